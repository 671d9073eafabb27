use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::space::MemorySpace;
use crate::symbols::StructId;

/// Shared handle to a struct instance. Every name bound to the same
/// instance observes the same field writes; the instance is released when
/// the last handle drops (no cycles are constructible in the language).
pub type InstanceRef = Rc<RefCell<StructInstance>>;

/// Per-instance memory space tagged with the struct symbol it was
/// constructed from. Fields start absent and are populated on first
/// assignment.
#[derive(Debug)]
pub struct StructInstance {
    struct_id: StructId,
    space: MemorySpace,
}

impl StructInstance {
    pub fn new(struct_id: StructId, struct_name: &str) -> InstanceRef {
        Rc::new(RefCell::new(Self {
            struct_id,
            space: MemorySpace::new(struct_name),
        }))
    }

    pub fn struct_id(&self) -> StructId {
        self.struct_id
    }

    pub fn struct_name(&self) -> &str {
        self.space.name()
    }

    pub fn space(&self) -> &MemorySpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut MemorySpace {
        &mut self.space
    }
}

/// Tagged runtime value. Values are never implicitly converted between
/// tags; `Absent` is the result of statements that produce no value.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Str(String),
    Instance(InstanceRef),
    Absent,
}

impl Value {
    pub fn to_output(&self) -> String {
        match self {
            Value::Integer(value) => value.to_string(),
            Value::Str(value) => value.clone(),
            Value::Instance(instance) => {
                format!("<struct {}>", instance.borrow().struct_name())
            }
            Value::Absent => "absent".to_string(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }
}

impl PartialEq for Value {
    /// Instances compare by identity, not by field contents.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::Instance(left), Value::Instance(right)) => Rc::ptr_eq(left, right),
            (Value::Absent, Value::Absent) => true,
            _ => false,
        }
    }
}
