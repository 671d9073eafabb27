use rustc_hash::FxHashMap;

use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;
use crate::symbols::FunctionSymbol;

/// Named mutable mapping from variable/field name to runtime value.
///
/// Spaces are not lexically chained: `lookup` never walks upward. The
/// evaluator decides which spaces to consult and in what order.
#[derive(Debug)]
pub struct MemorySpace {
    name: String,
    members: FxHashMap<String, Value>,
}

impl MemorySpace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.members.insert(name.into(), value);
    }

    /// Current bindings sorted by name, for display.
    pub fn bindings(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<_> = self
            .members
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }
}

/// Memory space created per function invocation and destroyed when the
/// call returns; its bindings never outlive the call.
#[derive(Debug)]
pub struct CallFrame {
    space: MemorySpace,
}

impl CallFrame {
    /// Builds the callee frame, binding already-evaluated arguments to the
    /// formal parameters positionally. Fails if the counts differ. The
    /// space is named after the function being invoked.
    pub fn with_arguments(
        symbol: &FunctionSymbol,
        args: Vec<Value>,
    ) -> Result<Self, RuntimeError> {
        if args.len() != symbol.params().len() {
            return Err(RuntimeError::ArityMismatch {
                name: symbol.name().to_string(),
                expected: symbol.params().len(),
                found: args.len(),
            });
        }
        let mut space = MemorySpace::new(symbol.name());
        for (param, value) in symbol.params().iter().zip(args) {
            space.bind(param.clone(), value);
        }
        Ok(Self { space })
    }

    pub fn space(&self) -> &MemorySpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut MemorySpace {
        &mut self.space
    }
}
