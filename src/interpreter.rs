//! Tree-walking evaluator.
//!
//! Name lookup at run time is deliberately two-level: the innermost call
//! frame first, then the global space, never intermediate frames. This
//! mirrors the static scope walk only loosely; the two hierarchies are
//! kept separate on purpose.

use crate::ast::{Leaf, Node, NodeKind};
use crate::runtime::error::RuntimeError;
use crate::runtime::space::{CallFrame, MemorySpace};
use crate::runtime::value::{InstanceRef, StructInstance, Value};
use crate::symbols::{FunctionId, Symbol, SymbolTable};

/// Control-flow marker for node evaluation: a produced value, or an early
/// return unwinding toward the nearest call boundary.
enum Flow {
    Value(Value),
    Return(Value),
}

/// Evaluator with persistent global space and captured print output.
///
/// Globals and captured output survive a failed `run`, so an interactive
/// session keeps its state across statements that error.
pub struct Interpreter {
    globals: MemorySpace,
    output: Vec<String>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            globals: MemorySpace::new("global"),
            output: Vec::new(),
        }
    }

    /// Evaluates each top-level statement in order against the declarations
    /// in `symbols`, collecting one result per statement (absent for
    /// statements that produce no value). The first failure aborts the run.
    pub fn run(
        &mut self,
        symbols: &SymbolTable,
        program: &[Node],
    ) -> Result<Vec<Value>, RuntimeError> {
        let mut evaluator = Evaluator {
            symbols,
            globals: &mut self.globals,
            stack: Vec::new(),
            output: &mut self.output,
        };
        let mut results = Vec::with_capacity(program.len());
        for statement in program {
            match evaluator.eval(statement)? {
                Flow::Value(value) => results.push(value),
                Flow::Return(_) => return Err(RuntimeError::ReturnOutsideFunction),
            }
        }
        Ok(results)
    }

    /// Drains the print output captured since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub fn globals(&self) -> &MemorySpace {
        &self.globals
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution context for one `run` call: the shared symbol table, the
/// global space, the call stack, and the print sink, threaded explicitly
/// so evaluation stays reentrant.
struct Evaluator<'a> {
    symbols: &'a SymbolTable,
    globals: &'a mut MemorySpace,
    stack: Vec<CallFrame>,
    output: &'a mut Vec<String>,
}

impl<'a> Evaluator<'a> {
    fn eval(&mut self, node: &Node) -> Result<Flow, RuntimeError> {
        match node.kind {
            NodeKind::Int => {
                let Some(Leaf::Int(value)) = node.leaf else {
                    panic!("Int node without integer payload");
                };
                Ok(Flow::Value(Value::Integer(value)))
            }
            NodeKind::Str => {
                let Some(Leaf::Str(value)) = &node.leaf else {
                    panic!("Str node without string payload");
                };
                Ok(Flow::Value(Value::Str(value.clone())))
            }
            NodeKind::Identifier => self.load(node.name()).map(Flow::Value),
            NodeKind::QualifiedIdentifier => self.load_field(node.name()).map(Flow::Value),
            NodeKind::Assign => self.eval_assign(node),
            NodeKind::Instance => self.eval_instance(node).map(Flow::Value),
            NodeKind::Call => self.eval_call(node),
            NodeKind::Print => {
                let value = match self.eval(node.operand())? {
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Value(value) => value,
                };
                self.output.push(value.to_output());
                Ok(Flow::Value(Value::Absent))
            }
            NodeKind::Return => {
                // An early return already unwinding keeps its value.
                let value = match self.eval(node.operand())? {
                    Flow::Return(value) | Flow::Value(value) => value,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Two-level identifier lookup: innermost call frame, then globals.
    fn load(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(frame) = self.stack.last()
            && let Some(value) = frame.space().lookup(name)
        {
            return Ok(value.clone());
        }
        if let Some(value) = self.globals.lookup(name) {
            return Ok(value.clone());
        }
        Err(RuntimeError::UndefinedVariable {
            name: name.to_string(),
        })
    }

    /// Resolves `base.member` in two steps: the base through the ordinary
    /// identifier lookup, the member against the instance's field table.
    /// A declared field that was never assigned reads as absent.
    fn load_field(&self, qualified: &str) -> Result<Value, RuntimeError> {
        let (base, member) = split_qualified(qualified);
        let instance = self.load_instance(base)?;
        let instance = instance.borrow();
        self.check_field(&instance, member)?;
        Ok(instance
            .space()
            .lookup(member)
            .cloned()
            .unwrap_or(Value::Absent))
    }

    fn eval_assign(&mut self, node: &Node) -> Result<Flow, RuntimeError> {
        let target = &node.children[0];
        let value = match self.eval(&node.children[1])? {
            Flow::Return(value) => return Ok(Flow::Return(value)),
            Flow::Value(value) => value,
        };
        match target.kind {
            NodeKind::QualifiedIdentifier => self.assign_field(target.name(), value)?,
            NodeKind::Identifier => self.assign_variable(target.name(), value),
            other => panic!("invalid assignment target {other:?}"),
        }
        Ok(Flow::Value(Value::Absent))
    }

    /// Field assignment: the member must exist in the base's struct symbol;
    /// the value lands in the instance's own space.
    fn assign_field(&mut self, qualified: &str, value: Value) -> Result<(), RuntimeError> {
        let (base, member) = split_qualified(qualified);
        let instance = self.load_instance(base)?;
        let mut instance = instance.borrow_mut();
        self.check_field(&instance, member)?;
        instance.space_mut().bind(member.to_string(), value);
        Ok(())
    }

    /// Unqualified assignment rebinds an existing reachable binding in
    /// place; otherwise the new binding lands in the current space.
    fn assign_variable(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.stack.last_mut()
            && frame.space().contains(name)
        {
            frame.space_mut().bind(name.to_string(), value);
            return;
        }
        if self.globals.contains(name) {
            self.globals.bind(name.to_string(), value);
            return;
        }
        self.current_space_mut().bind(name.to_string(), value);
    }

    fn eval_instance(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        let name = node.name();
        match self.symbols.resolve(node.scope, name) {
            Some(Symbol::Struct(id)) => {
                let symbol = self.symbols.struct_symbol(id);
                Ok(Value::Instance(StructInstance::new(id, symbol.name())))
            }
            _ => Err(RuntimeError::UndefinedStruct {
                name: name.to_string(),
            }),
        }
    }

    fn eval_call(&mut self, node: &Node) -> Result<Flow, RuntimeError> {
        let name = node.name();
        let function = match self.symbols.resolve(node.scope, name) {
            Some(Symbol::Function(id)) => id,
            _ => {
                return Err(RuntimeError::UndefinedFunction {
                    name: name.to_string(),
                });
            }
        };

        // Arguments are evaluated left to right in the caller's context,
        // before the callee frame exists.
        let mut args = Vec::with_capacity(node.children.len());
        for arg in &node.children {
            match self.eval(arg)? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Value(value) => args.push(value),
            }
        }

        let frame = CallFrame::with_arguments(self.symbols.function(function), args)?;
        self.stack.push(frame);
        let outcome = self.exec_body(function);
        // The frame is popped on every exit path, the error path included.
        self.stack.pop();
        Ok(Flow::Value(outcome?))
    }

    /// Runs body statements in order until one returns; a body that runs to
    /// completion produces an absent result.
    fn exec_body(&mut self, function: FunctionId) -> Result<Value, RuntimeError> {
        let body = self.symbols.function(function).body();
        for statement in body {
            if let Flow::Return(value) = self.eval(statement)? {
                return Ok(value);
            }
        }
        Ok(Value::Absent)
    }

    fn load_instance(&self, name: &str) -> Result<InstanceRef, RuntimeError> {
        match self.load(name)? {
            Value::Instance(instance) => Ok(instance),
            _ => Err(RuntimeError::NotAnInstance {
                name: name.to_string(),
            }),
        }
    }

    fn check_field(&self, instance: &StructInstance, member: &str) -> Result<(), RuntimeError> {
        if self
            .symbols
            .resolve_member(instance.struct_id(), member)
            .is_none()
        {
            return Err(RuntimeError::UnknownField {
                struct_name: instance.struct_name().to_string(),
                field: member.to_string(),
            });
        }
        Ok(())
    }

    fn current_space_mut(&mut self) -> &mut MemorySpace {
        match self.stack.last_mut() {
            Some(frame) => frame.space_mut(),
            None => self.globals,
        }
    }
}

/// The parser emits qualified names with at least one dot; everything after
/// the first dot is the member path.
fn split_qualified(qualified: &str) -> (&str, &str) {
    qualified
        .split_once('.')
        .expect("qualified identifier without a dot")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser;

    fn parse(source: &str, symbols: &mut SymbolTable) -> Vec<Node> {
        parser::parse(source, symbols).expect("parse failed")
    }

    fn run_source(source: &str) -> (Vec<Value>, Vec<String>) {
        let mut symbols = SymbolTable::new();
        let program = parse(source, &mut symbols);
        let mut interpreter = Interpreter::new();
        let results = interpreter.run(&symbols, &program).expect("run failed");
        (results, interpreter.take_output())
    }

    fn run_source_err(source: &str) -> (RuntimeError, Vec<String>) {
        let mut symbols = SymbolTable::new();
        let program = parse(source, &mut symbols);
        let mut interpreter = Interpreter::new();
        let error = interpreter
            .run(&symbols, &program)
            .expect_err("expected runtime error");
        (error, interpreter.take_output())
    }

    #[test]
    fn assigns_and_prints_a_global() {
        let (results, output) = run_source("x = 5 print x");
        assert_eq!(results, vec![Value::Absent, Value::Absent]);
        assert_eq!(output, vec!["5"]);
    }

    #[test]
    fn struct_field_roundtrip() {
        let (_, output) = run_source(
            "defstruct Point: x, y end
             p = new Point
             p.x = 5
             print p.x",
        );
        assert_eq!(output, vec!["5"]);
    }

    #[test]
    fn assigning_an_undeclared_field_fails() {
        let (error, output) = run_source_err(
            "defstruct Point: x, y end
             p = new Point
             p.z = 1",
        );
        assert_eq!(
            error,
            RuntimeError::UnknownField {
                struct_name: "Point".to_string(),
                field: "z".to_string(),
            }
        );
        assert!(output.is_empty());
    }

    #[test]
    fn reading_an_undeclared_field_fails() {
        let (error, _) = run_source_err(
            "defstruct Point: x end
             p = new Point
             print p.ghost",
        );
        assert_eq!(
            error,
            RuntimeError::UnknownField {
                struct_name: "Point".to_string(),
                field: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn declared_but_unassigned_field_reads_absent() {
        let (_, output) = run_source(
            "defstruct Point: x end
             p = new Point
             print p.x",
        );
        assert_eq!(output, vec!["absent"]);
    }

    #[test]
    fn field_access_through_a_non_instance_fails() {
        let (error, _) = run_source_err("n = 5 n.x = 1");
        assert_eq!(
            error,
            RuntimeError::NotAnInstance {
                name: "n".to_string()
            }
        );
    }

    #[test]
    fn call_returns_first_argument_positionally() {
        let (results, _) = run_source(
            "defun add(a, b): return a end
             add(3, 4)",
        );
        assert_eq!(results, vec![Value::Integer(3)]);
    }

    #[test]
    fn parameters_bind_in_declaration_order() {
        let (_, output) = run_source(
            "defun pair(first, second): print first print second end
             pair(1, 2)",
        );
        assert_eq!(output, vec!["1", "2"]);
    }

    #[test]
    fn wrong_arity_fails_without_output() {
        let (error, output) = run_source_err(
            "defun add(a, b): return a end
             add(3)",
        );
        assert_eq!(
            error,
            RuntimeError::ArityMismatch {
                name: "add".to_string(),
                expected: 2,
                found: 1,
            }
        );
        assert!(output.is_empty());
    }

    #[test]
    fn return_stops_the_rest_of_the_body() {
        let (results, output) = run_source(
            "defun f(): print 1 return 2 print 3 end
             f()",
        );
        assert_eq!(results, vec![Value::Integer(2)]);
        assert_eq!(output, vec!["1"]);
    }

    #[test]
    fn body_without_return_produces_absent() {
        let (results, _) = run_source(
            "defun f(): x = 1 end
             f()",
        );
        assert_eq!(results, vec![Value::Absent]);
    }

    #[test]
    fn frame_binding_shadows_global_without_mutating_it() {
        let (_, output) = run_source(
            "x = 'global'
             defun f(): x = 'local' print x end
             f()
             print x",
        );
        assert_eq!(output, vec!["local", "global"]);
    }

    #[test]
    fn assignment_to_existing_global_from_inside_a_call_rebinds_it() {
        let (_, output) = run_source(
            "defun bump(): counter = 2 end
             counter = 1
             bump()
             print counter",
        );
        assert_eq!(output, vec!["2"]);
    }

    #[test]
    fn call_locals_do_not_leak() {
        let (error, _) = run_source_err(
            "defun f(): hidden = 1 end
             f()
             print hidden",
        );
        assert_eq!(
            error,
            RuntimeError::UndefinedVariable {
                name: "hidden".to_string()
            }
        );
    }

    #[test]
    fn distinct_instances_have_distinct_field_storage() {
        let (_, output) = run_source(
            "defstruct P: x end
             a = new P
             b = new P
             a.x = 1
             b.x = 2
             print a.x
             print b.x",
        );
        assert_eq!(output, vec!["1", "2"]);
    }

    #[test]
    fn aliased_names_observe_each_others_field_writes() {
        let (_, output) = run_source(
            "defstruct Box: v end
             a = new Box
             b = a
             a.v = 7
             print b.v",
        );
        assert_eq!(output, vec!["7"]);
    }

    #[test]
    fn instances_survive_the_constructing_call() {
        let (_, output) = run_source(
            "defstruct Box: v end
             defun make(): b = new Box b.v = 9 return b end
             result = make()
             print result.v",
        );
        assert_eq!(output, vec!["9"]);
    }

    #[test]
    fn nested_calls_each_get_their_own_frame() {
        let (results, _) = run_source(
            "defun inner(n): return n end
             defun outer(n): return inner(5) end
             outer(1)",
        );
        assert_eq!(results, vec![Value::Integer(5)]);
    }

    #[test]
    fn top_level_return_is_rejected() {
        let (error, _) = run_source_err("return 1");
        assert_eq!(error, RuntimeError::ReturnOutsideFunction);
    }

    #[test]
    fn undefined_names_report_the_offender() {
        let (error, _) = run_source_err("print ghost");
        assert_eq!(
            error,
            RuntimeError::UndefinedVariable {
                name: "ghost".to_string()
            }
        );

        let (error, _) = run_source_err("missing()");
        assert_eq!(
            error,
            RuntimeError::UndefinedFunction {
                name: "missing".to_string()
            }
        );

        let (error, _) = run_source_err("p = new Ghost");
        assert_eq!(
            error,
            RuntimeError::UndefinedStruct {
                name: "Ghost".to_string()
            }
        );
    }

    #[test]
    fn calling_a_struct_name_is_an_undefined_function() {
        let (error, _) = run_source_err("defstruct Point: x end Point()");
        assert_eq!(
            error,
            RuntimeError::UndefinedFunction {
                name: "Point".to_string()
            }
        );
    }

    #[test]
    fn state_survives_a_failed_run() {
        let mut symbols = SymbolTable::new();
        let mut interpreter = Interpreter::new();

        let program = parse("x = 1 print ghost", &mut symbols);
        interpreter
            .run(&symbols, &program)
            .expect_err("expected undefined variable");

        let program = parse("print x", &mut symbols);
        interpreter
            .run(&symbols, &program)
            .expect("second run failed");
        assert_eq!(interpreter.take_output(), vec!["1"]);
    }

    #[test]
    fn frames_are_popped_after_a_failing_call() {
        let mut symbols = SymbolTable::new();
        let mut interpreter = Interpreter::new();

        let program = parse("defun f(): print ghost end f()", &mut symbols);
        interpreter
            .run(&symbols, &program)
            .expect_err("expected undefined variable");

        // A binding created after the failure lands in the global space,
        // proving the dead frame is gone.
        let program = parse("y = 2 print y", &mut symbols);
        interpreter
            .run(&symbols, &program)
            .expect("follow-up run failed");
        assert_eq!(interpreter.take_output(), vec!["2"]);
        assert!(interpreter.globals().contains("y"));
    }

    // A return in an expression position cannot be written in the concrete
    // syntax, but the node shape is constructible; it must unwind to the
    // call boundary without performing the enclosing operation.
    #[test]
    fn return_unwinds_through_an_expression_position() {
        let mut symbols = SymbolTable::new();
        let function = symbols.declare_function(symbols.global_scope(), "f", Vec::new());
        let body_scope = symbols.push_scope(symbols.function(function).scope());

        let returned = Node::with_leaf(
            NodeKind::Return,
            Leaf::Node(Box::new(Node::with_leaf(
                NodeKind::Int,
                Leaf::Int(9),
                body_scope,
            ))),
            body_scope,
        );
        let print_of_return = Node::with_leaf(
            NodeKind::Print,
            Leaf::Node(Box::new(returned)),
            body_scope,
        );
        symbols.attach_body(function, vec![print_of_return]);

        let call = Node {
            kind: NodeKind::Call,
            children: Vec::new(),
            leaf: Some(Leaf::Name("f".to_string())),
            scope: symbols.global_scope(),
        };

        let mut interpreter = Interpreter::new();
        let results = interpreter.run(&symbols, &[call]).expect("run failed");
        assert_eq!(results, vec![Value::Integer(9)]);
        assert!(interpreter.take_output().is_empty());
    }
}
