use thiserror::Error;

/// Typed runtime failures surfaced by `Interpreter::run`.
///
/// Each aborts the statement that raised it; none are retried. Parse-time
/// failures live in `lexer::LexError`/`parser::ParseError` and are never
/// folded into this taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Undefined struct '{name}'")]
    UndefinedStruct { name: String },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Struct '{struct_name}' has no field '{field}'")]
    UnknownField { struct_name: String, field: String },
    #[error("'{name}' is not a struct instance")]
    NotAnInstance { name: String },
    #[error("Return outside of function")]
    ReturnOutsideFunction,
}
