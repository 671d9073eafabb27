use std::fmt;

/// Source position of a token, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    Str(String),

    // Keywords
    Defstruct,
    Defun,
    End,
    New,
    Print,
    Return,

    // Punctuation
    Colon,  // :
    Comma,  // ,
    Dot,    // .
    Equal,  // =
    LParen, // (
    RParen, // )

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::Integer(value) => write!(f, "integer {value}"),
            TokenKind::Str(value) => write!(f, "string '{value}'"),
            TokenKind::Defstruct => write!(f, "'defstruct'"),
            TokenKind::Defun => write!(f, "'defun'"),
            TokenKind::End => write!(f, "'end'"),
            TokenKind::New => write!(f, "'new'"),
            TokenKind::Print => write!(f, "'print'"),
            TokenKind::Return => write!(f, "'return'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Equal => write!(f, "'='"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
