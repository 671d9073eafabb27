use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unknown symbol '{symbol}' at line {line}, column {column}")]
    UnknownSymbol {
        symbol: char,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("Invalid integer literal '{literal}' at line {line}, column {column}")]
    InvalidInteger {
        literal: String,
        line: usize,
        column: usize,
    },
}

/// Splits source text into tokens, ending with a single `Eof` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let span = self.span();
        let Some(&(_, ch)) = self.chars.peek() else {
            return Ok(Token::new(TokenKind::Eof, span));
        };

        if ch.is_ascii_digit() {
            return Ok(Token::new(self.lex_integer(span)?, span));
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(Token::new(self.lex_word(), span));
        }
        if ch == '\'' {
            return Ok(Token::new(self.lex_string(span)?, span));
        }

        self.bump();
        let kind = match ch {
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '=' => TokenKind::Equal,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            _ => {
                return Err(LexError::UnknownSymbol {
                    symbol: ch,
                    line: span.line,
                    column: span.column,
                });
            }
        };
        Ok(Token::new(kind, span))
    }

    fn lex_integer(&mut self, start: Span) -> Result<TokenKind, LexError> {
        let mut digits = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            digits.push(ch);
            self.bump();
        }
        // Only ASCII digits were collected; the parse can still overflow.
        match digits.parse() {
            Ok(value) => Ok(TokenKind::Integer(value)),
            Err(_) => Err(LexError::InvalidInteger {
                literal: digits,
                line: start.line,
                column: start.column,
            }),
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if !ch.is_ascii_alphanumeric() && ch != '_' {
                break;
            }
            word.push(ch);
            self.bump();
        }
        match word.as_str() {
            "defstruct" => TokenKind::Defstruct,
            "defun" => TokenKind::Defun,
            "end" => TokenKind::End,
            "new" => TokenKind::New,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            _ => TokenKind::Identifier(word),
        }
    }

    fn lex_string(&mut self, start: Span) -> Result<TokenKind, LexError> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            let Some(&(_, ch)) = self.chars.peek() else {
                return Err(LexError::UnterminatedString {
                    line: start.line,
                    column: start.column,
                });
            };
            self.bump();
            match ch {
                '\'' => return Ok(TokenKind::Str(value)),
                '\\' => {
                    let Some(&(_, escaped)) = self.chars.peek() else {
                        return Err(LexError::UnterminatedString {
                            line: start.line,
                            column: start.column,
                        });
                    };
                    self.bump();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        other => value.push(other),
                    }
                }
                other => value.push(other),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    fn bump(&mut self) {
        if let Some((_, ch)) = self.chars.next() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }
}
