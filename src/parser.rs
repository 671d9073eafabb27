//! Recursive-descent parser.
//!
//! Parsing is also the analysis pass: struct and function definitions are
//! registered in the `SymbolTable` as they are seen, nodes are annotated
//! with the scope active where they were produced, and function bodies are
//! attached to their function symbol once the definition closes.
//! Definitions contribute no executable node to the returned program.

use thiserror::Error;

use crate::ast::{Leaf, Node, NodeKind};
use crate::lexer::{self, LexError};
use crate::symbols::{ScopeId, SymbolTable};
use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("Expected {expected}, found {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Nested definitions are not supported (line {line}, column {column})")]
    NestedDefinition { line: usize, column: usize },
}

/// Parses `source` into a sequence of top-level statements, recording
/// declarations in `symbols`.
///
/// Successive calls against the same table accumulate declarations, which
/// is what an interactive session relies on.
pub fn parse(source: &str, symbols: &mut SymbolTable) -> Result<Vec<Node>, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let scope = symbols.global_scope();
    Parser {
        tokens,
        position: 0,
        symbols,
        scope,
    }
    .parse_program()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    symbols: &'a mut SymbolTable,
    scope: ScopeId,
}

impl<'a> Parser<'a> {
    fn parse_program(mut self) -> Result<Vec<Node>, ParseError> {
        let mut program = Vec::new();
        while !matches!(self.current().kind, TokenKind::Eof) {
            if matches!(self.current().kind, TokenKind::Defstruct) {
                self.parse_struct_def()?;
            } else if matches!(self.current().kind, TokenKind::Defun) {
                self.parse_function_def()?;
            } else {
                program.push(self.parse_statement()?);
            }
        }
        Ok(program)
    }

    fn parse_struct_def(&mut self) -> Result<(), ParseError> {
        self.advance(); // defstruct
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let fields = self.parse_id_list()?;
        self.expect(TokenKind::End)?;
        self.symbols.declare_struct(self.scope, &name, fields);
        Ok(())
    }

    fn parse_function_def(&mut self) -> Result<(), ParseError> {
        self.advance(); // defun
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let params = if matches!(self.current().kind, TokenKind::RParen) {
            Vec::new()
        } else {
            self.parse_id_list()?
        };
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;

        let function = self.symbols.declare_function(self.scope, &name, params);
        // Body statements live in a local scope nested inside the function
        // scope, so parameters resolve through the ordinary upward walk.
        let body_scope = self.symbols.push_scope(self.symbols.function(function).scope());
        let enclosing = self.scope;
        self.scope = body_scope;

        let mut body = Vec::new();
        loop {
            if matches!(self.current().kind, TokenKind::End) {
                break;
            }
            if matches!(self.current().kind, TokenKind::Defstruct | TokenKind::Defun) {
                let span = self.current().span;
                return Err(ParseError::NestedDefinition {
                    line: span.line,
                    column: span.column,
                });
            }
            if matches!(self.current().kind, TokenKind::Eof) {
                return Err(self.unexpected("'end'"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance(); // end

        self.scope = enclosing;
        self.symbols.attach_body(function, body);
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        if matches!(self.current().kind, TokenKind::Print) {
            self.advance();
            let operand = self.parse_expression()?;
            return Ok(Node::with_leaf(
                NodeKind::Print,
                Leaf::Node(Box::new(operand)),
                self.scope,
            ));
        }
        if matches!(self.current().kind, TokenKind::Return) {
            self.advance();
            let operand = self.parse_expression()?;
            return Ok(Node::with_leaf(
                NodeKind::Return,
                Leaf::Node(Box::new(operand)),
                self.scope,
            ));
        }
        if matches!(self.current().kind, TokenKind::Identifier(_)) {
            if matches!(self.peek().kind, TokenKind::LParen) {
                return self.parse_call();
            }
            let target = self.parse_qualified_identifier()?;
            self.expect(TokenKind::Equal)?;
            let value = self.parse_expression()?;
            return Ok(Node::with_children(
                NodeKind::Assign,
                vec![target, value],
                self.scope,
            ));
        }
        Err(self.unexpected("a statement"))
    }

    fn parse_expression(&mut self) -> Result<Node, ParseError> {
        match &self.current().kind {
            TokenKind::Integer(value) => {
                let value = *value;
                self.advance();
                Ok(Node::with_leaf(NodeKind::Int, Leaf::Int(value), self.scope))
            }
            TokenKind::Str(value) => {
                let value = value.clone();
                self.advance();
                Ok(Node::with_leaf(NodeKind::Str, Leaf::Str(value), self.scope))
            }
            TokenKind::New => {
                self.advance();
                let name = self.expect_identifier()?;
                Ok(Node::with_leaf(
                    NodeKind::Instance,
                    Leaf::Name(name),
                    self.scope,
                ))
            }
            TokenKind::Identifier(_) => {
                if matches!(self.peek().kind, TokenKind::LParen) {
                    self.parse_call()
                } else {
                    self.parse_qualified_identifier()
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_call(&mut self) -> Result<Node, ParseError> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.current().kind, TokenKind::RParen) {
            args.push(self.parse_expression()?);
            while matches!(self.current().kind, TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Node {
            kind: NodeKind::Call,
            children: args,
            leaf: Some(Leaf::Name(name)),
            scope: self.scope,
        })
    }

    fn parse_qualified_identifier(&mut self) -> Result<Node, ParseError> {
        let mut name = self.expect_identifier()?;
        let mut qualified = false;
        while matches!(self.current().kind, TokenKind::Dot) {
            self.advance();
            let member = self.expect_identifier()?;
            name.push('.');
            name.push_str(&member);
            qualified = true;
        }
        let kind = if qualified {
            NodeKind::QualifiedIdentifier
        } else {
            NodeKind::Identifier
        };
        Ok(Node::with_leaf(kind, Leaf::Name(name), self.scope))
    }

    fn parse_id_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect_identifier()?];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.advance();
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position + 1).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream always ends with Eof")
        })
    }

    fn advance(&mut self) {
        if !matches!(self.current().kind, TokenKind::Eof) {
            self.position += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.current().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            line: token.span.line,
            column: token.span.column,
        }
    }
}
