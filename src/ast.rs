use crate::symbols::ScopeId;

/// Kind tag for a syntax-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Assign,
    Instance,
    Call,
    Identifier,
    QualifiedIdentifier,
    Print,
    Str,
    Int,
    Return,
}

/// Leaf payload of a node: a literal value, a (possibly qualified) name,
/// or the operand node of `print`/`return`.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Int(i64),
    Str(String),
    Name(String),
    Node(Box<Node>),
}

/// Homogeneous syntax-tree node.
///
/// `scope` is the lexical scope active at the point the parser produced
/// the node; it is set once during analysis and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub leaf: Option<Leaf>,
    pub scope: ScopeId,
}

impl Node {
    pub fn with_leaf(kind: NodeKind, leaf: Leaf, scope: ScopeId) -> Self {
        Self {
            kind,
            children: Vec::new(),
            leaf: Some(leaf),
            scope,
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<Node>, scope: ScopeId) -> Self {
        Self {
            kind,
            children,
            leaf: None,
            scope,
        }
    }

    /// Name payload. The parser guarantees one for identifier, call, and
    /// instance nodes.
    pub fn name(&self) -> &str {
        match &self.leaf {
            Some(Leaf::Name(name)) => name,
            other => panic!("{:?} node has no name payload: {other:?}", self.kind),
        }
    }

    /// Operand payload. The parser guarantees one for print and return nodes.
    pub fn operand(&self) -> &Node {
        match &self.leaf {
            Some(Leaf::Node(node)) => node,
            other => panic!("{:?} node has no operand payload: {other:?}", self.kind),
        }
    }
}
