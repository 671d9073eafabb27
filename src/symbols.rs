//! Static scope and symbol model.
//!
//! Scopes and symbols are built once while a program is analyzed and are
//! immutable afterwards; every later evaluation shares them read-only.
//! Scopes live in an arena inside `SymbolTable` so syntax-tree nodes can
//! carry a plain `ScopeId` as their non-owning scope reference.

use rustc_hash::FxHashMap;

use crate::ast::Node;

/// Handle to a scope entry in a `SymbolTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(u32);

/// A named declaration recorded in a scope.
///
/// Struct and function symbols double as scopes (their fields and formal
/// parameters live in a member scope of their own), so the same `resolve`
/// walk that finds globals also finds parameters from inside a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Struct(StructId),
    Function(FunctionId),
    Variable,
}

#[derive(Debug)]
struct ScopeData {
    parent: Option<ScopeId>,
    members: FxHashMap<String, Symbol>,
}

#[derive(Debug)]
pub struct StructSymbol {
    name: String,
    scope: ScopeId,
    fields: Vec<String>,
}

impl StructSymbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member scope holding the field declarations.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Field names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

#[derive(Debug)]
pub struct FunctionSymbol {
    name: String,
    scope: ScopeId,
    params: Vec<String>,
    body: Vec<Node>,
}

impl FunctionSymbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member scope holding the formal-parameter declarations.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Formal parameters in declaration order; call arguments bind to
    /// these positionally.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &[Node] {
        &self.body
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<ScopeData>,
    structs: Vec<StructSymbol>,
    functions: Vec<FunctionSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeData {
                parent: None,
                members: FxHashMap::default(),
            }],
            structs: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// The root scope holding top-level declarations.
    pub fn global_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Creates an empty nested scope under `parent`.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeData {
            parent: Some(parent),
            members: FxHashMap::default(),
        });
        id
    }

    /// Records `symbol` under `name` in `scope`. Redeclaring a name in the
    /// same scope silently overwrites the earlier declaration.
    pub fn define(&mut self, scope: ScopeId, name: impl Into<String>, symbol: Symbol) {
        self.scopes[scope.0 as usize]
            .members
            .insert(name.into(), symbol);
    }

    /// Nearest declaration of `name` visible from `scope`: the scope's own
    /// table first, then each enclosing scope up to the root.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<Symbol> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            let data = &self.scopes[scope.0 as usize];
            if let Some(symbol) = data.members.get(name) {
                return Some(*symbol);
            }
            current = data.parent;
        }
        None
    }

    /// Looks up `field` in the struct's own field table only; no upward
    /// walk. Used for field-existence checks on qualified access.
    pub fn resolve_member(&self, id: StructId, field: &str) -> Option<Symbol> {
        let scope = self.structs[id.0 as usize].scope;
        self.scopes[scope.0 as usize].members.get(field).copied()
    }

    /// Declares a struct in `scope` and gives it a member scope populated
    /// with its field declarations.
    pub fn declare_struct(&mut self, scope: ScopeId, name: &str, fields: Vec<String>) -> StructId {
        let member_scope = self.push_scope(scope);
        for field in &fields {
            self.define(member_scope, field.clone(), Symbol::Variable);
        }
        let id = StructId(self.structs.len() as u32);
        self.structs.push(StructSymbol {
            name: name.to_string(),
            scope: member_scope,
            fields,
        });
        self.define(scope, name, Symbol::Struct(id));
        id
    }

    /// Declares a function in `scope` with an empty body; the body is
    /// attached once its statements have been analyzed.
    pub fn declare_function(
        &mut self,
        scope: ScopeId,
        name: &str,
        params: Vec<String>,
    ) -> FunctionId {
        let member_scope = self.push_scope(scope);
        for param in &params {
            self.define(member_scope, param.clone(), Symbol::Variable);
        }
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(FunctionSymbol {
            name: name.to_string(),
            scope: member_scope,
            params,
            body: Vec::new(),
        });
        self.define(scope, name, Symbol::Function(id));
        id
    }

    pub fn attach_body(&mut self, function: FunctionId, body: Vec<Node>) {
        self.functions[function.0 as usize].body = body;
    }

    pub fn function(&self, id: FunctionId) -> &FunctionSymbol {
        &self.functions[id.0 as usize]
    }

    pub fn struct_symbol(&self, id: StructId) -> &StructSymbol {
        &self.structs[id.0 as usize]
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_walks_enclosing_scopes() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let function = table.declare_function(global, "f", vec!["a".to_string()]);
        let body_scope = table.push_scope(table.function(function).scope());

        assert_eq!(table.resolve(body_scope, "a"), Some(Symbol::Variable));
        assert_eq!(
            table.resolve(body_scope, "f"),
            Some(Symbol::Function(function))
        );
        assert_eq!(table.resolve(body_scope, "missing"), None);
    }

    #[test]
    fn resolve_member_does_not_walk_upward() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        table.define(global, "above", Symbol::Variable);
        let id = table.declare_struct(global, "Point", vec!["x".to_string(), "y".to_string()]);

        assert_eq!(table.resolve_member(id, "x"), Some(Symbol::Variable));
        assert_eq!(table.resolve_member(id, "above"), None);

        // The struct's member scope still resolves outward via `resolve`.
        let member_scope = table.struct_symbol(id).scope();
        assert_eq!(table.resolve(member_scope, "above"), Some(Symbol::Variable));
    }

    #[test]
    fn redeclaration_in_one_scope_overwrites_silently() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let first = table.declare_struct(global, "Thing", vec![]);
        table.define(global, "Thing", Symbol::Variable);

        assert_eq!(table.resolve(global, "Thing"), Some(Symbol::Variable));
        // The earlier struct entry itself is untouched.
        assert_eq!(table.struct_symbol(first).name(), "Thing");
    }

    #[test]
    fn function_params_keep_declaration_order() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let id = table.declare_function(
            global,
            "pair",
            vec!["first".to_string(), "second".to_string()],
        );

        assert_eq!(table.function(id).params(), ["first", "second"]);
    }
}
