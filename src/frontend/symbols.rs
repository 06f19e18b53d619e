//! Symbol table and scope management for Mica
//!
//! Scopes and symbols live in arena vectors owned by the table; the AST
//! refers to them by id, so annotations stay valid for as long as the
//! analyzer that produced them. Exited scopes are kept (not destroyed) so
//! later passes can re-enter them by id.

use std::collections::HashMap;

use crate::frontend::ast::{Loc, TypeNode};

/// Index into the table's symbol arena.
pub type SymbolId = usize;

/// Index into the table's scope arena.
pub type ScopeId = usize;

pub const GLOBAL_SCOPE: ScopeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Class,
    Enum,
    Type,
}

impl SymbolKind {
    /// Lowercase noun used in diagnostics ("Duplicate variable declaration").
    pub fn describe(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Enum => "enum",
            SymbolKind::Type => "type",
        }
    }
}

/// A named entity registered in a scope.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// A variable's type, a function's return type, or a class/enum's own
    /// type. Built-in type symbols carry their own name.
    pub ty: Option<TypeNode>,
    /// Location of the declaration that introduced this symbol.
    pub declared_at: Loc,
    /// Scope the symbol is registered in.
    pub scope: ScopeId,
    /// For functions, classes, and enums: the scope they introduce.
    pub own_scope: Option<ScopeId>,
    pub is_initialized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Parameters,
    FunctionBody,
    Class,
    Enum,
    Block,
}

/// One lexical scope: a name-to-symbol map plus a parent link.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub symbols: HashMap<String, SymbolId>,
}

impl Scope {
    fn new(parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            parent,
            kind,
            symbols: HashMap::new(),
        }
    }
}

/// Symbol table managing all named entities and the scope stack.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            symbols: Vec::new(),
            scopes: vec![Scope::new(None, ScopeKind::Global)],
            current: GLOBAL_SCOPE,
        };
        table.add_builtins();
        table
    }

    fn add_builtins(&mut self) {
        for name in ["int", "uint", "float", "bool", "string", "void"] {
            self.define(Symbol {
                name: name.to_string(),
                kind: SymbolKind::Type,
                ty: Some(TypeNode::new(name)),
                declared_at: Loc::default(),
                scope: GLOBAL_SCOPE,
                own_scope: None,
                is_initialized: true,
            });
        }
    }

    // ========================================================================
    // Scope stack
    // ========================================================================

    /// Create a scope nested in the current one and make it current.
    pub fn enter_new_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(Some(self.current), kind));
        self.current = id;
        id
    }

    /// Make a previously created scope current again.
    pub fn enter_scope(&mut self, id: ScopeId) {
        debug_assert!(id < self.scopes.len());
        self.current = id;
    }

    /// Return to the parent scope. The exited scope's symbols stay alive in
    /// the arena; only the cursor moves.
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    /// True when the cursor is back at the global scope; every pass must end
    /// in this state.
    pub fn at_global_scope(&self) -> bool {
        self.current == GLOBAL_SCOPE
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    /// Register a symbol in the current scope. Callers check for duplicates
    /// first; a same-name insert replaces the map entry.
    pub fn define(&mut self, mut symbol: Symbol) -> SymbolId {
        symbol.scope = self.current;
        let id = self.symbols.len();
        self.scopes[self.current].symbols.insert(symbol.name.clone(), id);
        self.symbols.push(symbol);
        id
    }

    /// Look up a name through the scope chain starting at the current scope.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.lookup_from(self.current, name)
    }

    /// Look up a name through the scope chain starting at `scope`.
    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut cursor = scope;
        loop {
            if let Some(&id) = self.scopes[cursor].symbols.get(name) {
                return Some(id);
            }
            match self.scopes[cursor].parent {
                Some(parent) => cursor = parent,
                None => return None,
            }
        }
    }

    /// Look up a name in the current scope only (no parent search).
    pub fn lookup_local(&self, name: &str) -> Option<SymbolId> {
        self.scopes[self.current].symbols.get(name).copied()
    }

    /// Look up a name in the given scope only (no parent search).
    pub fn lookup_local_in(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope].symbols.get(name).copied()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
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

    fn variable(name: &str, ty: &str) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Variable,
            ty: Some(TypeNode::new(ty)),
            declared_at: Loc::default(),
            scope: GLOBAL_SCOPE,
            own_scope: None,
            is_initialized: true,
        }
    }

    #[test]
    fn builtins_are_preregistered() {
        let table = SymbolTable::new();
        for name in ["int", "uint", "float", "bool", "string", "void"] {
            let id = table.lookup(name).expect(name);
            assert_eq!(table.get(id).kind, SymbolKind::Type);
        }
    }

    #[test]
    fn lookup_walks_the_scope_chain() {
        let mut table = SymbolTable::new();
        table.define(variable("x", "int"));

        table.enter_new_scope(ScopeKind::Block);
        assert!(table.lookup("x").is_some());
        table.define(variable("y", "float"));
        assert!(table.lookup("y").is_some());

        table.exit_scope();
        assert!(table.lookup("x").is_some());
        assert!(table.lookup("y").is_none(), "inner binding leaked out");
    }

    #[test]
    fn lookup_local_ignores_parents() {
        let mut table = SymbolTable::new();
        table.define(variable("x", "int"));
        table.enter_new_scope(ScopeKind::Block);
        assert!(table.lookup_local("x").is_none());
        assert!(table.lookup("x").is_some());
    }

    #[test]
    fn reentering_a_scope_sees_its_symbols() {
        let mut table = SymbolTable::new();
        let inner = table.enter_new_scope(ScopeKind::FunctionBody);
        table.define(variable("local", "int"));
        table.exit_scope();
        assert!(table.at_global_scope());
        assert!(table.lookup("local").is_none());

        table.enter_scope(inner);
        assert!(table.lookup("local").is_some());
        table.exit_scope();
        assert!(table.at_global_scope());
    }

    #[test]
    fn shadowing_resolves_to_the_nearest_scope() {
        let mut table = SymbolTable::new();
        table.define(variable("x", "int"));
        table.enter_new_scope(ScopeKind::Block);
        let inner = table.define(variable("x", "float"));
        assert_eq!(table.lookup("x"), Some(inner));
    }
}
