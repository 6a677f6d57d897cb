// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexically nested symbol table.
//!
//! Scopes live in an arena indexed by `ScopeId`; the active scope moves on
//! `enter_scope`/`leave_scope`. Resolving a name that is local to an
//! ancestor function promotes it into the current scope's free list, which
//! is how the compiler discovers closure captures.

use std::collections::HashMap;

/// Where a resolved name lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Top-level binding; index is a global slot.
    Global,
    /// Binding inside a function; index is a local slot.
    Local,
    /// Captured from an enclosing function; index into the closure's free
    /// list.
    Free,
    /// Native function; index is its position in the registration table.
    Builtin,
    /// The enclosing function literal's own name (self-reference).
    Function,
}

/// A resolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// Identifier of a scope in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScopeId(usize);

const ROOT: ScopeId = ScopeId(0);

#[derive(Debug, Clone, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    store: HashMap<String, Symbol>,
    free_symbols: Vec<Symbol>,
    /// Count of `define` calls; builtin and function-name entries excluded.
    num_definitions: usize,
}

/// Tree of lexical scopes with an active cursor.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<ScopeData>,
    current: ScopeId,
}

impl SymbolTable {
    /// Create a table holding only the global root scope.
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![ScopeData::default()],
            current: ROOT,
        }
    }

    /// Push a fresh scope under the current one and make it active.
    pub fn enter_scope(&mut self) {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(ScopeData {
            parent: Some(self.current),
            ..ScopeData::default()
        });
        self.current = id;
    }

    /// Make the parent scope active again.
    ///
    /// The left scope's data stays in the arena, so its free list remains
    /// readable after leaving.
    pub fn leave_scope(&mut self) {
        self.current = self.scopes[self.current.0]
            .parent
            .expect("leave_scope on the global scope");
    }

    /// Reset the cursor to the global root scope.
    pub fn reset_to_root(&mut self) {
        self.current = ROOT;
    }

    /// Whether the active scope is the global root.
    pub fn is_global_scope(&self) -> bool {
        self.current == ROOT
    }

    /// Define a name in the active scope.
    ///
    /// Indices are dense per scope: 0, 1, 2, ... in definition order.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.current == ROOT {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };

        let data = &mut self.scopes[self.current.0];
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: data.num_definitions,
        };
        data.num_definitions += 1;
        data.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Register a built-in in the root scope under its table index.
    ///
    /// Built-ins do not count toward global slot numbering.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.scopes[ROOT.0]
            .store
            .insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Register a function literal's own name in its body scope.
    ///
    /// Resolving the name inside the body yields a `Function` symbol, which
    /// compiles to a self-reference instead of a capture.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Function,
            index: 0,
        };
        self.scopes[self.current.0]
            .store
            .insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Resolve a name, searching enclosing scopes.
    ///
    /// A hit on an ancestor's `Local` (or already-promoted `Free`) binding
    /// is promoted into the current scope's free list and cached in its
    /// store, so repeated resolutions return the same index. `Global`,
    /// `Builtin`, and `Function` resolutions pass through unchanged.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        self.resolve_in(self.current, name)
    }

    fn resolve_in(&mut self, scope: ScopeId, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.scopes[scope.0].store.get(name) {
            return Some(symbol.clone());
        }

        let parent = self.scopes[scope.0].parent?;
        let outer = self.resolve_in(parent, name)?;

        match outer.scope {
            SymbolScope::Global | SymbolScope::Builtin | SymbolScope::Function => Some(outer),
            SymbolScope::Local | SymbolScope::Free => Some(self.define_free(scope, outer)),
        }
    }

    fn define_free(&mut self, scope: ScopeId, original: Symbol) -> Symbol {
        let data = &mut self.scopes[scope.0];
        data.free_symbols.push(original.clone());

        let symbol = Symbol {
            name: original.name,
            scope: SymbolScope::Free,
            index: data.free_symbols.len() - 1,
        };
        data.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// The active scope's free captures, in promotion order.
    ///
    /// Each entry is the symbol as resolved in the parent scope, which is
    /// exactly what the compiler must load before building the closure.
    pub fn free_symbols(&self) -> Vec<Symbol> {
        self.scopes[self.current.0].free_symbols.clone()
    }

    /// Number of definitions in the active scope, built-ins excluded.
    pub fn num_definitions(&self) -> usize {
        self.scopes[self.current.0].num_definitions
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
