// marmoset-vm - Symbol table tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use marmoset_vm::{Symbol, SymbolScope, SymbolTable};

fn symbol(name: &str, scope: SymbolScope, index: usize) -> Symbol {
    Symbol {
        name: name.to_string(),
        scope,
        index,
    }
}

#[test]
fn test_define_globals() {
    let mut table = SymbolTable::new();
    assert_eq!(table.define("a"), symbol("a", SymbolScope::Global, 0));
    assert_eq!(table.define("b"), symbol("b", SymbolScope::Global, 1));
    assert_eq!(table.num_definitions(), 2);
}

#[test]
fn test_resolve_globals() {
    let mut table = SymbolTable::new();
    table.define("a");
    table.define("b");

    assert_eq!(table.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
    assert_eq!(table.resolve("b"), Some(symbol("b", SymbolScope::Global, 1)));
    assert_eq!(table.resolve("c"), None);
}

#[test]
fn test_dense_indices_per_scope() {
    let mut table = SymbolTable::new();
    // Built-ins get externally assigned indices and must not disturb the
    // global slot numbering.
    table.define_builtin(0, "len");
    table.define_builtin(1, "puts");

    for (i, name) in ["x", "y", "z"].iter().enumerate() {
        assert_eq!(table.define(name), symbol(name, SymbolScope::Global, i));
    }
    assert_eq!(table.num_definitions(), 3);

    table.enter_scope();
    for (i, name) in ["p", "q"].iter().enumerate() {
        assert_eq!(table.define(name), symbol(name, SymbolScope::Local, i));
    }
    assert_eq!(table.num_definitions(), 2);
}

#[test]
fn test_resolve_local() {
    let mut table = SymbolTable::new();
    table.define("a");
    table.define("b");

    table.enter_scope();
    table.define("c");
    table.define("d");

    assert_eq!(table.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
    assert_eq!(table.resolve("b"), Some(symbol("b", SymbolScope::Global, 1)));
    assert_eq!(table.resolve("c"), Some(symbol("c", SymbolScope::Local, 0)));
    assert_eq!(table.resolve("d"), Some(symbol("d", SymbolScope::Local, 1)));
}

#[test]
fn test_resolve_free() {
    let mut table = SymbolTable::new();
    table.define("a");
    table.define("b");

    table.enter_scope();
    table.define("c");
    table.define("d");

    table.enter_scope();
    table.define("e");
    table.define("f");

    // Globals pass through; outer locals get promoted to free captures.
    assert_eq!(table.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
    assert_eq!(table.resolve("b"), Some(symbol("b", SymbolScope::Global, 1)));
    assert_eq!(table.resolve("c"), Some(symbol("c", SymbolScope::Free, 0)));
    assert_eq!(table.resolve("d"), Some(symbol("d", SymbolScope::Free, 1)));
    assert_eq!(table.resolve("e"), Some(symbol("e", SymbolScope::Local, 0)));
    assert_eq!(table.resolve("f"), Some(symbol("f", SymbolScope::Local, 1)));

    // The free list records the symbols as seen from the enclosing scope.
    assert_eq!(
        table.free_symbols(),
        vec![
            symbol("c", SymbolScope::Local, 0),
            symbol("d", SymbolScope::Local, 1),
        ]
    );
}

#[test]
fn test_free_promotion_is_cached() {
    let mut table = SymbolTable::new();
    table.enter_scope();
    table.define("a");
    table.enter_scope();

    let first = table.resolve("a");
    let second = table.resolve("a");
    assert_eq!(first, Some(symbol("a", SymbolScope::Free, 0)));
    assert_eq!(second, first);
    assert_eq!(table.free_symbols().len(), 1);
}

#[test]
fn test_transitive_free_promotion() {
    let mut table = SymbolTable::new();
    table.enter_scope();
    table.define("a");

    table.enter_scope();
    table.enter_scope();

    // Two levels down, `a` chains through the middle scope's free list.
    assert_eq!(table.resolve("a"), Some(symbol("a", SymbolScope::Free, 0)));
    assert_eq!(
        table.free_symbols(),
        vec![symbol("a", SymbolScope::Free, 0)]
    );

    table.leave_scope();
    assert_eq!(
        table.free_symbols(),
        vec![symbol("a", SymbolScope::Local, 0)]
    );
}

#[test]
fn test_unresolvable_free() {
    let mut table = SymbolTable::new();
    table.define("a");

    table.enter_scope();
    table.define("c");

    table.enter_scope();
    table.define("e");
    table.define("f");

    assert_eq!(table.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
    assert_eq!(table.resolve("c"), Some(symbol("c", SymbolScope::Free, 0)));
    assert_eq!(table.resolve("e"), Some(symbol("e", SymbolScope::Local, 0)));
    assert_eq!(table.resolve("f"), Some(symbol("f", SymbolScope::Local, 1)));
    assert_eq!(table.resolve("b"), None);
    assert_eq!(table.resolve("d"), None);
}

#[test]
fn test_define_and_resolve_builtins() {
    let mut table = SymbolTable::new();
    let expected = [
        symbol("len", SymbolScope::Builtin, 0),
        symbol("puts", SymbolScope::Builtin, 1),
        symbol("first", SymbolScope::Builtin, 2),
    ];
    for builtin in &expected {
        table.define_builtin(builtin.index, &builtin.name);
    }

    // Built-ins resolve without promotion at every nesting depth.
    for _ in 0..2 {
        for builtin in &expected {
            assert_eq!(table.resolve(&builtin.name), Some(builtin.clone()));
        }
        table.enter_scope();
    }
    assert!(table.free_symbols().is_empty());
}

#[test]
fn test_function_name_resolves_to_self_reference() {
    let mut table = SymbolTable::new();
    table.enter_scope();
    table.define_function_name("fact");
    table.define("n");

    assert_eq!(
        table.resolve("fact"),
        Some(symbol("fact", SymbolScope::Function, 0))
    );
    assert_eq!(table.resolve("n"), Some(symbol("n", SymbolScope::Local, 0)));

    // The function name is not a definition and takes no local slot.
    assert_eq!(table.num_definitions(), 1);

    // It also passes through nested scopes without becoming a capture.
    table.enter_scope();
    assert_eq!(
        table.resolve("fact"),
        Some(symbol("fact", SymbolScope::Function, 0))
    );
    assert!(table.free_symbols().is_empty());
}

#[test]
fn test_shadowing_function_name() {
    let mut table = SymbolTable::new();
    table.enter_scope();
    table.define_function_name("a");
    let shadow = table.define("a");

    assert_eq!(shadow, symbol("a", SymbolScope::Local, 0));
    assert_eq!(table.resolve("a"), Some(shadow));
}

#[test]
fn test_leave_scope_hides_locals() {
    let mut table = SymbolTable::new();
    table.enter_scope();
    table.define("inner");
    table.leave_scope();

    assert_eq!(table.resolve("inner"), None);
}
