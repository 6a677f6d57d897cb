// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Built-in functions for Marmoset.
//!
//! The table order is the registration order: the compiler registers each
//! name under its index here, and `OpGetBuiltin` uses the same index at
//! runtime. Failures are reported as `Value::Error` results, which flow
//! through the language as ordinary values.

use crate::value::{Builtin, Value};

/// The built-in registration table.
pub static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "len",
        func: builtin_len,
    },
    Builtin {
        name: "puts",
        func: builtin_puts,
    },
    Builtin {
        name: "first",
        func: builtin_first,
    },
    Builtin {
        name: "last",
        func: builtin_last,
    },
    Builtin {
        name: "rest",
        func: builtin_rest,
    },
    Builtin {
        name: "push",
        func: builtin_push,
    },
];

/// Look up a built-in by name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

fn wrong_arguments(got: usize, want: usize) -> Option<Value> {
    Some(Value::error(format!(
        "wrong number of arguments. got={}, want={}",
        got, want
    )))
}

/// Length of an array or string.
fn builtin_len(args: &[Value]) -> Option<Value> {
    if args.len() != 1 {
        return wrong_arguments(args.len(), 1);
    }
    match &args[0] {
        Value::Array(elements) => Some(Value::Integer(elements.len() as i64)),
        Value::Str(value) => Some(Value::Integer(value.len() as i64)),
        other => Some(Value::error(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        ))),
    }
}

/// Print each argument on its own line.
fn builtin_puts(args: &[Value]) -> Option<Value> {
    for arg in args {
        println!("{}", arg);
    }
    None
}

/// First element of an array, or null when empty.
fn builtin_first(args: &[Value]) -> Option<Value> {
    if args.len() != 1 {
        return wrong_arguments(args.len(), 1);
    }
    match &args[0] {
        Value::Array(elements) => Some(elements.front().cloned().unwrap_or(Value::Null)),
        other => Some(Value::error(format!(
            "argument to `first` must be array, got {}",
            other.type_name()
        ))),
    }
}

/// Last element of an array, or null when empty.
fn builtin_last(args: &[Value]) -> Option<Value> {
    if args.len() != 1 {
        return wrong_arguments(args.len(), 1);
    }
    match &args[0] {
        Value::Array(elements) => Some(elements.back().cloned().unwrap_or(Value::Null)),
        other => Some(Value::error(format!(
            "argument to `last` must be array, got {}",
            other.type_name()
        ))),
    }
}

/// A new array without the first element; null when the array is empty.
fn builtin_rest(args: &[Value]) -> Option<Value> {
    if args.len() != 1 {
        return wrong_arguments(args.len(), 1);
    }
    match &args[0] {
        Value::Array(elements) => {
            if elements.is_empty() {
                return Some(Value::Null);
            }
            let mut rest = elements.clone();
            rest.pop_front();
            Some(Value::Array(rest))
        }
        other => Some(Value::error(format!(
            "argument to `rest` must be array, got {}",
            other.type_name()
        ))),
    }
}

/// A new array with a value appended; the original is unchanged.
fn builtin_push(args: &[Value]) -> Option<Value> {
    if args.len() != 2 {
        return wrong_arguments(args.len(), 2);
    }
    match &args[0] {
        Value::Array(elements) => {
            let mut extended = elements.clone();
            extended.push_back(args[1].clone());
            Some(Value::Array(extended))
        }
        other => Some(Value::error(format!(
            "argument to `push` must be array, got {}",
            other.type_name()
        ))),
    }
}
