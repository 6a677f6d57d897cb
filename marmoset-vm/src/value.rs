// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values for the Marmoset VM.
//!
//! `Value` is the central enum representing all Marmoset values. Containers
//! use persistent `im` collections, so language-level operations produce new
//! containers and never mutate in place. Compiled functions and closures are
//! shared behind `Rc`.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use im::{OrdMap, Vector};

use crate::opcode::Instructions;

/// A Marmoset runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),
    /// Boolean; equality is identity equality of the two singletons.
    Boolean(bool),
    /// The null singleton.
    Null,
    /// Immutable string.
    Str(Rc<str>),
    /// Ordered sequence of values. Operations produce new arrays.
    Array(Vector<Value>),
    /// Mapping from hashable value to its key/value pair, keyed by digest.
    Hash(OrdMap<HashKey, HashPair>),
    /// A compiled function body; lives in the constant pool.
    Function(Rc<CompiledFunction>),
    /// A compiled function paired with its captured free values.
    Closure(Rc<Closure>),
    /// A native built-in function.
    Builtin(&'static Builtin),
    /// An error produced by a built-in; an ordinary value, not a VM abort.
    Error(Rc<str>),
}

/// The two boolean singletons and null, named for emission sites.
pub const TRUE: Value = Value::Boolean(true);
pub const FALSE: Value = Value::Boolean(false);
pub const NULL: Value = Value::Null;

impl Value {
    /// The type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::Function(_) => "function",
            Value::Closure(_) => "closure",
            Value::Builtin(_) => "builtin",
            Value::Error(_) => "error",
        }
    }

    /// Compute the hash key for this value.
    ///
    /// Only integers, booleans, and strings are hashable; everything else
    /// returns `None`. The digest is tagged with the value's type so that
    /// `1`, `true`, and `"1"` occupy distinct slots.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Integer(value) => Some(HashKey {
                tag: HashTag::Integer,
                digest: *value as u64,
            }),
            Value::Boolean(value) => Some(HashKey {
                tag: HashTag::Boolean,
                digest: u64::from(*value),
            }),
            Value::Str(value) => {
                let mut hasher = DefaultHasher::new();
                value.hash(&mut hasher);
                Some(HashKey {
                    tag: HashTag::Str,
                    digest: hasher.finish(),
                })
            }
            _ => None,
        }
    }

    /// Truthiness: `false` and `null` are falsy, as is integer zero.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(value) => *value,
            Value::Null => false,
            Value::Integer(value) => *value != 0,
            _ => true,
        }
    }

    /// Build a string value.
    pub fn string(value: impl Into<Rc<str>>) -> Self {
        Value::Str(value.into())
    }

    /// Build an error value from a message.
    pub fn error(message: impl Into<Rc<str>>) -> Self {
        Value::Error(message.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Null => write!(f, "null"),
            Value::Str(value) => write!(f, "{}", value),
            Value::Array(elements) => {
                let elements: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Value::Hash(pairs) => {
                let pairs: Vec<String> = pairs
                    .values()
                    .map(|pair| format!("{}: {}", pair.key, pair.value))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Value::Function(function) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(function))
            }
            Value::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(closure)),
            Value::Builtin(_) => write!(f, "builtin function"),
            Value::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

/// Type tag folded into a hash key so digests of different types never
/// collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashTag {
    Integer,
    Boolean,
    Str,
}

/// Key of a hash entry: type tag plus 64-bit content digest.
///
/// Stable within one VM run; the ordering gives hashes a deterministic
/// iteration and display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey {
    pub tag: HashTag,
    pub digest: u64,
}

/// A hash entry, preserving the original key value next to the mapped value.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// The compiled representation of a function body.
///
/// Immutable once built; stored in the constant pool and shared by every
/// closure created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    /// The function body's instruction stream.
    pub instructions: Instructions,
    /// Number of local slots to reserve, parameters included.
    pub num_locals: u16,
    /// Number of declared parameters.
    pub num_params: u16,
}

/// A compiled function paired with a snapshot of its free variables.
///
/// Free values are captured by value at construction time; they are not
/// references back into the creating frame's stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

/// Signature of a native built-in function.
///
/// Receives the call arguments as a slice; returns `None` for void. Failures
/// are reported as `Value::Error`, never as a VM abort.
pub type BuiltinFn = fn(&[Value]) -> Option<Value>;

/// A named native function, registered in the built-in table.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
