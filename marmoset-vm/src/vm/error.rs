// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.

use std::fmt;

/// Runtime error during VM execution.
///
/// Any of these aborts the whole run; errors produced by built-ins are
/// ordinary `Value::Error` values instead and never pass through here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Value stack exhausted.
    StackOverflow { size: usize },
    /// Pop from an empty stack; unreachable from well-formed bytecode.
    StackUnderflow,
    /// Call stack exhausted.
    FrameOverflow { max: usize },
    /// Call arity mismatch.
    WrongArgumentCount { expected: usize, got: usize },
    /// Callee is neither a closure nor a built-in.
    NotCallable { got: &'static str },
    /// Binary operator applied to unsupported operand types.
    UnsupportedOperands {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
    },
    /// Arithmetic negation of a non-integer.
    UnsupportedNegation { got: &'static str },
    /// Index applied to a non-indexable container.
    IndexNotSupported { got: &'static str },
    /// Hash key (literal or lookup) of an unhashable type.
    UnhashableKey { got: &'static str },
    /// Invariant violation: malformed bytecode or a compiler bug.
    Internal(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackOverflow { size } => write!(f, "stack overflow (size {})", size),
            RuntimeError::StackUnderflow => write!(f, "stack underflow"),
            RuntimeError::FrameOverflow { max } => {
                write!(f, "frame stack overflow (max {})", max)
            }
            RuntimeError::WrongArgumentCount { expected, got } => {
                write!(f, "wrong number of arguments {}, expected {}", got, expected)
            }
            RuntimeError::NotCallable { got } => write!(f, "calling non-function: {}", got),
            RuntimeError::UnsupportedOperands {
                operator,
                left,
                right,
            } => {
                write!(
                    f,
                    "unsupported operand types for {}: {} and {}",
                    operator, left, right
                )
            }
            RuntimeError::UnsupportedNegation { got } => {
                write!(f, "unsupported operand type for -: {}", got)
            }
            RuntimeError::IndexNotSupported { got } => {
                write!(f, "index operator not supported: {}", got)
            }
            RuntimeError::UnhashableKey { got } => write!(f, "unusable as hash key: {}", got),
            RuntimeError::Internal(message) => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
