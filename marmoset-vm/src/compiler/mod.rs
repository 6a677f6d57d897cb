// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms the Marmoset syntax tree to bytecode.
//!
//! The compiler is a single pass over the tree. It emits instructions into a
//! stack of compilation scopes (one per function body being compiled),
//! resolves names through a lexically nested symbol table, and collects
//! every literal and compiled function into the constant pool.

pub mod codegen;
pub mod symbols;

pub use codegen::{Bytecode, CompileError, Compiler, Result};
pub use symbols::{Symbol, SymbolScope, SymbolTable};
