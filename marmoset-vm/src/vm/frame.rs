// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use crate::opcode::Instructions;
use crate::value::Closure;

/// A call frame on the VM's frame stack.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The closure being executed.
    pub closure: Rc<Closure>,

    /// Instruction pointer: next byte to fetch in the closure's body.
    pub ip: usize,

    /// Stack index where this call's locals begin, one slot past the callee.
    pub base_pointer: usize,
}

impl Frame {
    /// Create a frame for a closure about to run.
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Frame {
            closure,
            ip: 0,
            base_pointer,
        }
    }

    /// The instruction stream this frame executes.
    pub fn instructions(&self) -> &Instructions {
        &self.closure.function.instructions
    }
}
