// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing Marmoset bytecode.

pub mod error;
pub mod frame;
pub mod stack;

use std::rc::Rc;

use im::{OrdMap, Vector};

use crate::builtins;
use crate::compiler::Bytecode;
use crate::opcode::{self, Op};
use crate::value::{Builtin, Closure, CompiledFunction, HashPair, Value, FALSE, NULL, TRUE};

pub use error::{Result, RuntimeError};
pub use frame::Frame;
pub use stack::ValueStack;

/// Capacity of the value stack.
pub const STACK_SIZE: usize = 2048;

/// Number of global variable slots.
pub const GLOBALS_SIZE: usize = 65536;

/// Capacity of the call-frame stack.
pub const MAX_FRAMES: usize = 1024;

/// The Marmoset virtual machine.
///
/// Executes one `Bytecode` artifact. The main program runs as frame 0,
/// wrapped in a synthetic closure with no parameters, locals, or captures.
pub struct VM {
    constants: Vec<Value>,
    globals: Vec<Value>,
    stack: ValueStack,
    frames: Vec<Frame>,
}

impl VM {
    /// Create a VM with a fresh global slot array.
    pub fn new(bytecode: Bytecode) -> Self {
        VM::new_with_state(bytecode, vec![Value::Null; GLOBALS_SIZE])
    }

    /// Create a VM reusing an existing global slot array (REPL turns).
    pub fn new_with_state(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        let main_function = Rc::new(CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_params: 0,
        });
        let main_closure = Rc::new(Closure {
            function: main_function,
            free: Vec::new(),
        });

        let mut frames = Vec::with_capacity(MAX_FRAMES);
        frames.push(Frame::new(main_closure, 0));

        VM {
            constants: bytecode.constants,
            globals,
            stack: ValueStack::new(STACK_SIZE),
            frames,
        }
    }

    /// Reclaim the global slot array after a run.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The last value surviving on the stack, if any.
    pub fn stack_top(&self) -> Option<Value> {
        self.stack.top().cloned()
    }

    /// The value most recently popped off the stack; after a normal run this
    /// is the final expression statement's value.
    pub fn last_popped(&self) -> Value {
        self.stack.last_popped()
    }

    /// Run the fetch/decode/execute loop to completion.
    pub fn execute(&mut self) -> Result<()> {
        while self.current_frame().ip < self.current_frame().instructions().len() {
            let byte = self.read_byte();
            let op = Op::from_byte(byte)
                .ok_or_else(|| RuntimeError::Internal(format!("unknown opcode {}", byte)))?;

            match op {
                Op::GetConstant => {
                    let index = self.read_u16_operand() as usize;
                    let constant = self.constant(index)?;
                    self.stack.push(constant)?;
                }
                Op::PushTrue => self.stack.push(TRUE)?,
                Op::PushFalse => self.stack.push(FALSE)?,
                Op::PushNull => self.stack.push(NULL)?,
                Op::Pop => {
                    self.stack.pop()?;
                }

                Op::Add | Op::Subtract | Op::Multiply | Op::Divide => {
                    self.execute_binary_operation(op)?;
                }
                Op::Equals | Op::NotEquals | Op::GreaterThan => {
                    self.execute_comparison(op)?;
                }
                Op::Negate => {
                    let value = self.stack.pop()?;
                    match value {
                        Value::Integer(value) => self.stack.push(Value::Integer(-value))?,
                        other => {
                            return Err(RuntimeError::UnsupportedNegation {
                                got: other.type_name(),
                            });
                        }
                    }
                }
                Op::LogicalNot => {
                    let value = self.stack.pop()?;
                    self.stack.push(Value::Boolean(!value.is_truthy()))?;
                }

                Op::Jump => {
                    let target = self.read_u16_operand() as usize;
                    self.current_frame_mut().ip = target;
                }
                Op::JumpNotTruthy => {
                    let target = self.read_u16_operand() as usize;
                    let condition = self.stack.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target;
                    }
                }

                Op::SetGlobal => {
                    let slot = self.read_u16_operand() as usize;
                    self.globals[slot] = self.stack.pop()?;
                }
                Op::GetGlobal => {
                    let slot = self.read_u16_operand() as usize;
                    self.stack.push(self.globals[slot].clone())?;
                }
                Op::SetLocal => {
                    let slot = self.read_u8_operand() as usize;
                    let value = self.stack.pop()?;
                    let base = self.current_frame().base_pointer;
                    self.stack.set(base + slot, value);
                }
                Op::GetLocal => {
                    let slot = self.read_u8_operand() as usize;
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.get(base + slot).clone();
                    self.stack.push(value)?;
                }
                Op::GetFree => {
                    let index = self.read_u8_operand() as usize;
                    let value = self
                        .current_frame()
                        .closure
                        .free
                        .get(index)
                        .cloned()
                        .ok_or_else(|| {
                            RuntimeError::Internal(format!("free variable {} out of range", index))
                        })?;
                    self.stack.push(value)?;
                }
                Op::GetBuiltin => {
                    let index = self.read_u8_operand() as usize;
                    let builtin = builtins::BUILTINS.get(index).ok_or_else(|| {
                        RuntimeError::Internal(format!("builtin {} out of range", index))
                    })?;
                    self.stack.push(Value::Builtin(builtin))?;
                }

                Op::Array => {
                    let count = self.read_u16_operand() as usize;
                    self.build_array(count)?;
                }
                Op::Hash => {
                    let count = self.read_u16_operand() as usize;
                    self.build_hash(count)?;
                }
                Op::Index => {
                    self.execute_index()?;
                }

                Op::Call => {
                    let num_args = self.read_u8_operand() as usize;
                    self.execute_call(num_args)?;
                }
                Op::ReturnValue => {
                    let value = self.stack.pop()?;
                    if self.unwind_frame(value)? {
                        return Ok(());
                    }
                }
                Op::Return => {
                    if self.unwind_frame(NULL)? {
                        return Ok(());
                    }
                }

                Op::MakeClosure => {
                    let const_index = self.read_u16_operand() as usize;
                    let num_free = self.read_u8_operand() as usize;
                    self.push_closure(const_index, num_free)?;
                }
                Op::Recurse => {
                    let closure = self.current_frame().closure.clone();
                    self.stack.push(Value::Closure(closure))?;
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Fetch & decode
    // ========================================================================

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frames.last_mut().expect("no active frame");
        let byte = frame.closure.function.instructions.0[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_u8_operand(&mut self) -> u8 {
        self.read_byte()
    }

    fn read_u16_operand(&mut self) -> u16 {
        let frame = self.frames.last_mut().expect("no active frame");
        let value = opcode::read_u16(&frame.closure.function.instructions.0[frame.ip..]);
        frame.ip += 2;
        value
    }

    fn constant(&self, index: usize) -> Result<Value> {
        self.constants.get(index).cloned().ok_or_else(|| {
            RuntimeError::Internal(format!("constant {} out of range", index))
        })
    }

    // ========================================================================
    // Calls & returns
    // ========================================================================

    fn execute_call(&mut self, num_args: usize) -> Result<()> {
        let callee_index = self
            .stack
            .pointer()
            .checked_sub(num_args + 1)
            .ok_or(RuntimeError::StackUnderflow)?;
        let callee = self.stack.get(callee_index).clone();

        match callee {
            Value::Closure(closure) => self.call_closure(closure, num_args),
            Value::Builtin(builtin) => self.call_builtin(builtin, num_args),
            other => Err(RuntimeError::NotCallable {
                got: other.type_name(),
            }),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> Result<()> {
        let num_params = closure.function.num_params as usize;
        if num_args != num_params {
            return Err(RuntimeError::WrongArgumentCount {
                expected: num_params,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::FrameOverflow { max: MAX_FRAMES });
        }

        let base_pointer = self.stack.pointer() - num_args;
        let num_locals = closure.function.num_locals as usize;
        self.frames.push(Frame::new(closure, base_pointer));

        // Reserve slots for the locals above the arguments; their initial
        // contents are never read before a write.
        self.stack.reserve(base_pointer + num_locals)
    }

    fn call_builtin(&mut self, builtin: &'static Builtin, num_args: usize) -> Result<()> {
        let base_pointer = self.stack.pointer() - num_args;
        let result = {
            let arguments = self.stack.slice(base_pointer, self.stack.pointer());
            (builtin.func)(arguments)
        };

        // Drop the callee and its arguments, then push the result.
        self.stack.set_pointer(base_pointer - 1);
        self.stack.push(result.unwrap_or(NULL))
    }

    /// Unwind the current frame, leaving `value` in the callee's slot.
    ///
    /// Returns `true` when the unwound frame was the main program (a
    /// top-level `return`), which halts execution with the value on the
    /// stack.
    fn unwind_frame(&mut self, value: Value) -> Result<bool> {
        if self.frames.len() == 1 {
            self.stack.push(value)?;
            return Ok(true);
        }

        let frame = self.frames.pop().expect("no active frame");
        self.stack.set_pointer(frame.base_pointer);
        let slot = self.stack.pointer() - 1;
        self.stack.set(slot, value);
        Ok(false)
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn execute_binary_operation(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (&left, &right) {
            (Value::Integer(left), Value::Integer(right)) => Value::Integer(match op {
                Op::Add => left + right,
                Op::Subtract => left - right,
                Op::Multiply => left * right,
                Op::Divide => left / right,
                _ => unreachable!("non-arithmetic opcode {:?}", op),
            }),
            (Value::Str(left), Value::Str(right)) if op == Op::Add => {
                Value::string(format!("{}{}", left, right))
            }
            _ => {
                return Err(RuntimeError::UnsupportedOperands {
                    operator: operator_symbol(op),
                    left: left.type_name(),
                    right: right.type_name(),
                });
            }
        };

        self.stack.push(result)
    }

    fn execute_comparison(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (&left, &right) {
            (Value::Integer(left), Value::Integer(right)) => match op {
                Op::Equals => left == right,
                Op::NotEquals => left != right,
                Op::GreaterThan => left > right,
                _ => unreachable!("non-comparison opcode {:?}", op),
            },
            (Value::Str(left), Value::Str(right)) if op != Op::GreaterThan => match op {
                Op::Equals => left == right,
                _ => left != right,
            },
            (Value::Boolean(left), Value::Boolean(right)) if op != Op::GreaterThan => match op {
                Op::Equals => left == right,
                _ => left != right,
            },
            (Value::Null, Value::Null) if op != Op::GreaterThan => op == Op::Equals,
            _ => {
                return Err(RuntimeError::UnsupportedOperands {
                    operator: operator_symbol(op),
                    left: left.type_name(),
                    right: right.type_name(),
                });
            }
        };

        self.stack.push(Value::Boolean(result))
    }

    // ========================================================================
    // Containers & closures
    // ========================================================================

    fn build_array(&mut self, count: usize) -> Result<()> {
        let start = self
            .stack
            .pointer()
            .checked_sub(count)
            .ok_or(RuntimeError::StackUnderflow)?;

        let elements: Vector<Value> = self
            .stack
            .slice(start, start + count)
            .iter()
            .cloned()
            .collect();

        self.stack.set_pointer(start);
        self.stack.push(Value::Array(elements))
    }

    fn build_hash(&mut self, count: usize) -> Result<()> {
        let start = self
            .stack
            .pointer()
            .checked_sub(2 * count)
            .ok_or(RuntimeError::StackUnderflow)?;

        let mut pairs: OrdMap<_, HashPair> = OrdMap::new();
        let mut index = start;
        while index < start + 2 * count {
            let key = self.stack.get(index).clone();
            let value = self.stack.get(index + 1).clone();
            let hash_key = key.hash_key().ok_or_else(|| RuntimeError::UnhashableKey {
                got: key.type_name(),
            })?;
            pairs.insert(hash_key, HashPair { key, value });
            index += 2;
        }

        self.stack.set_pointer(start);
        self.stack.push(Value::Hash(pairs))
    }

    fn execute_index(&mut self) -> Result<()> {
        let index = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (&left, &index) {
            (Value::Array(elements), Value::Integer(position)) => {
                if *position < 0 || *position as usize >= elements.len() {
                    NULL
                } else {
                    elements[*position as usize].clone()
                }
            }
            (Value::Hash(pairs), key) => {
                let hash_key = key.hash_key().ok_or_else(|| RuntimeError::UnhashableKey {
                    got: key.type_name(),
                })?;
                match pairs.get(&hash_key) {
                    Some(pair) => pair.value.clone(),
                    None => NULL,
                }
            }
            _ => {
                return Err(RuntimeError::IndexNotSupported {
                    got: left.type_name(),
                });
            }
        };

        self.stack.push(result)
    }

    fn push_closure(&mut self, const_index: usize, num_free: usize) -> Result<()> {
        let constant = self.constant(const_index)?;
        let function = match constant {
            Value::Function(function) => function,
            other => {
                return Err(RuntimeError::Internal(format!(
                    "closure over non-function constant: {}",
                    other.type_name()
                )));
            }
        };

        let start = self
            .stack
            .pointer()
            .checked_sub(num_free)
            .ok_or(RuntimeError::StackUnderflow)?;
        let free = self.stack.slice(start, start + num_free).to_vec();
        self.stack.set_pointer(start);

        self.stack
            .push(Value::Closure(Rc::new(Closure { function, free })))
    }
}

fn operator_symbol(op: Op) -> &'static str {
    match op {
        Op::Add => "+",
        Op::Subtract => "-",
        Op::Multiply => "*",
        Op::Divide => "/",
        Op::Equals => "==",
        Op::NotEquals => "!=",
        Op::GreaterThan => ">",
        _ => "?",
    }
}
