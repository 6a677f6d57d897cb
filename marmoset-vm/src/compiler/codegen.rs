// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: emits bytecode from the syntax tree.

use std::fmt;
use std::rc::Rc;

use marmoset_parser::ast::{BlockStatement, Expression, Program, Statement};

use crate::builtins;
use crate::opcode::{self, Instructions, Op};
use crate::value::{CompiledFunction, Value};

use super::symbols::{Symbol, SymbolScope, SymbolTable};

/// Placeholder operand for forward jumps, patched once the target is known.
const PLACEHOLDER_JUMP: usize = 0xFFFF;

/// Operand-range limits implied by the instruction encoding.
const MAX_CONSTANTS: usize = u16::MAX as usize + 1;
const MAX_GLOBALS: usize = u16::MAX as usize + 1;
const MAX_LOCALS: usize = u8::MAX as usize + 1;
const MAX_FREE_VARIABLES: usize = u8::MAX as usize + 1;
const MAX_ARGUMENTS: usize = u8::MAX as usize;

/// Error during compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An identifier that no visible scope defines.
    UndefinedSymbol(String),
    /// Operator text with no opcode mapping.
    UnknownOperator(String),
    /// Constant pool overflow.
    TooManyConstants,
    /// Global slot overflow.
    TooManyGlobals,
    /// Too many local variables in one function.
    TooManyLocals,
    /// Too many captured variables in one closure.
    TooManyFreeVariables,
    /// Too many arguments at a call site.
    TooManyArguments,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UndefinedSymbol(name) => write!(f, "symbol not found: {}", name),
            CompileError::UnknownOperator(operator) => {
                write!(f, "unknown operator: {}", operator)
            }
            CompileError::TooManyConstants => {
                write!(f, "Too many constants (limit {})", MAX_CONSTANTS)
            }
            CompileError::TooManyGlobals => {
                write!(f, "Too many global bindings (limit {})", MAX_GLOBALS)
            }
            CompileError::TooManyLocals => {
                write!(f, "Too many local variables (limit {})", MAX_LOCALS)
            }
            CompileError::TooManyFreeVariables => {
                write!(f, "Too many captured variables (limit {})", MAX_FREE_VARIABLES)
            }
            CompileError::TooManyArguments => {
                write!(f, "Too many call arguments (limit {})", MAX_ARGUMENTS)
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// The compiled artifact: an instruction stream plus its constant pool.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

/// A record of an emitted instruction, for peeking at the tail of a scope.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    op: Op,
    position: usize,
}

/// One function body under compilation.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
}

/// Single-pass bytecode compiler.
pub struct Compiler {
    constants: Vec<Value>,
    symbols: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    /// Create a compiler with a fresh symbol table.
    ///
    /// The built-in table is registered in registration order, so the
    /// compiler and the VM agree on `OpGetBuiltin` indices.
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for (index, builtin) in builtins::BUILTINS.iter().enumerate() {
            symbols.define_builtin(index, builtin.name);
        }
        Compiler::new_with_state(Vec::new(), symbols)
    }

    /// Create a compiler continuing from an earlier constant pool and symbol
    /// table (REPL turns).
    pub fn new_with_state(constants: Vec<Value>, mut symbols: SymbolTable) -> Self {
        symbols.reset_to_root();
        Compiler {
            constants,
            symbols,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Compile a program into the main scope.
    pub fn compile(&mut self, program: &Program) -> Result<()> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// The compiled artifact for the main scope.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.scopes[0].instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    /// Reclaim the constant pool and symbol table for the next REPL turn.
    pub fn into_state(self) -> (Vec<Value>, SymbolTable) {
        (self.constants, self.symbols)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression(expression) => {
                self.compile_expression(expression)?;
                self.emit(Op::Pop, &[]);
            }
            Statement::Let { name, value } => {
                self.compile_expression(value)?;
                let symbol = self.symbols.define(name);
                self.emit_store(&symbol)?;
            }
            Statement::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Op::ReturnValue, &[]);
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<()> {
        if block.statements.is_empty() {
            self.emit(Op::PushNull, &[]);
            return Ok(());
        }
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn compile_expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::IntegerLiteral(value) => {
                let index = self.add_constant(Value::Integer(*value))?;
                self.emit(Op::GetConstant, &[index]);
            }
            Expression::StringLiteral(value) => {
                let index = self.add_constant(Value::string(value.clone()))?;
                self.emit(Op::GetConstant, &[index]);
            }
            Expression::BooleanLiteral(true) => {
                self.emit(Op::PushTrue, &[]);
            }
            Expression::BooleanLiteral(false) => {
                self.emit(Op::PushFalse, &[]);
            }
            Expression::Identifier(name) => {
                let symbol = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedSymbol(name.clone()))?;
                self.load_symbol(&symbol);
            }
            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator.as_str() {
                    "-" => self.emit(Op::Negate, &[]),
                    "!" => self.emit(Op::LogicalNot, &[]),
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                };
            }
            Expression::Infix {
                operator,
                left,
                right,
            } => {
                self.compile_infix(operator, left, right)?;
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_if(condition, consequence, alternative.as_ref())?;
            }
            Expression::Function {
                name,
                parameters,
                body,
            } => {
                self.compile_function(name.as_deref(), parameters, body)?;
            }
            Expression::Call {
                function,
                arguments,
            } => {
                if arguments.len() > MAX_ARGUMENTS {
                    return Err(CompileError::TooManyArguments);
                }
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Op::Call, &[arguments.len()]);
            }
            Expression::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Op::Array, &[elements.len()]);
            }
            Expression::HashLiteral(pairs) => {
                // Canonicalise emission order so identical literals compile
                // identically regardless of source ordering.
                let mut pairs: Vec<_> = pairs.iter().collect();
                pairs.sort_by_key(|(key, _)| key.to_string());
                for (key, value) in &pairs {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Op::Hash, &[pairs.len()]);
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
            }
        }
        Ok(())
    }

    fn compile_infix(
        &mut self,
        operator: &str,
        left: &Expression,
        right: &Expression,
    ) -> Result<()> {
        // There is no less-than opcode: swap the operands and reuse
        // greater-than.
        if operator == "<" {
            self.compile_expression(right)?;
            self.compile_expression(left)?;
            self.emit(Op::GreaterThan, &[]);
            return Ok(());
        }

        self.compile_expression(left)?;
        self.compile_expression(right)?;

        match operator {
            "+" => self.emit(Op::Add, &[]),
            "-" => self.emit(Op::Subtract, &[]),
            "*" => self.emit(Op::Multiply, &[]),
            "/" => self.emit(Op::Divide, &[]),
            "==" => self.emit(Op::Equals, &[]),
            "!=" => self.emit(Op::NotEquals, &[]),
            ">" => self.emit(Op::GreaterThan, &[]),
            other => return Err(CompileError::UnknownOperator(other.to_string())),
        };
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &BlockStatement,
        alternative: Option<&BlockStatement>,
    ) -> Result<()> {
        self.compile_expression(condition)?;
        let jump_not_truthy = self.emit(Op::JumpNotTruthy, &[PLACEHOLDER_JUMP]);

        self.compile_block(consequence)?;
        // The if-expression itself yields a value: drop the trailing
        // statement pop so the branch result stays on the stack.
        if self.last_instruction_is(Op::Pop) {
            self.remove_last_instruction();
        }

        let jump = self.emit(Op::Jump, &[PLACEHOLDER_JUMP]);
        let after_consequence = self.current_instructions().len();
        self.change_operand(jump_not_truthy, after_consequence);

        match alternative {
            None => {
                self.emit(Op::PushNull, &[]);
            }
            Some(alternative) => {
                self.compile_block(alternative)?;
                if self.last_instruction_is(Op::Pop) {
                    self.remove_last_instruction();
                }
            }
        }

        let after_alternative = self.current_instructions().len();
        self.change_operand(jump, after_alternative);
        Ok(())
    }

    fn compile_function(
        &mut self,
        name: Option<&str>,
        parameters: &[String],
        body: &BlockStatement,
    ) -> Result<()> {
        self.enter_scope();

        if let Some(name) = name {
            self.symbols.define_function_name(name);
        }
        for parameter in parameters {
            self.symbols.define(parameter);
        }

        self.compile_block(body)?;

        // Tail rewriting: an implicit return of the last expression, null
        // for an empty body, an extra return after a trailing let.
        if self.last_instruction_is(Op::Pop) {
            self.replace_last_instruction_with(Op::ReturnValue);
        }
        if self.last_instruction_is(Op::PushNull) {
            self.replace_last_instruction_with(Op::Return);
        }
        if self.last_instruction_is(Op::SetGlobal) || self.last_instruction_is(Op::SetLocal) {
            self.emit(Op::Return, &[]);
        }

        let free_symbols = self.symbols.free_symbols();
        let num_locals = self.symbols.num_definitions();
        if num_locals > MAX_LOCALS {
            return Err(CompileError::TooManyLocals);
        }
        if free_symbols.len() > MAX_FREE_VARIABLES {
            return Err(CompileError::TooManyFreeVariables);
        }

        let instructions = self.leave_scope();

        // Load each captured value in promotion order; the VM snapshots them
        // off the stack when it builds the closure.
        for symbol in &free_symbols {
            self.load_symbol(symbol);
        }

        let function = CompiledFunction {
            instructions,
            num_locals: num_locals as u16,
            num_params: parameters.len() as u16,
        };
        let index = self.add_constant(Value::Function(Rc::new(function)))?;
        self.emit(Op::MakeClosure, &[index, free_symbols.len()]);
        Ok(())
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Op::GetLocal, &[symbol.index]),
            SymbolScope::Free => self.emit(Op::GetFree, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[symbol.index]),
            SymbolScope::Function => self.emit(Op::Recurse, &[]),
        };
    }

    fn emit_store(&mut self, symbol: &Symbol) -> Result<()> {
        match symbol.scope {
            SymbolScope::Global => {
                if symbol.index >= MAX_GLOBALS {
                    return Err(CompileError::TooManyGlobals);
                }
                self.emit(Op::SetGlobal, &[symbol.index]);
            }
            _ => {
                if symbol.index >= MAX_LOCALS {
                    return Err(CompileError::TooManyLocals);
                }
                self.emit(Op::SetLocal, &[symbol.index]);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Emission plumbing
    // ========================================================================

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("no active compilation scope")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("no active compilation scope")
    }

    fn current_instructions(&self) -> &Instructions {
        &self.current_scope().instructions
    }

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let instruction = opcode::make(op, operands);
        let scope = self.current_scope_mut();
        let position = scope.instructions.append(instruction);
        scope.previous = scope.last.take();
        scope.last = Some(EmittedInstruction { op, position });
        position
    }

    fn last_instruction_is(&self, op: Op) -> bool {
        matches!(self.current_scope().last, Some(last) if last.op == op)
    }

    fn remove_last_instruction(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last {
            scope.instructions.0.truncate(last.position);
            scope.last = scope.previous.take();
        }
    }

    fn replace_last_instruction_with(&mut self, op: Op) {
        let scope = self.current_scope_mut();
        let last = scope.last.as_mut().expect("no last instruction to replace");
        let position = last.position;
        last.op = op;
        scope.instructions.replace(position, &opcode::make(op, &[]));
    }

    fn change_operand(&mut self, position: usize, operand: usize) {
        let op = Op::from_byte(self.current_instructions().0[position])
            .expect("change_operand on invalid opcode");
        let instruction = opcode::make(op, &[operand]);
        self.current_scope_mut()
            .instructions
            .replace(position, &instruction);
    }

    fn add_constant(&mut self, value: Value) -> Result<usize> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants);
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbols.enter_scope();
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("leave_scope on the main scope");
        self.symbols.leave_scope();
        scope.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
