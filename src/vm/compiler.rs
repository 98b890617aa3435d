//! AST-to-bytecode compiler.
//!
//! Single pass over the AST. Each function body is its own compilation unit
//! with its own instruction buffer and constant pool; names resolve through
//! one scope chain rooted at the program's global table.

use std::rc::Rc;

use log::debug;

use crate::ast::{FunctionDecl, Program, Stmt, StmtKind};
use crate::error::CompileError;
use crate::span::Span;

use super::builtins;
use super::chunk::{Bytecode, CompiledFunction};
use super::opcode::OpCode;
use super::symbol_table::{ScopeKind, Scopes, Symbol, SymbolKind};
use super::value::Value;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

const MAX_U8_OPERAND: usize = u8::MAX as usize;
const MAX_U16_OPERAND: usize = u16::MAX as usize;

/// Jump bookkeeping for the innermost loop of a unit.
#[derive(Debug)]
pub struct LoopContext {
    /// Where `continue` jumps to.
    pub head: usize,
    /// `break` jumps waiting for the loop's exit offset.
    pub break_patches: Vec<usize>,
}

/// One function body (or the program) being compiled.
#[derive(Debug, Default)]
pub struct CompilationUnit {
    pub bytecode: Bytecode,
    pub loops: Vec<LoopContext>,
}

/// The compiler: transforms an AST into bytecode.
pub struct Compiler {
    pub(crate) scopes: Scopes,
    pub(crate) units: Vec<CompilationUnit>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            scopes: Scopes::new(&builtins::names()),
            units: vec![CompilationUnit::default()],
        }
    }

    /// Compile a full program into its top-level bytecode.
    pub fn compile(program: &Program) -> CompileResult<Bytecode> {
        Compiler::new().compile_program(program)
    }

    pub fn compile_program(mut self, program: &Program) -> CompileResult<Bytecode> {
        for stmt in &program.statements {
            self.compile_stmt(stmt)?;
        }
        let line = program
            .statements
            .last()
            .map(|stmt| stmt.span.line)
            .unwrap_or(0);
        self.emit(OpCode::Return, &[], line);

        if self.scopes.depth() != 1 {
            return Err(CompileError::ScopeImbalance(format!(
                "{} scopes still open at end of program",
                self.scopes.depth() - 1
            )));
        }
        let mut unit = match (self.units.pop(), self.units.is_empty()) {
            (Some(unit), true) => unit,
            _ => {
                return Err(CompileError::ScopeImbalance(
                    "function unit still open at end of program".to_string(),
                ))
            }
        };
        if !unit.loops.is_empty() {
            return Err(CompileError::ScopeImbalance(
                "loop context still open at end of program".to_string(),
            ));
        }

        unit.bytecode.num_locals = self.scopes.top_level_frame_size();
        unit.bytecode.num_globals = self.scopes.num_globals();
        unit.bytecode.global_names = self.scopes.global_names().to_vec();
        debug!(
            "compiled program: {} bytes, {} constants, {} globals, {} locals",
            unit.bytecode.len(),
            unit.bytecode.constants.len(),
            unit.bytecode.num_globals,
            unit.bytecode.num_locals
        );
        Ok(unit.bytecode)
    }

    // --- Emission helpers ---

    pub(crate) fn unit(&mut self) -> &mut CompilationUnit {
        let last = self.units.len() - 1;
        &mut self.units[last]
    }

    pub(crate) fn current_offset(&self) -> usize {
        self.units[self.units.len() - 1].bytecode.len()
    }

    pub(crate) fn emit(&mut self, op: OpCode, operands: &[usize], line: usize) -> usize {
        self.unit().bytecode.emit(op, operands, line as u32)
    }

    /// Add a constant to the current unit and emit `Constant`.
    pub(crate) fn emit_constant(&mut self, value: Value, span: Span) -> CompileResult<()> {
        let index = self.add_constant(value, span)?;
        self.emit(OpCode::Constant, &[index], span.line);
        Ok(())
    }

    pub(crate) fn add_constant(&mut self, value: Value, span: Span) -> CompileResult<usize> {
        let index = self.unit().bytecode.add_constant(value);
        check_operand(index, MAX_U16_OPERAND, "constants", span)
    }

    /// Emit a jump with a placeholder target, to be backpatched.
    pub(crate) fn emit_jump(&mut self, op: OpCode, line: usize) -> usize {
        self.emit(op, &[0], line)
    }

    /// Point the jump at `jump` to the current end of the instruction stream.
    pub(crate) fn patch_jump(&mut self, jump: usize, span: Span) -> CompileResult<()> {
        let target = check_operand(self.current_offset(), MAX_U16_OPERAND, "jump target", span)?;
        self.unit().bytecode.patch_u16(jump, target as u16);
        Ok(())
    }

    /// Emit an unconditional jump back to an already known offset.
    pub(crate) fn emit_jump_to(&mut self, target: usize, span: Span) -> CompileResult<()> {
        let target = check_operand(target, MAX_U16_OPERAND, "jump target", span)?;
        self.emit(OpCode::Jump, &[target], span.line);
        Ok(())
    }

    // --- Loops ---

    pub(crate) fn begin_loop(&mut self, head: usize) {
        self.unit().loops.push(LoopContext {
            head,
            break_patches: Vec::new(),
        });
    }

    /// Close the innermost loop, sending its `break`s to the current offset.
    pub(crate) fn end_loop(&mut self, span: Span) -> CompileResult<()> {
        let context = self.unit().loops.pop().ok_or_else(|| {
            CompileError::ScopeImbalance("loop closed without being opened".to_string())
        })?;
        for jump in context.break_patches {
            self.patch_jump(jump, span)?;
        }
        Ok(())
    }

    // --- Scopes ---

    pub(crate) fn enter_block(&mut self) {
        self.scopes.push(ScopeKind::Block);
    }

    pub(crate) fn leave_block(&mut self) -> CompileResult<()> {
        match self.scopes.pop() {
            Some(table) if table.kind == ScopeKind::Block => Ok(()),
            _ => Err(CompileError::ScopeImbalance(
                "block scope closed without being opened".to_string(),
            )),
        }
    }

    /// Emit the instruction that pushes `symbol`'s value.
    pub(crate) fn load_symbol(&mut self, symbol: &Symbol, span: Span) -> CompileResult<()> {
        let line = span.line;
        match symbol.kind {
            SymbolKind::Global => {
                let index = check_operand(symbol.index, MAX_U16_OPERAND, "globals", span)?;
                self.emit(OpCode::GetGlobal, &[index], line);
            }
            SymbolKind::Local | SymbolKind::Parameter => {
                let index = check_operand(symbol.index, MAX_U8_OPERAND, "locals", span)?;
                self.emit(OpCode::GetLocal, &[index], line);
            }
            SymbolKind::Builtin => {
                self.emit(OpCode::GetBuiltin, &[symbol.index], line);
            }
            SymbolKind::Free => {
                let index = check_operand(symbol.index, MAX_U8_OPERAND, "free variables", span)?;
                self.emit(OpCode::GetFree, &[index], line);
            }
            SymbolKind::Function => {
                self.emit(OpCode::CurrentClosure, &[], line);
            }
        }
        Ok(())
    }

    /// Emit the instruction that pops the stack top into `symbol`.
    pub(crate) fn store_symbol(&mut self, symbol: &Symbol, span: Span) -> CompileResult<()> {
        match symbol.kind {
            SymbolKind::Global => {
                let index = check_operand(symbol.index, MAX_U16_OPERAND, "globals", span)?;
                self.emit(OpCode::SetGlobal, &[index], span.line);
                Ok(())
            }
            SymbolKind::Local | SymbolKind::Parameter => {
                let index = check_operand(symbol.index, MAX_U8_OPERAND, "locals", span)?;
                self.emit(OpCode::SetLocal, &[index], span.line);
                Ok(())
            }
            SymbolKind::Builtin => Err(CompileError::AssignToBuiltin(symbol.name.clone(), span)),
            SymbolKind::Free | SymbolKind::Function => {
                Err(CompileError::AssignToCaptured(symbol.name.clone(), span))
            }
        }
    }

    // --- Functions ---

    /// Compile a function declaration and bind the resulting closure to its name.
    pub(crate) fn compile_function(&mut self, decl: &FunctionDecl) -> CompileResult<()> {
        let span = decl.span;
        check_operand(decl.params.len(), MAX_U8_OPERAND, "parameters", span)?;

        let nested = !self.scopes.at_top_level();
        let binding = if nested {
            self.scopes.define_local(&decl.name)
        } else {
            self.scopes.define_global(&decl.name)
        };

        self.units.push(CompilationUnit::default());
        self.scopes.push(ScopeKind::Function);
        if nested {
            self.scopes.define_function_name(&decl.name);
        }
        for param in &decl.params {
            self.scopes.define_parameter(&param.name);
        }

        for stmt in &decl.body {
            self.compile_stmt(stmt)?;
        }
        if !ends_with_return(&decl.body) {
            let line = decl.body.last().map(|stmt| stmt.span.line).unwrap_or(span.line);
            self.emit(OpCode::Return, &[], line);
        }

        let table = match self.scopes.pop() {
            Some(table) if table.kind == ScopeKind::Function => table,
            _ => {
                return Err(CompileError::ScopeImbalance(format!(
                    "function '{}' left a block scope open",
                    decl.name
                )))
            }
        };
        let mut unit = self.units.pop().ok_or_else(|| {
            CompileError::ScopeImbalance(format!("function '{}' has no unit", decl.name))
        })?;
        if !unit.loops.is_empty() {
            return Err(CompileError::ScopeImbalance(format!(
                "function '{}' left a loop open",
                decl.name
            )));
        }

        check_operand(table.frame_size(), MAX_U8_OPERAND + 1, "locals", span)?;
        unit.bytecode.num_locals = table.frame_size();
        unit.bytecode.num_parameters = decl.params.len();
        debug!(
            "compiled function '{}': {} bytes, {} constants, {} locals, {} free",
            decl.name,
            unit.bytecode.len(),
            unit.bytecode.constants.len(),
            unit.bytecode.num_locals,
            table.free_symbols.len()
        );

        let free_count = check_operand(
            table.free_symbols.len(),
            MAX_U8_OPERAND,
            "free variables",
            span,
        )?;
        for free in &table.free_symbols {
            self.load_symbol(free, span)?;
        }
        let function = CompiledFunction::new(decl.name.clone(), unit.bytecode);
        let index = self.add_constant(Value::Function(Rc::new(function)), span)?;
        self.emit(OpCode::Closure, &[index, free_count], span.line);
        self.store_symbol(&binding, span)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn ends_with_return(body: &[Stmt]) -> bool {
    matches!(body.last().map(|stmt| &stmt.kind), Some(StmtKind::Return(_)))
}

/// Reject operands that do not fit their encoded width.
pub(crate) fn check_operand(
    value: usize,
    limit: usize,
    what: &'static str,
    span: Span,
) -> CompileResult<usize> {
    if value > limit {
        Err(CompileError::operand_overflow(what, limit, span))
    } else {
        Ok(value)
    }
}
