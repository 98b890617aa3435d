//! Expression compilation. Every expression leaves exactly one value on the stack.

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};

use super::compiler::{check_operand, CompileResult, Compiler};
use super::opcode::OpCode;
use super::value::Value;

impl Compiler {
    /// Compile an expression.
    pub fn compile_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        let span = expr.span;
        let line = span.line;
        match &expr.kind {
            ExprKind::IntLiteral(n) => self.emit_constant(Value::Integer(*n), span)?,
            ExprKind::FloatLiteral(n) => self.emit_constant(Value::Float(*n), span)?,
            ExprKind::StringLiteral(s) => self.emit_constant(Value::string(s.as_str()), span)?,
            ExprKind::BoolLiteral(true) => {
                self.emit(OpCode::True, &[], line);
            }
            ExprKind::BoolLiteral(false) => {
                self.emit(OpCode::False, &[], line);
            }
            ExprKind::Nil => {
                self.emit(OpCode::Null, &[], line);
            }

            ExprKind::Identifier(name) => {
                // Reading a name nobody assigned yet reserves its global slot;
                // the VM reports it if it is still unset when read.
                let symbol = match self.scopes.resolve(name) {
                    Some(symbol) => symbol,
                    None => self.scopes.define_global(name),
                };
                self.load_symbol(&symbol, span)?;
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit(binary_opcode(*operator), &[], line);
            }
            ExprKind::Unary { operator, operand } => {
                self.compile_expr(operand)?;
                let op = match operator {
                    UnaryOp::Negate => OpCode::Minus,
                    UnaryOp::Not => OpCode::Not,
                };
                self.emit(op, &[], line);
            }

            // left, DUP, JUMP_(NOT_)TRUTHY end, POP, right, end:
            ExprKind::LogicalAnd { left, right } => {
                self.compile_short_circuit(left, right, OpCode::JumpNotTruthy)?;
            }
            ExprKind::LogicalOr { left, right } => {
                self.compile_short_circuit(left, right, OpCode::JumpTruthy)?;
            }

            ExprKind::Call { callee, arguments } => {
                let argc = check_operand(arguments.len(), u8::MAX as usize, "call arguments", span)?;
                self.compile_expr(callee)?;
                for argument in arguments {
                    self.compile_expr(argument)?;
                }
                self.emit(OpCode::Call, &[argc], line);
            }
            ExprKind::Index { object, index } => {
                self.compile_expr(object)?;
                self.compile_expr(index)?;
                self.emit(OpCode::Index, &[], line);
            }

            ExprKind::List(elements) => {
                let count = check_operand(elements.len(), u16::MAX as usize, "list elements", span)?;
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.emit(OpCode::Array, &[count], line);
            }
            ExprKind::Table(pairs) => {
                let count = check_operand(pairs.len(), u16::MAX as usize, "table entries", span)?;
                for (key, value) in pairs {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                }
                self.emit(OpCode::Hash, &[count], line);
            }
        }
        Ok(())
    }

    fn compile_short_circuit(&mut self, left: &Expr, right: &Expr, jump: OpCode) -> CompileResult<()> {
        self.compile_expr(left)?;
        self.emit(OpCode::Dup, &[], left.span.line);
        let end = self.emit_jump(jump, left.span.line);
        self.emit(OpCode::Pop, &[], left.span.line);
        self.compile_expr(right)?;
        self.patch_jump(end, right.span)
    }
}

fn binary_opcode(operator: BinaryOp) -> OpCode {
    match operator {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Subtract => OpCode::Sub,
        BinaryOp::Multiply => OpCode::Mul,
        BinaryOp::Divide => OpCode::Div,
        BinaryOp::Modulo => OpCode::Mod,
        BinaryOp::Power => OpCode::Pow,
        BinaryOp::Equal => OpCode::Equal,
        BinaryOp::NotEqual => OpCode::NotEqual,
        BinaryOp::Less => OpCode::Less,
        BinaryOp::LessEqual => OpCode::LessEq,
        BinaryOp::Greater => OpCode::Greater,
        BinaryOp::GreaterEqual => OpCode::GreaterEq,
    }
}
