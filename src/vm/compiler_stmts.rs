//! Statement compilation: AST statements to bytecode.
//!
//! Every statement leaves the operand stack as it found it.

use crate::ast::{ConditionalBranch, Expr, ExprKind, Stmt, StmtKind};
use crate::error::CompileError;
use crate::span::Span;

use super::compiler::{check_operand, CompileResult, Compiler};
use super::opcode::OpCode;

impl Compiler {
    /// Compile a statement.
    pub fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expr(expr)?;
                self.emit(OpCode::Pop, &[], span.line);
            }
            StmtKind::Assign { target, value } => {
                self.compile_assign(target, value, span)?;
            }
            StmtKind::Print(arguments) => {
                let count = check_operand(arguments.len(), u8::MAX as usize, "print arguments", span)?;
                for argument in arguments {
                    self.compile_expr(argument)?;
                }
                self.emit(OpCode::Print, &[count], span.line);
            }
            StmtKind::Return(value) => match value {
                Some(expr) => {
                    self.compile_expr(expr)?;
                    self.emit(OpCode::ReturnValue, &[], span.line);
                }
                None => {
                    self.emit(OpCode::Return, &[], span.line);
                }
            },
            StmtKind::Block(body) => {
                self.enter_block();
                self.compile_body(body)?;
                self.leave_block()?;
            }
            StmtKind::If {
                branches,
                else_branch,
            } => {
                self.compile_if(branches, else_branch.as_deref(), span)?;
            }
            StmtKind::While { condition, body } => {
                self.compile_while(condition, body, span)?;
            }
            StmtKind::For {
                variable,
                iterable,
                body,
            } => {
                self.compile_for(variable, iterable, body, span)?;
            }
            StmtKind::Function(decl) => {
                self.compile_function(decl)?;
            }
            StmtKind::Break => {
                let jump = self.emit_jump(OpCode::Jump, span.line);
                match self.unit().loops.last_mut() {
                    Some(context) => context.break_patches.push(jump),
                    None => {
                        return Err(CompileError::LoopControlOutsideLoop {
                            keyword: "break",
                            span,
                        })
                    }
                }
            }
            StmtKind::Continue => {
                let head = match self.unit().loops.last() {
                    Some(context) => context.head,
                    None => {
                        return Err(CompileError::LoopControlOutsideLoop {
                            keyword: "continue",
                            span,
                        })
                    }
                };
                self.emit_jump_to(head, span)?;
            }
            StmtKind::Import(path) => {
                return Err(CompileError::unsupported(
                    format!("import of \"{}\"", path),
                    span,
                ));
            }
        }
        Ok(())
    }

    fn compile_body(&mut self, body: &[Stmt]) -> CompileResult<()> {
        for stmt in body {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    /// Compile `body` in a fresh block scope.
    fn compile_scoped_body(&mut self, body: &[Stmt]) -> CompileResult<()> {
        self.enter_block();
        self.compile_body(body)?;
        self.leave_block()
    }

    fn compile_assign(&mut self, target: &Expr, value: &Expr, span: Span) -> CompileResult<()> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                self.compile_expr(value)?;
                // No declaration syntax: an unknown name becomes a new global.
                let symbol = match self.scopes.resolve(name) {
                    Some(symbol) => symbol,
                    None => self.scopes.define_global(name),
                };
                self.store_symbol(&symbol, target.span)
            }
            ExprKind::Index { object, index } => {
                self.compile_expr(value)?;
                self.compile_expr(object)?;
                self.compile_expr(index)?;
                self.emit(OpCode::SetIndex, &[], span.line);
                Ok(())
            }
            _ => Err(CompileError::InvalidAssignmentTarget(target.span)),
        }
    }

    fn compile_if(
        &mut self,
        branches: &[ConditionalBranch],
        else_branch: Option<&[Stmt]>,
        span: Span,
    ) -> CompileResult<()> {
        let mut end_jumps = Vec::new();

        for (i, branch) in branches.iter().enumerate() {
            self.compile_expr(&branch.condition)?;
            let next = self.emit_jump(OpCode::JumpNotTruthy, branch.condition.span.line);

            self.compile_scoped_body(&branch.body)?;

            let is_last = i + 1 == branches.len() && else_branch.is_none();
            if !is_last {
                end_jumps.push(self.emit_jump(OpCode::Jump, span.line));
            }
            self.patch_jump(next, span)?;
        }

        if let Some(body) = else_branch {
            self.compile_scoped_body(body)?;
        }

        for jump in end_jumps {
            self.patch_jump(jump, span)?;
        }
        Ok(())
    }

    fn compile_while(&mut self, condition: &Expr, body: &[Stmt], span: Span) -> CompileResult<()> {
        let head = self.current_offset();
        self.begin_loop(head);

        self.compile_expr(condition)?;
        let exit = self.emit_jump(OpCode::JumpNotTruthy, condition.span.line);

        self.compile_scoped_body(body)?;
        self.emit_jump_to(head, span)?;

        self.patch_jump(exit, span)?;
        self.end_loop(span)
    }

    /// ```text
    ///         <iterable>
    ///         GET_ITERATOR
    /// next:   ITERATOR_NEXT
    ///         JUMP_NOT_TRUTHY exhausted
    ///         SET_LOCAL var
    ///         <body>
    ///         JUMP next
    /// exhausted:
    ///         POP              (last value)
    /// break:  POP              (iterator)
    /// ```
    fn compile_for(
        &mut self,
        variable: &str,
        iterable: &Expr,
        body: &[Stmt],
        span: Span,
    ) -> CompileResult<()> {
        self.compile_expr(iterable)?;
        self.emit(OpCode::GetIterator, &[], span.line);

        let head = self.current_offset();
        self.begin_loop(head);
        self.emit(OpCode::IteratorNext, &[], span.line);
        let exhausted = self.emit_jump(OpCode::JumpNotTruthy, span.line);

        self.enter_block();
        let symbol = self.scopes.define_local(variable);
        self.store_symbol(&symbol, span)?;
        self.compile_body(body)?;
        self.leave_block()?;
        self.emit_jump_to(head, span)?;

        self.patch_jump(exhausted, span)?;
        self.emit(OpCode::Pop, &[], span.line);
        self.end_loop(span)?;
        self.emit(OpCode::Pop, &[], span.line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Program;
    use crate::error::CompileError;
    use crate::lexer::Scanner;
    use crate::parser::Parser;
    use crate::vm::chunk::Bytecode;
    use crate::vm::compiler::{CompileResult, Compiler};
    use crate::vm::opcode::{make, OpCode};

    fn parse(source: &str) -> Program {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn compile(source: &str) -> CompileResult<Bytecode> {
        Compiler::compile(&parse(source))
    }

    #[test]
    fn test_expression_statement_pops() {
        let code = compile("1 + 2").unwrap();
        assert_eq!(
            code.instructions,
            [
                make(OpCode::Constant, &[0]),
                make(OpCode::Constant, &[1]),
                make(OpCode::Add, &[]),
                make(OpCode::Pop, &[]),
                make(OpCode::Return, &[]),
            ]
            .concat()
        );
    }

    #[test]
    fn test_if_elseif_else_backpatching() {
        let code = compile("if a { 1 } elseif b { 2 } else { 3 }").unwrap();
        assert_eq!(
            code.instructions,
            [
                make(OpCode::GetGlobal, &[0]),      // 0000
                make(OpCode::JumpNotTruthy, &[13]), // 0003
                make(OpCode::Constant, &[0]),       // 0006
                make(OpCode::Pop, &[]),             // 0009
                make(OpCode::Jump, &[30]),          // 0010
                make(OpCode::GetGlobal, &[1]),      // 0013
                make(OpCode::JumpNotTruthy, &[26]), // 0016
                make(OpCode::Constant, &[1]),       // 0019
                make(OpCode::Pop, &[]),             // 0022
                make(OpCode::Jump, &[30]),          // 0023
                make(OpCode::Constant, &[2]),       // 0026
                make(OpCode::Pop, &[]),             // 0029
                make(OpCode::Return, &[]),          // 0030
            ]
            .concat()
        );
    }

    #[test]
    fn test_if_without_else_has_no_trailing_jump() {
        let code = compile("if a { 1 }").unwrap();
        assert_eq!(
            code.instructions,
            [
                make(OpCode::GetGlobal, &[0]),
                make(OpCode::JumpNotTruthy, &[10]),
                make(OpCode::Constant, &[0]),
                make(OpCode::Pop, &[]),
                make(OpCode::Return, &[]),
            ]
            .concat()
        );
    }

    #[test]
    fn test_while_jumps_back_to_condition() {
        let code = compile("while x { break }").unwrap();
        assert_eq!(
            code.instructions,
            [
                make(OpCode::GetGlobal, &[0]),      // 0000
                make(OpCode::JumpNotTruthy, &[12]), // 0003
                make(OpCode::Jump, &[12]),          // 0006 break
                make(OpCode::Jump, &[0]),           // 0009
                make(OpCode::Return, &[]),          // 0012
            ]
            .concat()
        );
    }

    #[test]
    fn test_for_loop_layout() {
        let code = compile("for c in s { continue }").unwrap();
        assert_eq!(
            code.instructions,
            [
                make(OpCode::GetGlobal, &[0]),      // 0000
                make(OpCode::GetIterator, &[]),     // 0003
                make(OpCode::IteratorNext, &[]),    // 0004
                make(OpCode::JumpNotTruthy, &[16]), // 0005
                make(OpCode::SetLocal, &[0]),       // 0008
                make(OpCode::Jump, &[4]),           // 0010 continue
                make(OpCode::Jump, &[4]),           // 0013
                make(OpCode::Pop, &[]),             // 0016
                make(OpCode::Pop, &[]),             // 0017
                make(OpCode::Return, &[]),          // 0018
            ]
            .concat()
        );
        assert_eq!(code.num_locals, 1);
    }

    #[test]
    fn test_sequential_loops_share_one_local_slot() {
        let source = "for x in [1] { }\n".repeat(300);
        let code = compile(&source).unwrap();
        assert_eq!(code.num_locals, 1);

        let nested = compile("for a in p { for b in q { } }\nfor c in r { }").unwrap();
        assert_eq!(nested.num_locals, 2);
    }

    #[test]
    fn test_index_assignment() {
        let code = compile("xs[0] = 5").unwrap();
        assert_eq!(
            code.instructions,
            [
                make(OpCode::Constant, &[0]),
                make(OpCode::GetGlobal, &[0]),
                make(OpCode::Constant, &[1]),
                make(OpCode::SetIndex, &[]),
                make(OpCode::Return, &[]),
            ]
            .concat()
        );
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            compile("f() = 1"),
            Err(CompileError::InvalidAssignmentTarget(_))
        ));
        assert!(matches!(
            compile("break"),
            Err(CompileError::LoopControlOutsideLoop { keyword: "break", .. })
        ));
        assert!(matches!(
            compile("while true { function f() { continue } }"),
            Err(CompileError::LoopControlOutsideLoop { keyword: "continue", .. })
        ));
        assert!(matches!(
            compile("import \"math\""),
            Err(CompileError::Unsupported { .. })
        ));
    }
}
