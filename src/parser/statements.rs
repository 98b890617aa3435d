//! Statement parsing.

use crate::ast::*;
use crate::error::ParserError;
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn statement(&mut self) -> ParseResult<Stmt> {
        let stmt = match self.peek().kind {
            TokenKind::Function => self.function_declaration()?,
            TokenKind::If => self.if_statement()?,
            TokenKind::While => self.while_statement()?,
            TokenKind::For => self.for_statement()?,
            TokenKind::Return => self.return_statement()?,
            TokenKind::Print => self.print_statement()?,
            TokenKind::Import => self.import_statement()?,
            TokenKind::LeftBrace => {
                let start = self.current_span();
                let body = self.block()?;
                Stmt::new(StmtKind::Block(body), start.merge(&self.previous_span()))
            }
            TokenKind::Break => {
                let span = self.advance().span;
                Stmt::new(StmtKind::Break, span)
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                Stmt::new(StmtKind::Continue, span)
            }
            _ => self.expression_or_assignment()?,
        };
        self.match_token(&TokenKind::Semicolon);
        Ok(stmt)
    }

    /// `{ statement* }`
    pub(crate) fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(ParserError::unexpected_eof(self.current_span()));
            }
            if self.match_token(&TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(statements)
    }

    fn function_declaration(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let name = self.expect_identifier()?;

        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let span = self.current_span();
                let name = self.expect_identifier()?;
                params.push(Parameter { name, span });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.block()?;
        let span = start.merge(&self.previous_span());
        Ok(Stmt::new(
            StmtKind::Function(FunctionDecl {
                name,
                params,
                body,
                span,
            }),
            span,
        ))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let mut branches = Vec::new();

        let condition = self.expression()?;
        let body = self.block()?;
        branches.push(ConditionalBranch { condition, body });

        let mut else_branch = None;
        loop {
            if self.match_token(&TokenKind::Elseif) {
                let condition = self.expression()?;
                let body = self.block()?;
                branches.push(ConditionalBranch { condition, body });
            } else if self.match_token(&TokenKind::Else) {
                else_branch = Some(self.block()?);
                break;
            } else {
                break;
            }
        }

        let span = start.merge(&self.previous_span());
        Ok(Stmt::new(
            StmtKind::If {
                branches,
                else_branch,
            },
            span,
        ))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let condition = self.expression()?;
        let body = self.block()?;
        let span = start.merge(&self.previous_span());
        Ok(Stmt::new(StmtKind::While { condition, body }, span))
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let variable = self.expect_identifier()?;
        self.expect(&TokenKind::In)?;
        let iterable = self.expression()?;
        let body = self.block()?;
        let span = start.merge(&self.previous_span());
        Ok(Stmt::new(
            StmtKind::For {
                variable,
                iterable,
                body,
            },
            span,
        ))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let value = if self.check(&TokenKind::RightBrace)
            || self.check(&TokenKind::Semicolon)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.expression()?)
        };
        let span = start.merge(&self.previous_span());
        Ok(Stmt::new(StmtKind::Return(value), span))
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        self.expect(&TokenKind::LeftParen)?;
        let arguments = self.parse_arguments()?;
        self.expect(&TokenKind::RightParen)?;
        let span = start.merge(&self.previous_span());
        Ok(Stmt::new(StmtKind::Print(arguments), span))
    }

    fn import_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let token = self.advance();
        let path = match token.kind {
            TokenKind::StringLiteral(path) | TokenKind::Identifier(path) => path,
            other => {
                return Err(ParserError::unexpected_token(
                    "module path",
                    format!("{}", other),
                    token.span,
                ))
            }
        };
        let span = start.merge(&self.previous_span());
        Ok(Stmt::new(StmtKind::Import(path), span))
    }

    fn expression_or_assignment(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        if self.match_token(&TokenKind::Equal) {
            let value = self.expression()?;
            let span = expr.span.merge(&value.span);
            return Ok(Stmt::new(
                StmtKind::Assign {
                    target: expr,
                    value,
                },
                span,
            ));
        }
        let span = expr.span;
        Ok(Stmt::new(StmtKind::Expression(expr), span))
    }
}
