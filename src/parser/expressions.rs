//! Expression parsing using Pratt precedence.

use crate::ast::*;
use crate::error::ParserError;
use crate::lexer::TokenKind;
use crate::span::Span;

use super::core::{ParseResult, Parser};
use super::precedence::{get_precedence, Precedence};

impl Parser {
    pub(crate) fn expression(&mut self) -> ParseResult<Expr> {
        self.parse_precedence(Precedence::Or)
    }

    pub(crate) fn parse_precedence(&mut self, min_precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.is_at_end() {
            let precedence = get_precedence(&self.peek().kind);
            if precedence == Precedence::None || precedence < min_precedence {
                break;
            }

            left = self.parse_infix(left, precedence)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        if self.is_at_end() {
            return Err(ParserError::unexpected_eof(self.current_span()));
        }
        let token = self.advance();
        let start_span = token.span;

        match &token.kind {
            TokenKind::IntLiteral(n) => Ok(Expr::new(ExprKind::IntLiteral(*n), start_span)),
            TokenKind::FloatLiteral(n) => Ok(Expr::new(ExprKind::FloatLiteral(*n), start_span)),
            TokenKind::StringLiteral(s) => {
                Ok(Expr::new(ExprKind::StringLiteral(s.clone()), start_span))
            }
            TokenKind::BoolLiteral(b) => Ok(Expr::new(ExprKind::BoolLiteral(*b), start_span)),
            TokenKind::Nil => Ok(Expr::new(ExprKind::Nil, start_span)),

            TokenKind::Identifier(name) => {
                Ok(Expr::new(ExprKind::Identifier(name.clone()), start_span))
            }

            TokenKind::LeftParen => {
                let mut expr = self.expression()?;
                self.expect(&TokenKind::RightParen)?;
                expr.span = start_span.merge(&self.previous_span());
                Ok(expr)
            }

            TokenKind::LeftBracket => self.parse_list(start_span),
            TokenKind::LeftBrace => self.parse_table(start_span),

            TokenKind::Minus => self.parse_unary(UnaryOp::Negate, start_span),
            TokenKind::Not | TokenKind::Bang => self.parse_unary(UnaryOp::Not, start_span),

            _ => Err(ParserError::unexpected_token(
                "expression",
                format!("{}", token.kind),
                token.span,
            )),
        }
    }

    fn parse_unary(&mut self, operator: UnaryOp, start_span: Span) -> ParseResult<Expr> {
        let operand = self.parse_precedence(Precedence::Unary)?;
        let span = start_span.merge(&operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                operator,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_infix(&mut self, left: Expr, precedence: Precedence) -> ParseResult<Expr> {
        let token = self.advance();

        let operator = match token.kind {
            TokenKind::LeftParen => return self.parse_call(left),
            TokenKind::LeftBracket => return self.parse_index(left),
            TokenKind::And | TokenKind::Or => {
                let right = self.parse_precedence(precedence.next())?;
                let span = left.span.merge(&right.span);
                let kind = if token.kind == TokenKind::And {
                    ExprKind::LogicalAnd {
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                } else {
                    ExprKind::LogicalOr {
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                };
                return Ok(Expr::new(kind, span));
            }
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Subtract,
            TokenKind::Star => BinaryOp::Multiply,
            TokenKind::Slash => BinaryOp::Divide,
            TokenKind::Percent => BinaryOp::Modulo,
            TokenKind::Caret => BinaryOp::Power,
            TokenKind::EqualEqual => BinaryOp::Equal,
            TokenKind::BangEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
            _ => {
                return Err(ParserError::unexpected_token(
                    "operator",
                    format!("{}", token.kind),
                    token.span,
                ))
            }
        };

        // `^` is right associative: its right operand binds at the same level.
        let right = if operator == BinaryOp::Power {
            self.parse_precedence(Precedence::Power)?
        } else {
            self.parse_precedence(precedence.next())?
        };
        let span = left.span.merge(&right.span);
        Ok(Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let arguments = self.parse_arguments()?;
        self.expect(&TokenKind::RightParen)?;
        let span = callee.span.merge(&self.previous_span());
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                arguments,
            },
            span,
        ))
    }

    fn parse_index(&mut self, object: Expr) -> ParseResult<Expr> {
        let index = self.expression()?;
        self.expect(&TokenKind::RightBracket)?;
        let span = object.span.merge(&self.previous_span());
        Ok(Expr::new(
            ExprKind::Index {
                object: Box::new(object),
                index: Box::new(index),
            },
            span,
        ))
    }

    /// Comma-separated expressions up to (not including) `)`.
    pub(crate) fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut arguments = Vec::new();
        if self.check(&TokenKind::RightParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.expression()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(arguments)
    }

    fn parse_list(&mut self, start_span: Span) -> ParseResult<Expr> {
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.expression()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBracket)?;
        let span = start_span.merge(&self.previous_span());
        Ok(Expr::new(ExprKind::List(elements), span))
    }

    fn parse_table(&mut self, start_span: Span) -> ParseResult<Expr> {
        let mut pairs = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.expression()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.expression()?;
            pairs.push((key, value));
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace)?;
        let span = start_span.merge(&self.previous_span());
        Ok(Expr::new(ExprKind::Table(pairs), span))
    }
}
