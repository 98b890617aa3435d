//! Statement AST nodes.

use crate::ast::expr::Expr;
use crate::span::Span;

/// A statement in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression statement: f(x)
    Expression(Expr),

    /// Assignment: x = expr, xs[i] = expr
    Assign { target: Expr, value: Expr },

    /// print(a, b, ...)
    Print(Vec<Expr>),

    /// Return statement: return expr
    Return(Option<Expr>),

    /// Block: { statements }
    Block(Vec<Stmt>),

    /// if c { } elseif c { } else { }
    If {
        branches: Vec<ConditionalBranch>,
        else_branch: Option<Vec<Stmt>>,
    },

    /// While loop: while cond { ... }
    While { condition: Expr, body: Vec<Stmt> },

    /// For loop: for x in iter { ... }
    For {
        variable: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },

    /// Function declaration
    Function(FunctionDecl),

    Break,

    Continue,

    /// import "path" (parsed, rejected by the compiler)
    Import(String),
}

/// One `if`/`elseif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

/// Function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub span: Span,
}

/// A complete program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}
