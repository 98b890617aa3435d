//! Abstract Syntax Tree for Quill.
//!
//! This is the input contract of the bytecode compiler: the parser builds it,
//! the compiler only reads it.

pub mod expr;
pub mod stmt;

pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use stmt::{ConditionalBranch, FunctionDecl, Parameter, Program, Stmt, StmtKind};
