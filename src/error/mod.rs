//! Error types for all compilation phases.

use crate::span::Span;
use thiserror::Error;

/// Lexer errors.
#[derive(Debug, Error)]
pub enum LexerError {
    #[error("Unexpected character '{0}' at {1}")]
    UnexpectedChar(char, Span),

    #[error("Unterminated string at {0}")]
    UnterminatedString(Span),

    #[error("Invalid escape sequence '\\{0}' at {1}")]
    InvalidEscape(char, Span),

    #[error("Invalid number '{0}' at {1}")]
    InvalidNumber(String, Span),
}

impl LexerError {
    pub fn unexpected_char(c: char, span: Span) -> Self {
        Self::UnexpectedChar(c, span)
    }

    pub fn unterminated_string(span: Span) -> Self {
        Self::UnterminatedString(span)
    }

    pub fn invalid_escape(c: char, span: Span) -> Self {
        Self::InvalidEscape(c, span)
    }

    pub fn invalid_number(s: String, span: Span) -> Self {
        Self::InvalidNumber(s, span)
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedChar(_, span) => *span,
            Self::UnterminatedString(span) => *span,
            Self::InvalidEscape(_, span) => *span,
            Self::InvalidNumber(_, span) => *span,
        }
    }
}

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Unexpected token '{found}', expected {expected} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of file at {0}")]
    UnexpectedEof(Span),

    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl ParserError {
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn unexpected_eof(span: Span) -> Self {
        Self::UnexpectedEof(span)
    }

    pub fn general(message: impl Into<String>, span: Span) -> Self {
        Self::General {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::UnexpectedEof(span) => *span,
            Self::General { span, .. } => *span,
        }
    }
}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        Self::General {
            message: err.to_string(),
            span: err.span(),
        }
    }
}

/// Bytecode compilation errors. Compilation stops at the first one.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Cannot assign to builtin '{0}' at {1}")]
    AssignToBuiltin(String, Span),

    #[error("Cannot assign to captured variable '{0}' at {1}")]
    AssignToCaptured(String, Span),

    #[error("Invalid assignment target at {0}")]
    InvalidAssignmentTarget(Span),

    #[error("Unsupported {what} at {span}")]
    Unsupported { what: String, span: Span },

    #[error("'{keyword}' outside of a loop at {span}")]
    LoopControlOutsideLoop { keyword: &'static str, span: Span },

    #[error("Too many {what} (limit {limit}) at {span}")]
    OperandOverflow {
        what: &'static str,
        limit: usize,
        span: Span,
    },

    #[error("Internal compiler error: {0}")]
    ScopeImbalance(String),
}

impl CompileError {
    pub fn unsupported(what: impl Into<String>, span: Span) -> Self {
        Self::Unsupported {
            what: what.into(),
            span,
        }
    }

    pub fn operand_overflow(what: &'static str, limit: usize, span: Span) -> Self {
        Self::OperandOverflow { what, limit, span }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::AssignToBuiltin(_, span) => *span,
            Self::AssignToCaptured(_, span) => *span,
            Self::InvalidAssignmentTarget(span) => *span,
            Self::Unsupported { span, .. } => *span,
            Self::LoopControlOutsideLoop { span, .. } => *span,
            Self::OperandOverflow { span, .. } => *span,
            Self::ScopeImbalance(_) => Span::default(),
        }
    }
}

/// Runtime errors. Every failing VM operation returns one of these to `Vm::run`.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Division by zero at {0}")]
    DivisionByZero(Span),

    #[error("Undefined variable '{0}' at {1}")]
    UndefinedVariable(String, Span),

    #[error("Cannot call non-function value {0} at {1}")]
    NotCallable(&'static str, Span),

    #[error("Wrong number of arguments: expected {expected}, got {got} at {span}")]
    WrongArity {
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("Type error: {message} at {span}")]
    TypeError { message: String, span: Span },

    #[error("Index out of bounds: {index} (length {length}) at {span}")]
    IndexOutOfBounds {
        index: i64,
        length: usize,
        span: Span,
    },

    #[error("Table keys must be strings, got {0} at {1}")]
    InvalidTableKey(&'static str, Span),

    #[error("Integer overflow at {0}")]
    IntegerOverflow(Span),

    #[error("Unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("Truncated instruction at offset {0}")]
    TruncatedInstruction(usize),

    #[error("Stack overflow: operand stack exceeded {limit} slots at {span}")]
    StackOverflow { limit: usize, span: Span },

    #[error("Stack overflow: call depth exceeded {limit} frames at {span}")]
    FrameOverflow { limit: usize, span: Span },

    #[error("Stack underflow at {0}")]
    StackUnderflow(Span),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn division_by_zero(span: Span) -> Self {
        Self::DivisionByZero(span)
    }

    pub fn undefined_variable(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedVariable(name.into(), span)
    }

    pub fn not_callable(type_name: &'static str, span: Span) -> Self {
        Self::NotCallable(type_name, span)
    }

    pub fn wrong_arity(expected: usize, got: usize, span: Span) -> Self {
        Self::WrongArity {
            expected,
            got,
            span,
        }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::TypeError {
            message: message.into(),
            span,
        }
    }

    pub fn index_out_of_bounds(index: i64, length: usize, span: Span) -> Self {
        Self::IndexOutOfBounds {
            index,
            length,
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::DivisionByZero(span) => *span,
            Self::UndefinedVariable(_, span) => *span,
            Self::NotCallable(_, span) => *span,
            Self::WrongArity { span, .. } => *span,
            Self::TypeError { span, .. } => *span,
            Self::IndexOutOfBounds { span, .. } => *span,
            Self::InvalidTableKey(_, span) => *span,
            Self::IntegerOverflow(span) => *span,
            Self::UnknownOpcode { .. } => Span::default(),
            Self::TruncatedInstruction(_) => Span::default(),
            Self::StackOverflow { span, .. } => *span,
            Self::FrameOverflow { span, .. } => *span,
            Self::StackUnderflow(span) => *span,
            Self::Io(_) => Span::default(),
        }
    }

    /// Re-anchor a span-less error (raised inside the value model) at the
    /// line of the instruction that triggered it.
    pub fn at(self, span: Span) -> Self {
        match self {
            Self::DivisionByZero(_) => Self::DivisionByZero(span),
            Self::UndefinedVariable(name, _) => Self::UndefinedVariable(name, span),
            Self::NotCallable(t, _) => Self::NotCallable(t, span),
            Self::WrongArity { expected, got, .. } => Self::WrongArity {
                expected,
                got,
                span,
            },
            Self::TypeError { message, .. } => Self::TypeError { message, span },
            Self::IndexOutOfBounds { index, length, .. } => Self::IndexOutOfBounds {
                index,
                length,
                span,
            },
            Self::InvalidTableKey(t, _) => Self::InvalidTableKey(t, span),
            Self::IntegerOverflow(_) => Self::IntegerOverflow(span),
            Self::StackOverflow { limit, .. } => Self::StackOverflow { limit, span },
            Self::FrameOverflow { limit, .. } => Self::FrameOverflow { limit, span },
            Self::StackUnderflow(_) => Self::StackUnderflow(span),
            other @ (Self::UnknownOpcode { .. } | Self::TruncatedInstruction(_) | Self::Io(_)) => {
                other
            }
        }
    }
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum QuillError {
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
