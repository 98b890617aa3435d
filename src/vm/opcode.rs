//! Instruction set for the Quill VM.
//!
//! Every instruction is one opcode byte followed by a fixed number of operand
//! bytes. Two-byte operands are big-endian unsigned.

/// A single VM opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // --- Constants & Literals ---
    /// Push `constants[idx]`.
    Constant = 0,
    Null,
    True,
    False,

    // --- Arithmetic ---
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Minus,
    Not,

    // --- Comparison ---
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEq,
    LessEq,

    // --- Control flow (absolute targets) ---
    Jump,
    /// Pop a value, jump when it is falsy.
    JumpNotTruthy,
    /// Pop a value, jump when it is truthy.
    JumpTruthy,

    // --- Stack manipulation ---
    Pop,
    Dup,

    // --- Output ---
    /// Pop N values and write them space-separated with a trailing newline.
    Print,

    // --- Variables ---
    SetGlobal,
    GetGlobal,
    SetLocal,
    GetLocal,
    GetBuiltin,
    GetFree,
    CurrentClosure,

    // --- Collections ---
    /// Pop N elements, push a list.
    Array,
    /// Pop N key/value pairs, push a table.
    Hash,
    /// Stack: [aggregate, index].
    Index,
    /// Stack: [value, aggregate, index].
    SetIndex,

    // --- Functions ---
    Call,
    /// Constant index (2 bytes) and free variable count (1 byte).
    Closure,
    ReturnValue,
    Return,

    // --- Iteration ---
    GetIterator,
    /// Stack: [iterator] -> [iterator, value, continue-flag].
    IteratorNext,
}

const ALL: &[OpCode] = &[
    OpCode::Constant,
    OpCode::Null,
    OpCode::True,
    OpCode::False,
    OpCode::Add,
    OpCode::Sub,
    OpCode::Mul,
    OpCode::Div,
    OpCode::Mod,
    OpCode::Pow,
    OpCode::Minus,
    OpCode::Not,
    OpCode::Equal,
    OpCode::NotEqual,
    OpCode::Greater,
    OpCode::Less,
    OpCode::GreaterEq,
    OpCode::LessEq,
    OpCode::Jump,
    OpCode::JumpNotTruthy,
    OpCode::JumpTruthy,
    OpCode::Pop,
    OpCode::Dup,
    OpCode::Print,
    OpCode::SetGlobal,
    OpCode::GetGlobal,
    OpCode::SetLocal,
    OpCode::GetLocal,
    OpCode::GetBuiltin,
    OpCode::GetFree,
    OpCode::CurrentClosure,
    OpCode::Array,
    OpCode::Hash,
    OpCode::Index,
    OpCode::SetIndex,
    OpCode::Call,
    OpCode::Closure,
    OpCode::ReturnValue,
    OpCode::Return,
    OpCode::GetIterator,
    OpCode::IteratorNext,
];

impl OpCode {
    /// Decode an opcode byte.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        ALL.get(byte as usize).copied()
    }

    /// Width in bytes of each operand, in encoding order.
    pub fn operand_widths(self) -> &'static [usize] {
        match self {
            OpCode::Constant
            | OpCode::Jump
            | OpCode::JumpNotTruthy
            | OpCode::JumpTruthy
            | OpCode::SetGlobal
            | OpCode::GetGlobal
            | OpCode::Array
            | OpCode::Hash => &[2],
            OpCode::Print
            | OpCode::SetLocal
            | OpCode::GetLocal
            | OpCode::GetBuiltin
            | OpCode::GetFree
            | OpCode::Call => &[1],
            OpCode::Closure => &[2, 1],
            _ => &[],
        }
    }

    /// Total encoded size of the instruction, opcode byte included.
    pub fn size(self) -> usize {
        1 + self.operand_widths().iter().sum::<usize>()
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::Null => "NULL",
            OpCode::True => "TRUE",
            OpCode::False => "FALSE",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Pow => "POW",
            OpCode::Minus => "MINUS",
            OpCode::Not => "NOT",
            OpCode::Equal => "EQUAL",
            OpCode::NotEqual => "NOT_EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::Less => "LESS",
            OpCode::GreaterEq => "GREATER_EQ",
            OpCode::LessEq => "LESS_EQ",
            OpCode::Jump => "JUMP",
            OpCode::JumpNotTruthy => "JUMP_NOT_TRUTHY",
            OpCode::JumpTruthy => "JUMP_TRUTHY",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Print => "PRINT",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::GetBuiltin => "GET_BUILTIN",
            OpCode::GetFree => "GET_FREE",
            OpCode::CurrentClosure => "CURRENT_CLOSURE",
            OpCode::Array => "ARRAY",
            OpCode::Hash => "HASH",
            OpCode::Index => "INDEX",
            OpCode::SetIndex => "SET_INDEX",
            OpCode::Call => "CALL",
            OpCode::Closure => "CLOSURE",
            OpCode::ReturnValue => "RETURN_VALUE",
            OpCode::Return => "RETURN",
            OpCode::GetIterator => "GET_ITERATOR",
            OpCode::IteratorNext => "ITERATOR_NEXT",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Encode one instruction. Operands wider than their slot are truncated;
/// the compiler range-checks before calling this.
pub fn make(op: OpCode, operands: &[usize]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(op.size());
    bytes.push(op as u8);
    for (operand, width) in operands.iter().zip(op.operand_widths()) {
        match width {
            2 => bytes.extend_from_slice(&(*operand as u16).to_be_bytes()),
            _ => bytes.push(*operand as u8),
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_round_trips_every_opcode() {
        for (i, op) in ALL.iter().enumerate() {
            assert_eq!(*op as u8 as usize, i);
            assert_eq!(OpCode::from_u8(i as u8), Some(*op));
        }
        assert_eq!(OpCode::from_u8(ALL.len() as u8), None);
        assert_eq!(OpCode::from_u8(0xff), None);
    }

    #[test]
    fn test_make_is_big_endian() {
        assert_eq!(
            make(OpCode::Constant, &[65534]),
            vec![OpCode::Constant as u8, 0xff, 0xfe]
        );
        assert_eq!(make(OpCode::GetLocal, &[255]), vec![OpCode::GetLocal as u8, 255]);
        assert_eq!(make(OpCode::Add, &[]), vec![OpCode::Add as u8]);
        assert_eq!(
            make(OpCode::Closure, &[258, 3]),
            vec![OpCode::Closure as u8, 0x01, 0x02, 3]
        );
    }

    #[test]
    fn test_sizes() {
        assert_eq!(OpCode::Pop.size(), 1);
        assert_eq!(OpCode::Call.size(), 2);
        assert_eq!(OpCode::Jump.size(), 3);
        assert_eq!(OpCode::Closure.size(), 4);
    }
}
