//! Compiled bytecode: instruction bytes, line table and constant pool.

use super::opcode::{make, OpCode};
use super::value::Value;

/// The output of compiling one unit (the program, or one function body).
///
/// Immutable once the compiler hands it out.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// Encoded instructions.
    pub instructions: Vec<u8>,
    /// Source line per instruction byte, parallel to `instructions`.
    pub lines: Vec<u32>,
    /// Constant pool.
    pub constants: Vec<Value>,
    /// Frame-local slots needed by this unit (parameters included).
    pub num_locals: usize,
    pub num_parameters: usize,
    /// Size of the globals array. Only meaningful on the program unit.
    pub num_globals: usize,
    /// Global names by slot, for error messages.
    pub global_names: Vec<String>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one instruction and return its offset.
    pub fn emit(&mut self, op: OpCode, operands: &[usize], line: u32) -> usize {
        let offset = self.instructions.len();
        let bytes = make(op, operands);
        self.lines.extend(std::iter::repeat(line).take(bytes.len()));
        self.instructions.extend(bytes);
        offset
    }

    /// Add a constant to the pool and return its index.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.instructions[offset]
    }

    /// Read a big-endian 16-bit operand.
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.instructions[offset], self.instructions[offset + 1]])
    }

    /// Overwrite the first (2-byte) operand of the instruction at `op_offset`.
    pub fn patch_u16(&mut self, op_offset: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.instructions[op_offset + 1] = hi;
        self.instructions[op_offset + 2] = lo;
    }

    /// Opcode byte at `offset`, decoded.
    pub fn op_at(&self, offset: usize) -> Option<OpCode> {
        self.instructions.get(offset).copied().and_then(OpCode::from_u8)
    }

    /// Source line of the instruction byte at `offset`.
    pub fn line_at(&self, offset: usize) -> u32 {
        self.lines.get(offset).copied().unwrap_or(0)
    }
}

/// A function body compiled into its own unit.
#[derive(Debug)]
pub struct CompiledFunction {
    pub name: String,
    pub bytecode: Bytecode,
}

impl CompiledFunction {
    pub fn new(name: impl Into<String>, bytecode: Bytecode) -> Self {
        Self {
            name: name.into(),
            bytecode,
        }
    }

    pub fn arity(&self) -> usize {
        self.bytecode.num_parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_tracks_offsets_and_lines() {
        let mut code = Bytecode::new();
        let first = code.emit(OpCode::Constant, &[1], 3);
        let second = code.emit(OpCode::Pop, &[], 4);
        assert_eq!(first, 0);
        assert_eq!(second, 3);
        assert_eq!(code.lines, vec![3, 3, 3, 4]);
        assert_eq!(code.read_u16(1), 1);
        assert_eq!(code.op_at(3), Some(OpCode::Pop));
    }

    #[test]
    fn test_patch_u16_backpatches_jump_target() {
        let mut code = Bytecode::new();
        let jump = code.emit(OpCode::JumpNotTruthy, &[0], 1);
        code.emit(OpCode::Null, &[], 1);
        code.patch_u16(jump, code.len() as u16);
        assert_eq!(code.read_u16(jump + 1), 4);
        assert_eq!(code.instructions, vec![OpCode::JumpNotTruthy as u8, 0, 4, OpCode::Null as u8]);
    }

    #[test]
    fn test_line_at_out_of_range() {
        assert_eq!(Bytecode::new().line_at(10), 0);
    }
}
