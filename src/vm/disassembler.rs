//! Bytecode disassembler for debugging.
//!
//! One line per instruction: `NNNN MNEMONIC operands`. Function constants are
//! listed after the unit that owns them, in constant-pool order.

use std::fmt;

use super::chunk::Bytecode;
use super::opcode::OpCode;
use super::value::Value;

/// Disassemble a program and every function nested in it.
pub fn disassemble(code: &Bytecode) -> String {
    Disassembly {
        name: "<main>",
        code,
    }
    .to_string()
}

struct Disassembly<'a> {
    name: &'a str,
    code: &'a Bytecode,
}

impl fmt::Display for Disassembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "== {} (params: {}, locals: {}) ==",
            self.name, self.code.num_parameters, self.code.num_locals
        )?;

        let mut offset = 0;
        while offset < self.code.len() {
            offset = write_instruction(f, self.code, offset)?;
        }

        for constant in &self.code.constants {
            if let Value::Function(function) = constant {
                writeln!(f)?;
                let nested = Disassembly {
                    name: &function.name,
                    code: &function.bytecode,
                };
                fmt::Display::fmt(&nested, f)?;
            }
        }
        Ok(())
    }
}

/// Write the instruction at `offset`; returns the offset of the next one.
fn write_instruction(
    f: &mut fmt::Formatter<'_>,
    code: &Bytecode,
    offset: usize,
) -> Result<usize, fmt::Error> {
    let byte = code.read_u8(offset);
    let Some(op) = OpCode::from_u8(byte) else {
        writeln!(f, "{:04} UNKNOWN 0x{:02x}", offset, byte)?;
        return Ok(offset + 1);
    };

    let next = offset + op.size();
    if next > code.len() {
        writeln!(f, "{:04} {} <truncated>", offset, op)?;
        return Ok(code.len());
    }

    let mut operands = Vec::with_capacity(op.operand_widths().len());
    let mut cursor = offset + 1;
    for width in op.operand_widths() {
        let operand = match width {
            2 => code.read_u16(cursor) as usize,
            _ => code.read_u8(cursor) as usize,
        };
        operands.push(operand);
        cursor += width;
    }

    if operands.is_empty() {
        writeln!(f, "{:04} {}", offset, op)?;
        return Ok(next);
    }

    let rendered = operands
        .iter()
        .map(|operand| operand.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    match op {
        OpCode::Constant | OpCode::Closure => {
            let constant = code
                .constants
                .get(operands[0])
                .map(describe_constant)
                .unwrap_or_else(|| "?".to_string());
            writeln!(f, "{:04} {:<16} {} ({})", offset, op.mnemonic(), rendered, constant)?;
        }
        _ => writeln!(f, "{:04} {:<16} {}", offset, op.mnemonic(), rendered)?,
    }
    Ok(next)
}

fn describe_constant(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{:?}", s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;
    use crate::parser::Parser;
    use crate::vm::compiler::Compiler;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Bytecode {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        Compiler::compile(&program).unwrap()
    }

    #[test]
    fn test_disassemble_program() {
        let code = compile("x = \"hi\"\nif x { print(x, 1) }");
        assert_eq!(
            disassemble(&code),
            "\
== <main> (params: 0, locals: 0) ==
0000 CONSTANT         0 (\"hi\")
0003 SET_GLOBAL       0
0006 GET_GLOBAL       0
0009 JUMP_NOT_TRUTHY  20
0012 GET_GLOBAL       0
0015 CONSTANT         1 (1)
0018 PRINT            2
0020 RETURN
"
        );
    }

    #[test]
    fn test_disassemble_nested_functions() {
        let code = compile("function double(n) { return n * 2 }");
        assert_eq!(
            disassemble(&code),
            "\
== <main> (params: 0, locals: 0) ==
0000 CLOSURE          0 0 (<function double>)
0004 SET_GLOBAL       0
0007 RETURN

== double (params: 1, locals: 1) ==
0000 GET_LOCAL        0
0002 CONSTANT         0 (2)
0005 MUL
0006 RETURN_VALUE
"
        );
    }

    #[test]
    fn test_disassembly_is_deterministic() {
        let source = "function f(a) { t = {\"x\": a}; for k in t { print(k) } }\nf(1)";
        assert_eq!(disassemble(&compile(source)), disassemble(&compile(source)));
    }

    #[test]
    fn test_unknown_and_truncated_bytes() {
        let mut code = Bytecode::new();
        code.instructions = vec![0xee, OpCode::Pop as u8, OpCode::Constant as u8, 0];
        code.lines = vec![1; 4];
        assert_eq!(
            disassemble(&code),
            "\
== <main> (params: 0, locals: 0) ==
0000 UNKNOWN 0xee
0001 POP
0002 CONSTANT <truncated>
"
        );
    }
}
