//! Bytecode core for Quill: compiles the AST to bytecode and executes it on a
//! stack-based VM with explicit call frames.

pub mod builtins;
pub mod chunk;
pub mod compiler;
pub mod compiler_exprs;
pub mod compiler_stmts;
pub mod disassembler;
pub mod opcode;
pub mod symbol_table;
pub mod value;
#[allow(clippy::module_inception)]
pub mod vm;
pub mod vm_calls;

pub use chunk::{Bytecode, CompiledFunction};
pub use compiler::Compiler;
pub use disassembler::disassemble;
pub use opcode::OpCode;
pub use value::Value;
pub use vm::{Vm, VmConfig};
