//! Quill: a small dynamically-typed scripting language.
//!
//! Source text is scanned and parsed into an AST, compiled into [`vm::Bytecode`]
//! and executed by the stack-based [`vm::Vm`].

#![allow(clippy::result_large_err)]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod vm;

use std::io::Write;

use error::QuillError;
use vm::{Bytecode, Compiler, Vm, VmConfig};

/// Scan, parse and compile a program.
pub fn compile_source(source: &str) -> Result<Bytecode, QuillError> {
    let tokens = lexer::Scanner::new(source).scan_tokens()?;
    let program = parser::Parser::new(tokens).parse()?;
    Ok(Compiler::compile(&program)?)
}

/// Compile and run a program, printing to standard output.
pub fn run_source(source: &str) -> Result<(), QuillError> {
    let bytecode = compile_source(source)?;
    Vm::default().run(&bytecode)?;
    Ok(())
}

/// Compile and run a program with explicit limits, printing to `output`.
pub fn run_source_with_output<W: Write>(
    source: &str,
    config: VmConfig,
    output: W,
) -> Result<W, QuillError> {
    let bytecode = compile_source(source)?;
    let mut vm = Vm::new(config, output);
    vm.run(&bytecode)?;
    Ok(vm.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompileError, RuntimeError};

    fn run(source: &str) -> Result<String, QuillError> {
        let output = run_source_with_output(source, VmConfig::default(), Vec::new())?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_run_source_with_output() {
        assert_eq!(run("print(\"hello\", 1 + 2)").unwrap(), "hello 3\n");
    }

    #[test]
    fn test_errors_are_tagged_by_phase() {
        assert!(matches!(run("x = \"open"), Err(QuillError::Lexer(_))));
        assert!(matches!(run("x = (1"), Err(QuillError::Parser(_))));
        assert!(matches!(
            run("import \"m\""),
            Err(QuillError::Compile(CompileError::Unsupported { .. }))
        ));
        assert!(matches!(
            run("print(1 / 0)"),
            Err(QuillError::Runtime(RuntimeError::DivisionByZero(_)))
        ));
    }
}
