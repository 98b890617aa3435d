//! Function call dispatch for the VM.
//!
//! Calls push a frame instead of recursing on the host stack. The callee sits
//! at `stack_top - argc - 1`, which becomes the new frame's base pointer.

use std::io::Write;
use std::rc::Rc;

use log::trace;

use crate::error::RuntimeError;
use crate::span::Span;

use super::builtins::Builtin;
use super::value::{Closure, Value};
use super::vm::{Frame, Vm};

impl<W: Write> Vm<W> {
    /// Call the value below the top `argc` stack slots.
    pub(crate) fn call_value(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let callee_index = self
            .stack
            .len()
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow(Span::default()))?;

        match self.stack[callee_index].clone() {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::Function(function) => {
                self.call_closure(Rc::new(Closure::new(function, Vec::new())), argc)
            }
            Value::Builtin(builtin) => self.call_builtin(builtin, argc),
            other => Err(RuntimeError::not_callable(other.type_name(), Span::default())),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, argc: usize) -> Result<(), RuntimeError> {
        let arity = closure.function.arity();
        if argc != arity {
            return Err(RuntimeError::wrong_arity(arity, argc, Span::default()));
        }
        if self.frames.len() >= self.config.max_frames {
            return Err(RuntimeError::FrameOverflow {
                limit: self.config.max_frames,
                span: Span::default(),
            });
        }

        let base_pointer = self.stack.len() - argc - 1;
        let num_locals = closure.function.bytecode.num_locals.max(argc);
        let mut locals = Vec::with_capacity(num_locals);
        locals.extend(self.stack[base_pointer + 1..].iter().cloned());
        locals.resize(num_locals, Value::Nil);

        trace!(
            "call '{}' depth {} base {}",
            closure.function.name,
            self.frames.len() + 1,
            base_pointer
        );
        self.frames.push(Frame {
            closure,
            ip: 0,
            base_pointer,
            locals,
        });
        Ok(())
    }

    fn call_builtin(&mut self, builtin: &'static Builtin, argc: usize) -> Result<(), RuntimeError> {
        if argc != builtin.arity {
            return Err(RuntimeError::wrong_arity(builtin.arity, argc, Span::default()));
        }
        let args = self.pop_n(argc)?;
        self.pop()?;
        let result = (builtin.func)(&args)?;
        self.push(result)
    }

    /// Pop the active frame, cut the stack back to its base pointer and hand
    /// `value` to the caller. Returning from the program frame ends the run.
    pub(crate) fn return_from_frame(&mut self, value: Value) -> Result<(), RuntimeError> {
        let frame = self
            .frames
            .pop()
            .ok_or(RuntimeError::StackUnderflow(Span::default()))?;
        self.stack.truncate(frame.base_pointer);
        if self.frames.is_empty() {
            return Ok(());
        }
        trace!("return from '{}'", frame.closure.function.name);
        self.push(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RuntimeError;
    use crate::vm::chunk::{Bytecode, CompiledFunction};
    use crate::vm::opcode::OpCode;
    use crate::vm::value::Value;
    use crate::vm::vm::{Vm, VmConfig};
    use std::rc::Rc;

    /// `function(a, b) { return b }` built by hand.
    fn second_of_two() -> Value {
        let mut body = Bytecode::new();
        body.emit(OpCode::GetLocal, &[1], 1);
        body.emit(OpCode::ReturnValue, &[], 1);
        body.num_locals = 2;
        body.num_parameters = 2;
        Value::Function(Rc::new(CompiledFunction::new("second", body)))
    }

    fn program(argc: usize) -> Bytecode {
        let mut code = Bytecode::new();
        let f = code.add_constant(second_of_two());
        let x = code.add_constant(Value::Integer(7));
        code.emit(OpCode::Constant, &[f], 1);
        for _ in 0..argc {
            code.emit(OpCode::Constant, &[x], 1);
        }
        code.emit(OpCode::Call, &[argc], 1);
        code.emit(OpCode::Print, &[1], 1);
        code.emit(OpCode::Return, &[], 1);
        code
    }

    #[test]
    fn test_bare_function_constant_is_callable() {
        let mut vm = Vm::with_output(Vec::new());
        vm.run(&program(2)).unwrap();
        assert_eq!(String::from_utf8(vm.into_output()).unwrap(), "7\n");
    }

    #[test]
    fn test_return_restores_stack_to_base_pointer() {
        let mut vm = Vm::new(VmConfig::default(), Vec::new());
        vm.run(&program(2)).unwrap();
        assert!(vm.stack.is_empty());
        assert!(vm.frames.is_empty());
    }

    #[test]
    fn test_arity_mismatch() {
        let err = Vm::with_output(Vec::new()).run(&program(1)).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::WrongArity { expected: 2, got: 1, span } if span.line == 1
        ));
    }
}
