//! The bytecode virtual machine: a stack-based execution engine.

use std::cmp::Ordering;
use std::io::{self, Stdout, Write};
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::error::RuntimeError;
use crate::span::Span;

use super::builtins;
use super::chunk::{Bytecode, CompiledFunction};
use super::opcode::OpCode;
use super::value::{Closure, Value};

/// Resource limits for one VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum number of live frames, the program's own frame included.
    pub max_frames: usize,
    /// Maximum operand stack depth.
    pub max_stack: usize,
}

/// Operand stack slots granted per frame when only a depth is given.
pub const STACK_SLOTS_PER_FRAME: usize = 16;

impl VmConfig {
    /// Limits allowing `max_frames` frames, with a stack sized to match.
    pub fn with_max_frames(max_frames: usize) -> Self {
        Self {
            max_frames,
            max_stack: max_frames.saturating_mul(STACK_SLOTS_PER_FRAME),
        }
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self::with_max_frames(1024)
    }
}

/// A call frame on the VM call stack.
#[derive(Debug)]
pub struct Frame {
    /// The closure being executed.
    pub closure: Rc<Closure>,
    /// Offset of the next instruction byte.
    pub ip: usize,
    /// Stack slot holding the callee; the stack is cut back to here on return.
    pub base_pointer: usize,
    /// Parameters first, then the function's other locals.
    pub locals: Vec<Value>,
}

impl Frame {
    fn bytecode(&self) -> &Bytecode {
        &self.closure.function.bytecode
    }
}

/// The bytecode VM. `print` output goes to `W`.
pub struct Vm<W: Write = Stdout> {
    pub(crate) config: VmConfig,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<Frame>,
    globals: Vec<Option<Value>>,
    global_names: Vec<String>,
    output: W,
}

impl<W: Write> Vm<W> {
    pub fn new(config: VmConfig, output: W) -> Self {
        Self {
            config,
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(64),
            globals: Vec::new(),
            global_names: Vec::new(),
            output,
        }
    }

    /// A VM with the default limits.
    pub fn with_output(output: W) -> Self {
        Self::new(VmConfig::default(), output)
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Value of a global after a run, if it was ever assigned.
    pub fn global(&self, name: &str) -> Option<&Value> {
        let index = self.global_names.iter().position(|n| n == name)?;
        self.globals.get(index)?.as_ref()
    }

    /// Execute a compiled program until its top-level frame returns.
    pub fn run(&mut self, program: &Bytecode) -> Result<(), RuntimeError> {
        debug!(
            "vm run: {} bytes, {} globals, limits {:?}",
            program.len(),
            program.num_globals,
            self.config
        );
        self.stack.clear();
        self.frames.clear();
        self.globals = vec![None; program.num_globals];
        self.global_names = program.global_names.clone();

        let main = Rc::new(CompiledFunction::new("<main>", program.clone()));
        self.frames.push(Frame {
            closure: Rc::new(Closure::new(main, Vec::new())),
            ip: 0,
            base_pointer: 0,
            locals: vec![Value::Nil; program.num_locals],
        });

        let result = self.execute();
        self.output.flush()?;
        match &result {
            Ok(()) => debug!("vm finished"),
            Err(err) => debug!("vm aborted: {}", err),
        }
        result
    }

    /// The fetch-decode-execute loop. Ends when the frame stack is empty.
    fn execute(&mut self) -> Result<(), RuntimeError> {
        while let Some(frame) = self.frames.last() {
            let ip = frame.ip;
            let code = frame.bytecode();
            if ip >= code.len() {
                // Fell off the end of a unit: behave like `Return`.
                self.return_from_frame(Value::Nil)?;
                continue;
            }

            let byte = code.read_u8(ip);
            let span = Span::at_line(code.line_at(ip) as usize);
            let op = OpCode::from_u8(byte).ok_or(RuntimeError::UnknownOpcode {
                opcode: byte,
                offset: ip,
            })?;
            self.frame_mut()?.ip += 1;

            self.execute_instruction(op).map_err(|err| err.at(span))?;
        }
        Ok(())
    }

    fn execute_instruction(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        match op {
            OpCode::Constant => {
                let index = self.read_u16()? as usize;
                let value = self.frame()?.bytecode().constants[index].clone();
                self.push(value)?;
            }
            OpCode::Null => self.push(Value::Nil)?,
            OpCode::True => self.push(Value::Boolean(true))?,
            OpCode::False => self.push(Value::Boolean(false))?,

            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Pow => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = match op {
                    OpCode::Add => a.add(&b)?,
                    OpCode::Sub => a.sub(&b)?,
                    OpCode::Mul => a.mul(&b)?,
                    OpCode::Div => a.div(&b)?,
                    OpCode::Mod => a.rem(&b)?,
                    _ => a.pow(&b)?,
                };
                self.push(result)?;
            }
            OpCode::Minus => {
                let value = self.pop()?;
                self.push(value.negate()?)?;
            }
            OpCode::Not => {
                let value = self.pop()?;
                self.push(Value::Boolean(!value.is_truthy()))?;
            }

            OpCode::Equal | OpCode::NotEqual => {
                let b = self.pop()?;
                let a = self.pop()?;
                let equal = a == b;
                self.push(Value::Boolean(if op == OpCode::Equal { equal } else { !equal }))?;
            }
            OpCode::Greater | OpCode::Less | OpCode::GreaterEq | OpCode::LessEq => {
                let b = self.pop()?;
                let a = self.pop()?;
                let ordering = a.compare(&b)?;
                let result = match (op, ordering) {
                    (_, None) => false,
                    (OpCode::Greater, Some(ord)) => ord == Ordering::Greater,
                    (OpCode::Less, Some(ord)) => ord == Ordering::Less,
                    (OpCode::GreaterEq, Some(ord)) => ord != Ordering::Less,
                    (_, Some(ord)) => ord != Ordering::Greater,
                };
                self.push(Value::Boolean(result))?;
            }

            OpCode::Jump => {
                let target = self.read_u16()? as usize;
                self.frame_mut()?.ip = target;
            }
            OpCode::JumpNotTruthy | OpCode::JumpTruthy => {
                let target = self.read_u16()? as usize;
                let condition = self.pop()?.is_truthy();
                if condition == (op == OpCode::JumpTruthy) {
                    self.frame_mut()?.ip = target;
                }
            }

            OpCode::Pop => {
                self.pop()?;
            }
            OpCode::Dup => {
                let top = self.pop()?;
                self.push(top.clone())?;
                self.push(top)?;
            }

            OpCode::Print => {
                let count = self.read_u8()? as usize;
                let values = self.pop_n(count)?;
                let line = values
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(self.output, "{}", line)?;
            }

            OpCode::SetGlobal => {
                let index = self.read_u16()? as usize;
                let value = self.pop()?;
                self.globals[index] = Some(value);
            }
            OpCode::GetGlobal => {
                let index = self.read_u16()? as usize;
                match self.globals[index].clone() {
                    Some(value) => self.push(value)?,
                    None => {
                        let name = self
                            .global_names
                            .get(index)
                            .cloned()
                            .unwrap_or_else(|| format!("global #{}", index));
                        return Err(RuntimeError::undefined_variable(name, Span::default()));
                    }
                }
            }
            OpCode::SetLocal => {
                let index = self.read_u8()? as usize;
                let value = self.pop()?;
                self.frame_mut()?.locals[index] = value;
            }
            OpCode::GetLocal => {
                let index = self.read_u8()? as usize;
                let value = self.frame()?.locals[index].clone();
                self.push(value)?;
            }
            OpCode::GetBuiltin => {
                let index = self.read_u8()? as usize;
                let builtin = builtins::lookup(index).ok_or_else(|| {
                    RuntimeError::undefined_variable(format!("builtin #{}", index), Span::default())
                })?;
                self.push(Value::Builtin(builtin))?;
            }
            OpCode::GetFree => {
                let index = self.read_u8()? as usize;
                let value = self.frame()?.closure.free[index].clone();
                self.push(value)?;
            }
            OpCode::CurrentClosure => {
                let closure = Rc::clone(&self.frame()?.closure);
                self.push(Value::Closure(closure))?;
            }

            OpCode::Array => {
                let count = self.read_u16()? as usize;
                let items = self.pop_n(count)?;
                self.push(Value::list(items))?;
            }
            OpCode::Hash => {
                let count = self.read_u16()? as usize;
                let flat = self.pop_n(count * 2)?;
                let mut entries = IndexMap::with_capacity(count);
                let mut flat = flat.into_iter();
                while let (Some(key), Some(value)) = (flat.next(), flat.next()) {
                    match key {
                        Value::String(key) => {
                            entries.insert(key, value);
                        }
                        other => {
                            return Err(RuntimeError::InvalidTableKey(
                                other.type_name(),
                                Span::default(),
                            ))
                        }
                    }
                }
                self.push(Value::table(entries))?;
            }
            OpCode::Index => {
                let index = self.pop()?;
                let aggregate = self.pop()?;
                self.push(aggregate.get_index(&index)?)?;
            }
            OpCode::SetIndex => {
                let index = self.pop()?;
                let aggregate = self.pop()?;
                let value = self.pop()?;
                aggregate.set_index(&index, value)?;
            }

            OpCode::Call => {
                let argc = self.read_u8()? as usize;
                self.call_value(argc)?;
            }
            OpCode::Closure => {
                let index = self.read_u16()? as usize;
                let free_count = self.read_u8()? as usize;
                let function = match &self.frame()?.bytecode().constants[index] {
                    Value::Function(function) => Rc::clone(function),
                    other => {
                        return Err(RuntimeError::type_error(
                            format!("cannot build a closure from '{}'", other.type_name()),
                            Span::default(),
                        ))
                    }
                };
                let free = self.pop_n(free_count)?;
                self.push(Value::Closure(Rc::new(Closure::new(function, free))))?;
            }
            OpCode::ReturnValue => {
                let value = self.pop()?;
                self.return_from_frame(value)?;
            }
            OpCode::Return => {
                self.return_from_frame(Value::Nil)?;
            }

            OpCode::GetIterator => {
                let iterable = self.pop()?;
                self.push(iterable.get_iterator()?)?;
            }
            OpCode::IteratorNext => {
                let iterator = self.pop()?;
                let next = match &iterator {
                    Value::Iterator(state) => state.borrow_mut().next_value(),
                    other => {
                        return Err(RuntimeError::type_error(
                            format!("'{}' is not an iterator", other.type_name()),
                            Span::default(),
                        ))
                    }
                };
                let has_next = next.is_some();
                self.push(iterator)?;
                self.push(next.unwrap_or(Value::Nil))?;
                self.push(Value::Boolean(has_next))?;
            }
        }
        Ok(())
    }

    // --- Stack & frame helpers ---

    pub(crate) fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.max_stack {
            return Err(RuntimeError::StackOverflow {
                limit: self.config.max_stack,
                span: Span::default(),
            });
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow(Span::default()))
    }

    /// Pop the top `n` values, oldest first.
    pub(crate) fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(RuntimeError::StackUnderflow(Span::default()))?;
        Ok(self.stack.split_off(start))
    }

    pub(crate) fn frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames
            .last()
            .ok_or(RuntimeError::StackUnderflow(Span::default()))
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames
            .last_mut()
            .ok_or(RuntimeError::StackUnderflow(Span::default()))
    }

    fn read_u8(&mut self) -> Result<u8, RuntimeError> {
        let frame = self.frame_mut()?;
        let ip = frame.ip;
        if ip >= frame.bytecode().len() {
            return Err(RuntimeError::TruncatedInstruction(ip));
        }
        frame.ip += 1;
        Ok(frame.bytecode().read_u8(ip))
    }

    fn read_u16(&mut self) -> Result<u16, RuntimeError> {
        let frame = self.frame_mut()?;
        let ip = frame.ip;
        if ip + 2 > frame.bytecode().len() {
            return Err(RuntimeError::TruncatedInstruction(ip));
        }
        frame.ip += 2;
        Ok(frame.bytecode().read_u16(ip))
    }
}

impl Default for Vm<Stdout> {
    fn default() -> Self {
        Self::new(VmConfig::default(), io::stdout())
    }
}
