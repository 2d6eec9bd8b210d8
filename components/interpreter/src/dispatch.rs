//! Dispatch loop for bytecode execution
//!
//! Handles fetch, decode and execution of individual opcodes, plus the
//! numeric semantics shared with the JIT.

use bytecode_system::{Chunk, Instruction, Opcode};
use core_types::{ErrorKind, Value, VmError, VmResult, REGISTER_COUNT};
use memory_manager::{HeapObject, NativeFn};
use std::io::Write;
use tracing::{debug, error, trace};

use crate::call_frame::{CallFrame, FrameCode};
use crate::vm::Vm;

/// Resolved target of a `CALL`.
enum Callee {
    Native(NativeFn),
    Bytecode(usize),
}

impl Vm {
    /// Execute the current chunk from its first instruction.
    ///
    /// Runs until `HALT`, a `RET` at depth 0, the end of the entry code, or
    /// an error. Every exit unwinds to depth 0; errors are returned
    /// with the faulting pc attached.
    ///
    /// # Example
    ///
    /// ```
    /// use bytecode_system::{Chunk, Instruction, Opcode};
    /// use core_types::Value;
    /// use interpreter::{OutputBuffer, Vm, VmConfig};
    ///
    /// let out = OutputBuffer::new();
    /// let mut vm = Vm::with_output(VmConfig::new(), Box::new(out.clone()));
    /// let chunk = Chunk::with_code(
    ///     vec![
    ///         Instruction::ad(Opcode::LoadK, 0, 0),
    ///         Instruction::ad(Opcode::LoadK, 1, 1),
    ///         Instruction::abc(Opcode::Add, 2, 0, 1),
    ///         Instruction::abc(Opcode::Print, 2, 0, 0),
    ///         Instruction::abc(Opcode::Halt, 0, 0, 0),
    ///     ],
    ///     vec![Value::Integer(5), Value::Integer(7)],
    /// );
    ///
    /// vm.interpret(chunk).unwrap();
    /// assert_eq!(out.contents(), "12\n");
    /// assert_eq!(vm.register(2), Value::Integer(12));
    /// ```
    pub fn run(&mut self) -> VmResult<()> {
        let chunk = self
            .chunk
            .clone()
            .ok_or_else(|| VmError::new(ErrorKind::MalformedModule, "no chunk loaded"))?;

        self.unwind();
        self.pc = 0;
        self.running = true;
        debug!(target: "evm::vm", instructions = chunk.code.len(), "interpret");

        let result = self.execute(&chunk);
        self.running = false;
        if let Err(e) = &result {
            error!(target: "evm::vm", "runtime error: {}", e);
        }
        // HALT inside a function or an error both leave callee frames behind.
        self.unwind();
        self.flush_output()?;
        result
    }

    fn execute(&mut self, chunk: &Chunk) -> VmResult<()> {
        while self.running {
            let code = self.current_code(chunk);
            let Some(&inst) = code.get(self.pc) else {
                // Falling off the end returns 0 from a function and stops
                // the program at depth 0.
                if self.frames.len() > 1 {
                    self.return_from_frame(Value::Integer(0));
                    continue;
                }
                break;
            };
            let pc = self.pc;
            self.pc += 1;
            self.step(chunk, inst, pc)?;
        }
        Ok(())
    }

    fn current_code<'c>(&self, chunk: &'c Chunk) -> &'c [Instruction] {
        match self.frames.last().map(|f| f.code) {
            Some(FrameCode::Function(index)) => chunk
                .functions
                .get(index)
                .map(|f| f.code.as_slice())
                .unwrap_or(&[]),
            _ => &chunk.code,
        }
    }

    fn step(&mut self, chunk: &Chunk, inst: Instruction, pc: usize) -> VmResult<()> {
        let op = inst.opcode().map_err(|byte| VmError::unknown_opcode(byte, pc))?;
        let (a, b, c) = (inst.a(), inst.b(), inst.c());

        if self.trace_execution {
            trace!(
                target: "evm::vm",
                pc,
                depth = self.frames.len() - 1,
                op = op.mnemonic(),
                a,
                b,
                c,
                "dispatch"
            );
        }

        match op {
            Opcode::Halt => {
                self.running = false;
            }
            Opcode::LoadK => {
                let index = inst.d() as usize;
                let value = chunk.constants.get(index).copied().ok_or_else(|| {
                    VmError::constant_index_out_of_range(index, chunk.constants.len(), pc)
                })?;
                self.write(a, value);
            }
            Opcode::Load => {
                let value = self.read(b);
                self.write(a, value);
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                let result = arithmetic(op, self.read(b), self.read(c), pc)?;
                self.write(a, result);
            }
            Opcode::Compare => {
                let result = compare(self.read(b), self.read(c), pc)?;
                self.write(a, result);
            }
            Opcode::Jmp => {
                self.jump(inst);
            }
            Opcode::JmpIf => {
                if self.read(a).is_truthy() {
                    self.jump(inst);
                }
            }
            Opcode::JmpIfNot => {
                if !self.read(a).is_truthy() {
                    self.jump(inst);
                }
            }
            Opcode::Call => {
                self.call(chunk, a, b, c, pc)?;
            }
            Opcode::Ret => {
                let value = self.read(a);
                if self.frames.len() > 1 {
                    self.return_from_frame(value);
                } else {
                    self.running = false;
                }
            }
            Opcode::Print => {
                let value = self.read(a);
                self.print_value(value)
                    .map_err(|e| VmError::new(ErrorKind::Io, e.to_string()).at(pc))?;
            }
        }
        Ok(())
    }

    fn read(&self, register: u8) -> Value {
        self.arena[self.base() + register as usize]
    }

    fn write(&mut self, register: u8, value: Value) {
        let base = self.base();
        self.arena[base + register as usize] = value;
    }

    /// `pc` already points past the jump, so the delta is applied to it.
    /// A target before the first instruction leaves the code like running
    /// off its end.
    fn jump(&mut self, inst: Instruction) {
        let target = self.pc as i64 + inst.sd() as i64;
        self.pc = usize::try_from(target).unwrap_or(usize::MAX);
    }

    fn call(
        &mut self,
        chunk: &Chunk,
        dest: u8,
        callee: u8,
        argc: u8,
        pc: usize,
    ) -> VmResult<()> {
        let first_arg = callee as usize + 1;
        let last_arg = callee as usize + argc as usize;
        if argc > 0 && last_arg >= REGISTER_COUNT {
            return Err(VmError::new(
                ErrorKind::InvalidRegister,
                format!(
                    "arguments r{}..=r{} exceed the register window",
                    first_arg, last_arg
                ),
            )
            .at(pc));
        }

        let target = self.resolve_callee(chunk, self.read(callee), pc)?;
        let base = self.base();
        let args = base + first_arg..base + first_arg + argc as usize;

        match target {
            Callee::Native(function) => {
                let result = function(&self.arena[args]);
                self.write(dest, result);
            }
            Callee::Bytecode(index) => {
                if self.frames.len() >= self.max_call_depth {
                    return Err(VmError::new(
                        ErrorKind::StackOverflow,
                        format!("call depth limit of {} exceeded", self.max_call_depth),
                    )
                    .at(pc));
                }
                let new_base = self.arena.len();
                self.arena.try_reserve(REGISTER_COUNT).map_err(|e| {
                    let bytes = REGISTER_COUNT * std::mem::size_of::<Value>();
                    VmError::out_of_memory(bytes, e.to_string()).at(pc)
                })?;
                self.arena.resize(new_base + REGISTER_COUNT, Value::default());
                self.arena.copy_within(args, new_base);

                trace!(
                    target: "evm::vm",
                    function = %chunk.functions[index].name,
                    depth = self.frames.len(),
                    argc,
                    "call"
                );
                self.frames.push(CallFrame::new(
                    FrameCode::Function(index),
                    self.pc,
                    new_base,
                    dest,
                ));
                self.pc = 0;
            }
        }
        Ok(())
    }

    fn resolve_callee(&self, chunk: &Chunk, value: Value, pc: usize) -> VmResult<Callee> {
        let undefined = |what: String| VmError::new(ErrorKind::UndefinedFunction, what).at(pc);
        let handle = match value {
            Value::Object(handle) => handle,
            other => return Err(undefined(format!("cannot call {}", other.type_name()))),
        };
        match self.heap.get(handle) {
            Some(HeapObject::Native(native)) => Ok(Callee::Native(native.function)),
            Some(HeapObject::Function(function))
                if function.chunk_id == self.chunk_id
                    && function.function_index < chunk.functions.len() =>
            {
                Ok(Callee::Bytecode(function.function_index))
            }
            Some(HeapObject::Function(function)) => Err(undefined(format!(
                "function '{}' belongs to a previously loaded chunk",
                function.name
            ))),
            Some(HeapObject::String(name)) => {
                let name = name.to_string_lossy();
                if let Some(function) = self.natives.get(&name) {
                    Ok(Callee::Native(function))
                } else if let Some(index) = chunk.function_index(&name) {
                    Ok(Callee::Bytecode(index))
                } else {
                    Err(undefined(format!("no function named '{}'", name)))
                }
            }
            Some(other) => Err(undefined(format!("cannot call {:?} object", other.kind()))),
            None => Err(undefined(format!("callee {} was freed", handle))),
        }
    }

    fn return_from_frame(&mut self, value: Value) {
        if let Some(frame) = self.frames.pop() {
            self.arena.truncate(frame.base);
            self.pc = frame.return_pc;
            self.write(frame.return_register, value);
        }
    }

    fn unwind(&mut self) {
        self.frames.truncate(1);
        self.arena.truncate(REGISTER_COUNT);
    }

    fn print_value(&mut self, value: Value) -> std::io::Result<()> {
        match value {
            Value::Integer(n) => writeln!(self.output, "{}", n),
            Value::Float(x) => writeln!(self.output, "{:.6}", x),
            Value::Object(handle) => match self.heap.get(handle) {
                Some(HeapObject::String(s)) => {
                    self.output.write_all(s.as_bytes())?;
                    self.output.write_all(b"\n")
                }
                Some(HeapObject::Function(f)) => writeln!(self.output, "<fn {}>", f.name),
                Some(HeapObject::Native(n)) => writeln!(self.output, "<native {}>", n.name),
                Some(HeapObject::Struct(_)) | None => writeln!(self.output, "<obj>"),
            },
        }
    }

    fn flush_output(&mut self) -> VmResult<()> {
        self.output
            .flush()
            .map_err(|e| VmError::new(ErrorKind::Io, e.to_string()))
    }
}

/// Applies `ADD`, `SUB`, `MUL` or `DIV` to two operands.
///
/// Two integers give an integer with wrapping arithmetic; if either operand
/// is a float both are promoted. Integer division truncates toward zero.
///
/// # Examples
///
/// ```
/// use bytecode_system::Opcode;
/// use core_types::Value;
/// use interpreter::arithmetic;
///
/// let sum = arithmetic(Opcode::Add, Value::Integer(i64::MAX), Value::Integer(1), 0).unwrap();
/// assert_eq!(sum, Value::Integer(i64::MIN));
///
/// let mixed = arithmetic(Opcode::Mul, Value::Integer(3), Value::Float(0.5), 0).unwrap();
/// assert_eq!(mixed, Value::Float(1.5));
/// ```
pub fn arithmetic(op: Opcode, lhs: Value, rhs: Value, pc: usize) -> VmResult<Value> {
    match (lhs, rhs) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(match op {
            Opcode::Add => x.wrapping_add(y),
            Opcode::Sub => x.wrapping_sub(y),
            Opcode::Mul => x.wrapping_mul(y),
            Opcode::Div => {
                if y == 0 {
                    return Err(
                        VmError::new(ErrorKind::DivisionByZero, "integer division by zero").at(pc),
                    );
                }
                x.wrapping_div(y)
            }
            _ => return Err(VmError::unknown_opcode(op as u8, pc)),
        })),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(x), Some(y)) => Ok(Value::Float(match op {
                Opcode::Add => x + y,
                Opcode::Sub => x - y,
                Opcode::Mul => x * y,
                Opcode::Div => x / y,
                _ => return Err(VmError::unknown_opcode(op as u8, pc)),
            })),
            _ => Err(VmError::type_mismatch(
                op.mnemonic(),
                lhs.type_name(),
                rhs.type_name(),
                pc,
            )),
        },
    }
}

/// `COMPARE`: integer 1 if `lhs < rhs`, else 0, with the arithmetic
/// promotion rule.
pub fn compare(lhs: Value, rhs: Value, pc: usize) -> VmResult<Value> {
    let less = match (lhs, rhs) {
        (Value::Integer(x), Value::Integer(y)) => x < y,
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(x), Some(y)) => x < y,
            _ => {
                return Err(VmError::type_mismatch(
                    Opcode::Compare.mnemonic(),
                    lhs.type_name(),
                    rhs.type_name(),
                    pc,
                ))
            }
        },
    };
    Ok(Value::Integer(less as i64))
}
