//! Code generation
//!
//! Single forward pass from register bytecode to x86-64. Every lowered
//! instruction goes through `rax`; no value lives in a machine register
//! across instructions, so there is nothing to allocate.

use crate::compiled_code::RegisterSet;
use crate::x64::{slot_offset, Assembler};
use bytecode_system::{Instruction, Opcode};
use core_types::{Value, VmError, VmResult};

/// Output of a code generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenResult {
    /// Machine code, prologue through epilogue
    pub code_bytes: Vec<u8>,
    /// Registers read before being written
    pub inputs: RegisterSet,
    /// Registers written
    pub outputs: RegisterSet,
    /// Instructions consumed, including a terminating `RET`/`HALT`
    pub instructions_lowered: usize,
}

impl CodegenResult {
    /// Code size in bytes
    pub fn code_size(&self) -> usize {
        self.code_bytes.len()
    }
}

/// Lowers instruction sequences to machine code.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    asm: Assembler,
    inputs: RegisterSet,
    outputs: RegisterSet,
}

impl CodeGenerator {
    /// Create a generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower `code` up to its first `RET`/`HALT`, or all of it.
    ///
    /// `LOADK` operands are baked in as immediates, so only integer
    /// constants can be lowered.
    ///
    /// # Errors
    ///
    /// `JitUnsupported` for an empty sequence, any opcode outside
    /// `ADD`/`SUB`/`MUL`/`LOAD`/`LOADK`/`RET`/`HALT`, or a `LOADK` whose
    /// constant is missing or not an integer.
    pub fn generate(mut self, code: &[Instruction], constants: &[Value]) -> VmResult<CodegenResult> {
        if code.is_empty() {
            return Err(VmError::jit_unsupported("empty instruction sequence"));
        }

        self.asm.prologue();
        let mut lowered = 0;
        for (pc, inst) in code.iter().enumerate() {
            lowered = pc + 1;
            let op = inst.opcode().map_err(|byte| {
                VmError::jit_unsupported(format!("unknown opcode 0x{:02X}", byte)).at(pc)
            })?;
            let (a, b, c) = (inst.a(), inst.b(), inst.c());
            match op {
                Opcode::Add | Opcode::Sub | Opcode::Mul => {
                    self.read(b);
                    self.read(c);
                    self.asm.load_rax(slot_offset(b));
                    match op {
                        Opcode::Add => self.asm.add_rax(slot_offset(c)),
                        Opcode::Sub => self.asm.sub_rax(slot_offset(c)),
                        _ => self.asm.imul_rax(slot_offset(c)),
                    }
                    self.write(a);
                }
                Opcode::Load => {
                    self.read(b);
                    self.asm.load_rax(slot_offset(b));
                    self.write(a);
                }
                Opcode::LoadK => {
                    let index = inst.d() as usize;
                    match constants.get(index) {
                        Some(Value::Integer(n)) => self.asm.mov_rax_imm64(*n),
                        Some(other) => {
                            return Err(VmError::jit_unsupported(format!(
                                "LOADK of a {} constant",
                                other.type_name()
                            ))
                            .at(pc))
                        }
                        None => {
                            return Err(VmError::jit_unsupported(format!(
                                "LOADK of missing constant #{}",
                                index
                            ))
                            .at(pc))
                        }
                    }
                    self.write(a);
                }
                Opcode::Ret | Opcode::Halt => break,
                other => {
                    return Err(VmError::jit_unsupported(format!(
                        "{} is not compiled",
                        other.mnemonic()
                    ))
                    .at(pc))
                }
            }
        }
        self.asm.epilogue();

        Ok(CodegenResult {
            code_bytes: self.asm.finish(),
            inputs: self.inputs,
            outputs: self.outputs,
            instructions_lowered: lowered,
        })
    }

    fn read(&mut self, register: u8) {
        if !self.outputs.contains(register) {
            self.inputs.insert(register);
        }
    }

    /// Stores `rax` into `register`.
    fn write(&mut self, register: u8) {
        self.asm.store_rax(slot_offset(register));
        self.outputs.insert(register);
    }
}
