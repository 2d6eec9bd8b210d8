//! Baseline JIT compiler
//!
//! Template-based compilation of straight-line integer code. Each bytecode
//! instruction maps to a fixed x86-64 sequence; the result is copied into
//! its own executable region.

use crate::codegen::CodeGenerator;
use crate::compiled_code::CompiledFunction;
use crate::exec_mem::ExecutableMemory;
use bytecode_system::{Chunk, Instruction};
use core_types::{Value, VmError, VmResult};
use tracing::{debug, warn};

/// Statistics for baseline JIT compilation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineStats {
    /// Number of functions compiled
    pub functions_compiled: u64,
    /// Total code size generated
    pub total_code_size: usize,
    /// Sequences declined as unsupported
    pub rejected: u64,
    /// Executable memory allocation failures
    pub allocation_failures: u64,
}

/// Baseline JIT compiler
///
/// Characteristics:
/// - Single pass, no IR
/// - Operates on an unboxed `i64` register file
/// - Lowers `ADD`, `SUB`, `MUL`, `LOAD`, integer `LOADK`, `RET` and `HALT`
/// - Everything else is left to the interpreter
#[derive(Debug, Default)]
pub struct BaselineJIT {
    stats: BaselineStats,
}

impl BaselineJIT {
    /// Create a new baseline JIT compiler
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether native code can run on this target.
    pub fn is_available(&self) -> bool {
        cfg!(all(target_arch = "x86_64", unix))
    }

    /// Compile an instruction sequence to native code
    ///
    /// # Errors
    ///
    /// `JitUnsupported` if the sequence cannot be lowered or the target has
    /// no backend, `JitAllocationFailed` if executable memory cannot be
    /// mapped. Either way the caller should interpret instead.
    ///
    /// # Example
    /// ```
    /// use bytecode_system::{Instruction, Opcode};
    /// use core_types::{Value, REGISTER_COUNT};
    /// use jit_compiler::BaselineJIT;
    ///
    /// let mut jit = BaselineJIT::new();
    /// let code = [
    ///     Instruction::ad(Opcode::LoadK, 1, 0),
    ///     Instruction::abc(Opcode::Mul, 2, 0, 1),
    ///     Instruction::abc(Opcode::Ret, 2, 0, 0),
    /// ];
    /// # if !jit.is_available() { return; }
    /// let compiled = jit.compile(&code, &[Value::Integer(6)]).unwrap();
    ///
    /// let mut registers = [0i64; REGISTER_COUNT];
    /// registers[0] = 7;
    /// assert_eq!(compiled.invoke(&mut registers), 0);
    /// assert_eq!(registers[2], 42);
    /// ```
    pub fn compile(
        &mut self,
        code: &[Instruction],
        constants: &[Value],
    ) -> VmResult<CompiledFunction> {
        if !self.is_available() {
            self.stats.rejected += 1;
            return Err(VmError::jit_unsupported(
                "no native backend for this target",
            ));
        }

        let generated = match CodeGenerator::new().generate(code, constants) {
            Ok(generated) => generated,
            Err(e) => {
                self.stats.rejected += 1;
                debug!(target: "evm::jit", "not compiling: {}", e);
                return Err(e);
            }
        };

        let memory = match ExecutableMemory::from_code(&generated.code_bytes) {
            Ok(memory) => memory,
            Err(e) => {
                self.stats.allocation_failures += 1;
                warn!(target: "evm::jit", "falling back to the interpreter: {}", e);
                return Err(e);
            }
        };

        self.stats.functions_compiled += 1;
        self.stats.total_code_size += generated.code_size();
        debug!(
            target: "evm::jit",
            code_size = generated.code_size(),
            instructions = generated.instructions_lowered,
            inputs = ?generated.inputs,
            "compiled"
        );

        Ok(CompiledFunction::new(
            memory,
            generated.inputs,
            generated.outputs,
            generated.instructions_lowered,
        ))
    }

    /// Compile a chunk's entry code.
    pub fn compile_chunk(&mut self, chunk: &Chunk) -> VmResult<CompiledFunction> {
        self.compile(&chunk.code, &chunk.constants)
    }

    /// Get compilation statistics
    pub fn stats(&self) -> &BaselineStats {
        &self.stats
    }

    /// Reset compilation statistics
    pub fn reset_stats(&mut self) {
        self.stats = BaselineStats::default();
    }
}
