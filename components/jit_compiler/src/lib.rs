//! Baseline JIT for the register VM
//!
//! This crate provides:
//! - x86-64 code generation for straight-line integer arithmetic
//! - Executable memory owned by the compiled function that uses it
//! - A bounded code cache with explicit retirement
//! - An entry guard that deoptimizes to the interpreter on non-integer input
//! - A tiered executor that tries native code first
//!
//! Compiled code runs over an unboxed register file of 256 `i64` slots, not
//! over the interpreter's tagged values; the guard is what makes that safe.
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Chunk, Instruction, Opcode};
//! use core_types::Value;
//! use interpreter::{Vm, VmConfig};
//! use jit_compiler::{ExecutionTier, TieredExecutor};
//!
//! let mut vm = Vm::new(VmConfig::new());
//! vm.set_chunk(Chunk::with_code(
//!     vec![
//!         Instruction::ad(Opcode::LoadK, 0, 0),
//!         Instruction::ad(Opcode::LoadK, 1, 1),
//!         Instruction::abc(Opcode::Mul, 2, 0, 1),
//!         Instruction::abc(Opcode::Ret, 2, 0, 0),
//!     ],
//!     vec![Value::Integer(6), Value::Integer(7)],
//! ));
//!
//! let mut tiered = TieredExecutor::new();
//! let tier = tiered.run(&mut vm).unwrap();
//! assert_eq!(vm.register(2), Value::Integer(42));
//! # let _ = tier == ExecutionTier::Native;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod baseline;
pub mod cache;
pub mod codegen;
pub mod compiled_code;
pub mod deopt;
pub mod exec_mem;
pub mod tiered;
pub mod x64;

// Re-export main types at crate root
pub use baseline::{BaselineJIT, BaselineStats};
pub use cache::{CacheKey, CodeCache, DEFAULT_CACHE_CAPACITY};
pub use codegen::{CodeGenerator, CodegenResult};
pub use compiled_code::{CompiledFunction, NativeRegisters, RegisterSet};
pub use deopt::{DeoptInfo, DeoptReason, Deoptimizer};
pub use exec_mem::ExecutableMemory;
pub use tiered::{ExecutionTier, TieredExecutor, TieredStats};
