//! Bytecode system for the register VM
//!
//! This crate provides the instruction set, the binary module format and the
//! linked in-memory [`Chunk`] consumed by the interpreter and the JIT.
//!
//! # Features
//!
//! - 32-bit register instructions in ABC and AD formats
//! - Big-endian module codec (decode and encode)
//! - Constant linking against the VM heap
//! - Disassembler for debugging
//!
//! # Example
//!
//! ```
//! use bytecode_system::{load_bytes, Constant, Instruction, Module, Opcode};
//! use core_types::Value;
//! use memory_manager::Heap;
//!
//! let module = Module::new(
//!     vec![Constant::Integer(5), Constant::Integer(7)],
//!     vec![
//!         Instruction::ad(Opcode::LoadK, 0, 0),
//!         Instruction::ad(Opcode::LoadK, 1, 1),
//!         Instruction::abc(Opcode::Add, 2, 0, 1),
//!         Instruction::abc(Opcode::Print, 2, 0, 0),
//!         Instruction::abc(Opcode::Halt, 0, 0, 0),
//!     ],
//! );
//!
//! let mut heap = Heap::default();
//! let chunk = load_bytes(&module.to_bytes(), &mut heap).unwrap();
//! assert_eq!(chunk.constants, vec![Value::Integer(5), Value::Integer(7)]);
//! assert_eq!(chunk.instruction_count(), 5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod disassembler;
pub mod instruction;
pub mod loader;
pub mod module;
pub mod opcode;

// Re-export main types at crate root
pub use chunk::{Chunk, Function};
pub use disassembler::{disassemble, disassemble_instruction};
pub use instruction::Instruction;
pub use loader::{load_bytes, load_file, read_module};
pub use module::{Constant, FunctionProto, Module, FORMAT_VERSION, MAGIC};
pub use opcode::{Opcode, OperandFormat};
