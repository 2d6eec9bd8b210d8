//! Bytecode interpreter for the register VM
//!
//! This crate provides the virtual machine that executes linked chunks:
//! - 256-register windows per call frame, carved from one arena
//! - A fetch/decode/execute loop over 32-bit instructions
//! - Integer/float arithmetic with promotion, shared with the JIT
//! - Host natives supplied through the VM configuration
//! - Heap allocation rooted at every live register and the constant pool
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Constant, Instruction, Module, Opcode};
//! use interpreter::{OutputBuffer, Vm, VmConfig};
//!
//! let module = Module::new(
//!     vec![Constant::String(b"hello".to_vec())],
//!     vec![
//!         Instruction::ad(Opcode::LoadK, 0, 0),
//!         Instruction::abc(Opcode::Print, 0, 0, 0),
//!         Instruction::abc(Opcode::Halt, 0, 0, 0),
//!     ],
//! );
//!
//! let out = OutputBuffer::new();
//! let mut vm = Vm::with_output(VmConfig::new(), Box::new(out.clone()));
//! vm.load_bytes(&module.to_bytes()).unwrap();
//! vm.run().unwrap();
//! assert_eq!(out.contents(), "hello\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_frame;
pub mod dispatch;
pub mod natives;
pub mod output;
pub mod vm;

// Re-export main types at crate root
pub use call_frame::{CallFrame, FrameCode};
pub use dispatch::{arithmetic, compare};
pub use natives::NativeRegistry;
pub use output::OutputBuffer;
pub use vm::{Vm, VmConfig, DEFAULT_MAX_CALL_DEPTH};
