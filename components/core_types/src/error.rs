//! Runtime error taxonomy.
//!
//! Every fallible operation in the VM returns a [`VmError`]. Its
//! [`ErrorKind`] decides how the caller reacts: interpreter errors stop the
//! current program, JIT errors fall back to interpretation.

use std::fmt;
use thiserror::Error;

/// The kind of VM error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad magic, truncated data or an invalid field in a module
    MalformedModule,
    /// `LOADK` referenced a constant past the end of the pool
    ConstantIndexOutOfRange,
    /// The dispatch loop fetched an opcode it does not know
    UnknownOpcode,
    /// The allocator could not satisfy a request
    OutOfMemory,
    /// Executable memory for compiled code could not be obtained
    JitAllocationFailed,
    /// The JIT declined to compile an instruction sequence
    JitUnsupported,
    /// An operand had the wrong variant for the operation
    TypeMismatch,
    /// Integer division by zero
    DivisionByZero,
    /// A `CALL` target could not be resolved
    UndefinedFunction,
    /// The call stack exceeded the configured depth
    StackOverflow,
    /// A register index fell outside its window
    InvalidRegister,
    /// A module file could not be read
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedModule => "MalformedModule",
            ErrorKind::ConstantIndexOutOfRange => "ConstantIndexOutOfRange",
            ErrorKind::UnknownOpcode => "UnknownOpcode",
            ErrorKind::OutOfMemory => "OutOfMemory",
            ErrorKind::JitAllocationFailed => "JitAllocationFailed",
            ErrorKind::JitUnsupported => "JitUnsupported",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::UndefinedFunction => "UndefinedFunction",
            ErrorKind::StackOverflow => "StackOverflow",
            ErrorKind::InvalidRegister => "InvalidRegister",
            ErrorKind::Io => "Io",
        };
        f.write_str(name)
    }
}

/// A VM error with its kind, a human-readable message and, for errors raised
/// while executing, the program counter of the faulting instruction.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, VmError};
///
/// let err = VmError::malformed_module("bad magic 0xDEADBEEF");
/// assert_eq!(err.kind, ErrorKind::MalformedModule);
/// assert_eq!(err.to_string(), "MalformedModule: bad magic 0xDEADBEEF");
///
/// let err = VmError::constant_index_out_of_range(9, 2, 0);
/// assert_eq!(err.to_string(), "ConstantIndexOutOfRange: constant #9 out of range (pool has 2) at pc 0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}{}", pc_suffix(.pc))]
pub struct VmError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Instruction index where the error occurred, if raised during execution
    pub pc: Option<usize>,
}

fn pc_suffix(pc: &Option<usize>) -> String {
    pc.map(|pc| format!(" at pc {}", pc)).unwrap_or_default()
}

/// Result alias used throughout the VM.
pub type VmResult<T> = Result<T, VmError>;

impl VmError {
    /// Create an error without a program counter.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            pc: None,
        }
    }

    /// Attach the program counter of the faulting instruction.
    pub fn at(mut self, pc: usize) -> Self {
        self.pc = Some(pc);
        self
    }

    /// Module bytes could not be decoded.
    pub fn malformed_module(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedModule, message)
    }

    /// `LOADK` index past the end of the constant pool.
    pub fn constant_index_out_of_range(index: usize, len: usize, pc: usize) -> Self {
        Self::new(
            ErrorKind::ConstantIndexOutOfRange,
            format!("constant #{} out of range (pool has {})", index, len),
        )
        .at(pc)
    }

    /// Opcode byte not in the instruction set.
    pub fn unknown_opcode(opcode: u8, pc: usize) -> Self {
        Self::new(
            ErrorKind::UnknownOpcode,
            format!("unknown opcode 0x{:02X}", opcode),
        )
        .at(pc)
    }

    /// Allocation of `requested` bytes failed.
    pub fn out_of_memory(requested: usize, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::OutOfMemory,
            format!("allocation of {} bytes failed: {}", requested, message.into()),
        )
    }

    /// Executable memory could not be mapped.
    pub fn jit_allocation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::JitAllocationFailed, message)
    }

    /// The compiler rejected the instruction sequence.
    pub fn jit_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::JitUnsupported, message)
    }

    /// Operand variant does not fit the operation.
    pub fn type_mismatch(op: &str, lhs: &str, rhs: &str, pc: usize) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("cannot apply {} to {} and {}", op, lhs, rhs),
        )
        .at(pc)
    }

    /// Returns true when the JIT declined or failed and the caller should
    /// interpret instead.
    pub fn is_jit_fallback(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::JitUnsupported | ErrorKind::JitAllocationFailed
        )
    }
}
