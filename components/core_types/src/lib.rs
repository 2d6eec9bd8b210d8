//! Core value types and error handling for the Epsilon VM.
//!
//! This crate provides the foundational types shared by every other
//! component: the tagged register value, the handle used to reference heap
//! objects, and the error taxonomy.
//!
//! # Overview
//!
//! - [`Value`] - Tagged register value (integer, float or object handle)
//! - [`ObjectRef`] - Generation-checked handle into the object heap
//! - [`VmError`] - Runtime error with kind, message and program counter
//! - [`ErrorKind`] - Classification of runtime errors
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, Value, VmError};
//!
//! let n = Value::Integer(42);
//! assert!(n.is_truthy());
//! assert_eq!(n.type_name(), "integer");
//!
//! let err = VmError::unknown_opcode(0x7f, 3);
//! assert_eq!(err.kind, ErrorKind::UnknownOpcode);
//! assert_eq!(err.pc, Some(3));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{ErrorKind, VmError, VmResult};
pub use value::{ObjectRef, Value, ValueKind};

/// Number of slots in one register window.
pub const REGISTER_COUNT: usize = 256;

/// Maximum number of entries in a chunk's constant pool.
pub const MAX_CONSTANTS: usize = 256;
