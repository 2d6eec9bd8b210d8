//! Memory Manager - object heap and garbage collection
//!
//! This component provides:
//! - Heap object variants (strings, functions, natives, structs)
//! - An index-based object arena with generation-checked handles
//! - Byte accounting with a doubling collection threshold
//! - Tri-color mark/trace/sweep collection over an explicit gray stack
//!
//! The collector never discovers roots on its own: every allocating call
//! and every explicit collection receives the root set from its caller.
//!
//! # Example
//!
//! ```
//! use core_types::Value;
//! use memory_manager::{GcConfig, Heap};
//!
//! let mut heap = Heap::new(GcConfig::default());
//! let kept = heap.alloc_string(b"kept", &[]).unwrap();
//! let _dropped = heap.alloc_string(b"dropped", &[]).unwrap();
//!
//! let registers = [Value::Object(kept)];
//! let report = heap.collect(&[&registers]);
//! assert_eq!(report.objects_freed, 1);
//! assert!(heap.contains(kept));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gc;
pub mod heap;
pub mod object;

pub use gc::{CollectionReport, MarkColor};
pub use heap::{GcConfig, GcStats, Heap, ObjectHeader, DEFAULT_INITIAL_THRESHOLD};
pub use object::{
    FunctionObject, HeapObject, NativeFn, NativeObject, ObjectKind, StringObject, StructObject,
};
