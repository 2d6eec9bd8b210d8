//! Heap object representation
//!
//! Every object allocated by the VM is one of the [`HeapObject`] variants.
//! Only [`StructObject`] owns nested values; the other variants are leaves
//! as far as the collector is concerned.

use core_types::{ObjectRef, Value};
use std::fmt;
use std::mem::size_of;

/// Host function callable from bytecode. Receives the argument registers.
pub type NativeFn = fn(&[Value]) -> Value;

/// Type discriminant stored in every object header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Immutable byte string
    String,
    /// Bytecode function from the chunk's function table
    Function,
    /// Host-provided function
    Native,
    /// Composite object with value fields
    Struct,
}

/// Immutable byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringObject {
    bytes: Box<[u8]>,
}

impl StringObject {
    /// Wrap an owned byte buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Raw bytes of the string.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// UTF-8 view, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Reference to a function in a chunk's function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionObject {
    /// Identity of the chunk whose table `function_index` refers to
    pub chunk_id: u64,
    /// Index into the chunk's function table
    pub function_index: usize,
    /// Declared argument count
    pub arity: u8,
    /// Debug name
    pub name: String,
}

/// Host function with a debug name.
#[derive(Clone)]
pub struct NativeObject {
    /// The host function
    pub function: NativeFn,
    /// Debug name
    pub name: String,
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Composite object whose fields are traced by the collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructObject {
    /// Field values
    pub fields: Vec<Value>,
}

/// A heap-allocated object.
#[derive(Debug, Clone)]
pub enum HeapObject {
    /// Byte string
    String(StringObject),
    /// Bytecode function reference
    Function(FunctionObject),
    /// Host function
    Native(NativeObject),
    /// Composite object
    Struct(StructObject),
}

impl HeapObject {
    /// Returns the type discriminant.
    pub fn kind(&self) -> ObjectKind {
        match self {
            HeapObject::String(_) => ObjectKind::String,
            HeapObject::Function(_) => ObjectKind::Function,
            HeapObject::Native(_) => ObjectKind::Native,
            HeapObject::Struct(_) => ObjectKind::Struct,
        }
    }

    /// Bytes charged against the heap for this object, including owned
    /// buffers.
    pub fn size_in_bytes(&self) -> usize {
        let owned = match self {
            HeapObject::String(s) => s.len(),
            HeapObject::Function(f) => f.name.len(),
            HeapObject::Native(n) => n.name.len(),
            HeapObject::Struct(s) => s.fields.len() * size_of::<Value>(),
        };
        size_of::<HeapObject>() + owned
    }

    /// Visit every object handle this object holds.
    pub fn for_each_reference(&self, mut visit: impl FnMut(ObjectRef)) {
        if let HeapObject::Struct(s) = self {
            for field in &s.fields {
                if let Value::Object(r) = field {
                    visit(*r);
                }
            }
        }
    }

    /// Returns the string payload, if this is a string.
    pub fn as_string(&self) -> Option<&StringObject> {
        match self {
            HeapObject::String(s) => Some(s),
            _ => None,
        }
    }
}
