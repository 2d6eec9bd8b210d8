//! Register value representation.
//!
//! A [`Value`] is a Rust enum, so the tag always matches the live payload:
//! reading the wrong variant is impossible without going through a match.

use std::fmt;

/// Handle to an object living in the VM heap.
///
/// Handles are plain indices into the heap's slot arena paired with the
/// generation of the slot at allocation time. A handle whose generation no
/// longer matches its slot refers to an object that has been swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    index: u32,
    generation: u32,
}

impl ObjectRef {
    /// Create a handle from a slot index and generation.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the heap arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

/// Discriminant of a [`Value`], used by guards and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 64-bit signed integer
    Integer,
    /// 64-bit IEEE float
    Float,
    /// Reference to a heap object
    Object,
}

/// A register or constant-pool value.
///
/// # Examples
///
/// ```
/// use core_types::{Value, ValueKind};
///
/// let zero = Value::default();
/// assert_eq!(zero, Value::Integer(0));
/// assert!(!zero.is_truthy());
///
/// let f = Value::Float(2.5);
/// assert_eq!(f.kind(), ValueKind::Float);
/// assert_eq!(f.as_number(), Some(2.5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit IEEE-754 float
    Float(f64),
    /// Reference into the object heap
    Object(ObjectRef),
}

impl Default for Value {
    fn default() -> Self {
        Value::Integer(0)
    }
}

impl Value {
    /// Returns the discriminant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Truthiness used by conditional jumps.
    ///
    /// Integer zero and float zero are falsy; every object reference is
    /// truthy. NaN compares unequal to zero and is therefore truthy.
    ///
    /// ```
    /// use core_types::{ObjectRef, Value};
    ///
    /// assert!(Value::Integer(3).is_truthy());
    /// assert!(!Value::Integer(0).is_truthy());
    /// assert!(!Value::Float(0.0).is_truthy());
    /// assert!(!Value::Float(-0.0).is_truthy());
    /// assert!(Value::Object(ObjectRef::new(0, 0)).is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Object(_) => true,
        }
    }

    /// Lower-case name of the variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Object(_) => "object",
        }
    }

    /// Returns the integer payload, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float payload, if this is a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the object handle, if this is an object reference.
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(r) => Some(*r),
            _ => None,
        }
    }

    /// Numeric view with integer-to-float promotion.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Object(_) => None,
        }
    }

    /// Whether this value is an integer.
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<ObjectRef> for Value {
    fn from(r: ObjectRef) -> Self {
        Value::Object(r)
    }
}
