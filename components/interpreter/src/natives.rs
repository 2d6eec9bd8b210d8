//! Host function table
//!
//! The table is owned by the VM instance and supplied through
//! [`VmConfig`](crate::VmConfig); there is no process-wide registration.

use core_types::Value;
use memory_manager::NativeFn;
use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch as a float.
pub fn clock(_args: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Value::Float(seconds)
}

/// Name to host function mapping.
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use interpreter::NativeRegistry;
///
/// fn twice(args: &[Value]) -> Value {
///     match args.first() {
///         Some(Value::Integer(n)) => Value::Integer(n * 2),
///         _ => Value::Integer(0),
///     }
/// }
///
/// let mut natives = NativeRegistry::with_defaults();
/// natives.register("twice", twice);
/// assert!(natives.get("clock").is_some());
/// assert_eq!(natives.get("twice").unwrap()(&[Value::Integer(4)]), Value::Integer(8));
/// ```
#[derive(Clone, Default)]
pub struct NativeRegistry {
    functions: HashMap<String, NativeFn>,
}

impl NativeRegistry {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table containing the built-in `clock` native.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("clock", clock);
        registry
    }

    /// Adds or replaces a native.
    pub fn register(&mut self, name: impl Into<String>, function: NativeFn) {
        self.functions.insert(name.into(), function);
    }

    /// Looks up a native by name.
    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.functions.get(name).copied()
    }

    /// Whether a native with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered natives.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
