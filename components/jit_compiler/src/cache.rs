//! Code cache
//!
//! Owns compiled functions, keyed by the instruction words they were
//! compiled from plus the integer immediates baked in by `LOADK`. Dropping
//! an entry (eviction, `retire` or `clear`) unmaps its code.

use crate::compiled_code::CompiledFunction;
use bytecode_system::{Instruction, Opcode};
use core_types::Value;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Default number of compiled functions kept alive.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Identity of a compiled instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    code: Vec<u32>,
    immediates: Vec<Option<i64>>,
}

impl CacheKey {
    /// Key for `code` as compiled against `constants`.
    pub fn new(code: &[Instruction], constants: &[Value]) -> Self {
        let immediates = code
            .iter()
            .filter(|inst| inst.opcode() == Ok(Opcode::LoadK))
            .map(|inst| {
                constants
                    .get(inst.d() as usize)
                    .and_then(Value::as_integer)
            })
            .collect();
        Self {
            code: code.iter().map(|inst| inst.raw()).collect(),
            immediates,
        }
    }
}

/// Bounded cache of compiled functions, evicting the oldest entry.
#[derive(Debug)]
pub struct CodeCache {
    entries: HashMap<CacheKey, CompiledFunction>,
    order: VecDeque<CacheKey>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl CodeCache {
    /// Cache with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Cache holding at most `capacity` functions (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a compiled function.
    pub fn get(&mut self, key: &CacheKey) -> Option<&CompiledFunction> {
        match self.entries.get(key) {
            Some(function) => {
                self.hits += 1;
                Some(function)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Whether `key` has a compiled function
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Install `function`, evicting the oldest entry when full.
    pub fn insert(&mut self, key: CacheKey, function: CompiledFunction) -> &CompiledFunction {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        } else if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                debug!(target: "evm::jit", "evicted oldest compiled function");
            }
        }
        self.order.push_back(key.clone());
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(function);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(function),
        }
    }

    /// Remove and release a compiled function.
    ///
    /// Returns false if there was nothing to retire.
    pub fn retire(&mut self, key: &CacheKey) -> bool {
        self.order.retain(|k| k != key);
        self.entries.remove(key).is_some()
    }

    /// Release every compiled function
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached functions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached functions
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lookups that found a function
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that found nothing
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl Default for CodeCache {
    fn default() -> Self {
        Self::new()
    }
}
