//! Compiled function handles
//!
//! A [`CompiledFunction`] owns the executable region its code lives in and
//! knows which registers the code reads and writes, so callers can guard the
//! entry and copy results back.

use crate::exec_mem::ExecutableMemory;
use core_types::REGISTER_COUNT;
use std::fmt;

/// Unboxed register file handed to compiled code.
pub type NativeRegisters = [i64; REGISTER_COUNT];

/// Set of register indices.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegisterSet {
    bits: [u64; 4],
}

impl RegisterSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a register; returns false if it was already present.
    pub fn insert(&mut self, register: u8) -> bool {
        let (word, bit) = (register as usize / 64, register % 64);
        let was_set = self.bits[word] & (1 << bit) != 0;
        self.bits[word] |= 1 << bit;
        !was_set
    }

    /// Whether `register` is present
    pub fn contains(&self, register: u8) -> bool {
        self.bits[register as usize / 64] & (1 << (register % 64)) != 0
    }

    /// Number of registers in the set
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// Registers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |r| self.contains(*r))
    }
}

impl FromIterator<u8> for RegisterSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::new();
        for r in iter {
            set.insert(r);
        }
        set
    }
}

impl fmt::Debug for RegisterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Native code for one instruction sequence.
///
/// The code follows `extern "sysv64" fn(*mut i64) -> i32`: it receives the
/// base of an unboxed register file and returns status 0.
pub struct CompiledFunction {
    memory: ExecutableMemory,
    inputs: RegisterSet,
    outputs: RegisterSet,
    instruction_count: usize,
}

impl CompiledFunction {
    pub(crate) fn new(
        memory: ExecutableMemory,
        inputs: RegisterSet,
        outputs: RegisterSet,
        instruction_count: usize,
    ) -> Self {
        Self {
            memory,
            inputs,
            outputs,
            instruction_count,
        }
    }

    /// Registers read before being written; all must hold integers.
    pub fn inputs(&self) -> &RegisterSet {
        &self.inputs
    }

    /// Registers the code writes.
    pub fn outputs(&self) -> &RegisterSet {
        &self.outputs
    }

    /// Machine code size in bytes.
    pub fn code_size(&self) -> usize {
        self.memory.code_len()
    }

    /// The machine code.
    pub fn code(&self) -> &[u8] {
        self.memory.code()
    }

    /// Bytecode instructions lowered, including the terminating `RET`/`HALT`.
    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    /// Run the code over `registers` and return its status.
    #[cfg(target_arch = "x86_64")]
    pub fn invoke(&self, registers: &mut NativeRegisters) -> i32 {
        type Entry = unsafe extern "sysv64" fn(*mut i64) -> i32;
        // SAFETY: the region holds a complete function emitted by the code
        // generator for this calling convention. It only touches slots
        // `[rdi + r*8]` with `r < 256`, all inside `registers`.
        unsafe {
            let entry: Entry = std::mem::transmute::<*const u8, Entry>(self.memory.as_ptr());
            entry(registers.as_mut_ptr())
        }
    }

    /// Run the code over `registers` and return its status.
    #[cfg(not(target_arch = "x86_64"))]
    pub fn invoke(&self, _registers: &mut NativeRegisters) -> i32 {
        -1
    }
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("entry", &self.memory.as_ptr())
            .field("code_size", &self.code_size())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}
