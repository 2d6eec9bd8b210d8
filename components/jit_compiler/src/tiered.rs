//! Tiered execution
//!
//! Runs a VM's current chunk natively when the entry code compiles and the
//! guard accepts the registers, and through the interpreter otherwise. The
//! interpreter is always the source of truth: a failed compile, a failed
//! guard or a bad native status leaves the registers untouched and runs the
//! chunk from pc 0.

use crate::baseline::{BaselineJIT, BaselineStats};
use crate::cache::{CacheKey, CodeCache};
use crate::deopt::{DeoptReason, Deoptimizer};
use core_types::{ErrorKind, Value, VmError, VmResult};
use interpreter::Vm;
use std::collections::HashSet;
use tracing::debug;

/// How a run was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionTier {
    /// Compiled code ran
    Native,
    /// The interpreter ran
    Interpreted,
}

/// Counters for tiered runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TieredStats {
    /// Runs completed by compiled code
    pub native_runs: u64,
    /// Runs completed by the interpreter
    pub interpreted_runs: u64,
    /// Runs that fell back after compiling
    pub deopts: u64,
}

/// JIT-first executor with interpreter fallback.
#[derive(Debug, Default)]
pub struct TieredExecutor {
    jit: BaselineJIT,
    cache: CodeCache,
    deopt: Deoptimizer,
    rejected: HashSet<CacheKey>,
    stats: TieredStats,
}

impl TieredExecutor {
    /// Create an executor with a default cache and deoptimizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `cache` for compiled code.
    pub fn with_cache(mut self, cache: CodeCache) -> Self {
        self.cache = cache;
        self
    }

    /// Use `deopt` for guards; its limit decides when to stop compiling.
    pub fn with_deoptimizer(mut self, deopt: Deoptimizer) -> Self {
        self.deopt = deopt;
        self
    }

    /// Run the VM's current chunk.
    ///
    /// # Errors
    ///
    /// Whatever the interpreter reports when it runs; JIT failures are
    /// never returned.
    pub fn run(&mut self, vm: &mut Vm) -> VmResult<ExecutionTier> {
        let chunk = vm
            .chunk()
            .ok_or_else(|| VmError::new(ErrorKind::MalformedModule, "no chunk loaded"))?;
        if self.deopt.should_disable_optimization() {
            return Self::interpret(&mut self.stats, vm);
        }

        let key = CacheKey::new(&chunk.code, &chunk.constants);
        if self.rejected.contains(&key) {
            return Self::interpret(&mut self.stats, vm);
        }
        if !self.cache.contains(&key) {
            match self.jit.compile(&chunk.code, &chunk.constants) {
                Ok(compiled) => {
                    self.cache.insert(key.clone(), compiled);
                }
                Err(e) if e.is_jit_fallback() => {
                    // Bounded by the cache capacity.
                    if self.rejected.len() >= self.cache.capacity() {
                        debug!(
                            target: "evm::jit",
                            entries = self.rejected.len(),
                            "forgetting rejected sequences"
                        );
                        self.rejected.clear();
                    }
                    self.rejected.insert(key);
                    return Self::interpret(&mut self.stats, vm);
                }
                Err(e) => return Err(e),
            }
        }

        let Some(compiled) = self.cache.get(&key) else {
            return Self::interpret(&mut self.stats, vm);
        };
        let Some(mut registers) = self.deopt.guard(compiled, vm.registers()) else {
            self.stats.deopts += 1;
            return Self::interpret(&mut self.stats, vm);
        };

        let status = compiled.invoke(&mut registers);
        if status != 0 {
            debug!(target: "evm::jit", status, "native code failed");
            self.deopt.record(DeoptReason::NativeFailure);
            self.stats.deopts += 1;
            return Self::interpret(&mut self.stats, vm);
        }
        let window = vm.registers_mut();
        for register in compiled.outputs().iter() {
            window[register as usize] = Value::Integer(registers[register as usize]);
        }
        self.stats.native_runs += 1;
        Ok(ExecutionTier::Native)
    }

    fn interpret(stats: &mut TieredStats, vm: &mut Vm) -> VmResult<ExecutionTier> {
        vm.run()?;
        stats.interpreted_runs += 1;
        Ok(ExecutionTier::Interpreted)
    }

    /// Release every compiled function.
    pub fn retire_all(&mut self) {
        self.cache.clear();
        self.rejected.clear();
    }

    /// Number of remembered sequences the compiler declined
    pub fn rejected_len(&self) -> usize {
        self.rejected.len()
    }

    /// Run counters
    pub fn stats(&self) -> &TieredStats {
        &self.stats
    }

    /// Compiler statistics
    pub fn jit_stats(&self) -> &BaselineStats {
        self.jit.stats()
    }

    /// The code cache
    pub fn cache(&self) -> &CodeCache {
        &self.cache
    }

    /// The deoptimizer and its history
    pub fn deoptimizer(&self) -> &Deoptimizer {
        &self.deopt
    }
}
