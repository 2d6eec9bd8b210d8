//! Deoptimization support
//!
//! Compiled code assumes every input register holds an integer. The entry
//! guard checks that against the boxed register window and, when it fails,
//! records why so the caller can interpret instead.

use crate::compiled_code::{CompiledFunction, NativeRegisters};
use core_types::{Value, REGISTER_COUNT};
use tracing::warn;

/// Reason for deoptimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeoptReason {
    /// An input register did not hold an integer
    TypeGuardFailure,
    /// Compiled code returned a non-zero status
    NativeFailure,
}

/// Information about a deoptimization event
#[derive(Debug, Clone, PartialEq)]
pub struct DeoptInfo {
    /// Reason for deoptimization
    pub reason: DeoptReason,
    /// Offending register, for guard failures
    pub register: Option<u8>,
    /// Value found there
    pub found: Option<Value>,
}

/// Entry guard and deoptimization history.
#[derive(Debug, Clone)]
pub struct Deoptimizer {
    /// History of deoptimizations
    deopt_history: Vec<DeoptInfo>,
    /// Deoptimizations tolerated before compilation is abandoned
    max_deopt_count: u32,
}

impl Deoptimizer {
    /// Create a new deoptimizer
    pub fn new() -> Self {
        Self::with_max_count(10)
    }

    /// Create deoptimizer with custom max deopt count
    pub fn with_max_count(max_count: u32) -> Self {
        Self {
            deopt_history: Vec::new(),
            max_deopt_count: max_count,
        }
    }

    /// Unbox `registers` for `compiled`, or record a guard failure.
    ///
    /// Every input register must hold an integer. Other registers are
    /// copied when they are integers and zeroed otherwise; compiled code
    /// never reads them before writing.
    pub fn guard(
        &mut self,
        compiled: &CompiledFunction,
        registers: &[Value],
    ) -> Option<Box<NativeRegisters>> {
        for register in compiled.inputs().iter() {
            let value = registers.get(register as usize).copied().unwrap_or_default();
            if !value.is_integer() {
                warn!(
                    target: "evm::jit",
                    register,
                    found = value.type_name(),
                    "type guard failed, deoptimizing"
                );
                self.deopt_history.push(DeoptInfo {
                    reason: DeoptReason::TypeGuardFailure,
                    register: Some(register),
                    found: Some(value),
                });
                return None;
            }
        }

        let mut unboxed = Box::new([0i64; REGISTER_COUNT]);
        for (slot, value) in unboxed.iter_mut().zip(registers) {
            *slot = value.as_integer().unwrap_or(0);
        }
        Some(unboxed)
    }

    /// Record a deoptimization that did not come from the guard.
    ///
    /// Execution always resumes by interpreting the chunk from its start.
    pub fn record(&mut self, reason: DeoptReason) {
        self.deopt_history.push(DeoptInfo {
            reason,
            register: None,
            found: None,
        });
    }

    /// Check if too many deoptimizations have occurred
    pub fn should_disable_optimization(&self) -> bool {
        self.deopt_history.len() as u32 >= self.max_deopt_count
    }

    /// Get the deoptimization count
    pub fn deopt_count(&self) -> usize {
        self.deopt_history.len()
    }

    /// Get deoptimization history
    pub fn history(&self) -> &[DeoptInfo] {
        &self.deopt_history
    }
}

impl Default for Deoptimizer {
    fn default() -> Self {
        Self::new()
    }
}
