//! Runtime orchestration for module execution
//!
//! The Runtime struct coordinates the components:
//! - The VM, configured from command-line flags
//! - The tiered executor when `--jit` is given
//! - Disassembly and run statistics

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use bytecode_system::disassemble;
use interpreter::{Vm, VmConfig};
use jit_compiler::{ExecutionTier, TieredExecutor};
use memory_manager::GcConfig;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Statistics for one run, printed with `--stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// `native` or `interpreted`
    pub tier: &'static str,
    /// Objects alive after the run
    pub live_objects: usize,
    /// Heap bytes after the run
    pub bytes_allocated: usize,
    /// Collections performed
    pub collections: u64,
    /// Objects reclaimed by all collections
    pub objects_freed: u64,
    /// JIT counters, when the tiered executor ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jit: Option<JitReport>,
}

/// JIT counters for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JitReport {
    /// Sequences compiled to native code
    pub functions_compiled: u64,
    /// Bytes of machine code emitted
    pub total_code_size: usize,
    /// Sequences the compiler declined
    pub rejected: u64,
    /// Guard failures and native fallbacks
    pub deopts: u64,
}

/// Main runtime that orchestrates module execution
pub struct Runtime {
    vm: Vm,
    tiered: Option<TieredExecutor>,
    disassemble: bool,
    listing: Box<dyn Write>,
}

impl Runtime {
    /// Create a runtime around `vm`
    ///
    /// # Example
    /// ```
    /// use evm_cli::Runtime;
    /// use interpreter::{Vm, VmConfig};
    ///
    /// let runtime = Runtime::new(Vm::new(VmConfig::new()), true);
    /// assert!(runtime.is_jit_enabled());
    /// ```
    pub fn new(vm: Vm, enable_jit: bool) -> Self {
        Self {
            vm,
            tiered: enable_jit.then(TieredExecutor::new),
            disassemble: false,
            listing: Box::new(io::stdout()),
        }
    }

    /// Build a runtime from parsed flags, writing to stdout.
    pub fn from_cli(cli: &Cli) -> Self {
        Self::new(Vm::new(vm_config(cli)), cli.jit).with_disassemble(cli.disassemble)
    }

    /// Print a disassembly before each run
    pub fn with_disassemble(mut self, enabled: bool) -> Self {
        self.disassemble = enabled;
        self
    }

    /// Write disassembly listings to `listing` instead of stdout
    pub fn with_listing_output(mut self, listing: Box<dyn Write>) -> Self {
        self.listing = listing;
        self
    }

    /// Check if the tiered executor is used
    pub fn is_jit_enabled(&self) -> bool {
        self.tiered.is_some()
    }

    /// Check if disassembly is printed
    pub fn is_disassemble_enabled(&self) -> bool {
        self.disassemble
    }

    /// The VM
    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// Load and run a module file.
    ///
    /// # Errors
    ///
    /// `CliError::Vm` with kind `Io` if the file cannot be read, or with the
    /// loader's or interpreter's kind otherwise. `CliError::Output` if the
    /// disassembly cannot be written.
    pub fn execute_file(&mut self, path: impl AsRef<Path>) -> CliResult<RunReport> {
        let path = path.as_ref();
        info!(target: "evm::loader", path = %path.display(), "loading module");
        self.vm.load_file(path)?;
        self.execute_loaded()
    }

    /// Load and run module bytes.
    pub fn execute_bytes(&mut self, bytes: &[u8]) -> CliResult<RunReport> {
        self.vm.load_bytes(bytes)?;
        self.execute_loaded()
    }

    fn execute_loaded(&mut self) -> CliResult<RunReport> {
        if self.disassemble {
            if let Some(chunk) = self.vm.chunk() {
                let listing = disassemble(chunk, self.vm.heap());
                self.listing.write_all(listing.as_bytes())?;
                self.listing.flush()?;
            }
        }

        let tier = match self.tiered.as_mut() {
            Some(tiered) => tiered.run(&mut self.vm)?,
            None => {
                self.vm.run()?;
                ExecutionTier::Interpreted
            }
        };
        Ok(self.report(tier))
    }

    fn report(&self, tier: ExecutionTier) -> RunReport {
        let heap = self.vm.heap();
        let gc = heap.stats();
        RunReport {
            tier: match tier {
                ExecutionTier::Native => "native",
                ExecutionTier::Interpreted => "interpreted",
            },
            live_objects: heap.object_count(),
            bytes_allocated: heap.bytes_allocated(),
            collections: gc.collections,
            objects_freed: gc.objects_freed,
            jit: self.tiered.as_ref().map(|tiered| JitReport {
                functions_compiled: tiered.jit_stats().functions_compiled,
                total_code_size: tiered.jit_stats().total_code_size,
                rejected: tiered.jit_stats().rejected,
                deopts: tiered.stats().deopts,
            }),
        }
    }
}

/// VM configuration for the given flags.
pub fn vm_config(cli: &Cli) -> VmConfig {
    let mut gc = GcConfig::default().with_stress(cli.stress_gc);
    if let Some(threshold) = cli.gc_threshold {
        gc = gc.with_initial_threshold(threshold);
    }
    if let Some(limit) = cli.heap_limit {
        gc = gc.with_heap_limit(limit);
    }
    VmConfig::new()
        .with_gc(gc)
        .with_trace_execution(cli.trace)
}
