//! Command-line arguments

use clap::Parser;

/// Run a compiled bytecode module.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "evm", version, about = "Register bytecode VM")]
pub struct Cli {
    /// Module file to execute
    pub file: Option<String>,

    /// Try native code before interpreting
    #[arg(long)]
    pub jit: bool,

    /// Print a disassembly of the module before running it
    #[arg(short, long)]
    pub disassemble: bool,

    /// Collect garbage on every growing allocation
    #[arg(long)]
    pub stress_gc: bool,

    /// Bytes allocated before the first collection
    #[arg(long, value_name = "BYTES")]
    pub gc_threshold: Option<usize>,

    /// Hard limit on heap bytes
    #[arg(long, value_name = "BYTES")]
    pub heap_limit: Option<usize>,

    /// Log filter, e.g. `debug` or `evm::gc=trace` (overrides RUST_LOG)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Trace every dispatched instruction (needs `evm::vm=trace`)
    #[arg(long)]
    pub trace: bool,

    /// Print run statistics as JSON to stderr
    #[arg(long)]
    pub stats: bool,
}
