//! Error types for the CLI

use core_types::VmError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// No module path was given
    #[error("no module file given")]
    MissingFile,

    /// The disassembly listing could not be written
    #[error("could not write disassembly: {0}")]
    Output(#[from] std::io::Error),

    /// Loading or execution failed
    #[error(transparent)]
    Vm(#[from] VmError),

    /// Statistics could not be serialized
    #[error("could not write statistics: {0}")]
    Stats(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
