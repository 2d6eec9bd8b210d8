//! `evm` entry point
//!
//! Parses arguments, loads the module file and runs it. Any failure is
//! reported on stderr with exit status 1.

use clap::{CommandFactory, Parser};
use evm_cli::{logging, Cli, CliError, CliResult, Runtime};
use std::process::ExitCode;

fn run(cli: &Cli) -> CliResult<()> {
    let file = cli.file.as_deref().ok_or(CliError::MissingFile)?;
    let mut runtime = Runtime::from_cli(cli);
    let report = runtime.execute_file(file)?;
    if cli.stats {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::MissingFile) => {
            eprintln!("{}", Cli::command().render_usage());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
