//! Stored-procedure runner
//!
//! Opens one MySQL connection, executes a single parameterless statement
//! (by default `call template.foo`), and prints the single text value it
//! returns.
//!
//! Exit status is 0 with the value on stdout, or 1 with the error on stderr.
//! Logs go to stderr; set `RUST_LOG` for more detail.

mod config;
mod db;
mod dsn;
mod error;
mod registry;
mod runner;

use clap::Parser;
use config::Args;
use std::io::Write;
use std::process::ExitCode;

use error::RunError;
use registry::DriverRegistry;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let outcome = match execute(args).await {
        Ok(value) => emit(&mut std::io::stdout().lock(), &value),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Writes the value as one line. A closed stdout is reported like any other failure.
fn emit(out: &mut impl Write, value: &str) -> Result<(), RunError> {
    writeln!(out, "{value}")
        .and_then(|()| out.flush())
        .map_err(RunError::OutputError)
}

async fn execute(args: Args) -> Result<String, RunError> {
    let settings = config::load(args)?;
    let registry = DriverRegistry::with_defaults();
    runner::run(&registry, &settings).await
}
