//! cbor2json - print CBOR data items as JSON
//!
//! Reads one data item from a file (optionally at a byte offset), converts it
//! and writes the JSON to stdout. Diagnostics go to stderr.

use cbor2json::cli::Cli;
use cbor2json::driver;
use console::style;
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

/// Main application entry point
fn run() -> i32 {
    let cli = Cli::parse_args();

    if let Err(err) = init_tracing(cli.verbose) {
        report(&format!("{err:#}"));
        return 1;
    }

    match driver::run(&cli) {
        Ok(()) => 0,
        Err(err) => {
            report(&err.to_string());
            err.exit_code()
        }
    }
}

/// Log to stderr so stdout carries nothing but JSON
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose {
        "cbor2json=debug"
    } else {
        "cbor2json=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

fn report(message: &str) {
    let _ = writeln!(std::io::stderr(), "{} {message}", style("Error:").red().bold());
}
