//! The `cbor2json <input> [offset]` pipeline
//!
//! Read file, decode one item, convert it, print it. Every failure is
//! surfaced as a [`CliError`] so `main` can map it to an exit code.

use crate::cli::Cli;
use crate::config::Config;
use crate::convert::Converter;
use crate::decode::decode;
use crate::error::{CliError, Result};
use crate::output::write_json;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// Run the command described by `cli`
///
/// # Errors
///
/// Returns an error if the config is invalid, the input cannot be read or
/// decoded, strict key checking finds a duplicate, or output fails.
pub fn run(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let input = read_input(&cli.input, cli.offset.unwrap_or(0))?;
    let json = convert_bytes(&input, &config)?;

    match &cli.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| CliError::io(path, &e))?;
            write_json(BufWriter::new(file), &json, config.output_style())?;
            info!(path = %path.display(), "wrote JSON output");
        }
        None => write_json(io::stdout().lock(), &json, config.output_style())?,
    }
    Ok(())
}

/// Defaults, then the config file, then flags.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or the result is invalid.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.merge(&cli.overrides());
    config.validate()?;
    Ok(config)
}

/// Read `path` and drop the first `offset` bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is shorter than `offset`.
pub fn read_input(path: &Path, offset: usize) -> Result<Vec<u8>> {
    let mut data = fs::read(path).map_err(|e| CliError::io(path, &e))?;
    if offset > data.len() {
        return Err(CliError::OffsetOutOfRange {
            offset,
            path: path.to_path_buf(),
            len: data.len(),
        });
    }
    debug!(path = %path.display(), len = data.len(), offset, "read input");
    Ok(data.split_off(offset))
}

/// Decode the first CBOR item in `input` and convert it to JSON.
///
/// # Errors
///
/// Returns [`CliError::Decode`] for malformed input and
/// [`CliError::Convert`] when strict key checking finds a duplicate.
pub fn convert_bytes(input: &[u8], config: &Config) -> Result<Value> {
    let decoded = decode(input, &config.decode_options())?;
    if decoded.read < input.len() {
        debug!(
            trailing = input.len() - decoded.read,
            "ignoring bytes after the first data item"
        );
    }
    let json = Converter::new(config.convert_options()).convert(&decoded.item)?;
    Ok(json)
}
