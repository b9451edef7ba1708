//! Command-line interface argument parsing
//!
//! Defines the `cbor2json <input> [offset]` surface using Clap.

use crate::config::Overrides;
use crate::convert::NonFiniteFloats;
use clap::Parser;
use std::path::PathBuf;

/// cbor2json - print a CBOR data item as JSON
#[derive(Parser, Debug)]
#[command(name = "cbor2json")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reads a CBOR data item from a file and prints it as JSON")]
#[command(long_about = concat!(
    "cbor2json (v", env!("CARGO_PKG_VERSION"), ")\n",
    "Reads one CBOR data item from a file, optionally starting at a byte offset,\n",
    "and prints it as JSON.\n\n",
    "Types JSON cannot express are mapped lossily: byte strings become \"b<HEX>\",\n",
    "tags become {\"tag_<n>\": ...} and non-string map keys get surrogate names."
))]
pub struct Cli {
    /// CBOR input file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Byte offset of the data item (decimal, 0x-prefixed hex or 0-prefixed octal)
    #[arg(value_name = "OFFSET", value_parser = parse_offset)]
    pub offset: Option<usize>,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file (defaults to ~/.config/cbor2json/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write JSON to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print JSON on a single line
    #[arg(long)]
    pub compact: bool,

    /// Truncate text map keys to this many bytes
    #[arg(long, value_name = "BYTES", conflicts_with = "no_key_limit")]
    pub max_key_len: Option<usize>,

    /// Never truncate text map keys
    #[arg(long)]
    pub no_key_limit: bool,

    /// Fail instead of overwriting when two map entries produce the same key
    #[arg(long)]
    pub strict_keys: bool,

    /// Representation of NaN and infinite floats
    #[arg(long, value_enum, value_name = "MODE")]
    pub non_finite: Option<NonFiniteFloats>,

    /// Maximum nesting of arrays, maps and tags
    #[arg(long, value_name = "LEVELS")]
    pub max_depth: Option<usize>,
}

impl Cli {
    /// Parse command-line arguments
    ///
    /// # Returns
    ///
    /// Parsed CLI arguments
    #[must_use]
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Config values set by flags
    #[must_use]
    pub const fn overrides(&self) -> Overrides {
        Overrides {
            max_key_len: self.max_key_len,
            unlimited_keys: self.no_key_limit,
            max_depth: self.max_depth,
            strict_keys: self.strict_keys,
            non_finite: self.non_finite,
            compact: self.compact,
        }
    }
}

/// Parse an offset the way `strtoull(s, NULL, 0)` reads it.
///
/// # Errors
///
/// Returns a message if `s` is not a number in any of the accepted bases.
pub fn parse_offset(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    usize::from_str_radix(digits, radix).map_err(|e| format!("invalid offset '{s}': {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("0"), Ok(0));
        assert_eq!(parse_offset("42"), Ok(42));
        assert_eq!(parse_offset("0x10"), Ok(16));
        assert_eq!(parse_offset("0XfF"), Ok(255));
        assert_eq!(parse_offset("010"), Ok(8));
        assert!(parse_offset("").is_err());
        assert!(parse_offset("-1").is_err());
        assert!(parse_offset("09").is_err());
        assert!(parse_offset("0x").is_err());
    }

    #[test]
    fn test_parse_positional_and_flags() {
        let cli = Cli::try_parse_from([
            "cbor2json",
            "data.cbor",
            "0x4",
            "--compact",
            "--strict-keys",
            "--non-finite",
            "string",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("data.cbor"));
        assert_eq!(cli.offset, Some(4));
        let overrides = cli.overrides();
        assert!(overrides.compact);
        assert!(overrides.strict_keys);
        assert_eq!(overrides.non_finite, Some(NonFiniteFloats::String));
    }

    #[test]
    fn test_key_limit_flags_conflict() {
        let cli = Cli::try_parse_from([
            "cbor2json",
            "data.cbor",
            "--max-key-len",
            "4",
            "--no-key-limit",
        ]);
        assert!(cli.is_err());
    }
}
