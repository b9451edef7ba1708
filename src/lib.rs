#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

//! # cbor2json
//!
//! Converts decoded CBOR data items into JSON values for inspection.
//!
//! ## Architecture
//!
//! - **[`item`]** - The CBOR data item model
//! - **[`convert`]** - CBOR to JSON type mapping
//! - **[`decode`]** - Raw bytes to item model
//! - **[`output`]** - JSON rendering
//! - **[`config`]** - Layered configuration
//! - **[`cli`]** / **[`driver`]** - The command-line tool
//! - **[`error`]** - Error types and exit codes
//!
//! ## Quick Start
//!
//! ```
//! use cbor2json::{to_json, CborItem};
//!
//! let item = CborItem::tag(7, CborItem::bytes(vec![0xde, 0xad]));
//! assert_eq!(to_json(&item), serde_json::json!({"tag_7": "bDEAD"}));
//! ```

pub mod cli;
pub mod config;
pub mod convert;
pub mod decode;
pub mod driver;
pub mod error;
pub mod item;
pub mod output;

/// Error type alias for convenience
pub use error::{CliError, Result};

/// Configuration type alias for convenience
pub use config::Config;

pub use convert::{to_json, ConvertError, ConvertOptions, Converter};
pub use decode::{decode, DecodeError, DecodeFailure, DecodeOptions, Decoded};
pub use item::{ByteString, CborItem, FloatCtrl, MajorType, TextString};
pub use output::OutputStyle;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "cbor2json";
