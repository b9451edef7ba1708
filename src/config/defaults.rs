//! Default configuration values

use crate::convert::DEFAULT_MAX_KEY_LEN;
use crate::decode::DEFAULT_MAX_DEPTH;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CBOR2JSON_CONFIG";

/// Default byte ceiling for keys taken from text strings
pub const fn default_max_key_len() -> usize {
    DEFAULT_MAX_KEY_LEN
}

/// Default nesting limit for the decoder
pub const fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Pretty printing is on unless asked otherwise
pub const fn default_pretty() -> bool {
    true
}
