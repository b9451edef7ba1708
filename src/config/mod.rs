//! Configuration management for cbor2json
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! a TOML config file, and command-line flags.

use crate::convert::{ConvertOptions, KeyCollisions, NonFiniteFloats};
use crate::decode::{DecodeOptions, MAX_DEPTH_LIMIT};
use crate::error::{CliError, Result};
use crate::output::OutputStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod defaults;

pub use defaults::*;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Byte ceiling for map keys taken from text strings
    #[serde(default = "defaults::default_max_key_len")]
    pub max_key_len: usize,

    /// Keep text keys whole regardless of `max_key_len`
    #[serde(default)]
    pub unlimited_keys: bool,

    /// Maximum nesting accepted by the decoder
    #[serde(default = "defaults::default_max_depth")]
    pub max_depth: usize,

    /// Duplicate object key handling
    #[serde(default)]
    pub key_collisions: KeyCollisions,

    /// NaN / infinity handling
    #[serde(default)]
    pub non_finite: NonFiniteFloats,

    /// Indented output
    #[serde(default = "defaults::default_pretty")]
    pub pretty: bool,
}

/// Values supplied on the command line; `None` keeps the lower layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Key ceiling
    pub max_key_len: Option<usize>,
    /// Disable key truncation
    pub unlimited_keys: bool,
    /// Decoder nesting limit
    pub max_depth: Option<usize>,
    /// Reject duplicate keys
    pub strict_keys: bool,
    /// NaN / infinity handling
    pub non_finite: Option<NonFiniteFloats>,
    /// Single-line output
    pub compact: bool,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Tries in order:
    /// 1. `$CBOR2JSON_CONFIG`
    /// 2. `$XDG_CONFIG_HOME/cbor2json/config.toml`
    /// 3. `~/.config/cbor2json/config.toml`
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Self::load_from(Path::new(&path));
        }
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| CliError::InvalidConfig(e.to_string()))?;
        debug!(path = %path.display(), ?config, "loaded config file");
        Ok(config)
    }

    /// Get the path to the default config file
    pub fn config_path() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|path| path.join("cbor2json").join("config.toml"))
    }

    /// Apply command-line values on top of this config
    pub fn merge(&mut self, overrides: &Overrides) {
        if let Some(max_key_len) = overrides.max_key_len {
            self.max_key_len = max_key_len;
            self.unlimited_keys = false;
        }
        if overrides.unlimited_keys {
            self.unlimited_keys = true;
        }
        if let Some(max_depth) = overrides.max_depth {
            self.max_depth = max_depth;
        }
        if overrides.strict_keys {
            self.key_collisions = KeyCollisions::Reject;
        }
        if let Some(non_finite) = overrides.non_finite {
            self.non_finite = non_finite;
        }
        if overrides.compact {
            self.pretty = false;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_key_len == 0 {
            return Err(CliError::InvalidConfig(
                "max_key_len must be greater than 0 (use unlimited_keys to disable truncation)"
                    .to_string(),
            ));
        }

        if self.max_depth == 0 {
            return Err(CliError::InvalidConfig(
                "max_depth must be greater than 0".to_string(),
            ));
        }

        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(CliError::InvalidConfig(format!(
                "max_depth must be at most {MAX_DEPTH_LIMIT}, got {}",
                self.max_depth
            )));
        }

        Ok(())
    }

    /// Converter settings
    #[must_use]
    pub const fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            max_key_len: if self.unlimited_keys {
                None
            } else {
                Some(self.max_key_len)
            },
            key_collisions: self.key_collisions,
            non_finite: self.non_finite,
        }
    }

    /// Decoder settings
    #[must_use]
    pub const fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
        }
    }

    /// Output layout
    #[must_use]
    pub const fn output_style(&self) -> OutputStyle {
        if self.pretty {
            OutputStyle::Pretty
        } else {
            OutputStyle::Compact
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_key_len: default_max_key_len(),
            unlimited_keys: false,
            max_depth: default_max_depth(),
            key_collisions: KeyCollisions::default(),
            non_finite: NonFiniteFloats::default(),
            pretty: default_pretty(),
        }
    }
}
