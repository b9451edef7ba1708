//! JSON rendering
//!
//! Serializes converted values to text. Formatting is entirely serde_json's;
//! this module only picks the style and terminates the document with a
//! newline.

use crate::error::Result;
use serde_json::Value;
use std::io::Write;

/// Text layout for the rendered JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputStyle {
    /// Indented, one member per line
    #[default]
    Pretty,
    /// Single line, no insignificant whitespace
    Compact,
}

/// Write `value` to `writer` followed by a newline, then flush.
///
/// # Errors
///
/// Returns an error if serialization or the underlying writer fails.
pub fn write_json<W: Write>(mut writer: W, value: &Value, style: OutputStyle) -> Result<()> {
    match style {
        OutputStyle::Pretty => serde_json::to_writer_pretty(&mut writer, value)?,
        OutputStyle::Compact => serde_json::to_writer(&mut writer, value)?,
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Render `value` as a newline-terminated string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(value: &Value, style: OutputStyle) -> Result<String> {
    let mut buffer = Vec::new();
    write_json(&mut buffer, value, style)?;
    String::from_utf8(buffer).map_err(|e| crate::error::CliError::SerializationError(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact() {
        let value = json!({"b": [1, "x"], "a": null});
        assert_eq!(
            render(&value, OutputStyle::Compact).unwrap(),
            "{\"b\":[1,\"x\"],\"a\":null}\n"
        );
    }

    #[test]
    fn test_pretty() {
        let value = json!({"tag_7": true});
        assert_eq!(
            render(&value, OutputStyle::Pretty).unwrap(),
            "{\n  \"tag_7\": true\n}\n"
        );
    }

    #[test]
    fn test_default_is_pretty() {
        assert_eq!(OutputStyle::default(), OutputStyle::Pretty);
    }
}
