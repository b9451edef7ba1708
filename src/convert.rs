//! CBOR to JSON conversion
//!
//! Maps a decoded [`CborItem`] tree onto a [`serde_json::Value`] tree. The
//! mapping is total: every item yields exactly one JSON value, and constructs
//! JSON cannot express (chunked strings, exotic simple values) become fixed
//! placeholder strings instead of errors.
//!
//! # Type mapping
//!
//! | CBOR | JSON |
//! |---|---|
//! | unsigned / negative integer | number (`-1 - m` for negatives) |
//! | definite byte string | `"b"` + uppercase hex |
//! | definite text string | string |
//! | array | array, same order |
//! | map | object, keys from [`Converter::object_key`] |
//! | tag `n` | `{"tag_n": <item>}` |
//! | true / false / null | boolean / null |
//! | float | number |
//!
//! Nesting is walked with an explicit stack, so deeply nested input cannot
//! exhaust the call stack during conversion.

#![allow(clippy::cast_precision_loss)] // Integers beyond 2^53 lose precision by contract

use crate::item::{ByteString, CborItem, FloatCtrl, TextString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::iter::Enumerate;
use std::slice::Iter;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Placeholder for indefinite-length byte strings
pub const UNSUPPORTED_CHUNKED_BYTES: &str = "Unsupported CBOR item: Chunked Bytestring";

/// Placeholder for indefinite-length text strings
pub const UNSUPPORTED_CHUNKED_TEXT: &str = "Unsupported CBOR item: Chunked string";

/// Placeholder for simple values other than true, false and null
pub const UNSUPPORTED_CONTROL: &str = "Unsupported CBOR item: Control value";

/// Default byte ceiling for object keys taken from text strings
pub const DEFAULT_MAX_KEY_LEN: usize = 127;

/// Errors raised by the strict conversion mode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// Two entries of the same map produced the same object key
    #[error("map entry {index} produces duplicate object key {key:?}")]
    KeyCollision {
        /// The colliding key as it would appear in the output
        key: String,
        /// Zero-based index of the later entry within its map
        index: usize,
    },
}

/// What to do when two map entries produce the same object key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum KeyCollisions {
    /// The later entry replaces the earlier value
    #[default]
    LastWins,
    /// Conversion fails with [`ConvertError::KeyCollision`]
    Reject,
}

/// How NaN and infinite floats are represented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NonFiniteFloats {
    /// JSON `null`
    #[default]
    Null,
    /// The strings `"NaN"`, `"Infinity"` and `"-Infinity"`
    String,
}

/// Conversion policy knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Byte ceiling for keys taken from definite text strings; `None` keeps keys whole
    pub max_key_len: Option<usize>,
    /// Handling of duplicate object keys
    pub key_collisions: KeyCollisions,
    /// Handling of NaN and infinities
    pub non_finite: NonFiniteFloats,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_key_len: Some(DEFAULT_MAX_KEY_LEN),
            key_collisions: KeyCollisions::LastWins,
            non_finite: NonFiniteFloats::Null,
        }
    }
}

/// Convert `item` with the default options.
///
/// Never fails: duplicate keys resolve last-write-wins.
#[must_use]
pub fn to_json(item: &CborItem) -> Value {
    match Converter::default().walk::<LastWriteWins>(item) {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// CBOR to JSON converter
#[derive(Debug, Clone, Copy, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    /// Create a converter with the given options
    #[must_use]
    pub const fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    #[must_use]
    pub const fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert `item` into a freshly allocated JSON value.
    ///
    /// # Errors
    ///
    /// Only with [`KeyCollisions::Reject`]: returns
    /// [`ConvertError::KeyCollision`] for the first duplicate key.
    pub fn convert(&self, item: &CborItem) -> Result<Value, ConvertError> {
        debug!(root = %item.major_type(), options = ?self.options, "converting CBOR item");
        match self.options.key_collisions {
            KeyCollisions::LastWins => match self.walk::<LastWriteWins>(item) {
                Ok(value) => Ok(value),
                Err(never) => match never {},
            },
            KeyCollisions::Reject => self.walk::<RejectCollisions>(item),
        }
    }

    /// Object key for the map entry at `index` whose key item is `key`.
    ///
    /// Unsigned integers use their decimal form, definite text strings their
    /// content cut to `max_key_len` bytes, and everything else a
    /// `"Surrogate key <index>"` placeholder.
    #[must_use]
    pub fn object_key(&self, index: usize, key: &CborItem) -> String {
        match key {
            CborItem::Uint(n) => n.to_string(),
            CborItem::Text(TextString::Definite(text)) => {
                let kept = truncate_on_char_boundary(text, self.options.max_key_len);
                if kept.len() < text.len() {
                    warn!(index, len = text.len(), kept = kept.len(), "truncated map key");
                }
                kept.to_owned()
            }
            _ => format!("Surrogate key {index}"),
        }
    }

    fn walk<'a, P: CollisionPolicy>(&self, root: &'a CborItem) -> Result<Value, P::Error> {
        let mut stack: Vec<Frame<'a>> = Vec::new();
        let mut current = root;
        let mut deepest = 0usize;

        loop {
            // Descend until `current` produces a finished value.
            let mut value = loop {
                match self.open(current) {
                    Opened::Leaf(value) => break value,
                    Opened::Container(mut frame) => match self.next_child(&mut frame) {
                        Some(child) => {
                            stack.push(frame);
                            deepest = deepest.max(stack.len());
                            current = child;
                        }
                        None => break frame.finish(),
                    },
                }
            };

            // Hand the value to its parent, closing every parent it completes.
            loop {
                let Some(mut frame) = stack.pop() else {
                    trace!(depth = deepest, "conversion finished");
                    return Ok(value);
                };
                frame.attach::<P>(value)?;
                if let Some(child) = self.next_child(&mut frame) {
                    stack.push(frame);
                    current = child;
                    break;
                }
                value = frame.finish();
            }
        }
    }

    fn open<'a>(&self, item: &'a CborItem) -> Opened<'a> {
        trace!(kind = %item.major_type(), "visiting item");
        let leaf = match item {
            CborItem::Uint(n) => Value::from(*n),
            CborItem::NegInt(magnitude) => negative_integer(*magnitude),
            CborItem::Bytes(ByteString::Definite(bytes)) => {
                Value::String(format!("b{}", hex::encode_upper(bytes)))
            }
            CborItem::Bytes(ByteString::Indefinite(_)) => Value::from(UNSUPPORTED_CHUNKED_BYTES),
            CborItem::Text(TextString::Definite(text)) => Value::String(text.clone()),
            CborItem::Text(TextString::Indefinite(_)) => Value::from(UNSUPPORTED_CHUNKED_TEXT),
            CborItem::FloatCtrl(value) => self.float_ctrl(*value),
            CborItem::Array(items) => {
                return Opened::Container(Frame::Array {
                    rest: items.iter(),
                    out: Vec::with_capacity(items.len()),
                })
            }
            CborItem::Map(pairs) => {
                return Opened::Container(Frame::Map {
                    rest: pairs.iter().enumerate(),
                    out: Map::with_capacity(pairs.len()),
                    key: None,
                })
            }
            CborItem::Tag(number, inner) => {
                return Opened::Container(Frame::Tag {
                    child: Some(inner.as_ref()),
                    key: format!("tag_{number}"),
                    value: None,
                })
            }
        };
        Opened::Leaf(leaf)
    }

    fn next_child<'a>(&self, frame: &mut Frame<'a>) -> Option<&'a CborItem> {
        match frame {
            Frame::Array { rest, .. } => rest.next(),
            Frame::Map { rest, key, .. } => {
                let (index, (key_item, value_item)) = rest.next()?;
                *key = Some(PendingKey {
                    name: self.object_key(index, key_item),
                    index,
                });
                Some(value_item)
            }
            Frame::Tag { child, .. } => child.take(),
        }
    }

    fn float_ctrl(&self, value: FloatCtrl) -> Value {
        match value {
            FloatCtrl::Bool(b) => Value::Bool(b),
            FloatCtrl::Null => Value::Null,
            FloatCtrl::Undefined | FloatCtrl::Simple(_) => Value::from(UNSUPPORTED_CONTROL),
            FloatCtrl::Float(f) if f.is_finite() => Value::from(f),
            FloatCtrl::Float(f) => match self.options.non_finite {
                NonFiniteFloats::Null => Value::Null,
                NonFiniteFloats::String => Value::from(non_finite_name(f)),
            },
        }
    }
}

/// `-1 - magnitude`, exact while it fits an i64.
fn negative_integer(magnitude: u64) -> Value {
    i64::try_from(magnitude).map_or_else(
        |_| Value::from(-1.0 - magnitude as f64),
        |m| Value::from(-1 - m),
    )
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// Longest prefix of `text` within `max` bytes that ends on a char boundary.
fn truncate_on_char_boundary(text: &str, max: Option<usize>) -> &str {
    let Some(max) = max else {
        return text;
    };
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

enum Opened<'a> {
    Leaf(Value),
    Container(Frame<'a>),
}

struct PendingKey {
    name: String,
    index: usize,
}

/// A container whose children are still being converted.
enum Frame<'a> {
    Array {
        rest: Iter<'a, CborItem>,
        out: Vec<Value>,
    },
    Map {
        rest: Enumerate<Iter<'a, (CborItem, CborItem)>>,
        out: Map<String, Value>,
        key: Option<PendingKey>,
    },
    Tag {
        child: Option<&'a CborItem>,
        key: String,
        value: Option<Value>,
    },
}

impl Frame<'_> {
    fn attach<P: CollisionPolicy>(&mut self, value: Value) -> Result<(), P::Error> {
        match self {
            Frame::Array { out, .. } => out.push(value),
            Frame::Map { out, key, .. } => {
                if let Some(PendingKey { name, index }) = key.take() {
                    if out.contains_key(&name) {
                        P::collided(&name, index)?;
                    }
                    let _ = out.insert(name, value);
                }
            }
            Frame::Tag { value: slot, .. } => *slot = Some(value),
        }
        Ok(())
    }

    fn finish(self) -> Value {
        match self {
            Frame::Array { out, .. } => Value::Array(out),
            Frame::Map { out, .. } => Value::Object(out),
            Frame::Tag { key, value, .. } => {
                Value::Object([(key, value.unwrap_or(Value::Null))].into_iter().collect())
            }
        }
    }
}

trait CollisionPolicy {
    type Error;

    fn collided(key: &str, index: usize) -> Result<(), Self::Error>;
}

struct LastWriteWins;

impl CollisionPolicy for LastWriteWins {
    type Error = Infallible;

    fn collided(key: &str, index: usize) -> Result<(), Self::Error> {
        warn!(key, index, "duplicate object key, keeping the later value");
        Ok(())
    }
}

struct RejectCollisions;

impl CollisionPolicy for RejectCollisions {
    type Error = ConvertError;

    fn collided(key: &str, index: usize) -> Result<(), Self::Error> {
        Err(ConvertError::KeyCollision {
            key: key.to_owned(),
            index,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::decode::MAX_DEPTH_LIMIT;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_unsigned_integer() {
        assert_eq!(to_json(&CborItem::Uint(42)), json!(42));
        assert_eq!(to_json(&CborItem::Uint(u64::MAX)), json!(u64::MAX));
    }

    #[test]
    fn test_negative_integer() {
        assert_eq!(to_json(&CborItem::NegInt(0)), json!(-1));
        assert_eq!(to_json(&CborItem::NegInt(99)), json!(-100));
        assert_eq!(
            to_json(&CborItem::NegInt(i64::MAX as u64)),
            json!(i64::MIN)
        );
    }

    #[test]
    fn test_negative_integer_beyond_i64_is_approximate() {
        let value = to_json(&CborItem::NegInt(u64::MAX));
        assert_eq!(value.as_f64(), Some(-18_446_744_073_709_551_616.0));
    }

    #[test]
    fn test_definite_bytes() {
        assert_eq!(to_json(&CborItem::bytes(vec![0x00, 0xFF])), json!("b00FF"));
        assert_eq!(to_json(&CborItem::bytes(vec![0xDE, 0xAD])), json!("bDEAD"));
        assert_eq!(to_json(&CborItem::bytes(Vec::new())), json!("b"));
    }

    #[test]
    fn test_chunked_strings_are_placeholders() {
        let bytes = CborItem::Bytes(ByteString::Indefinite(vec![vec![1], vec![2]]));
        let text = CborItem::Text(TextString::Indefinite(vec!["a".into(), "b".into()]));
        assert_eq!(to_json(&bytes), json!(UNSUPPORTED_CHUNKED_BYTES));
        assert_eq!(to_json(&text), json!(UNSUPPORTED_CHUNKED_TEXT));
    }

    #[test]
    fn test_text() {
        assert_eq!(to_json(&CborItem::text("hi")), json!("hi"));
    }

    #[test]
    fn test_array_keeps_order() {
        let item = CborItem::array(vec![CborItem::Uint(1), CborItem::text("a"), CborItem::bool(true)]);
        assert_eq!(to_json(&item), json!([1, "a", true]));
        assert_eq!(to_json(&CborItem::array(Vec::new())), json!([]));
    }

    #[test]
    fn test_map_with_text_key() {
        let item = CborItem::map(vec![(CborItem::text("k"), CborItem::Uint(1))]);
        assert_eq!(to_json(&item), json!({"k": 1}));
    }

    #[test]
    fn test_map_with_integer_key() {
        let item = CborItem::map(vec![(CborItem::Uint(5), CborItem::bool(true))]);
        assert_eq!(to_json(&item), json!({"5": true}));
    }

    #[test]
    fn test_map_with_surrogate_keys() {
        let item = CborItem::map(vec![
            (CborItem::array(Vec::new()), CborItem::Uint(1)),
            (CborItem::NegInt(0), CborItem::Uint(2)),
            (CborItem::bytes(vec![1]), CborItem::Uint(3)),
            (
                CborItem::Text(TextString::Indefinite(vec!["x".into()])),
                CborItem::Uint(4),
            ),
        ]);
        assert_eq!(
            to_json(&item),
            json!({
                "Surrogate key 0": 1,
                "Surrogate key 1": 2,
                "Surrogate key 2": 3,
                "Surrogate key 3": 4,
            })
        );
    }

    #[test]
    fn test_map_preserves_entry_order() {
        let item = CborItem::map(vec![
            (CborItem::text("z"), CborItem::Uint(1)),
            (CborItem::text("a"), CborItem::Uint(2)),
            (CborItem::Uint(0), CborItem::Uint(3)),
        ]);
        let value = to_json(&item);
        let keys: Vec<&str> = value
            .as_object()
            .into_iter()
            .flat_map(|object| object.keys())
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["z", "a", "0"]);
    }

    #[test]
    fn test_long_key_is_truncated() {
        let long = "k".repeat(200);
        let item = CborItem::map(vec![(CborItem::text(long), CborItem::null())]);
        let value = to_json(&item);
        let key = value.as_object().unwrap().keys().next().unwrap();
        assert_eq!(key.len(), DEFAULT_MAX_KEY_LEN);
    }

    #[test]
    fn test_key_at_limit_is_kept_whole() {
        let converter = Converter::default();
        let at_limit = "k".repeat(DEFAULT_MAX_KEY_LEN);
        assert_eq!(
            converter.object_key(0, &CborItem::text(at_limit.clone())),
            at_limit
        );

        let over_limit = "k".repeat(DEFAULT_MAX_KEY_LEN + 1);
        let key = converter.object_key(0, &CborItem::text(over_limit.clone()));
        assert_eq!(key.len(), 127);
        assert_eq!(key, over_limit[..127]);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 126 ASCII bytes followed by a two byte character straddling the limit
        let text = format!("{}é", "a".repeat(126));
        assert_eq!(truncate_on_char_boundary(&text, Some(127)).len(), 126);
        assert_eq!(truncate_on_char_boundary(&text, None), text);
        assert_eq!(truncate_on_char_boundary("short", Some(127)), "short");
    }

    #[test]
    fn test_unlimited_keys() {
        let long = "k".repeat(200);
        let converter = Converter::new(ConvertOptions {
            max_key_len: None,
            ..ConvertOptions::default()
        });
        assert_eq!(converter.object_key(0, &CborItem::text(long.clone())), long);
    }

    #[test]
    fn test_collision_last_write_wins() {
        let item = CborItem::map(vec![
            (CborItem::text("5"), CborItem::text("first")),
            (CborItem::Uint(7), CborItem::Uint(0)),
            (CborItem::Uint(5), CborItem::text("second")),
        ]);
        let value = to_json(&item);
        assert_eq!(value, json!({"5": "second", "7": 0}));
        assert_eq!(value.as_object().map(Map::len), Some(2));
    }

    #[test]
    fn test_collision_rejected_in_strict_mode() {
        let item = CborItem::map(vec![
            (CborItem::text("5"), CborItem::Uint(1)),
            (CborItem::Uint(5), CborItem::Uint(2)),
        ]);
        let converter = Converter::new(ConvertOptions {
            key_collisions: KeyCollisions::Reject,
            ..ConvertOptions::default()
        });
        assert_eq!(
            converter.convert(&item),
            Err(ConvertError::KeyCollision {
                key: "5".into(),
                index: 1,
            })
        );
    }

    #[test]
    fn test_tag() {
        let item = CborItem::tag(7, CborItem::bool(true));
        assert_eq!(to_json(&item), json!({"tag_7": true}));

        let nested = CborItem::tag(1, CborItem::tag(u64::MAX, CborItem::array(Vec::new())));
        assert_eq!(
            to_json(&nested),
            json!({"tag_1": {"tag_18446744073709551615": []}})
        );
    }

    #[test]
    fn test_control_values() {
        assert_eq!(to_json(&CborItem::bool(false)), json!(false));
        assert_eq!(to_json(&CborItem::null()), Value::Null);
        assert_eq!(
            to_json(&CborItem::FloatCtrl(FloatCtrl::Undefined)),
            json!(UNSUPPORTED_CONTROL)
        );
        assert_eq!(
            to_json(&CborItem::FloatCtrl(FloatCtrl::Simple(99))),
            json!(UNSUPPORTED_CONTROL)
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(to_json(&CborItem::float(1.5)), json!(1.5));
        assert_eq!(to_json(&CborItem::float(f64::NAN)), Value::Null);

        let converter = Converter::new(ConvertOptions {
            non_finite: NonFiniteFloats::String,
            ..ConvertOptions::default()
        });
        let convert = |f: f64| converter.convert(&CborItem::float(f));
        assert_eq!(convert(f64::NAN), Ok(json!("NaN")));
        assert_eq!(convert(f64::INFINITY), Ok(json!("Infinity")));
        assert_eq!(convert(f64::NEG_INFINITY), Ok(json!("-Infinity")));
    }

    #[test]
    fn test_nested_document() {
        let item = CborItem::map(vec![
            (
                CborItem::text("list"),
                CborItem::array(vec![
                    CborItem::map(Vec::new()),
                    CborItem::array(vec![CborItem::NegInt(1)]),
                    CborItem::tag(32, CborItem::text("http://example.com")),
                ]),
            ),
            (CborItem::text("blob"), CborItem::bytes(vec![0x0a])),
        ]);
        assert_eq!(
            to_json(&item),
            json!({
                "list": [{}, [-2], {"tag_32": "http://example.com"}],
                "blob": "b0A",
            })
        );
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        // Deeper trees cannot come out of the decoder, and dropping one
        // recurses once per level.
        const DEPTH: usize = MAX_DEPTH_LIMIT;

        let mut item = CborItem::Uint(1);
        for i in 0..DEPTH {
            item = if i % 2 == 0 {
                CborItem::array(vec![item])
            } else {
                CborItem::tag(0, item)
            };
        }

        let value = to_json(&item);
        let mut depth = 0;
        let mut cursor = &value;
        loop {
            cursor = match cursor {
                Value::Array(items) => &items[0],
                Value::Object(object) => &object["tag_0"],
                _ => break,
            };
            depth += 1;
        }
        assert_eq!(depth, DEPTH);
        assert_eq!(cursor, &json!(1));
    }

    #[test]
    fn test_conversion_is_repeatable() {
        let item = CborItem::map(vec![(CborItem::text("a"), CborItem::array(vec![CborItem::Uint(1)]))]);
        let first = to_json(&item);
        let second = to_json(&item);
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn prop_uint_is_exact(n in any::<u64>()) {
            prop_assert_eq!(to_json(&CborItem::Uint(n)).as_u64(), Some(n));
        }

        #[test]
        fn prop_negint_is_minus_one_minus_magnitude(m in 0..=i64::MAX as u64) {
            let expected = -1 - i128::from(m);
            let actual = to_json(&CborItem::NegInt(m)).as_i64().map(i128::from);
            prop_assert_eq!(actual, Some(expected));
        }

        #[test]
        fn prop_text_round_trips_verbatim(s in ".*") {
            prop_assert_eq!(to_json(&CborItem::text(s.clone())), Value::String(s));
        }

        #[test]
        fn prop_bytes_are_prefixed_uppercase_hex(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let value = to_json(&CborItem::bytes(bytes.clone()));
            let text = value.as_str().unwrap().to_owned();
            prop_assert_eq!(text.len(), 1 + 2 * bytes.len());
            prop_assert!(text.starts_with('b'));
            prop_assert_eq!(hex::decode(&text[1..]).ok(), Some(bytes));
            prop_assert!(!text[1..].chars().any(|c| c.is_ascii_lowercase()));
        }
    }
}
