//! CBOR data item model
//!
//! A decoded CBOR document as an owned tree, one variant per major type.
//! Unlike serde-oriented value types, the model keeps the definite/indefinite
//! distinction for strings so the converter can treat chunked strings as a
//! separate case.

use std::fmt;

/// A single decoded CBOR data item.
#[derive(Debug, Clone, PartialEq)]
pub enum CborItem {
    /// Major type 0: unsigned integer.
    Uint(u64),
    /// Major type 1: negative integer, stored as magnitude `m` for the value `-1 - m`.
    NegInt(u64),
    /// Major type 2: byte string.
    Bytes(ByteString),
    /// Major type 3: UTF-8 text string.
    Text(TextString),
    /// Major type 4: array (definite or indefinite on the wire).
    Array(Vec<CborItem>),
    /// Major type 5: map of key/value pairs in wire order.
    Map(Vec<(CborItem, CborItem)>),
    /// Major type 6: tag number wrapping exactly one item.
    Tag(u64, Box<CborItem>),
    /// Major type 7: simple values and floats.
    FloatCtrl(FloatCtrl),
}

/// Byte string payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteString {
    /// Length known up front.
    Definite(Vec<u8>),
    /// Chunked; chunks are kept as they appeared on the wire.
    Indefinite(Vec<Vec<u8>>),
}

/// Text string payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextString {
    /// Length known up front.
    Definite(String),
    /// Chunked; chunks are kept as they appeared on the wire.
    Indefinite(Vec<String>),
}

/// Major type 7 payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloatCtrl {
    /// `true` / `false` (simple values 21 / 20)
    Bool(bool),
    /// Simple value 22
    Null,
    /// Simple value 23
    Undefined,
    /// Any other simple value
    Simple(u8),
    /// Half, single or double precision float, widened to f64
    Float(f64),
}

/// CBOR major type of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorType {
    /// Unsigned integer
    Uint,
    /// Negative integer
    NegInt,
    /// Byte string
    Bytes,
    /// Text string
    Text,
    /// Array
    Array,
    /// Map
    Map,
    /// Tag
    Tag,
    /// Simple value or float
    FloatCtrl,
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uint => "uint",
            Self::NegInt => "negint",
            Self::Bytes => "bytestring",
            Self::Text => "string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Tag => "tag",
            Self::FloatCtrl => "float_ctrl",
        };
        f.write_str(name)
    }
}

impl CborItem {
    /// Major type of this item
    #[must_use]
    pub const fn major_type(&self) -> MajorType {
        match self {
            Self::Uint(_) => MajorType::Uint,
            Self::NegInt(_) => MajorType::NegInt,
            Self::Bytes(_) => MajorType::Bytes,
            Self::Text(_) => MajorType::Text,
            Self::Array(_) => MajorType::Array,
            Self::Map(_) => MajorType::Map,
            Self::Tag(..) => MajorType::Tag,
            Self::FloatCtrl(_) => MajorType::FloatCtrl,
        }
    }

    /// Definite text string
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(TextString::Definite(value.into()))
    }

    /// Definite byte string
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(ByteString::Definite(value.into()))
    }

    /// Tag `number` wrapping `item`
    #[must_use]
    pub fn tag(number: u64, item: Self) -> Self {
        Self::Tag(number, Box::new(item))
    }

    /// Array of `items`
    #[must_use]
    pub const fn array(items: Vec<Self>) -> Self {
        Self::Array(items)
    }

    /// Map of `pairs`, in the given order
    #[must_use]
    pub const fn map(pairs: Vec<(Self, Self)>) -> Self {
        Self::Map(pairs)
    }

    /// Boolean simple value
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Self::FloatCtrl(FloatCtrl::Bool(value))
    }

    /// `null`
    #[must_use]
    pub const fn null() -> Self {
        Self::FloatCtrl(FloatCtrl::Null)
    }

    /// Floating point number
    #[must_use]
    pub const fn float(value: f64) -> Self {
        Self::FloatCtrl(FloatCtrl::Float(value))
    }

    /// Integer in CBOR's split representation.
    ///
    /// Values below `-2^64` cannot be expressed by major type 1 and saturate
    /// to the largest magnitude; values above `u64::MAX` saturate likewise.
    #[must_use]
    pub fn integer(value: i128) -> Self {
        if value >= 0 {
            Self::Uint(u64::try_from(value).unwrap_or(u64::MAX))
        } else {
            Self::NegInt(u64::try_from(-1 - value).unwrap_or(u64::MAX))
        }
    }
}

/// Trees produced by ciborium's serde decoder.
///
/// ciborium concatenates chunked strings while decoding, so every string
/// converted this way is definite.
impl From<ciborium::Value> for CborItem {
    fn from(value: ciborium::Value) -> Self {
        use ciborium::Value;

        match value {
            Value::Integer(int) => Self::integer(i128::from(int)),
            Value::Bytes(bytes) => Self::bytes(bytes),
            Value::Float(float) => Self::float(float),
            Value::Text(text) => Self::text(text),
            Value::Bool(b) => Self::bool(b),
            Value::Null => Self::null(),
            Value::Tag(number, inner) => Self::tag(number, Self::from(*inner)),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Map(pairs) => Self::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| (Self::from(k), Self::from(v)))
                    .collect(),
            ),
            _ => Self::FloatCtrl(FloatCtrl::Undefined),
        }
    }
}
