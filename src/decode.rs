//! Decoding raw CBOR bytes into the item model
//!
//! Uses minicbor's pull decoder so that indefinite-length strings keep their
//! chunks instead of being concatenated. Only the first complete data item of
//! the input is decoded; trailing bytes are left untouched and reported
//! through [`Decoded::read`].

use crate::item::{ByteString, CborItem, FloatCtrl, TextString};
use minicbor::data::Type;
use minicbor::Decoder;
use thiserror::Error;
use tracing::debug;

/// Default nesting limit for arrays, maps and tags
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Highest accepted nesting limit.
///
/// Decoding, serializing and dropping a tree each recurse once per level, so
/// this bounds stack use on the main thread of a debug build.
pub const MAX_DEPTH_LIMIT: usize = 2048;

/// Decoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum nesting of arrays, maps and tags, capped at [`MAX_DEPTH_LIMIT`]
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A successfully decoded data item
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The decoded item
    pub item: CborItem,
    /// Bytes consumed by the item
    pub read: usize,
}

/// Decode failures, each carrying the byte offset it was detected near
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended inside a data item
    #[error("unexpected end of input at byte {position}")]
    UnexpectedEof {
        /// Offset of the item being decoded
        position: usize,
    },

    /// Input is not well-formed CBOR
    #[error("malformed CBOR at byte {position}: {reason}")]
    Malformed {
        /// Offset of the item being decoded
        position: usize,
        /// Decoder diagnostic
        reason: String,
    },

    /// Nesting exceeded [`DecodeOptions::max_depth`]
    #[error("nesting exceeds {limit} levels at byte {position}")]
    DepthExceeded {
        /// Offset of the container that crossed the limit
        position: usize,
        /// Configured limit
        limit: usize,
    },
}

/// A decode error together with how far the decoder got
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error}")]
pub struct DecodeFailure {
    /// What went wrong
    #[source]
    pub error: DecodeError,
    /// Bytes consumed before decoding stopped
    pub read: usize,
}

impl DecodeError {
    /// Byte offset the error was detected near
    #[must_use]
    pub const fn position(&self) -> usize {
        match self {
            Self::UnexpectedEof { position }
            | Self::Malformed { position, .. }
            | Self::DepthExceeded { position, .. } => *position,
        }
    }

    fn at(position: usize) -> impl FnOnce(minicbor::decode::Error) -> Self {
        move |err| {
            if err.is_end_of_input() {
                Self::UnexpectedEof { position }
            } else {
                Self::Malformed {
                    position,
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Decode the first data item in `input`.
///
/// # Errors
///
/// Returns a [`DecodeFailure`] if the input is truncated, malformed, contains
/// invalid UTF-8 in a text string, or nests deeper than allowed.
pub fn decode(input: &[u8], options: &DecodeOptions) -> Result<Decoded, DecodeFailure> {
    let mut reader = ItemReader {
        decoder: Decoder::new(input),
        len: input.len(),
        max_depth: options.max_depth.min(MAX_DEPTH_LIMIT),
    };
    let result = reader.item(0);
    let read = reader.decoder.position();
    let item = result.map_err(|error| DecodeFailure { error, read })?;
    debug!(read, total = input.len(), root = %item.major_type(), "decoded CBOR item");
    Ok(Decoded { item, read })
}

struct ItemReader<'b> {
    decoder: Decoder<'b>,
    len: usize,
    max_depth: usize,
}

impl ItemReader<'_> {
    fn item(&mut self, depth: usize) -> Result<CborItem, DecodeError> {
        let start = self.decoder.position();
        let d = &mut self.decoder;
        let ty = d.datatype().map_err(DecodeError::at(start))?;

        let item = match ty {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 => {
                CborItem::Uint(d.u64().map_err(DecodeError::at(start))?)
            }
            Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::Int => {
                let value = i128::from(d.int().map_err(DecodeError::at(start))?);
                CborItem::integer(value)
            }
            Type::F16 => CborItem::float(f64::from(d.f16().map_err(DecodeError::at(start))?)),
            Type::F32 => CborItem::float(f64::from(d.f32().map_err(DecodeError::at(start))?)),
            Type::F64 => CborItem::float(d.f64().map_err(DecodeError::at(start))?),
            Type::Bool => CborItem::bool(d.bool().map_err(DecodeError::at(start))?),
            Type::Null => {
                d.null().map_err(DecodeError::at(start))?;
                CborItem::null()
            }
            Type::Undefined => {
                d.undefined().map_err(DecodeError::at(start))?;
                CborItem::FloatCtrl(FloatCtrl::Undefined)
            }
            Type::Simple => {
                CborItem::FloatCtrl(simple(d.simple().map_err(DecodeError::at(start))?))
            }
            Type::Bytes => CborItem::bytes(d.bytes().map_err(DecodeError::at(start))?),
            Type::BytesIndef => {
                let mut chunks = Vec::new();
                for chunk in d.bytes_iter().map_err(DecodeError::at(start))? {
                    chunks.push(chunk.map_err(DecodeError::at(start))?.to_vec());
                }
                CborItem::Bytes(ByteString::Indefinite(chunks))
            }
            Type::String => CborItem::text(d.str().map_err(DecodeError::at(start))?),
            Type::StringIndef => {
                let mut chunks = Vec::new();
                for chunk in d.str_iter().map_err(DecodeError::at(start))? {
                    chunks.push(chunk.map_err(DecodeError::at(start))?.to_owned());
                }
                CborItem::Text(TextString::Indefinite(chunks))
            }
            Type::Array | Type::ArrayIndef => {
                self.enter(depth, start)?;
                let len = self.decoder.array().map_err(DecodeError::at(start))?;
                let mut items = Vec::with_capacity(self.capacity_hint(len));
                match len {
                    Some(n) => {
                        for _ in 0..n {
                            items.push(self.item(depth + 1)?);
                        }
                    }
                    None => {
                        while !self.at_break()? {
                            items.push(self.item(depth + 1)?);
                        }
                    }
                }
                CborItem::Array(items)
            }
            Type::Map | Type::MapIndef => {
                self.enter(depth, start)?;
                let len = self.decoder.map().map_err(DecodeError::at(start))?;
                let mut pairs = Vec::with_capacity(self.capacity_hint(len));
                match len {
                    Some(n) => {
                        for _ in 0..n {
                            let key = self.item(depth + 1)?;
                            pairs.push((key, self.item(depth + 1)?));
                        }
                    }
                    None => {
                        while !self.at_break()? {
                            let key = self.item(depth + 1)?;
                            pairs.push((key, self.item(depth + 1)?));
                        }
                    }
                }
                CborItem::Map(pairs)
            }
            Type::Tag => {
                self.enter(depth, start)?;
                let tag = self.decoder.tag().map_err(DecodeError::at(start))?;
                CborItem::tag(u64::from(&tag), self.item(depth + 1)?)
            }
            Type::Break => {
                return Err(DecodeError::Malformed {
                    position: start,
                    reason: "unexpected break".to_string(),
                })
            }
            Type::Unknown(byte) => {
                return Err(DecodeError::Malformed {
                    position: start,
                    reason: format!("unknown initial byte 0x{byte:02x}"),
                })
            }
        };

        Ok(item)
    }

    const fn enter(&self, depth: usize, position: usize) -> Result<(), DecodeError> {
        if depth >= self.max_depth {
            return Err(DecodeError::DepthExceeded {
                position,
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    /// Consumes the break marker of an indefinite container if it is next.
    fn at_break(&mut self) -> Result<bool, DecodeError> {
        let position = self.decoder.position();
        let ty = self.decoder.datatype().map_err(DecodeError::at(position))?;
        if ty == Type::Break {
            self.decoder.set_position(position + 1);
            return Ok(true);
        }
        Ok(false)
    }

    /// Declared lengths are untrusted; never reserve more slots than bytes left.
    fn capacity_hint(&self, declared: Option<u64>) -> usize {
        let remaining = self.len.saturating_sub(self.decoder.position());
        declared
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
            .min(remaining)
    }
}

const fn simple(value: u8) -> FloatCtrl {
    match value {
        20 => FloatCtrl::Bool(false),
        21 => FloatCtrl::Bool(true),
        22 => FloatCtrl::Null,
        23 => FloatCtrl::Undefined,
        other => FloatCtrl::Simple(other),
    }
}
