//! Canonical binary codec for consensus types.
//!
//! ```text
//! u8 / u16 / u32 / u64 / i64   fixed width, little endian
//! u128                         16 bytes, little endian
//! varint                       unsigned LEB128, at most 32 bits, minimal form only
//! bool                         one byte, 0 or 1
//! string                       varint byte length ++ utf-8 bytes
//! vec<T>                       varint count ++ items
//! map<K, V>                    varint count ++ (k, v) pairs, keys strictly ascending
//! struct                       fields in declaration order, no framing
//! tagged union                 varint ordinal ++ variant fields
//! ```
//!
//! Packing never fails. Unpacking reports every structural problem as a
//! [`CodecError`], which is the malformed-encoding class of errors.

use bytes::{Buf, BufMut};
use std::collections::BTreeMap;
use thiserror::Error;

/// Decode-time structural failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before the value was complete.
    #[error("unexpected end of input: {needed} more bytes required")]
    InputTooShort {
        /// Number of missing bytes.
        needed: usize,
    },

    /// Exact-length framing left bytes unread.
    #[error("{remaining} trailing bytes after decoded value")]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },

    /// Varint does not fit into 32 bits.
    #[error("varint exceeds 32 bits")]
    VarintOverflow,

    /// Varint carries redundant continuation groups.
    #[error("varint is not minimally encoded")]
    NonCanonicalVarint,

    /// Boolean byte other than 0 or 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// String bytes are not valid UTF-8.
    #[error("string is not valid utf-8")]
    InvalidUtf8,

    /// Bounded string exceeds its capacity.
    #[error("string of {len} bytes exceeds maximum of {max}")]
    StringTooLong {
        /// Decoded length.
        len: usize,
        /// Capacity of the type.
        max: usize,
    },

    /// Map keys out of order or duplicated.
    #[error("map keys are not strictly ascending")]
    UnsortedMapKeys,

    /// Tagged-union ordinal outside the defined range of its family.
    #[error("unknown {family} action type {ordinal}")]
    UnknownActionType {
        /// Action family name.
        family: &'static str,
        /// Ordinal read from the wire.
        ordinal: u32,
    },

    /// Reward curve ordinal outside the defined curves.
    #[error("unknown reward curve {0}")]
    UnknownCurve(u32),

    /// Extension ordinal other than `void`.
    #[error("unknown extension {0}")]
    UnknownExtension(u32),

    /// Asset symbol bits that do not describe a valid symbol.
    #[error("invalid asset symbol: {0}")]
    InvalidAssetSymbol(String),
}

/// A value with a canonical binary encoding.
pub trait Encodable {
    /// Appends the canonical encoding to `out`.
    fn encode(&self, out: &mut dyn BufMut);

    /// Exact number of bytes [`Encodable::encode`] writes.
    fn length(&self) -> usize;
}

/// A value that can be read back from its canonical encoding.
pub trait Decodable: Sized {
    /// Decodes one value from the front of `buf`, advancing it.
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError>;
}

/// Encodes `value` into a freshly allocated vector.
pub fn encode<T: Encodable + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.length());
    value.encode(&mut out);
    out
}

/// Decodes exactly one value from `bytes`, rejecting leftovers.
pub fn decode_exact<T: Decodable>(mut bytes: &[u8]) -> Result<T, CodecError> {
    let value = T::decode(&mut bytes)?;
    if !bytes.is_empty() {
        return Err(CodecError::TrailingBytes { remaining: bytes.len() });
    }
    Ok(value)
}

#[inline]
pub(crate) const fn ensure(buf: &[u8], needed: usize) -> Result<(), CodecError> {
    if buf.len() < needed {
        return Err(CodecError::InputTooShort { needed: needed - buf.len() });
    }
    Ok(())
}

/// Writes `value` as an unsigned LEB128 varint.
pub fn encode_varint(mut value: u32, out: &mut dyn BufMut) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.put_u8(byte);
            return;
        }
        out.put_u8(byte | 0x80);
    }
}

/// Encoded size of `value` as a varint.
pub const fn varint_length(value: u32) -> usize {
    if value < 1 << 7 {
        1
    } else if value < 1 << 14 {
        2
    } else if value < 1 << 21 {
        3
    } else if value < 1 << 28 {
        4
    } else {
        5
    }
}

/// Reads a minimally encoded varint of at most 32 bits.
pub fn decode_varint(buf: &mut &[u8]) -> Result<u32, CodecError> {
    let mut value = 0u64;
    for group in 0..5 {
        ensure(buf, 1)?;
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << (7 * group);
        if byte & 0x80 == 0 {
            if group > 0 && byte == 0 {
                return Err(CodecError::NonCanonicalVarint);
            }
            return u32::try_from(value).map_err(|_| CodecError::VarintOverflow);
        }
    }
    Err(CodecError::VarintOverflow)
}

fn encode_len(len: usize, out: &mut dyn BufMut) {
    encode_varint(len as u32, out);
}

const fn len_length(len: usize) -> usize {
    varint_length(len as u32)
}

/// Reads a length-prefixed string of at most `max` bytes.
pub(crate) fn decode_bounded_string(buf: &mut &[u8], max: usize) -> Result<String, CodecError> {
    let len = decode_varint(buf)? as usize;
    if len > max {
        return Err(CodecError::StringTooLong { len, max });
    }
    ensure(buf, len)?;
    let bytes: &[u8] = *buf;
    let (head, tail) = bytes.split_at(len);
    let value = std::str::from_utf8(head).map_err(|_| CodecError::InvalidUtf8)?.to_owned();
    *buf = tail;
    Ok(value)
}

macro_rules! impl_fixed_width {
    ($($ty:ty => $size:literal, $put:ident, $get:ident;)*) => {
        $(
            impl Encodable for $ty {
                fn encode(&self, out: &mut dyn BufMut) {
                    out.$put(*self);
                }

                fn length(&self) -> usize {
                    $size
                }
            }

            impl Decodable for $ty {
                fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
                    ensure(buf, $size)?;
                    Ok(buf.$get())
                }
            }
        )*
    };
}

impl_fixed_width! {
    u8 => 1, put_u8, get_u8;
    u16 => 2, put_u16_le, get_u16_le;
    u32 => 4, put_u32_le, get_u32_le;
    u64 => 8, put_u64_le, get_u64_le;
    i64 => 8, put_i64_le, get_i64_le;
    u128 => 16, put_u128_le, get_u128_le;
}

impl Encodable for bool {
    fn encode(&self, out: &mut dyn BufMut) {
        out.put_u8(u8::from(*self));
    }

    fn length(&self) -> usize {
        1
    }
}

impl Decodable for bool {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        match u8::decode(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }
}

impl Encodable for str {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_len(self.len(), out);
        out.put_slice(self.as_bytes());
    }

    fn length(&self) -> usize {
        len_length(self.len()) + self.len()
    }
}

impl Encodable for String {
    fn encode(&self, out: &mut dyn BufMut) {
        self.as_str().encode(out);
    }

    fn length(&self) -> usize {
        self.as_str().length()
    }
}

impl Decodable for String {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        decode_bounded_string(buf, usize::MAX)
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_len(self.len(), out);
        for item in self {
            item.encode(out);
        }
    }

    fn length(&self) -> usize {
        len_length(self.len()) + self.iter().map(Encodable::length).sum::<usize>()
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let count = decode_varint(buf)? as usize;
        // every item takes at least one byte
        let mut items = Self::with_capacity(count.min(buf.len()));
        for _ in 0..count {
            items.push(T::decode(buf)?);
        }
        Ok(items)
    }
}

impl<K: Encodable, V: Encodable> Encodable for BTreeMap<K, V> {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_len(self.len(), out);
        for (key, value) in self {
            key.encode(out);
            value.encode(out);
        }
    }

    fn length(&self) -> usize {
        len_length(self.len()) + self.iter().map(|(k, v)| k.length() + v.length()).sum::<usize>()
    }
}

impl<K: Decodable + Ord, V: Decodable> Decodable for BTreeMap<K, V> {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let count = decode_varint(buf)? as usize;
        let mut map = Self::new();
        for _ in 0..count {
            let key = K::decode(buf)?;
            let value = V::decode(buf)?;
            if map.last_key_value().is_some_and(|(last, _)| *last >= key) {
                return Err(CodecError::UnsortedMapKeys);
            }
            map.insert(key, value);
        }
        Ok(map)
    }
}

/// Exclusively owned staging area for a single pack or unpack round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Creates an empty buffer.
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Wraps bytes received from elsewhere.
    pub const fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Staged bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of staged bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Releases the staged bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

/// Resizes `buffer` to the exact encoded length of `value` and writes it.
pub fn pack_to_buffer<T: Encodable + ?Sized>(buffer: &mut Buffer, value: &T) {
    let len = value.length();
    buffer.bytes.clear();
    buffer.bytes.resize(len, 0);
    let mut window: &mut [u8] = &mut buffer.bytes;
    value.encode(&mut window);
    debug_assert!(window.is_empty(), "encoded length disagrees with Encodable::length");
}

/// Decodes a value occupying the whole of `buffer`.
pub fn unpack_from_buffer<T: Decodable>(buffer: &Buffer) -> Result<T, CodecError> {
    decode_exact(buffer.as_slice())
}
