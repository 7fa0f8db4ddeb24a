//! Primitive consensus types: account names, timestamps and extensions.

use crate::{
    codec::{self, CodecError, Decodable, Encodable},
    constants::MAX_ACCOUNT_NAME_LENGTH,
};
use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a ledger account. Holds at most 16 bytes on the wire; syntax is
/// checked by validation, not by decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Wraps a name without checking its syntax.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name follows account-name syntax.
    pub fn is_valid(&self) -> bool {
        crate::validation::is_valid_account_name(&self.0)
    }
}

impl From<&str> for AccountName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Encodable for AccountName {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.encode(out);
    }

    fn length(&self) -> usize {
        self.0.length()
    }
}

impl Decodable for AccountName {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        codec::decode_bounded_string(buf, MAX_ACCOUNT_NAME_LENGTH).map(Self)
    }
}

/// Seconds since the unix epoch, 32 bits wide.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimePointSec(u32);

impl TimePointSec {
    /// The epoch.
    pub const ZERO: Self = Self(0);

    /// Latest representable instant.
    pub const MAX: Self = Self(u32::MAX);

    /// Instant `secs` seconds after the epoch.
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Seconds since the epoch.
    pub const fn secs(self) -> u32 {
        self.0
    }

    /// Adds seconds, clamping at [`TimePointSec::MAX`].
    pub const fn saturating_add(self, secs: u64) -> Self {
        let sum = self.0 as u64 + secs;
        if sum > u32::MAX as u64 { Self::MAX } else { Self(sum as u32) }
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is later.
    pub const fn saturating_since(self, earlier: Self) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Encodable for TimePointSec {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.encode(out);
    }

    fn length(&self) -> usize {
        4
    }
}

impl Decodable for TimePointSec {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        u32::decode(buf).map(Self)
    }
}

/// Placeholder members of an extension list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureExtension {
    /// The only defined extension.
    Void,
}

/// Extension list carried by extensible actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(Vec<FutureExtension>);

impl Extensions {
    /// Empty list.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Encodable for Extensions {
    fn encode(&self, out: &mut dyn BufMut) {
        codec::encode_varint(self.0.len() as u32, out);
        for _ in &self.0 {
            codec::encode_varint(0, out);
        }
    }

    fn length(&self) -> usize {
        codec::varint_length(self.0.len() as u32) + self.0.len()
    }
}

impl Decodable for Extensions {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let count = codec::decode_varint(buf)? as usize;
        let mut entries = Vec::with_capacity(count.min(buf.len()));
        for _ in 0..count {
            match codec::decode_varint(buf)? {
                0 => entries.push(FutureExtension::Void),
                other => return Err(CodecError::UnknownExtension(other)),
            }
        }
        Ok(Self(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_exact, encode};
    use assert_matches::assert_matches;

    #[test]
    fn test_account_name_capacity() {
        let name = AccountName::from("sixteen-chars-ab");
        assert_eq!(decode_exact::<AccountName>(&encode(&name)).unwrap(), name);

        let long = encode("seventeen-chars-a");
        assert_matches!(
            decode_exact::<AccountName>(&long),
            Err(CodecError::StringTooLong { len: 17, max: 16 })
        );
    }

    #[test]
    fn test_time_point_saturates() {
        let t = TimePointSec::from_secs(u32::MAX - 5);
        assert_eq!(t.saturating_add(10), TimePointSec::MAX);
        assert_eq!(TimePointSec::from_secs(5).saturating_since(TimePointSec::from_secs(9)), 0);
    }

    #[test]
    fn test_extensions_only_void() {
        assert_eq!(encode(&Extensions::new()), vec![0]);
        assert_eq!(decode_exact::<Extensions>(&[2, 0, 0]).unwrap().len(), 2);
        assert_matches!(decode_exact::<Extensions>(&[1, 1]), Err(CodecError::UnknownExtension(1)));
    }
}
