//! Asset symbols and amounts.
//!
//! ```text
//! NAI symbol (4 bytes on the wire)
//!   asset_num = nai_data << 5 | 0x10 | decimals
//!   bit 0x20 (lowest NAI data bit) selects the vesting variant
//!   NAI       = nai_data * 10 + damm_check_digit(nai_data), printed as "@@" + 9 digits
//!
//! Legacy native symbol (8 bytes on the wire)
//!   asset_num = (99_999_999 + n) << 5 | decimals     n = 1 DOLLAR, 2 CORE, 3 VESTS
//!   wire      = decimals | ticker_ascii << 8
//! ```

use crate::{
    codec::{self, CodecError, Decodable, Encodable},
    constants::{ASSET_MAX_DECIMALS, SST_MAX_NAI, SST_MIN_NAI},
};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const PRECISION_BITS: u32 = 4;
const CONTROL_BITS: u32 = 1;
const NAI_SHIFT: u32 = PRECISION_BITS + CONTROL_BITS;

/// Mask of the decimals nibble.
pub const ASSET_NUM_PRECISION_MASK: u32 = 0xF;
/// Bit set on every NAI-space symbol.
pub const ASSET_NUM_CONTROL_MASK: u32 = 0x10;
/// Bit distinguishing the vesting variant of a NAI-space symbol.
pub const ASSET_NUM_VESTING_MASK: u32 = 0x20;

const NAI_DOLLAR: u32 = 1;
const NAI_CORE: u32 = 2;
const NAI_VESTS: u32 = 3;

const PRECISION_DOLLAR: u32 = 3;
const PRECISION_CORE: u32 = 3;
const PRECISION_VESTS: u32 = 6;

const ASSET_NUM_DOLLAR: u32 = ((SST_MAX_NAI + NAI_DOLLAR) << NAI_SHIFT) | PRECISION_DOLLAR;
const ASSET_NUM_CORE: u32 = ((SST_MAX_NAI + NAI_CORE) << NAI_SHIFT) | PRECISION_CORE;
const ASSET_NUM_VESTS: u32 = ((SST_MAX_NAI + NAI_VESTS) << NAI_SHIFT) | PRECISION_VESTS;

const fn legacy_ser(decimals: u32, ticker: &[u8]) -> u64 {
    let mut ser = decimals as u64;
    let mut i = 0;
    while i < ticker.len() {
        ser |= (ticker[i] as u64) << (8 * (i + 1));
        i += 1;
    }
    ser
}

const DOLLAR_SER: u64 = legacy_ser(PRECISION_DOLLAR, b"SBD");
const CORE_SER: u64 = legacy_ser(PRECISION_CORE, b"STEEM");
const VESTS_SER: u64 = legacy_ser(PRECISION_VESTS, b"VESTS");

const DAMM_TABLE: [[u8; 10]; 10] = [
    [0, 3, 1, 7, 5, 9, 8, 6, 4, 2],
    [7, 0, 9, 2, 1, 5, 4, 8, 6, 3],
    [4, 2, 0, 6, 8, 7, 1, 3, 5, 9],
    [1, 7, 5, 0, 9, 8, 3, 4, 2, 6],
    [6, 1, 2, 3, 0, 4, 5, 9, 7, 8],
    [3, 6, 7, 4, 2, 0, 9, 5, 8, 1],
    [5, 8, 6, 9, 7, 2, 0, 1, 3, 4],
    [8, 9, 4, 5, 3, 6, 2, 0, 1, 7],
    [9, 4, 3, 8, 6, 1, 7, 2, 0, 5],
    [2, 5, 8, 1, 4, 3, 6, 7, 9, 0],
];

/// Damm check digit over the eight decimal digits of `value`, most significant first.
pub const fn damm_checksum_8digit(value: u32) -> u8 {
    let mut interim = 0u8;
    let mut divisor = 10_000_000u32;
    while divisor > 0 {
        let digit = (value / divisor) % 10;
        interim = DAMM_TABLE[interim as usize][digit as usize];
        divisor /= 10;
    }
    interim
}

/// Asset symbol parsing and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// NAI string not of the form `@@` followed by nine digits.
    #[error("malformed NAI string {0:?}")]
    MalformedNaiString(String),

    /// NAI check digit does not match its data digits.
    #[error("NAI {nai} has an invalid check digit")]
    InvalidCheckDigit {
        /// The rejected NAI.
        nai: u32,
    },

    /// NAI data outside the assignable range.
    #[error("NAI data {0} is out of range")]
    NaiOutOfRange(u32),

    /// Too many decimal places.
    #[error("{0} decimal places exceed the maximum of 12")]
    TooManyDecimals(u8),

    /// NAI-space symbol without its control bit.
    #[error("asset number {0:#x} is missing the control bit")]
    MissingControlBit(u32),

    /// Legacy-space number that is not one of the native symbols.
    #[error("asset number {0:#x} is not a known native symbol")]
    UnknownLegacySymbol(u32),
}

/// Which numbering space a symbol belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSpace {
    /// The three native symbols.
    Legacy,
    /// Issued tokens identified by a NAI.
    Nai,
}

/// Identifier of an asset together with its decimal precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetSymbol {
    asset_num: u32,
}

impl AssetSymbol {
    /// The native core token.
    pub const CORE: Self = Self::from_asset_num(ASSET_NUM_CORE);
    /// The native dollar-pegged token.
    pub const DOLLAR: Self = Self::from_asset_num(ASSET_NUM_DOLLAR);
    /// Vested core token.
    pub const VESTS: Self = Self::from_asset_num(ASSET_NUM_VESTS);

    /// Symbol with the given raw number, unchecked.
    pub const fn from_asset_num(asset_num: u32) -> Self {
        Self { asset_num }
    }

    /// Raw asset number.
    pub const fn asset_num(self) -> u32 {
        self.asset_num
    }

    /// Symbol from NAI data digits (no check digit) and decimals.
    pub fn from_nai_data(nai_data: u32, decimals: u8) -> Result<Self, AssetError> {
        if !(SST_MIN_NAI..=SST_MAX_NAI).contains(&nai_data) {
            return Err(AssetError::NaiOutOfRange(nai_data));
        }
        if decimals > ASSET_MAX_DECIMALS {
            return Err(AssetError::TooManyDecimals(decimals));
        }
        Ok(Self::from_asset_num(
            (nai_data << NAI_SHIFT) | ASSET_NUM_CONTROL_MASK | u32::from(decimals),
        ))
    }

    /// Symbol from a full NAI (data digits followed by the check digit).
    pub fn from_nai(nai: u32, decimals: u8) -> Result<Self, AssetError> {
        let nai_data = nai / 10;
        if damm_checksum_8digit(nai_data) != (nai % 10) as u8 {
            return Err(AssetError::InvalidCheckDigit { nai });
        }
        Self::from_nai_data(nai_data, decimals)
    }

    /// Parses `@@ddddddddc`.
    pub fn from_nai_string(nai: &str, decimals: u8) -> Result<Self, AssetError> {
        let digits = nai
            .strip_prefix("@@")
            .filter(|d| d.len() == 9 && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| AssetError::MalformedNaiString(nai.to_owned()))?;
        let value =
            digits.parse::<u32>().map_err(|_| AssetError::MalformedNaiString(nai.to_owned()))?;
        match value {
            21 if decimals == PRECISION_CORE as u8 => Ok(Self::CORE),
            13 if decimals == PRECISION_DOLLAR as u8 => Ok(Self::DOLLAR),
            37 if decimals == PRECISION_VESTS as u8 => Ok(Self::VESTS),
            _ => Self::from_nai(value, decimals),
        }
    }

    /// Decimal places.
    pub const fn decimals(self) -> u8 {
        (self.asset_num & ASSET_NUM_PRECISION_MASK) as u8
    }

    /// Numbering space.
    pub const fn space(self) -> SymbolSpace {
        if (self.asset_num >> NAI_SHIFT) > SST_MAX_NAI {
            SymbolSpace::Legacy
        } else {
            SymbolSpace::Nai
        }
    }

    /// NAI data digits; native symbols map to 1, 2 and 3.
    pub const fn nai_data(self) -> u32 {
        let data = self.asset_num >> NAI_SHIFT;
        if data > SST_MAX_NAI { data - SST_MAX_NAI } else { data }
    }

    /// Full NAI including its check digit.
    pub const fn to_nai(self) -> u32 {
        let data = self.nai_data();
        data * 10 + damm_checksum_8digit(data) as u32
    }

    /// `@@` followed by the nine-digit NAI.
    pub fn to_nai_string(self) -> String {
        format!("@@{:09}", self.to_nai())
    }

    /// Whether this is the vesting variant of its token.
    pub const fn is_vesting(self) -> bool {
        match self.space() {
            SymbolSpace::Legacy => self.asset_num == ASSET_NUM_VESTS,
            SymbolSpace::Nai => self.asset_num & ASSET_NUM_VESTING_MASK != 0,
        }
    }

    /// Liquid symbol for a vesting one and the other way round. The dollar
    /// token has no pair and maps to itself.
    pub const fn paired_symbol(self) -> Self {
        match self.space() {
            SymbolSpace::Legacy => match self.asset_num {
                ASSET_NUM_CORE => Self::VESTS,
                ASSET_NUM_VESTS => Self::CORE,
                _ => self,
            },
            SymbolSpace::Nai => Self::from_asset_num(self.asset_num ^ ASSET_NUM_VESTING_MASK),
        }
    }

    /// Vesting variant.
    pub const fn vesting_symbol(self) -> Self {
        if self.is_vesting() { self } else { self.paired_symbol() }
    }

    /// Liquid variant.
    pub const fn liquid_symbol(self) -> Self {
        if self.is_vesting() { self.paired_symbol() } else { self }
    }

    /// Asset number with the decimals nibble cleared.
    pub const fn stripped_precision_num(self) -> u32 {
        self.asset_num & !ASSET_NUM_PRECISION_MASK
    }

    /// Checks the bit layout.
    pub fn validate(self) -> Result<(), AssetError> {
        match self.space() {
            SymbolSpace::Legacy => match self.asset_num {
                ASSET_NUM_CORE | ASSET_NUM_DOLLAR | ASSET_NUM_VESTS => Ok(()),
                other => Err(AssetError::UnknownLegacySymbol(other)),
            },
            SymbolSpace::Nai => {
                let data = self.nai_data();
                if data < SST_MIN_NAI {
                    return Err(AssetError::NaiOutOfRange(data));
                }
                if self.asset_num & ASSET_NUM_CONTROL_MASK == 0 {
                    return Err(AssetError::MissingControlBit(self.asset_num));
                }
                if self.decimals() > ASSET_MAX_DECIMALS {
                    return Err(AssetError::TooManyDecimals(self.decimals()));
                }
                Ok(())
            }
        }
    }

    const fn legacy_ser(self) -> Option<u64> {
        match self.asset_num {
            ASSET_NUM_CORE => Some(CORE_SER),
            ASSET_NUM_DOLLAR => Some(DOLLAR_SER),
            ASSET_NUM_VESTS => Some(VESTS_SER),
            _ => None,
        }
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.asset_num {
            ASSET_NUM_CORE => f.write_str("CORE"),
            ASSET_NUM_DOLLAR => f.write_str("DOLLAR"),
            ASSET_NUM_VESTS => f.write_str("VESTS"),
            _ => write!(f, "{}.{}", self.to_nai_string(), self.decimals()),
        }
    }
}

impl Encodable for AssetSymbol {
    fn encode(&self, out: &mut dyn BufMut) {
        match self.legacy_ser() {
            Some(ser) => out.put_u64_le(ser),
            None => out.put_u32_le(self.asset_num),
        }
    }

    fn length(&self) -> usize {
        if self.legacy_ser().is_some() { 8 } else { 4 }
    }
}

impl Decodable for AssetSymbol {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        codec::ensure(buf, 4)?;
        let low = buf.get_u32_le();
        let legacy = [(CORE_SER, Self::CORE), (DOLLAR_SER, Self::DOLLAR), (VESTS_SER, Self::VESTS)]
            .into_iter()
            .find(|(ser, _)| *ser as u32 == low);

        let symbol = match legacy {
            Some((ser, symbol)) => {
                codec::ensure(buf, 4)?;
                let high = buf.get_u32_le();
                if ((u64::from(high) << 32) | u64::from(low)) != ser {
                    let reason = "invalid legacy asset bits".to_owned();
                    return Err(CodecError::InvalidAssetSymbol(reason));
                }
                symbol
            }
            None => Self::from_asset_num(low),
        };
        symbol.validate().map_err(|err| CodecError::InvalidAssetSymbol(err.to_string()))?;
        Ok(symbol)
    }
}

#[derive(Serialize, Deserialize)]
struct SymbolRepr {
    nai: String,
    precision: u8,
}

impl Serialize for AssetSymbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SymbolRepr { nai: self.to_nai_string(), precision: self.decimals() }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AssetSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = SymbolRepr::deserialize(deserializer)?;
        Self::from_nai_string(&repr.nai, repr.precision).map_err(serde::de::Error::custom)
    }
}

wire_struct! {
    /// An amount of some asset, in the asset's smallest unit.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Asset {
        /// Amount in the smallest unit.
        pub amount: i64,
        /// Denomination.
        pub symbol: AssetSymbol,
    }
}

impl Asset {
    /// Amount of `symbol`.
    pub const fn new(amount: i64, symbol: AssetSymbol) -> Self {
        Self { amount, symbol }
    }

    /// Amount of the core token.
    pub const fn core(amount: i64) -> Self {
        Self::new(amount, AssetSymbol::CORE)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_exact, encode};
    use assert_matches::assert_matches;

    #[test]
    fn test_native_nai_strings() {
        assert_eq!(AssetSymbol::CORE.to_nai_string(), "@@000000021");
        assert_eq!(AssetSymbol::DOLLAR.to_nai_string(), "@@000000013");
        assert_eq!(AssetSymbol::VESTS.to_nai_string(), "@@000000037");
        assert_eq!(AssetSymbol::from_nai_string("@@000000021", 3).unwrap(), AssetSymbol::CORE);
    }

    #[test]
    fn test_legacy_wire_form() {
        let bytes = encode(&AssetSymbol::CORE);
        assert_eq!(bytes, [3, b'S', b'T', b'E', b'E', b'M', 0, 0]);
        assert_eq!(decode_exact::<AssetSymbol>(&bytes).unwrap(), AssetSymbol::CORE);

        let vests = encode(&AssetSymbol::VESTS);
        assert_eq!(vests, [6, b'V', b'E', b'S', b'T', b'S', 0, 0]);

        let mut corrupted = bytes;
        corrupted[6] = 1;
        assert_matches!(
            decode_exact::<AssetSymbol>(&corrupted),
            Err(CodecError::InvalidAssetSymbol(_))
        );
    }

    #[test]
    fn test_nai_symbol_layout() {
        let symbol = AssetSymbol::from_nai_data(10_000_000, 3).unwrap();
        assert_eq!(symbol.asset_num(), (10_000_000 << 5) | 0x10 | 3);
        assert_eq!(symbol.space(), SymbolSpace::Nai);
        assert!(!symbol.is_vesting());
        assert_eq!(symbol.decimals(), 3);

        let vesting = symbol.paired_symbol();
        assert!(vesting.is_vesting());
        assert_eq!(vesting.liquid_symbol(), symbol);
        assert_eq!(symbol.vesting_symbol(), vesting);

        let round = AssetSymbol::from_nai_string(&symbol.to_nai_string(), 3).unwrap();
        assert_eq!(round, symbol);
        assert_eq!(encode(&symbol).len(), 4);
        assert_eq!(decode_exact::<AssetSymbol>(&encode(&symbol)).unwrap(), symbol);
    }

    #[test]
    fn test_bad_check_digit_rejected() {
        let nai = AssetSymbol::from_nai_data(12_345_678, 0).unwrap().to_nai();
        let wrong = nai / 10 * 10 + (nai % 10 + 1) % 10;
        assert_matches!(AssetSymbol::from_nai(wrong, 0), Err(AssetError::InvalidCheckDigit { .. }));
    }

    #[test]
    fn test_decode_rejects_invalid_nai_bits() {
        // control bit missing
        let raw = (10_000_000u32 << 5) | 3;
        assert_matches!(
            decode_exact::<AssetSymbol>(&raw.to_le_bytes()),
            Err(CodecError::InvalidAssetSymbol(_))
        );
        // too many decimals
        let raw = (10_000_000u32 << 5) | 0x10 | 13;
        assert_matches!(
            decode_exact::<AssetSymbol>(&raw.to_le_bytes()),
            Err(CodecError::InvalidAssetSymbol(_))
        );
    }

    #[test]
    fn test_symbol_json_form() {
        let json = serde_json::to_value(AssetSymbol::CORE).unwrap();
        assert_eq!(json, serde_json::json!({ "nai": "@@000000021", "precision": 3 }));
        let back: AssetSymbol = serde_json::from_value(json).unwrap();
        assert_eq!(back, AssetSymbol::CORE);
    }

    #[test]
    fn test_native_pairs() {
        assert_eq!(AssetSymbol::CORE.paired_symbol(), AssetSymbol::VESTS);
        assert_eq!(AssetSymbol::VESTS.liquid_symbol(), AssetSymbol::CORE);
        assert_eq!(AssetSymbol::DOLLAR.paired_symbol(), AssetSymbol::DOLLAR);
    }
}
