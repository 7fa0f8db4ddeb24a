use crate::codec::{self, CodecError, Decodable, Encodable};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Reward curve shapes. The discriminant is the wire ordinal.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumCount,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum CurveId {
    /// `w² / (w + c)`.
    Quadratic = 0,
    /// Quadratic, with each payout capped at a fraction of the fund.
    Bounded = 1,
    /// `w`.
    #[default]
    Linear = 2,
    /// `√w`.
    SquareRoot = 3,
    /// Linear, converging against recent claims.
    ConvergentLinear = 4,
    /// Square root, converging against recent claims.
    ConvergentSquareRoot = 5,
}

impl CurveId {
    /// Whether the shape normalizes against the fund's recent claims.
    pub const fn is_convergent(self) -> bool {
        matches!(self, Self::ConvergentLinear | Self::ConvergentSquareRoot)
    }
}

impl TryFrom<u32> for CurveId {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Quadratic,
            1 => Self::Bounded,
            2 => Self::Linear,
            3 => Self::SquareRoot,
            4 => Self::ConvergentLinear,
            5 => Self::ConvergentSquareRoot,
            ordinal => return Err(CodecError::UnknownCurve(ordinal)),
        })
    }
}

impl Encodable for CurveId {
    fn encode(&self, out: &mut dyn BufMut) {
        codec::encode_varint(*self as u32, out);
    }

    fn length(&self) -> usize {
        1
    }
}

impl Decodable for CurveId {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Self::try_from(codec::decode_varint(buf)?)
    }
}
