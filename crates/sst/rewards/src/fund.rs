//! Per-fund accounting context.

use crate::curve::mul_div;
use bytes::BufMut;
use serde::{Deserialize, Serialize};
use sst_protocol::{
    codec::{CodecError, Decodable, Encodable},
    constants::{CONTENT_CONSTANT, SST_DEFAULT_PERCENT_CURATION_REWARDS},
    schema::{FieldSchema, Reflect},
    Asset, CurveId, TimePointSec,
};
use std::fmt;

/// Identifier of a reward fund.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FundId(pub u16);

impl fmt::Display for FundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Encodable for FundId {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.encode(out);
    }

    fn length(&self) -> usize {
        2
    }
}

impl Decodable for FundId {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        u16::decode(buf).map(Self)
    }
}

/// State of one reward fund, carried across maintenance intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardFundContext {
    /// Fund identifier.
    pub id: FundId,
    /// Decaying total of shaped claim weight.
    pub recent_claims: u128,
    /// Tokens available for payout.
    pub reward_balance: Asset,
    /// Time of the last settlement.
    pub last_update: TimePointSec,
    /// Tokens paid out over the fund's lifetime.
    pub tokens_awarded: i64,
    /// Shape applied to author weight.
    pub author_reward_curve: CurveId,
    /// Shape applied to curator weight.
    pub curation_reward_curve: CurveId,
    /// Curvature parameter of the quadratic shapes.
    pub content_constant: u128,
    /// Curators' share of each payout, in basis points.
    pub percent_curation_rewards: u16,
}

impl RewardFundContext {
    /// Empty fund paying out in `reward_balance.symbol`.
    pub const fn new(id: FundId, reward_balance: Asset, last_update: TimePointSec) -> Self {
        Self {
            id,
            recent_claims: 0,
            reward_balance,
            last_update,
            tokens_awarded: 0,
            author_reward_curve: CurveId::Linear,
            curation_reward_curve: CurveId::Linear,
            content_constant: CONTENT_CONSTANT,
            percent_curation_rewards: SST_DEFAULT_PERCENT_CURATION_REWARDS,
        }
    }

    /// Decays `recent_claims` for the time elapsed since the last update and
    /// stamps `now`.
    pub fn decay(&mut self, now: TimePointSec, window_seconds: u32) {
        let elapsed = now.saturating_since(self.last_update);
        self.recent_claims = decay_recent_claims(self.recent_claims, elapsed, window_seconds);
        self.last_update = now;
    }

    /// Whether either curve normalizes against recent claims.
    pub const fn is_convergent(&self) -> bool {
        self.author_reward_curve.is_convergent() || self.curation_reward_curve.is_convergent()
    }

    /// Starts a convergent fund without history at `seed` recent claims.
    /// Returns whether the fund was seeded.
    pub fn seed_recent_claims(&mut self, seed: u128) -> bool {
        if self.recent_claims != 0 || !self.is_convergent() {
            return false;
        }
        self.recent_claims = seed;
        true
    }
}

/// Recent claims left after `elapsed` seconds of decay.
///
/// ```text
/// recent' = recent - recent * min(elapsed, window) / window
/// ```
///
/// A zero window clears the history.
pub fn decay_recent_claims(recent: u128, elapsed: u32, window: u32) -> u128 {
    if window == 0 {
        return 0;
    }
    let elapsed = u128::from(elapsed.min(window));
    recent - mul_div(recent, elapsed, u128::from(window))
}

impl Encodable for RewardFundContext {
    fn encode(&self, out: &mut dyn BufMut) {
        self.id.encode(out);
        self.recent_claims.encode(out);
        self.reward_balance.encode(out);
        self.last_update.encode(out);
        self.tokens_awarded.encode(out);
        self.author_reward_curve.encode(out);
        self.curation_reward_curve.encode(out);
        self.content_constant.encode(out);
        self.percent_curation_rewards.encode(out);
    }

    fn length(&self) -> usize {
        self.id.length()
            + self.recent_claims.length()
            + self.reward_balance.length()
            + self.last_update.length()
            + self.tokens_awarded.length()
            + self.author_reward_curve.length()
            + self.curation_reward_curve.length()
            + self.content_constant.length()
            + self.percent_curation_rewards.length()
    }
}

impl Decodable for RewardFundContext {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            id: Decodable::decode(buf)?,
            recent_claims: Decodable::decode(buf)?,
            reward_balance: Decodable::decode(buf)?,
            last_update: Decodable::decode(buf)?,
            tokens_awarded: Decodable::decode(buf)?,
            author_reward_curve: Decodable::decode(buf)?,
            curation_reward_curve: Decodable::decode(buf)?,
            content_constant: Decodable::decode(buf)?,
            percent_curation_rewards: Decodable::decode(buf)?,
        })
    }
}

impl Reflect for RewardFundContext {
    const NAME: &'static str = "RewardFundContext";
    const FIELDS: &'static [FieldSchema] = &[
        FieldSchema { name: "id", type_name: "FundId" },
        FieldSchema { name: "recent_claims", type_name: "u128" },
        FieldSchema { name: "reward_balance", type_name: "Asset" },
        FieldSchema { name: "last_update", type_name: "TimePointSec" },
        FieldSchema { name: "tokens_awarded", type_name: "i64" },
        FieldSchema { name: "author_reward_curve", type_name: "CurveId" },
        FieldSchema { name: "curation_reward_curve", type_name: "CurveId" },
        FieldSchema { name: "content_constant", type_name: "u128" },
        FieldSchema { name: "percent_curation_rewards", type_name: "u16" },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use sst_protocol::{decode_exact, encode};

    const WINDOW: u32 = 1_296_000;

    #[test]
    fn test_decay_is_proportional_to_elapsed_time() {
        assert_eq!(decay_recent_claims(1_000, WINDOW / 2, WINDOW), 500);
        assert_eq!(decay_recent_claims(1_000, 0, WINDOW), 1_000);
        // one hour of a fifteen day window, truncated
        assert_eq!(decay_recent_claims(1_000_000, 3_600, WINDOW), 997_223);
        // elapsed beyond the window saturates
        assert_eq!(decay_recent_claims(1_000, WINDOW * 3, WINDOW), 0);
        assert_eq!(decay_recent_claims(7, 5, 0), 0);
    }

    #[test]
    fn test_decay_stamps_time() {
        let mut fund =
            RewardFundContext::new(FundId(0), Asset::core(100), TimePointSec::from_secs(10));
        fund.recent_claims = 1_000;
        fund.decay(TimePointSec::from_secs(10 + WINDOW / 10), WINDOW);
        assert_eq!(fund.recent_claims, 900);
        assert_eq!(fund.last_update.secs(), 10 + WINDOW / 10);

        // clock running backwards is treated as no elapsed time
        fund.decay(TimePointSec::from_secs(5), WINDOW);
        assert_eq!(fund.recent_claims, 900);
    }

    #[test]
    fn test_seed_only_fresh_convergent_funds() {
        let mut fund = RewardFundContext::new(FundId(0), Asset::core(100), TimePointSec::ZERO);
        assert!(!fund.seed_recent_claims(5));
        assert_eq!(fund.recent_claims, 0);

        fund.curation_reward_curve = CurveId::ConvergentSquareRoot;
        assert!(fund.is_convergent());
        assert!(fund.seed_recent_claims(5));
        assert_eq!(fund.recent_claims, 5);
        // existing history is kept
        assert!(!fund.seed_recent_claims(9));
        assert_eq!(fund.recent_claims, 5);
    }

    #[test]
    fn test_context_codec_and_schema() {
        let mut fund =
            RewardFundContext::new(FundId(3), Asset::core(42), TimePointSec::from_secs(99));
        fund.recent_claims = u128::MAX - 1;
        fund.author_reward_curve = CurveId::ConvergentSquareRoot;
        let bytes = encode(&fund);
        assert_eq!(bytes.len(), 2 + 16 + 16 + 4 + 8 + 1 + 1 + 16 + 2);
        assert_eq!(decode_exact::<RewardFundContext>(&bytes).unwrap(), fund);
        assert_eq!(RewardFundContext::FIELDS.len(), 9);
        assert_eq!(RewardFundContext::FIELDS[1].name, "recent_claims");
    }
}
