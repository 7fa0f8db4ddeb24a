//! Reward Fund Curve Engine
//!
//! Converts accumulated engagement weight into payouts from a decaying reward
//! pool. Runs once per maintenance interval; funds are independent and settle
//! in parallel.
//!
//! ```text
//! per fund, per interval:
//!   R    = recent_claims · (1 - dt / window)     decayed claim volume
//!   f_i  = curve(w_i · reward_weight_i, R)       shaped weight of each claim
//!   p_i  = ⌊balance · f_i / max(R, Σ f_i)⌋       truncated, zero when R = 0
//!   balance -= Σ p_i,  tokens_awarded += Σ p_i
//!   recent_claims = R + Σ f_i
//! ```
//!
//! All intermediate products are computed in 256 bits.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod curve;
pub mod fund;
pub mod payout;

pub use curve::{evaluate_reward_curve, mul_div};
pub use fund::{decay_recent_claims, FundId, RewardFundContext};
pub use payout::{
    settle, settle_funds, ClaimPayout, CuratorClaim, CuratorPayout, PendingClaim, RewardParams,
    SettlementReport,
};

use sst_protocol::AssetSymbol;
use thiserror::Error;

/// Errors raised while settling a fund.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewardError {
    /// Funds pay out in liquid tokens only.
    #[error("reward fund cannot pay out in vesting symbol {0}")]
    UnsupportedSymbol(AssetSymbol),

    /// Curation share above 100%.
    #[error("curation percent {0} exceeds 10000 basis points")]
    InvalidCurationPercent(u16),

    /// Fund balance below zero.
    #[error("reward balance {0} is negative")]
    NegativeBalance(i64),

    /// Accumulated weight or award total out of range.
    #[error("arithmetic overflow settling fund {fund}")]
    Overflow {
        /// Fund being settled.
        fund: FundId,
    },
}
