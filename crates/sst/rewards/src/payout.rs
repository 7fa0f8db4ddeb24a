//! Settlement of pending claims against a fund.

use crate::{
    curve::{evaluate_reward_curve, narrow},
    fund::{FundId, RewardFundContext},
    RewardError,
};
use alloy_primitives::U256;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sst_protocol::{constants::PERCENT_100, AccountName, CurveId, TimePointSec};
use tracing::{debug, info};

/// Settlement parameters shared by every fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardParams {
    /// Window over which recent claims decay to zero.
    pub decay_window_seconds: u32,
    /// Cap on a single payout under the bounded curve, in basis points of the fund.
    pub bounded_ceiling_bps: u16,
}

impl Default for RewardParams {
    fn default() -> Self {
        Self { decay_window_seconds: 15 * 24 * 60 * 60, bounded_ceiling_bps: 1_000 }
    }
}

/// A curator's stake in a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratorClaim {
    /// Curator account.
    pub curator: AccountName,
    /// Raw curation weight.
    pub weight: u128,
}

/// A content item due for payout this interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingClaim {
    /// Author account.
    pub author: AccountName,
    /// Raw engagement weight.
    pub weight: u128,
    /// Scale applied to `weight`, in basis points.
    #[serde(default = "full_weight")]
    pub reward_weight: u16,
    /// Curators sharing the curation part.
    #[serde(default)]
    pub curators: Vec<CuratorClaim>,
}

const fn full_weight() -> u16 {
    PERCENT_100
}

impl PendingClaim {
    /// Claim with full reward weight and no curators.
    pub fn new(author: impl Into<AccountName>, weight: u128) -> Self {
        Self { author: author.into(), weight, reward_weight: PERCENT_100, curators: Vec::new() }
    }

    fn effective_weight(&self) -> u128 {
        narrow(U256::from(self.weight) * U256::from(self.reward_weight) / U256::from(PERCENT_100))
    }
}

/// Tokens paid to one curator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratorPayout {
    /// Curator account.
    pub curator: AccountName,
    /// Tokens paid.
    pub amount: i64,
}

/// Outcome of one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPayout {
    /// Author account.
    pub author: AccountName,
    /// Shaped weight of the claim.
    pub shaped_weight: u128,
    /// Tokens paid to the author.
    pub author_tokens: i64,
    /// Tokens paid to each curator.
    pub curators: Vec<CuratorPayout>,
}

impl ClaimPayout {
    /// Tokens paid to author and curators together.
    pub fn total(&self) -> i64 {
        self.author_tokens + self.curators.iter().map(|c| c.amount).sum::<i64>()
    }
}

/// Result of settling one fund for one interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Settled fund.
    pub fund: FundId,
    /// Recent claims after decay, the payout denominator.
    pub decayed_claims: u128,
    /// Recent claims carried into the next interval.
    pub recent_claims: u128,
    /// Per-claim outcome, in input order.
    pub payouts: Vec<ClaimPayout>,
    /// Tokens removed from the fund.
    pub paid: i64,
}

/// Settles `claims` against `fund` at `now`.
///
/// Recent claims are decayed for the elapsed time first. Each claim then
/// receives `reward_balance * f(w) / max(R, Σf)`, truncated, where `R` is the
/// decayed total; with `R == 0` nothing is paid. The interval's shaped claims
/// are added to recent claims afterwards. The author and curation parts are
/// split by `percent_curation_rewards`; curation dust that cannot be allocated
/// stays in the fund.
pub fn settle(
    fund: &mut RewardFundContext,
    claims: &[PendingClaim],
    now: TimePointSec,
    params: &RewardParams,
) -> Result<SettlementReport, RewardError> {
    if fund.reward_balance.symbol.is_vesting() {
        return Err(RewardError::UnsupportedSymbol(fund.reward_balance.symbol));
    }
    if fund.percent_curation_rewards > PERCENT_100 {
        return Err(RewardError::InvalidCurationPercent(fund.percent_curation_rewards));
    }
    if fund.reward_balance.amount < 0 {
        return Err(RewardError::NegativeBalance(fund.reward_balance.amount));
    }

    fund.decay(now, params.decay_window_seconds);
    let decayed = fund.recent_claims;

    let shaped = claims
        .iter()
        .map(|claim| {
            evaluate_reward_curve(
                claim.effective_weight(),
                fund.author_reward_curve,
                fund.content_constant,
                decayed,
            )
        })
        .collect::<Vec<_>>();
    let observed = shaped
        .iter()
        .try_fold(0u128, |acc, f| acc.checked_add(*f))
        .ok_or(RewardError::Overflow { fund: fund.id })?;

    let budget = fund.reward_balance.amount as u128;
    let denominator = decayed.max(observed);
    let ceiling = match fund.author_reward_curve {
        CurveId::Bounded => {
            Some(budget * u128::from(params.bounded_ceiling_bps) / u128::from(PERCENT_100))
        }
        _ => None,
    };

    let mut payouts = Vec::with_capacity(claims.len());
    let mut paid = 0i64;
    for (claim, shaped_weight) in claims.iter().zip(shaped) {
        let reward = if decayed == 0 {
            0
        } else {
            let share =
                narrow(U256::from(budget) * U256::from(shaped_weight) / U256::from(denominator));
            ceiling.map_or(share, |cap| share.min(cap))
        };
        let payout = split_reward(fund, claim, shaped_weight, reward, decayed);
        paid += payout.total();
        payouts.push(payout);
    }

    let recent = decayed.checked_add(observed).ok_or(RewardError::Overflow { fund: fund.id })?;
    let tokens_awarded =
        fund.tokens_awarded.checked_add(paid).ok_or(RewardError::Overflow { fund: fund.id })?;
    fund.recent_claims = recent;
    fund.reward_balance.amount -= paid;
    fund.tokens_awarded = tokens_awarded;

    debug!(
        target: "sst::rewards",
        fund = %fund.id,
        claims = claims.len(),
        decayed_claims = %decayed,
        recent_claims = %recent,
        paid,
        "Settled reward fund"
    );

    Ok(SettlementReport {
        fund: fund.id,
        decayed_claims: decayed,
        recent_claims: recent,
        payouts,
        paid,
    })
}

/// Divides one claim's reward between its author and curators.
fn split_reward(
    fund: &RewardFundContext,
    claim: &PendingClaim,
    shaped_weight: u128,
    reward: u128,
    recent_claims: u128,
) -> ClaimPayout {
    let curation_tokens =
        reward * u128::from(fund.percent_curation_rewards) / u128::from(PERCENT_100);
    let author_tokens = reward - curation_tokens;

    let curator_weights = claim
        .curators
        .iter()
        .map(|c| {
            evaluate_reward_curve(
                c.weight,
                fund.curation_reward_curve,
                fund.content_constant,
                recent_claims,
            )
        })
        .collect::<Vec<_>>();
    let total_curation_weight =
        curator_weights.iter().fold(U256::ZERO, |acc, w| acc + U256::from(*w));

    let curators = claim
        .curators
        .iter()
        .zip(curator_weights)
        .map(|(curator, weight)| {
            let amount = if total_curation_weight.is_zero() {
                0
            } else {
                narrow(U256::from(curation_tokens) * U256::from(weight) / total_curation_weight)
            };
            CuratorPayout { curator: curator.curator.clone(), amount: amount as i64 }
        })
        .collect();

    ClaimPayout {
        author: claim.author.clone(),
        shaped_weight,
        author_tokens: author_tokens as i64,
        curators,
    }
}

/// Settles independent funds in parallel. `claims` is indexed like `funds`;
/// missing entries settle with no claims, which only decays the fund.
///
/// Either every fund is settled or, on error, none is modified.
pub fn settle_funds(
    funds: &mut [RewardFundContext],
    claims: &[Vec<PendingClaim>],
    now: TimePointSec,
    params: &RewardParams,
) -> Result<Vec<SettlementReport>, RewardError> {
    let mut staged = funds.to_vec();
    let reports = staged
        .par_iter_mut()
        .enumerate()
        .map(|(index, fund)| {
            let pending = claims.get(index).map(Vec::as_slice).unwrap_or_default();
            settle(fund, pending, now, params)
        })
        .collect::<Result<Vec<_>, _>>()?;
    funds.clone_from_slice(&staged);

    info!(
        target: "sst::rewards",
        funds = reports.len(),
        paid = reports.iter().map(|r| r.paid).sum::<i64>(),
        "Reward maintenance pass complete"
    );
    Ok(reports)
}
