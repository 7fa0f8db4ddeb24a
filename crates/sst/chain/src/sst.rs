//! SST token records and emission schedules.
//!
//! ```text
//! setup ─ico_launch─> ico ─ico_evaluation─┬─> ico_completed ─token_launch─> launch_success
//!                                         └─> launch_failed
//! ```
//!
//! Emissions run off one or more schedules per token. Each schedule emits at
//! `schedule_time + k * interval_seconds` for `k < emission_count`; the amount
//! at an instant interpolates linearly between the left and right endpoints.

use crate::{error::ApplyError, state::LedgerStore};
use serde::{Deserialize, Serialize};
use sst_protocol::{
    constants::SST_EMIT_INDEFINITELY,
    validation::validate_sst_symbol,
    AccountName, AssetSymbol, EmissionsUnit, Extensions, OptionalAutomatedAction, TimePointSec,
    TokenEmissionAction, UnitTarget, Validate,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Lifecycle phase of a token.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TokenPhase {
    /// Created, parameters still being set.
    #[default]
    Setup,
    /// Contribution window open.
    Ico,
    /// ICO met its minimum, awaiting launch.
    IcoCompleted,
    /// ICO missed its minimum; contributions are refunded.
    LaunchFailed,
    /// Launched.
    LaunchSuccess,
}

/// Balances held by a token's market maker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMaker {
    /// Core tokens.
    pub core_balance: i64,
    /// Issued tokens.
    pub token_balance: i64,
}

/// An issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SstToken {
    /// Liquid symbol.
    pub liquid_symbol: AssetSymbol,
    /// Account allowed to configure the token.
    pub control_account: AccountName,
    /// Lifecycle phase.
    pub phase: TokenPhase,
    /// Tokens in existence.
    pub current_supply: i64,
    /// Liquid tokens backing vesting shares.
    pub total_vesting_fund: i64,
    /// Vesting shares outstanding.
    pub total_vesting_shares: i64,
    /// Virtual vesting fund seeded at launch.
    pub total_vesting_fund_ballast: i64,
    /// Virtual vesting shares seeded at launch.
    pub total_vesting_shares_ballast: i64,
    /// Tokens set aside for content rewards.
    pub reward_balance: i64,
    /// Market maker balances.
    pub market_maker: MarketMaker,
    /// Instant of the last emission applied.
    pub last_virtual_emission_time: TimePointSec,
    /// Upper bound on `current_supply`.
    pub max_supply: i64,
}

impl SstToken {
    /// Token in [`TokenPhase::Setup`] with nothing issued.
    pub fn new(liquid_symbol: AssetSymbol, control_account: AccountName, max_supply: i64) -> Self {
        Self {
            liquid_symbol,
            control_account,
            phase: TokenPhase::Setup,
            current_supply: 0,
            total_vesting_fund: 0,
            total_vesting_shares: 0,
            total_vesting_fund_ballast: 0,
            total_vesting_shares_ballast: 0,
            reward_balance: 0,
            market_maker: MarketMaker::default(),
            last_virtual_emission_time: TimePointSec::ZERO,
            max_supply,
        }
    }
}

/// One emission schedule of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSchedule {
    /// Liquid symbol.
    pub symbol: AssetSymbol,
    /// First emission instant.
    pub schedule_time: TimePointSec,
    /// Split of each emission.
    pub emissions_unit: EmissionsUnit,
    /// Seconds between emissions.
    pub interval_seconds: u32,
    /// Number of emissions, or [`SST_EMIT_INDEFINITELY`].
    pub emission_count: u32,
    /// Left endpoint of the interpolation.
    pub lep_time: TimePointSec,
    /// Right endpoint of the interpolation.
    pub rep_time: TimePointSec,
    /// Absolute amount at the left endpoint.
    pub lep_abs_amount: i64,
    /// Absolute amount at the right endpoint.
    pub rep_abs_amount: i64,
    /// Supply-relative numerator at the left endpoint.
    pub lep_rel_amount_numerator: u32,
    /// Supply-relative numerator at the right endpoint.
    pub rep_rel_amount_numerator: u32,
    /// Supply-relative amounts are `supply * numerator >> rel_amount_denom_bits`.
    pub rel_amount_denom_bits: u8,
    /// Combine absolute and relative amounts by `min` instead of `max`.
    pub floor_emissions: bool,
}

impl EmissionSchedule {
    /// Last emission instant, [`TimePointSec::MAX`] for endless schedules.
    pub fn schedule_end_time(&self) -> TimePointSec {
        if self.emission_count == SST_EMIT_INDEFINITELY {
            return TimePointSec::MAX;
        }
        let count = u64::from(self.emission_count.saturating_sub(1));
        let span = u64::from(self.interval_seconds) * count;
        self.schedule_time.saturating_add(span)
    }

    /// First emission instant strictly after `time`.
    pub fn next_emission_after(&self, time: TimePointSec) -> Option<TimePointSec> {
        if self.emission_count == 0 {
            return None;
        }
        let k = if time < self.schedule_time {
            0
        } else if self.interval_seconds == 0 {
            return None;
        } else {
            u64::from(time.saturating_since(self.schedule_time) / self.interval_seconds) + 1
        };
        if self.emission_count != SST_EMIT_INDEFINITELY && k >= u64::from(self.emission_count) {
            return None;
        }
        let secs = u64::from(self.schedule_time.secs()) + k * u64::from(self.interval_seconds);
        u32::try_from(secs).ok().map(TimePointSec::from_secs)
    }

    /// Whether `time` is one of this schedule's emission instants.
    pub fn emits_at(&self, time: TimePointSec) -> bool {
        if self.emission_count == 0
            || time < self.schedule_time
            || time > self.schedule_end_time()
        {
            return false;
        }
        match self.interval_seconds {
            0 => time == self.schedule_time,
            interval => time.saturating_since(self.schedule_time) % interval == 0,
        }
    }

    fn check(&self) -> Result<(), ApplyError> {
        let invalid = |reason| ApplyError::InvalidEmissionSchedule { symbol: self.symbol, reason };
        self.emissions_unit.validate()?;
        if self.emission_count == 0 {
            return Err(invalid("emission count must be positive"));
        }
        if self.emission_count > 1 && self.interval_seconds == 0 {
            return Err(invalid("repeating schedules need a positive interval"));
        }
        if self.lep_time > self.rep_time {
            return Err(invalid("left endpoint is after right endpoint"));
        }
        if self.lep_abs_amount < 0 || self.rep_abs_amount < 0 {
            return Err(invalid("absolute amounts must not be negative"));
        }
        if self.rel_amount_denom_bits > 63 {
            return Err(invalid("relative denominator exceeds 63 bits"));
        }
        if self.emission_count != SST_EMIT_INDEFINITELY {
            let span = u64::from(self.interval_seconds) * u64::from(self.emission_count - 1);
            if u64::from(self.schedule_time.secs()) + span > u64::from(u32::MAX) {
                return Err(invalid("schedule ends past the representable time range"));
            }
        }
        Ok(())
    }
}

/// Creates a token in [`TokenPhase::Setup`].
pub fn create_token(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
    control_account: AccountName,
    max_supply: i64,
) -> Result<(), ApplyError> {
    validate_sst_symbol(symbol)?;
    if ledger.account(&control_account).is_none() {
        return Err(ApplyError::UnknownAccount(control_account));
    }
    ledger.create_token(SstToken::new(symbol, control_account, max_supply))?;
    info!(target: "sst::chain", %symbol, "Created SST");
    Ok(())
}

/// Token controlled by `control_account`.
pub(crate) fn controlled_token<'a>(
    ledger: &'a dyn LedgerStore,
    symbol: AssetSymbol,
    control_account: &AccountName,
) -> Result<&'a SstToken, ApplyError> {
    let token = ledger.token(symbol).ok_or(ApplyError::UnknownToken(symbol))?;
    if &token.control_account != control_account {
        return Err(ApplyError::ControlAccountMismatch {
            symbol,
            expected: token.control_account.clone(),
            actual: control_account.clone(),
        });
    }
    Ok(token)
}

/// Adds an emission schedule to a token that is still in setup.
pub fn setup_emissions(
    ledger: &mut dyn LedgerStore,
    control_account: &AccountName,
    schedule: EmissionSchedule,
) -> Result<(), ApplyError> {
    let token = controlled_token(ledger, schedule.symbol, control_account)?;
    if token.phase != TokenPhase::Setup {
        return Err(ApplyError::WrongTokenPhase {
            symbol: schedule.symbol,
            expected: TokenPhase::Setup,
            actual: token.phase,
        });
    }
    schedule.check()?;
    debug!(
        target: "sst::chain",
        symbol = %schedule.symbol,
        start = %schedule.schedule_time,
        "Added emission schedule"
    );
    ledger.add_emission_schedule(schedule);
    Ok(())
}

/// Earliest emission instant strictly after `last` across `schedules`.
pub fn next_emission_time(
    schedules: &[EmissionSchedule],
    last: TimePointSec,
) -> Option<TimePointSec> {
    schedules.iter().filter_map(|schedule| schedule.next_emission_after(last)).min()
}

/// First schedule that emits at `time`.
pub fn emission_schedule_at(
    schedules: &[EmissionSchedule],
    time: TimePointSec,
) -> Option<&EmissionSchedule> {
    schedules.iter().find(|schedule| schedule.emits_at(time))
}

/// Linear interpolation between `(lep_time, lep)` and `(rep_time, rep)`,
/// clamped to the endpoints outside them.
fn interpolate(
    lep_time: TimePointSec,
    rep_time: TimePointSec,
    lep: i128,
    rep: i128,
    t: TimePointSec,
) -> i128 {
    if t <= lep_time {
        return lep;
    }
    if t >= rep_time {
        return rep;
    }
    let span = i128::from(rep_time.saturating_since(lep_time));
    let elapsed = i128::from(t.saturating_since(lep_time));
    lep + (rep - lep) * elapsed / span
}

/// Amount per destination of the emission at `time`.
///
/// Returns an empty map when the total is too small to give every route at
/// least one unit per weight.
pub fn generate_emissions(
    token: &SstToken,
    schedule: &EmissionSchedule,
    time: TimePointSec,
) -> BTreeMap<UnitTarget, i64> {
    let abs = interpolate(
        schedule.lep_time,
        schedule.rep_time,
        i128::from(schedule.lep_abs_amount),
        i128::from(schedule.rep_abs_amount),
        time,
    );
    let numerator = interpolate(
        schedule.lep_time,
        schedule.rep_time,
        i128::from(schedule.lep_rel_amount_numerator),
        i128::from(schedule.rep_rel_amount_numerator),
        time,
    );
    let supply = i128::from(token.current_supply.max(0));
    let rel = (supply * numerator) >> schedule.rel_amount_denom_bits;
    let total = if schedule.floor_emissions { abs.min(rel) } else { abs.max(rel) }.max(0);

    let unit_sum = i128::from(schedule.emissions_unit.token_unit_sum());
    if unit_sum == 0 {
        return BTreeMap::new();
    }
    let ratio = total / unit_sum;
    if ratio == 0 {
        return BTreeMap::new();
    }
    schedule
        .emissions_unit
        .token_unit
        .iter()
        .filter_map(|(target, weight)| {
            let amount = i64::try_from(ratio * i128::from(*weight)).ok()?;
            Some((target.clone(), amount))
        })
        .collect()
}

/// Emission actions due at `now`, one per token at most.
pub fn generate_optional_actions(
    ledger: &dyn LedgerStore,
    now: TimePointSec,
) -> Vec<OptionalAutomatedAction> {
    ledger
        .token_symbols()
        .into_iter()
        .filter_map(|symbol| {
            let token = ledger.token(symbol)?;
            let schedules = ledger.emission_schedules(symbol);
            let emission_time = next_emission_time(schedules, token.last_virtual_emission_time)
                .filter(|time| *time <= now)?;
            let schedule = emission_schedule_at(schedules, emission_time)?;
            let emissions = generate_emissions(token, schedule, emission_time);
            if emissions.is_empty() {
                return None;
            }
            Some(OptionalAutomatedAction::from(TokenEmissionAction {
                control_account: token.control_account.clone(),
                symbol,
                emission_time,
                emissions,
                extensions: Extensions::new(),
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Account, MemoryLedger};
    use assert_matches::assert_matches;

    fn symbol() -> AssetSymbol {
        AssetSymbol::from_nai_data(10_000_000, 3).unwrap()
    }

    fn schedule(start: u32, interval: u32, count: u32) -> EmissionSchedule {
        EmissionSchedule {
            symbol: symbol(),
            schedule_time: TimePointSec::from_secs(start),
            emissions_unit: EmissionsUnit {
                token_unit: [("$rewards".into(), 1), ("$market_maker".into(), 1)]
                    .into_iter()
                    .collect(),
            },
            interval_seconds: interval,
            emission_count: count,
            lep_time: TimePointSec::from_secs(start),
            rep_time: TimePointSec::from_secs(start),
            lep_abs_amount: 100,
            rep_abs_amount: 100,
            lep_rel_amount_numerator: 0,
            rep_rel_amount_numerator: 0,
            rel_amount_denom_bits: 0,
            floor_emissions: false,
        }
    }

    #[test]
    fn test_next_emission_alignment() {
        let s = schedule(1_000, 60, 3);
        assert_eq!(s.schedule_end_time(), TimePointSec::from_secs(1_120));
        assert_eq!(s.next_emission_after(TimePointSec::ZERO), Some(TimePointSec::from_secs(1_000)));
        let next = |t| s.next_emission_after(TimePointSec::from_secs(t)).map(TimePointSec::secs);
        assert_eq!(next(1_000), Some(1_060));
        assert_eq!(next(1_061), Some(1_120));
        assert_eq!(s.next_emission_after(TimePointSec::from_secs(1_120)), None);

        let endless = schedule(500, 1_000, SST_EMIT_INDEFINITELY);
        assert_eq!(endless.schedule_end_time(), TimePointSec::MAX);
        let schedules = [s, endless];
        let next = |t| {
            next_emission_time(&schedules, TimePointSec::from_secs(t)).map(TimePointSec::secs)
        };
        assert_eq!(next(600), Some(1_000));
        assert_eq!(next(1_200), Some(1_500));
        assert!(emission_schedule_at(&schedules, TimePointSec::from_secs(1_500)).is_some());
        assert!(emission_schedule_at(&schedules, TimePointSec::from_secs(1_501)).is_none());
    }

    #[test]
    fn test_generate_emissions_interpolates() {
        let mut token = SstToken::new(symbol(), "alice".into(), i64::MAX);
        token.current_supply = 1 << 20;
        let mut s = schedule(0, 10, 11);
        s.rep_time = TimePointSec::from_secs(100);
        s.rep_abs_amount = 300;

        let at = |s: &EmissionSchedule, t, target: &str| {
            generate_emissions(&token, s, TimePointSec::from_secs(t))[&UnitTarget::from(target)]
        };
        assert_eq!(at(&s, 0, "$rewards"), 50);
        assert_eq!(at(&s, 50, "$rewards"), 100);
        assert_eq!(at(&s, 200, "$market_maker"), 150);

        // 2^20 * 1 >> 10 = 1024 beats the absolute amount unless flooring
        s.lep_rel_amount_numerator = 1;
        s.rep_rel_amount_numerator = 1;
        s.rel_amount_denom_bits = 10;
        assert_eq!(at(&s, 0, "$rewards"), 512);
        s.floor_emissions = true;
        assert_eq!(at(&s, 0, "$rewards"), 50);
    }

    #[test]
    fn test_dust_emission_generates_nothing() {
        let token = SstToken::new(symbol(), "alice".into(), i64::MAX);
        let mut s = schedule(0, 10, 1);
        s.lep_abs_amount = 1;
        s.rep_abs_amount = 1;
        assert!(generate_emissions(&token, &s, TimePointSec::ZERO).is_empty());
    }

    #[test]
    fn test_setup_emissions_checks() {
        let mut ledger = MemoryLedger::new(TimePointSec::ZERO);
        ledger.create_account(Account::new("alice")).unwrap();
        create_token(&mut ledger, symbol(), "alice".into(), i64::MAX).unwrap();

        assert_matches!(
            setup_emissions(&mut ledger, &"bob".into(), schedule(0, 10, 2)),
            Err(ApplyError::ControlAccountMismatch { .. })
        );
        assert_matches!(
            setup_emissions(&mut ledger, &"alice".into(), schedule(0, 0, 2)),
            Err(ApplyError::InvalidEmissionSchedule { .. })
        );
        setup_emissions(&mut ledger, &"alice".into(), schedule(0, 10, 2)).unwrap();
        assert_eq!(ledger.emission_schedules(symbol()).len(), 1);

        ledger.token_mut(symbol()).unwrap().phase = TokenPhase::Ico;
        assert_matches!(
            setup_emissions(&mut ledger, &"alice".into(), schedule(0, 10, 2)),
            Err(ApplyError::WrongTokenPhase { actual: TokenPhase::Ico, .. })
        );
    }

    #[test]
    fn test_generate_optional_actions_only_when_due() {
        let mut ledger = MemoryLedger::new(TimePointSec::ZERO);
        ledger.create_account(Account::new("alice")).unwrap();
        create_token(&mut ledger, symbol(), "alice".into(), i64::MAX).unwrap();
        setup_emissions(&mut ledger, &"alice".into(), schedule(1_000, 10, 2)).unwrap();

        assert!(generate_optional_actions(&ledger, TimePointSec::from_secs(999)).is_empty());
        let actions = generate_optional_actions(&ledger, TimePointSec::from_secs(1_005));
        assert_eq!(actions.len(), 1);
        let OptionalAutomatedAction::TokenEmission(emission) = &actions[0];
        assert_eq!(emission.emission_time, TimePointSec::from_secs(1_000));
        assert_eq!(emission.emissions.values().sum::<i64>(), 100);
    }
}
