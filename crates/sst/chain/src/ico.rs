//! ICO records, contributions and payout planning.
//!
//! ```text
//! pending ─ico_launch─> launched ─ico_evaluation─┬─> evaluated ─token_launch─> payout_ready
//!                                                └─> refunding ─refund*─> complete
//!
//! payout_ready ─contributor_payout*─> contributors_paid ─founder_payout─> complete
//! ```
//!
//! Payouts are planned when a contribution's payout is scheduled. With
//! contribution `C` and core weights summing to `S`, one unit is `C / S`:
//! every core route gets `units * w` core, every token route gets
//! `units * w * unit_ratio` tokens, and the remainder `C - units * S` goes back
//! to the contributor.

use crate::{
    error::{ActionError, ApplyError},
    pending::push_required_action,
    sst::{controlled_token, TokenPhase},
    state::{adjust_balance, create_vesting, Contribution, ContributionKey, LedgerStore},
};
use serde::{Deserialize, Serialize};
use sst_protocol::{
    unit_target::{
        get_unit_target_account, is_founder_vesting, is_market_maker, is_rewards,
        DESTINATION_FROM, DESTINATION_FROM_VESTING,
    },
    AccountName, Asset, AssetSymbol, ContributionPayout, ContributorPayoutAction,
    FounderPayoutAction, GenerationUnit, IcoLaunchAction, RefundAction, TimePointSec, Validate,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Phase of an ICO.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IcoPhase {
    /// Set up, contribution window not yet open.
    #[default]
    Pending,
    /// Accepting contributions.
    Launched,
    /// Evaluated to launch, awaiting the token launch.
    Evaluated,
    /// Token launched, contributors being paid.
    PayoutReady,
    /// Evaluated to refund, contributions being returned.
    Refunding,
    /// Every contributor paid, founders not yet.
    ContributorsPaid,
    /// Nothing left to do.
    Complete,
}

/// Decision recorded by the evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IcoOutcome {
    /// Minimum met; the token launches.
    Launch,
    /// Minimum missed; contributions are refunded.
    Refund,
}

/// ICO parameters chosen by the control account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcoSetup {
    /// Liquid token symbol.
    pub symbol: AssetSymbol,
    /// Contributions accepted from this instant.
    pub contribution_begin_time: TimePointSec,
    /// Contributions accepted until this instant.
    pub contribution_end_time: TimePointSec,
    /// Token launch instant if the minimum is met.
    pub launch_time: TimePointSec,
    /// Core tokens needed for the token to launch.
    pub core_satoshi_min: i64,
    /// Tokens issued per token-unit weight.
    pub unit_ratio: u32,
    /// Routing of each contribution.
    pub generation_unit: GenerationUnit,
}

/// ICO state of one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcoRecord {
    /// Liquid token symbol.
    pub symbol: AssetSymbol,
    /// Current phase.
    pub phase: IcoPhase,
    /// Contributions accepted from this instant.
    pub contribution_begin_time: TimePointSec,
    /// Contributions accepted until this instant.
    pub contribution_end_time: TimePointSec,
    /// Token launch instant.
    pub launch_time: TimePointSec,
    /// Core tokens needed for the token to launch.
    pub core_satoshi_min: i64,
    /// Tokens issued per token-unit weight.
    pub unit_ratio: u32,
    /// Routing of each contribution.
    pub generation_unit: GenerationUnit,
    /// Core tokens contributed.
    pub contributed: Asset,
    /// Core tokens already paid out or refunded.
    pub processed_contributions: i64,
    /// Set by the evaluation.
    pub outcome: Option<IcoOutcome>,
    /// Founder credits accumulated while contributors are paid.
    pub founder_payouts: BTreeMap<AccountName, Vec<ContributionPayout>>,
    /// Core tokens accumulated for the market maker.
    pub market_maker_core: i64,
    /// Issued tokens accumulated for the market maker.
    pub market_maker_tokens: i64,
    /// Issued tokens accumulated for the reward balance.
    pub reward_tokens: i64,
}

impl IcoRecord {
    /// Pending record for `setup`.
    pub fn new(setup: IcoSetup) -> Self {
        Self {
            symbol: setup.symbol,
            phase: IcoPhase::Pending,
            contribution_begin_time: setup.contribution_begin_time,
            contribution_end_time: setup.contribution_end_time,
            launch_time: setup.launch_time,
            core_satoshi_min: setup.core_satoshi_min,
            unit_ratio: setup.unit_ratio,
            generation_unit: setup.generation_unit,
            contributed: Asset::core(0),
            processed_contributions: 0,
            outcome: None,
            founder_payouts: BTreeMap::new(),
            market_maker_core: 0,
            market_maker_tokens: 0,
            reward_tokens: 0,
        }
    }

    /// Fails unless the evaluation chose `required`.
    pub fn require_outcome(&self, required: IcoOutcome) -> Result<(), ApplyError> {
        match self.outcome {
            None => Err(ApplyError::NotEvaluated(self.symbol)),
            Some(outcome) if outcome != required => {
                Err(ApplyError::WrongBranch { symbol: self.symbol, outcome, required })
            }
            Some(_) => Ok(()),
        }
    }

    /// Fails unless the record is in `expected`.
    pub fn require_phase(&self, expected: IcoPhase) -> Result<(), ApplyError> {
        if self.phase != expected {
            let (symbol, actual) = (self.symbol, self.phase);
            return Err(ApplyError::WrongIcoPhase { symbol, expected, actual });
        }
        Ok(())
    }

    fn absorb(&mut self, plan: &PayoutPlan) -> Result<(), ApplyError> {
        for (account, payouts) in &plan.founders {
            let entry = self.founder_payouts.entry(account.clone()).or_default();
            for payout in payouts {
                merge_payout(entry, payout.payout, payout.to_vesting)?;
            }
        }
        let add =
            |a: i64, b: i64| a.checked_add(b).ok_or(ApplyError::Overflow("ICO founder terms"));
        self.market_maker_core = add(self.market_maker_core, plan.market_maker_core)?;
        self.market_maker_tokens = add(self.market_maker_tokens, plan.market_maker_tokens)?;
        self.reward_tokens = add(self.reward_tokens, plan.reward_tokens)?;
        Ok(())
    }
}

/// Split of one contribution across its destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayoutPlan {
    /// Credits to the contributor.
    pub contributor: Vec<ContributionPayout>,
    /// Credits to founder accounts.
    pub founders: BTreeMap<AccountName, Vec<ContributionPayout>>,
    /// Core tokens for the market maker.
    pub market_maker_core: i64,
    /// Issued tokens for the market maker.
    pub market_maker_tokens: i64,
    /// Issued tokens for the reward balance.
    pub reward_tokens: i64,
}

/// Adds `amount` to the entry with the same symbol and vesting flag.
fn merge_payout(
    payouts: &mut Vec<ContributionPayout>,
    amount: Asset,
    to_vesting: bool,
) -> Result<(), ApplyError> {
    let existing =
        payouts.iter_mut().find(|p| p.payout.symbol == amount.symbol && p.to_vesting == to_vesting);
    match existing {
        Some(existing) => {
            existing.payout.amount = existing
                .payout
                .amount
                .checked_add(amount.amount)
                .ok_or(ApplyError::Overflow("payout merge"))?;
        }
        None => payouts.push(ContributionPayout { payout: amount, to_vesting }),
    }
    Ok(())
}

fn weighted(units: i64, weight: u16, ratio: u32) -> Result<i64, ApplyError> {
    units
        .checked_mul(i64::from(weight))
        .and_then(|amount| amount.checked_mul(i64::from(ratio)))
        .ok_or(ApplyError::Overflow("ICO payout"))
}

fn checked_sum(total: i64, amount: i64) -> Result<i64, ApplyError> {
    total.checked_add(amount).ok_or(ApplyError::Overflow("ICO payout"))
}

/// Splits `contribution` according to the ICO's generation unit.
pub fn plan_contribution_payout(
    ico: &IcoRecord,
    contribution: Asset,
) -> Result<PayoutPlan, ApplyError> {
    let core_sum = i64::from(ico.generation_unit.core_unit_sum());
    if core_sum == 0 || contribution.amount < 0 {
        return Err(ApplyError::InvalidAmount(contribution));
    }
    let units = contribution.amount / core_sum;
    let mut plan = PayoutPlan::default();

    for (target, weight) in &ico.generation_unit.core_unit {
        let amount = weighted(units, *weight, 1)?;
        if amount == 0 {
            continue;
        }
        if is_market_maker(target.as_str()) {
            plan.market_maker_core = checked_sum(plan.market_maker_core, amount)?;
        } else {
            let account = get_unit_target_account(target.as_str())?;
            let entry = plan.founders.entry(account).or_default();
            merge_payout(entry, Asset::core(amount), is_founder_vesting(target.as_str()))?;
        }
    }

    for (target, weight) in &ico.generation_unit.token_unit {
        let amount = weighted(units, *weight, ico.unit_ratio)?;
        if amount == 0 {
            continue;
        }
        let tokens = Asset::new(amount, ico.symbol);
        match target.as_str() {
            DESTINATION_FROM => merge_payout(&mut plan.contributor, tokens, false)?,
            DESTINATION_FROM_VESTING => merge_payout(&mut plan.contributor, tokens, true)?,
            t if is_market_maker(t) => {
                plan.market_maker_tokens = checked_sum(plan.market_maker_tokens, amount)?;
            }
            t if is_rewards(t) => plan.reward_tokens = checked_sum(plan.reward_tokens, amount)?,
            t => {
                let account = get_unit_target_account(t)?;
                let entry = plan.founders.entry(account).or_default();
                merge_payout(entry, tokens, is_founder_vesting(t))?;
            }
        }
    }

    let dust = contribution.amount - units * core_sum;
    if dust > 0 {
        merge_payout(&mut plan.contributor, Asset::core(dust), false)?;
    }
    Ok(plan)
}

/// Creates the ICO record of a token in setup and queues its launch at the
/// start of the contribution window.
pub fn setup_ico(
    ledger: &mut dyn LedgerStore,
    control_account: &AccountName,
    setup: IcoSetup,
) -> Result<(), ApplyError> {
    let symbol = setup.symbol;
    let token = controlled_token(ledger, symbol, control_account)?;
    if token.phase != TokenPhase::Setup {
        return Err(ApplyError::WrongTokenPhase {
            symbol,
            expected: TokenPhase::Setup,
            actual: token.phase,
        });
    }
    let invalid = |reason| ApplyError::InvalidIcoSetup { symbol, reason };
    setup.generation_unit.validate()?;
    if setup.contribution_begin_time > setup.contribution_end_time {
        return Err(invalid("contribution window ends before it begins"));
    }
    if setup.contribution_end_time > setup.launch_time {
        return Err(invalid("launch precedes the end of the contribution window"));
    }
    if setup.unit_ratio == 0 {
        return Err(invalid("unit ratio must be positive"));
    }
    if setup.core_satoshi_min < 0 {
        return Err(invalid("minimum contribution total must not be negative"));
    }

    let launch = IcoLaunchAction { control_account: control_account.clone(), symbol };
    let begin = setup.contribution_begin_time;
    ledger.create_ico(IcoRecord::new(setup))?;
    push_required_action(ledger, launch, begin)?;
    info!(target: "sst::chain", %symbol, begin = %begin, "ICO set up");
    Ok(())
}

/// Records a core-token contribution to a launched ICO, debiting the
/// contributor.
pub fn record_contribution(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
    contributor: &AccountName,
    contribution_id: u32,
    amount: Asset,
) -> Result<(), ApplyError> {
    if amount.symbol != AssetSymbol::CORE || amount.amount <= 0 {
        return Err(ApplyError::InvalidAmount(amount));
    }
    let now = ledger.head_time();
    let ico = ledger.ico(symbol).ok_or(ApplyError::UnknownIco(symbol))?;
    ico.require_phase(IcoPhase::Launched)?;
    if now < ico.contribution_begin_time || now > ico.contribution_end_time {
        return Err(ApplyError::ContributionWindowClosed { symbol, time: now });
    }
    let contributed = ico
        .contributed
        .amount
        .checked_add(amount.amount)
        .ok_or(ApplyError::Overflow("ICO contributions"))?;

    let contribution = Contribution {
        symbol,
        contributor: contributor.clone(),
        contribution_id,
        contribution: amount,
    };
    if ledger.contribution(&contribution.key()).is_some() {
        return Err(ApplyError::DuplicateContribution {
            symbol,
            contributor: contributor.clone(),
            contribution_id,
        });
    }
    adjust_balance(ledger, contributor, Asset::new(-amount.amount, amount.symbol))?;
    ledger.create_contribution(contribution)?;
    if let Some(ico) = ledger.ico_mut(symbol) {
        ico.contributed.amount = contributed;
    }
    debug!(
        target: "sst::chain",
        %symbol,
        %contributor,
        contribution_id,
        %amount,
        "Recorded contribution"
    );
    Ok(())
}

/// Key of the contribution a payout or refund action settles.
pub(crate) fn contribution_key(
    symbol: AssetSymbol,
    contributor: &AccountName,
    contribution_id: u32,
) -> ContributionKey {
    ContributionKey { symbol, contributor: contributor.clone(), contribution_id }
}

/// Queues the refund of the next open contribution. Returns `false` when none
/// is left.
pub fn schedule_next_refund(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
) -> Result<bool, ApplyError> {
    let Some(next) = ledger.first_contribution(symbol).cloned() else { return Ok(false) };
    let refund = RefundAction {
        contributor: next.contributor,
        symbol,
        contribution_id: next.contribution_id,
        refund: next.contribution,
    };
    let now = ledger.head_time();
    push_required_action(ledger, refund, now)?;
    Ok(true)
}

/// Plans and queues the payout of the next open contribution, adding its
/// founder terms to the ICO. Returns `false` when none is left.
pub fn schedule_next_contributor_payout(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
) -> Result<bool, ApplyError> {
    let Some(next) = ledger.first_contribution(symbol).cloned() else { return Ok(false) };
    let ico = ledger.ico_mut(symbol).ok_or(ApplyError::UnknownIco(symbol))?;
    let plan = plan_contribution_payout(ico, next.contribution)?;
    ico.absorb(&plan)?;

    let payout = ContributorPayoutAction {
        contributor: next.contributor,
        symbol,
        contribution_id: next.contribution_id,
        contribution: next.contribution,
        payouts: plan.contributor,
    };
    let now = ledger.head_time();
    push_required_action(ledger, payout, now)?;
    Ok(true)
}

/// Marks every contributor paid and queues the founder payout.
pub fn schedule_founder_payout(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
) -> Result<(), ApplyError> {
    let ico = ledger.ico_mut(symbol).ok_or(ApplyError::UnknownIco(symbol))?;
    ico.phase = IcoPhase::ContributorsPaid;
    let payout = FounderPayoutAction {
        symbol,
        account_payouts: ico.founder_payouts.clone(),
        market_maker_core: ico.market_maker_core,
        market_maker_tokens: ico.market_maker_tokens,
        reward_balance: ico.reward_tokens,
    };
    let now = ledger.head_time();
    push_required_action(ledger, payout, now)?;
    info!(target: "sst::chain", %symbol, "Contributors paid");
    Ok(())
}

/// Checks that every entry pays a non-negative amount of core or `symbol`.
/// Returns the amount of `symbol` the entries issue.
pub fn check_payouts(
    symbol: AssetSymbol,
    payouts: &[ContributionPayout],
) -> Result<i64, ApplyError> {
    payouts.iter().try_fold(0i64, |issued, payout| {
        let asset = payout.payout;
        if asset.amount < 0 || (asset.symbol != symbol && asset.symbol != AssetSymbol::CORE) {
            return Err(ApplyError::InvalidAmount(asset));
        }
        if asset.symbol != symbol {
            return Ok(issued);
        }
        issued.checked_add(asset.amount).ok_or(ApplyError::Overflow("ICO issuance"))
    })
}

/// Credits `account` with `payouts` in core or `symbol`. Returns the amount of
/// `symbol` issued, which the caller adds to the supply.
///
/// Every entry is checked before the first credit.
pub fn execute_payouts(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
    account: &AccountName,
    payouts: &[ContributionPayout],
) -> Result<i64, ActionError> {
    let issued = check_payouts(symbol, payouts)?;
    if ledger.account(account).is_none() {
        return Err(ApplyError::UnknownAccount(account.clone()).into());
    }
    for payout in payouts {
        if payout.to_vesting {
            create_vesting(ledger, account, payout.payout)?;
        } else {
            adjust_balance(ledger, account, payout.payout)?;
        }
    }
    Ok(issued)
}
