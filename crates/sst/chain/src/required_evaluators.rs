//! Evaluators of the required actions: the ICO lifecycle.
//!
//! Each evaluator checks phases and payout entries before its first write.
//! Supply limits are only checked while crediting, so a late failure can leave
//! earlier credits behind. Block application runs every action on a staged
//! ledger and discards it on failure.

use crate::{
    error::{ActionError, ApplyError},
    ico::{
        check_payouts, contribution_key, execute_payouts, schedule_founder_payout,
        schedule_next_contributor_payout, schedule_next_refund, IcoOutcome, IcoPhase, IcoRecord,
    },
    pending::push_required_action,
    sst::{controlled_token, TokenPhase},
    state::{adjust_balance, adjust_supply, LedgerStore},
};
use sst_protocol::{
    constants::{PERCENT_100, SST_BALLAST_SUPPLY_PERCENT, SST_INITIAL_VESTING_PER_UNIT},
    AccountName, AssetSymbol, ContributorPayoutAction, FounderPayoutAction, IcoEvaluationAction,
    IcoLaunchAction, RefundAction, TokenLaunchAction,
};
use tracing::info;

fn ico(ledger: &dyn LedgerStore, symbol: AssetSymbol) -> Result<&IcoRecord, ApplyError> {
    ledger.ico(symbol).ok_or(ApplyError::UnknownIco(symbol))
}

fn ico_mut(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
) -> Result<&mut IcoRecord, ApplyError> {
    ledger.ico_mut(symbol).ok_or(ApplyError::UnknownIco(symbol))
}

fn require_token_phase(
    ledger: &dyn LedgerStore,
    symbol: AssetSymbol,
    control_account: &AccountName,
    expected: TokenPhase,
) -> Result<(), ApplyError> {
    let token = controlled_token(ledger, symbol, control_account)?;
    if token.phase != expected {
        return Err(ApplyError::WrongTokenPhase { symbol, expected, actual: token.phase });
    }
    Ok(())
}

fn set_token_phase(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
    phase: TokenPhase,
) -> Result<(), ApplyError> {
    ledger.token_mut(symbol).ok_or(ApplyError::UnknownToken(symbol))?.phase = phase;
    info!(target: "sst::chain", %symbol, %phase, "Token phase changed");
    Ok(())
}

fn set_ico_phase(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
    phase: IcoPhase,
) -> Result<(), ApplyError> {
    ico_mut(ledger, symbol)?.phase = phase;
    info!(target: "sst::chain", %symbol, %phase, "ICO phase changed");
    Ok(())
}

/// Opens the contribution window and queues the evaluation at its end.
pub fn ico_launch(
    action: &IcoLaunchAction,
    ledger: &mut dyn LedgerStore,
) -> Result<(), ActionError> {
    let symbol = action.symbol;
    require_token_phase(ledger, symbol, &action.control_account, TokenPhase::Setup)?;
    let record = ico(ledger, symbol)?;
    record.require_phase(IcoPhase::Pending)?;
    let evaluation_time = record.contribution_end_time;

    set_token_phase(ledger, symbol, TokenPhase::Ico)?;
    set_ico_phase(ledger, symbol, IcoPhase::Launched)?;
    let evaluation =
        IcoEvaluationAction { control_account: action.control_account.clone(), symbol };
    push_required_action(ledger, evaluation, evaluation_time)?;
    Ok(())
}

/// Decides launch or refund from the contributed total.
pub fn ico_evaluation(
    action: &IcoEvaluationAction,
    ledger: &mut dyn LedgerStore,
) -> Result<(), ActionError> {
    let symbol = action.symbol;
    require_token_phase(ledger, symbol, &action.control_account, TokenPhase::Ico)?;
    let record = ico(ledger, symbol)?;
    record.require_phase(IcoPhase::Launched)?;

    if record.contributed.amount >= record.core_satoshi_min {
        let launch_time = record.launch_time;
        let record = ico_mut(ledger, symbol)?;
        record.outcome = Some(IcoOutcome::Launch);
        record.phase = IcoPhase::Evaluated;
        set_token_phase(ledger, symbol, TokenPhase::IcoCompleted)?;
        let launch = TokenLaunchAction { control_account: action.control_account.clone(), symbol };
        push_required_action(ledger, launch, launch_time)?;
    } else {
        let record = ico_mut(ledger, symbol)?;
        record.outcome = Some(IcoOutcome::Refund);
        record.phase = IcoPhase::Refunding;
        set_token_phase(ledger, symbol, TokenPhase::LaunchFailed)?;
        if !schedule_next_refund(ledger, symbol)? {
            set_ico_phase(ledger, symbol, IcoPhase::Complete)?;
        }
    }
    Ok(())
}

/// Launches the token and starts paying contributors.
pub fn token_launch(
    action: &TokenLaunchAction,
    ledger: &mut dyn LedgerStore,
) -> Result<(), ActionError> {
    let symbol = action.symbol;
    let record = ico(ledger, symbol)?;
    record.require_outcome(IcoOutcome::Launch)?;
    record.require_phase(IcoPhase::Evaluated)?;
    require_token_phase(ledger, symbol, &action.control_account, TokenPhase::IcoCompleted)?;

    set_token_phase(ledger, symbol, TokenPhase::LaunchSuccess)?;
    set_ico_phase(ledger, symbol, IcoPhase::PayoutReady)?;
    if !schedule_next_contributor_payout(ledger, symbol)? {
        schedule_founder_payout(ledger, symbol)?;
    }
    Ok(())
}

/// Returns one contribution of a failed ICO.
pub fn refund(action: &RefundAction, ledger: &mut dyn LedgerStore) -> Result<(), ActionError> {
    let symbol = action.symbol;
    let record = ico(ledger, symbol)?;
    record.require_outcome(IcoOutcome::Refund)?;
    record.require_phase(IcoPhase::Refunding)?;
    let processed = record
        .processed_contributions
        .checked_add(action.refund.amount)
        .ok_or(ApplyError::Overflow("processed contributions"))?;
    let key = contribution_key(symbol, &action.contributor, action.contribution_id);
    if ledger.contribution(&key).is_none() {
        return Err(ApplyError::UnknownContribution {
            symbol,
            contributor: action.contributor.clone(),
            contribution_id: action.contribution_id,
        }
        .into());
    }

    adjust_balance(ledger, &action.contributor, action.refund)?;
    ico_mut(ledger, symbol)?.processed_contributions = processed;
    ledger.remove_contribution(&key);
    if !schedule_next_refund(ledger, symbol)? {
        set_ico_phase(ledger, symbol, IcoPhase::Complete)?;
    }
    Ok(())
}

/// Pays out one contribution of a launched ICO. A no-op once every
/// contributor has been paid.
pub fn contributor_payout(
    action: &ContributorPayoutAction,
    ledger: &mut dyn LedgerStore,
) -> Result<(), ActionError> {
    let symbol = action.symbol;
    let record = ico(ledger, symbol)?;
    record.require_outcome(IcoOutcome::Launch)?;
    if matches!(record.phase, IcoPhase::ContributorsPaid | IcoPhase::Complete) {
        return Ok(());
    }
    record.require_phase(IcoPhase::PayoutReady)?;
    let processed = record
        .processed_contributions
        .checked_add(action.contribution.amount)
        .ok_or(ApplyError::Overflow("processed contributions"))?;
    let key = contribution_key(symbol, &action.contributor, action.contribution_id);
    if ledger.contribution(&key).is_none() {
        return Err(ApplyError::UnknownContribution {
            symbol,
            contributor: action.contributor.clone(),
            contribution_id: action.contribution_id,
        }
        .into());
    }

    let issued = execute_payouts(ledger, symbol, &action.contributor, &action.payouts)?;
    if issued > 0 {
        adjust_supply(ledger, symbol, issued)?;
    }
    ico_mut(ledger, symbol)?.processed_contributions = processed;
    ledger.remove_contribution(&key);
    if !schedule_next_contributor_payout(ledger, symbol)? {
        schedule_founder_payout(ledger, symbol)?;
    }
    Ok(())
}

/// Pays the founders, seeds the market maker and reward balance and sets the
/// vesting ballast. A no-op once the ICO is complete.
pub fn founder_payout(
    action: &FounderPayoutAction,
    ledger: &mut dyn LedgerStore,
) -> Result<(), ActionError> {
    let symbol = action.symbol;
    let record = ico(ledger, symbol)?;
    record.require_outcome(IcoOutcome::Launch)?;
    if record.phase == IcoPhase::Complete {
        return Ok(());
    }
    record.require_phase(IcoPhase::ContributorsPaid)?;
    for amount in [action.market_maker_core, action.market_maker_tokens, action.reward_balance] {
        if amount < 0 {
            return Err(ApplyError::Overflow("negative founder payout term").into());
        }
    }
    for (account, payouts) in &action.account_payouts {
        if ledger.account(account).is_none() {
            return Err(ApplyError::UnknownAccount(account.clone()).into());
        }
        check_payouts(symbol, payouts)?;
    }

    let mut issued: i64 = 0;
    for (account, payouts) in &action.account_payouts {
        let paid = execute_payouts(ledger, symbol, account, payouts)?;
        issued = issued.checked_add(paid).ok_or(ApplyError::Overflow("founder issuance"))?;
    }
    issued = issued
        .checked_add(action.market_maker_tokens)
        .and_then(|sum| sum.checked_add(action.reward_balance))
        .ok_or(ApplyError::Overflow("founder issuance"))?;
    {
        let token = ledger.token_mut(symbol).ok_or(ApplyError::UnknownToken(symbol))?;
        token.market_maker.core_balance = action.market_maker_core;
        token.market_maker.token_balance = action.market_maker_tokens;
        token.reward_balance = action.reward_balance;
    }
    if issued > 0 {
        adjust_supply(ledger, symbol, issued)?;
    }

    let token = ledger.token_mut(symbol).ok_or(ApplyError::UnknownToken(symbol))?;
    let ballast = i128::from(token.current_supply) * i128::from(SST_BALLAST_SUPPLY_PERCENT)
        / i128::from(PERCENT_100);
    token.total_vesting_fund_ballast =
        i64::try_from(ballast).map_err(|_| ApplyError::Overflow("ballast"))?;
    token.total_vesting_shares_ballast = token
        .total_vesting_fund_ballast
        .checked_mul(SST_INITIAL_VESTING_PER_UNIT)
        .ok_or(ApplyError::Overflow("ballast shares"))?;
    set_ico_phase(ledger, symbol, IcoPhase::Complete)?;
    Ok(())
}
