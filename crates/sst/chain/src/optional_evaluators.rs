//! Evaluators of the optional actions.

use crate::{
    error::{ActionError, ApplyError},
    sst::{controlled_token, emission_schedule_at, generate_emissions, next_emission_time, SstToken},
    state::{adjust_balance, adjust_supply, create_vesting, LedgerStore},
};
use sst_protocol::{
    unit_target::{
        get_unit_target_account, is_founder_vesting, is_market_maker, is_rewards, is_vesting,
    },
    Asset, TokenEmissionAction,
};
use tracing::debug;

/// Issues one scheduled emission.
///
/// The action must carry the next emission instant after the token's last
/// one, that instant must have passed, and the amounts must equal what the
/// schedule generates for it.
pub fn token_emission(
    action: &TokenEmissionAction,
    ledger: &mut dyn LedgerStore,
) -> Result<(), ActionError> {
    let symbol = action.symbol;
    let emission_time = action.emission_time;
    let head_time = ledger.head_time();
    let token = controlled_token(ledger, symbol, &action.control_account)?;
    if emission_time > head_time {
        return Err(ApplyError::EmissionNotDue { symbol, emission_time, head_time }.into());
    }
    let schedules = ledger.emission_schedules(symbol);
    let expected = next_emission_time(schedules, token.last_virtual_emission_time)
        .ok_or(ApplyError::NoUpcomingEmission(symbol))?;
    if expected != emission_time {
        return Err(
            ApplyError::EmissionTimeMismatch { symbol, expected, actual: emission_time }.into()
        );
    }
    let schedule =
        emission_schedule_at(schedules, expected).ok_or(ApplyError::NoUpcomingEmission(symbol))?;
    if generate_emissions(token, schedule, expected) != action.emissions {
        return Err(ApplyError::EmissionMismatch(symbol).into());
    }
    let total = action
        .emissions
        .values()
        .try_fold(0i64, |total, amount| total.checked_add(*amount))
        .ok_or(ApplyError::Overflow("emission total"))?;
    // the supply bound is checked before any credit lands
    {
        let token = ledger.token(symbol).ok_or(ApplyError::UnknownToken(symbol))?;
        let max_supply = token.max_supply;
        if token.current_supply.checked_add(total).is_none_or(|supply| supply > max_supply) {
            return Err(ApplyError::MaxSupplyExceeded { symbol, max_supply }.into());
        }
    }

    for (target, amount) in &action.emissions {
        let target = target.as_str();
        let credit = Asset::new(*amount, symbol);
        if is_market_maker(target) {
            credit_token(ledger, action, |token| &mut token.market_maker.token_balance, *amount)?;
        } else if is_rewards(target) {
            credit_token(ledger, action, |token| &mut token.reward_balance, *amount)?;
        } else if is_vesting(target) {
            credit_token(ledger, action, |token| &mut token.total_vesting_fund, *amount)?;
        } else if is_founder_vesting(target) {
            let account = get_unit_target_account(target)?;
            create_vesting(ledger, &account, credit)?;
        } else {
            let account = get_unit_target_account(target)?;
            adjust_balance(ledger, &account, credit)?;
        }
    }
    adjust_supply(ledger, symbol, total)?;
    if let Some(token) = ledger.token_mut(symbol) {
        token.last_virtual_emission_time = emission_time;
    }
    debug!(target: "sst::chain", %symbol, %emission_time, total, "Applied token emission");
    Ok(())
}

fn credit_token(
    ledger: &mut dyn LedgerStore,
    action: &TokenEmissionAction,
    field: impl FnOnce(&mut SstToken) -> &mut i64,
    amount: i64,
) -> Result<(), ApplyError> {
    let token = ledger.token_mut(action.symbol).ok_or(ApplyError::UnknownToken(action.symbol))?;
    let balance = field(token);
    *balance = balance.checked_add(amount).ok_or(ApplyError::Overflow("token emission"))?;
    Ok(())
}
