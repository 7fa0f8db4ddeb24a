//! Per-interval maintenance: reward fund settlement.
//!
//! Claims queue up against a fund between passes. A pass settles every fund
//! at once, credits authors with liquid tokens and curators with vesting, and
//! clears the queues.

use crate::{
    config::ProtocolConfig,
    error::{ApplyError, MaintenanceError},
    state::{adjust_balance, create_vesting, LedgerStore},
};
use sst_protocol::{Asset, TimePointSec};
use sst_rewards::{settle_funds, FundId, PendingClaim, RewardFundContext, SettlementReport};
use tracing::{debug, info};

/// Queues a claim against `fund` for the next pass.
pub fn queue_claim(
    ledger: &mut dyn LedgerStore,
    fund: FundId,
    claim: PendingClaim,
) -> Result<(), ApplyError> {
    if ledger.reward_fund(fund).is_none() {
        return Err(ApplyError::UnknownRewardFund(fund));
    }
    let curators = claim.curators.iter().map(|c| &c.curator);
    let accounts = std::iter::once(&claim.author).chain(curators);
    for account in accounts {
        if ledger.account(account).is_none() {
            return Err(ApplyError::UnknownAccount(account.clone()));
        }
    }
    debug!(
        target: "sst::chain",
        %fund,
        author = %claim.author,
        weight = claim.weight,
        "Queued reward claim"
    );
    ledger.push_claim(fund, claim);
    Ok(())
}

/// Whether a pass is due at `now`.
pub fn is_due(ledger: &dyn LedgerStore, config: &ProtocolConfig, now: TimePointSec) -> bool {
    now >= ledger.last_maintenance().saturating_add(u64::from(config.maintenance_interval_seconds))
}

/// Settles every reward fund against its queued claims and pays out.
///
/// On error the ledger may be partially updated; the caller runs this on a
/// staged copy.
pub fn run_maintenance(
    ledger: &mut dyn LedgerStore,
    config: &ProtocolConfig,
    now: TimePointSec,
) -> Result<Vec<SettlementReport>, MaintenanceError> {
    let ids = ledger.reward_fund_ids();
    let mut funds = Vec::with_capacity(ids.len());
    let mut claims = Vec::with_capacity(ids.len());
    for id in &ids {
        let fund = ledger.reward_fund(*id).ok_or(ApplyError::UnknownRewardFund(*id))?;
        funds.push(fund.clone());
        claims.push(ledger.queued_claims(*id).to_vec());
    }

    let reports = settle_funds(&mut funds, &claims, now, &config.reward_params())?;

    for (fund, report) in funds.iter().zip(&reports) {
        pay_out(ledger, fund, report)?;
    }
    for fund in funds {
        let id = fund.id;
        ledger.take_claims(id);
        if let Some(stored) = ledger.reward_fund_mut(id) {
            *stored = fund;
        }
    }
    ledger.set_last_maintenance(now);
    info!(
        target: "sst::chain",
        %now,
        funds = reports.len(),
        paid = reports.iter().map(|r| r.paid).sum::<i64>(),
        "Maintenance pass complete"
    );
    Ok(reports)
}

fn pay_out(
    ledger: &mut dyn LedgerStore,
    fund: &RewardFundContext,
    report: &SettlementReport,
) -> Result<(), ApplyError> {
    let symbol = fund.reward_balance.symbol;
    for payout in &report.payouts {
        if payout.author_tokens > 0 {
            adjust_balance(ledger, &payout.author, Asset::new(payout.author_tokens, symbol))?;
        }
        for curator in &payout.curators {
            if curator.amount > 0 {
                create_vesting(ledger, &curator.curator, Asset::new(curator.amount, symbol))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Account, MemoryLedger};
    use assert_matches::assert_matches;
    use sst_protocol::{AccountName, AssetSymbol, CurveId};
    use sst_rewards::CuratorClaim;

    fn ledger() -> MemoryLedger {
        let mut ledger = MemoryLedger::new(TimePointSec::from_secs(10_000));
        for name in ["alice", "bob", "carol"] {
            ledger.create_account(Account::new(name)).unwrap();
        }
        let mut fund =
            RewardFundContext::new(FundId(0), Asset::core(100), TimePointSec::from_secs(10_000));
        fund.recent_claims = 1_000;
        fund.percent_curation_rewards = 0;
        ledger.create_reward_fund(fund).unwrap();
        ledger
    }

    fn config() -> ProtocolConfig {
        ProtocolConfig::default()
    }

    fn balance(ledger: &MemoryLedger, name: &str) -> i64 {
        ledger.account(&AccountName::from(name)).unwrap().balance(AssetSymbol::CORE)
    }

    #[test]
    fn test_queue_claim_checks_fund_and_accounts() {
        let mut ledger = ledger();
        assert_matches!(
            queue_claim(&mut ledger, FundId(7), PendingClaim::new("alice", 1)),
            Err(ApplyError::UnknownRewardFund(FundId(7)))
        );
        let mut claim = PendingClaim::new("alice", 1);
        claim.curators.push(CuratorClaim { curator: "dave".into(), weight: 1 });
        assert_matches!(
            queue_claim(&mut ledger, FundId(0), claim),
            Err(ApplyError::UnknownAccount(_))
        );
        assert!(ledger.queued_claims(FundId(0)).is_empty());
    }

    #[test]
    fn test_pass_pays_and_clears_queue() {
        let mut ledger = ledger();
        queue_claim(&mut ledger, FundId(0), PendingClaim::new("alice", 300)).unwrap();
        queue_claim(&mut ledger, FundId(0), PendingClaim::new("bob", 700)).unwrap();

        let now = TimePointSec::from_secs(13_600);
        assert!(is_due(&ledger, &config(), now));
        let reports = run_maintenance(&mut ledger, &config(), now).unwrap();
        // an hour of decay leaves 998, the claims themselves bound the share
        assert_eq!(reports[0].decayed_claims, 998);
        assert_eq!(reports[0].paid, 100);

        assert_eq!(balance(&ledger, "alice"), 30);
        assert_eq!(balance(&ledger, "bob"), 70);
        let fund = ledger.reward_fund(FundId(0)).unwrap();
        assert_eq!(fund.reward_balance, Asset::core(0));
        assert_eq!(fund.tokens_awarded, 100);
        assert_eq!(fund.recent_claims, 1_998);
        assert_eq!(fund.last_update, now);
        assert!(ledger.queued_claims(FundId(0)).is_empty());
        assert_eq!(ledger.last_maintenance(), now);
        assert!(!is_due(&ledger, &config(), now));
    }

    #[test]
    fn test_consecutive_passes_decay_and_accumulate() {
        let mut ledger = ledger();
        let fund = ledger.reward_fund_mut(FundId(0)).unwrap();
        fund.recent_claims = 1_000_000;
        fund.reward_balance = Asset::core(10_000);

        queue_claim(&mut ledger, FundId(0), PendingClaim::new("alice", 100_000)).unwrap();
        queue_claim(&mut ledger, FundId(0), PendingClaim::new("bob", 300_000)).unwrap();
        let reports = run_maintenance(&mut ledger, &config(), TimePointSec::from_secs(13_600))
            .unwrap();
        assert_eq!(reports[0].decayed_claims, 997_223);
        assert_eq!(reports[0].paid, 1_002 + 3_008);
        assert_eq!(balance(&ledger, "alice"), 1_002);
        assert_eq!(balance(&ledger, "bob"), 3_008);
        assert_eq!(ledger.reward_fund(FundId(0)).unwrap().recent_claims, 1_397_223);

        queue_claim(&mut ledger, FundId(0), PendingClaim::new("alice", 200_000)).unwrap();
        let reports = run_maintenance(&mut ledger, &config(), TimePointSec::from_secs(17_200))
            .unwrap();
        assert_eq!(reports[0].decayed_claims, 1_393_342);
        assert_eq!(reports[0].paid, 859);
        assert_eq!(balance(&ledger, "alice"), 1_002 + 859);
        let fund = ledger.reward_fund(FundId(0)).unwrap();
        assert_eq!(fund.recent_claims, 1_593_342);
        assert_eq!(fund.reward_balance, Asset::core(5_131));
        assert_eq!(fund.tokens_awarded, 4_869);
    }

    #[test]
    fn test_fresh_convergent_fund_pays_out() {
        let mut ledger = ledger();
        let config = config();
        let fund = config.new_reward_fund(
            FundId(1),
            Asset::core(1_000_000_000_000),
            TimePointSec::from_secs(10_000),
            CurveId::ConvergentLinear,
            CurveId::ConvergentSquareRoot,
        );
        ledger.create_reward_fund(fund).unwrap();

        for pass in 1..=3u32 {
            queue_claim(&mut ledger, FundId(1), PendingClaim::new("alice", 10u128.pow(15)))
                .unwrap();
            let now = TimePointSec::from_secs(10_000 + pass * 3_600);
            let reports = run_maintenance(&mut ledger, &config, now).unwrap();
            assert!(reports[1].paid > 0, "pass {pass} paid nothing");
            assert!(ledger.reward_fund(FundId(1)).unwrap().recent_claims > 0);
        }
        let fund = ledger.reward_fund(FundId(1)).unwrap();
        assert_eq!(balance(&ledger, "alice"), fund.tokens_awarded);
    }

    #[test]
    fn test_curators_receive_vesting() {
        let mut ledger = ledger();
        ledger.reward_fund_mut(FundId(0)).unwrap().percent_curation_rewards = 5_000;
        let mut claim = PendingClaim::new("alice", 1_000);
        claim.curators.push(CuratorClaim { curator: "carol".into(), weight: 1 });
        queue_claim(&mut ledger, FundId(0), claim).unwrap();

        run_maintenance(&mut ledger, &config(), TimePointSec::from_secs(13_600)).unwrap();
        let carol = ledger.account(&AccountName::from("carol")).unwrap();
        assert_eq!(carol.balance(AssetSymbol::VESTS), 50);
        assert_eq!(carol.balance(AssetSymbol::CORE), 0);
        let alice = ledger.account(&AccountName::from("alice")).unwrap();
        assert_eq!(alice.balance(AssetSymbol::CORE), 50);
    }
}
