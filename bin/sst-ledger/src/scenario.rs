//! Genesis ledgers and block replay.

use eyre::WrapErr;
use serde::Deserialize;
use sst_chain::{
    ico::{record_contribution, setup_ico, IcoSetup},
    maintenance::queue_claim,
    sst::{create_token, setup_emissions},
    state::adjust_balance,
    Account, ActionBlock, BlockProcessor, EmissionSchedule, LedgerStore, MemoryLedger,
    ProtocolConfig,
};
use sst_protocol::{
    AccountName, Asset, AssetSymbol, CurveId, OptionalAutomatedAction, RequiredAutomatedAction,
    TimePointSec,
};
use sst_rewards::{FundId, PendingClaim};
use tracing::{debug, info};

/// Initial state of a replay.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Genesis {
    #[serde(default)]
    head_time: TimePointSec,
    #[serde(default)]
    accounts: Vec<GenesisAccount>,
    #[serde(default)]
    tokens: Vec<GenesisToken>,
    #[serde(default)]
    reward_funds: Vec<GenesisRewardFund>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenesisAccount {
    name: AccountName,
    #[serde(default)]
    balances: Vec<Asset>,
}

/// A token in setup, with its emission schedules and optional ICO.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenesisToken {
    symbol: AssetSymbol,
    control_account: AccountName,
    max_supply: i64,
    #[serde(default)]
    emissions: Vec<EmissionSchedule>,
    #[serde(default)]
    ico: Option<IcoSetup>,
}

/// A reward fund created with the protocol's fund defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenesisRewardFund {
    id: FundId,
    reward_balance: Asset,
    #[serde(default)]
    author_reward_curve: CurveId,
    #[serde(default)]
    curation_reward_curve: CurveId,
}

impl Genesis {
    /// Builds the ledger through the same entry points a running chain uses.
    pub(crate) fn build(self, config: &ProtocolConfig) -> eyre::Result<MemoryLedger> {
        let mut ledger = MemoryLedger::new(self.head_time);
        for account in self.accounts {
            let name = account.name;
            ledger.create_account(Account::new(name.clone()))?;
            for balance in account.balances {
                adjust_balance(&mut ledger, &name, balance)
                    .wrap_err_with(|| format!("failed to fund {name}"))?;
            }
        }
        for token in self.tokens {
            let symbol = token.symbol;
            let control_account = token.control_account;
            create_token(&mut ledger, symbol, control_account.clone(), token.max_supply)
                .wrap_err_with(|| format!("failed to create {symbol}"))?;
            for schedule in token.emissions {
                eyre::ensure!(
                    schedule.symbol == symbol,
                    "emission schedule for {} listed under {symbol}",
                    schedule.symbol
                );
                setup_emissions(&mut ledger, &control_account, schedule)?;
            }
            if let Some(setup) = token.ico {
                eyre::ensure!(
                    setup.symbol == symbol,
                    "ICO for {} listed under {symbol}",
                    setup.symbol
                );
                setup_ico(&mut ledger, &control_account, setup)
                    .wrap_err_with(|| format!("failed to set up the ICO of {symbol}"))?;
            }
        }
        for fund in self.reward_funds {
            let fund = config.new_reward_fund(
                fund.id,
                fund.reward_balance,
                self.head_time,
                fund.author_reward_curve,
                fund.curation_reward_curve,
            );
            ledger.create_reward_fund(fund)?;
        }
        info!(
            target: "sst::ledger",
            accounts = ledger.account_count(),
            tokens = ledger.token_symbols().len(),
            funds = ledger.reward_fund_ids().len(),
            "Built genesis ledger"
        );
        Ok(ledger)
    }
}

/// One block of a replay. Without `required` and `optional` the block is
/// assembled by the producer. Contributions and claims are recorded after the
/// block, at its timestamp.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScenarioBlock {
    timestamp: TimePointSec,
    #[serde(default)]
    required: Option<Vec<RequiredAutomatedAction>>,
    #[serde(default)]
    optional: Option<Vec<OptionalAutomatedAction>>,
    #[serde(default)]
    contributions: Vec<ScenarioContribution>,
    #[serde(default)]
    claims: Vec<ScenarioClaim>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioContribution {
    symbol: AssetSymbol,
    contributor: AccountName,
    contribution_id: u32,
    amount: Asset,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioClaim {
    fund: FundId,
    claim: PendingClaim,
}

/// Applies `blocks` in order, stopping at the first rejected one.
pub(crate) fn replay(
    processor: &BlockProcessor,
    ledger: &mut MemoryLedger,
    blocks: Vec<ScenarioBlock>,
) -> eyre::Result<()> {
    for (number, step) in blocks.into_iter().enumerate() {
        let block = match (step.required, step.optional) {
            (None, None) => processor.produce_block(&*ledger, step.timestamp)?,
            (required, optional) => ActionBlock {
                timestamp: step.timestamp,
                required: required.unwrap_or_default(),
                optional: optional.unwrap_or_default(),
            },
        };
        let report = processor
            .apply_block(ledger, &block)
            .wrap_err_with(|| format!("block {number} at {} was rejected", step.timestamp))?;
        info!(
            target: "sst::ledger",
            number,
            hash = %report.hash,
            timestamp = %report.timestamp,
            required = report.required_applied,
            optional = report.optional_applied.len(),
            skipped = report.optional_skipped.len(),
            "Replayed block"
        );
        for (index, err) in &report.optional_skipped {
            debug!(target: "sst::ledger", number, index, %err, "Optional action skipped");
        }

        for contribution in step.contributions {
            record_contribution(
                ledger,
                contribution.symbol,
                &contribution.contributor,
                contribution.contribution_id,
                contribution.amount,
            )
            .wrap_err_with(|| format!("contribution after block {number} was rejected"))?;
        }
        for ScenarioClaim { fund, claim } in step.claims {
            queue_claim(ledger, fund, claim)
                .wrap_err_with(|| format!("claim after block {number} was rejected"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sst_chain::IcoPhase;
    use sst_protocol::{GenerationUnit, IcoLaunchAction, UnitTarget};

    fn symbol() -> AssetSymbol {
        AssetSymbol::from_nai_data(10_000_000, 3).unwrap()
    }

    fn genesis() -> Genesis {
        let setup = IcoSetup {
            symbol: symbol(),
            contribution_begin_time: TimePointSec::from_secs(100),
            contribution_end_time: TimePointSec::from_secs(200),
            launch_time: TimePointSec::from_secs(300),
            core_satoshi_min: 500,
            unit_ratio: 1,
            generation_unit: GenerationUnit {
                core_unit: [(UnitTarget::from("alice"), 1)].into_iter().collect(),
                token_unit: [(UnitTarget::from("$from"), 1)].into_iter().collect(),
            },
        };
        serde_json::from_value(json!({
            "accounts": [
                { "name": "alice" },
                { "name": "bob", "balances": [Asset::core(2_000)] },
            ],
            "tokens": [{
                "symbol": symbol(),
                "control_account": "alice",
                "max_supply": i64::MAX,
                "ico": setup,
            }],
        }))
        .unwrap()
    }

    fn blocks(value: serde_json::Value) -> Vec<ScenarioBlock> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_replay_runs_an_ico_to_completion() {
        let processor = BlockProcessor::new(ProtocolConfig::default());
        let mut ledger = genesis().build(&ProtocolConfig::default()).unwrap();
        let contribution = json!({
            "symbol": symbol(),
            "contributor": "bob",
            "contribution_id": 0,
            "amount": Asset::core(1_000),
        });
        let steps = blocks(json!([
            { "timestamp": 50, "required": [] },
            { "timestamp": 100, "contributions": [contribution] },
            { "timestamp": 200 },
            { "timestamp": 300 },
        ]));
        replay(&processor, &mut ledger, steps).unwrap();

        assert_eq!(ledger.ico(symbol()).unwrap().phase, IcoPhase::Complete);
        assert_eq!(ledger.token(symbol()).unwrap().current_supply, 1_000);
        let balance = |name: &str, symbol| {
            ledger.account(&AccountName::from(name)).unwrap().balance(symbol)
        };
        assert_eq!(balance("bob", symbol()), 1_000);
        assert_eq!(balance("bob", AssetSymbol::CORE), 1_000);
        assert_eq!(balance("alice", AssetSymbol::CORE), 1_000);
    }

    #[test]
    fn test_replay_stops_at_rejected_block() {
        let processor = BlockProcessor::new(ProtocolConfig::default());
        let mut ledger = genesis().build(&ProtocolConfig::default()).unwrap();
        let launch = RequiredAutomatedAction::from(IcoLaunchAction {
            control_account: "alice".into(),
            symbol: symbol(),
        });
        let steps = blocks(json!([
            { "timestamp": 100, "required": [] },
            { "timestamp": 100, "required": [launch] },
        ]));
        let err = replay(&processor, &mut ledger, steps).unwrap_err();
        assert!(err.to_string().contains("block 0"), "{err}");
        assert_eq!(ledger.head_time(), TimePointSec::ZERO);
    }

    #[test]
    fn test_genesis_funds_take_protocol_defaults() {
        let genesis: Genesis = serde_json::from_value(json!({
            "head_time": 500,
            "reward_funds": [
                { "id": 0, "reward_balance": Asset::core(100) },
                {
                    "id": 1,
                    "reward_balance": Asset::core(100),
                    "author_reward_curve": "convergent_linear",
                },
            ],
        }))
        .unwrap();
        let config = ProtocolConfig {
            default_percent_curation_rewards: 5_000,
            convergent_recent_claims_seed: 77,
            ..Default::default()
        };
        let ledger = genesis.build(&config).unwrap();

        let linear = ledger.reward_fund(FundId(0)).unwrap();
        assert_eq!(linear.percent_curation_rewards, 5_000);
        assert_eq!(linear.content_constant, config.default_content_constant);
        assert_eq!(linear.last_update, TimePointSec::from_secs(500));
        assert_eq!(linear.recent_claims, 0);
        assert_eq!(ledger.reward_fund(FundId(1)).unwrap().recent_claims, 77);
    }

    #[test]
    fn test_genesis_rejects_misfiled_ico() {
        let mut genesis = genesis();
        let other = AssetSymbol::from_nai_data(10_000_001, 3).unwrap();
        if let Some(setup) = genesis.tokens[0].ico.as_mut() {
            setup.symbol = other;
        }
        assert!(genesis.build(&ProtocolConfig::default()).is_err());
        assert!(Genesis::default().build(&ProtocolConfig::default()).is_ok());
    }
}
