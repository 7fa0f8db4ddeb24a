//! SST ledger tool.
//!
//! Replays scenarios against the in-memory ledger and inspects automated
//! actions. JSON goes to stdout, logs to stderr.
//!
//! Usage:
//!   sst-ledger replay --genesis genesis.json --blocks blocks.json
//!   sst-ledger decode --family required 0x00...
//!   sst-ledger settle --funds funds.json --now 3600
//!   sst-ledger schema --family optional

mod scenario;

use alloy_primitives::hex;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use eyre::WrapErr;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use sst_chain::{BlockProcessor, ProtocolConfig};
use sst_protocol::{
    decode_exact, OptionalAutomatedAction, ReflectFamily, RequiredAutomatedAction, TimePointSec,
};
use sst_rewards::{settle_funds, PendingClaim, RewardFundContext};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

/// SST ledger tool
#[derive(Debug, Parser)]
#[command(name = "sst-ledger", version)]
#[command(about = "Replays SST ledger scenarios and inspects automated actions")]
struct Cli {
    /// Log verbosity: -v for debug, -vv for trace. `RUST_LOG` takes precedence.
    #[arg(long = "verbosity", short = 'v', action = ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply a scenario's blocks to its genesis ledger and print the final ledger.
    Replay {
        /// Genesis file (JSON).
        #[arg(long)]
        genesis: PathBuf,
        /// Blocks file (JSON). Blocks without actions are assembled by the producer.
        #[arg(long)]
        blocks: Option<PathBuf>,
        /// Protocol parameters (TOML).
        #[arg(long, env = "SST_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Decode a hex-encoded action and print it with its id.
    Decode {
        /// Action family of the encoding.
        #[arg(long, value_enum, default_value_t = Family::Required)]
        family: Family,
        /// Encoded action, with or without a `0x` prefix.
        hex: String,
    },
    /// Settle reward funds against their claims once and print the payouts.
    Settle {
        /// Funds file (JSON): a list of `{ "fund": ..., "claims": [...] }`.
        #[arg(long)]
        funds: PathBuf,
        /// Settlement time, in seconds.
        #[arg(long)]
        now: u32,
        /// Protocol parameters (TOML).
        #[arg(long, env = "SST_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the reflected schema of the action families.
    Schema {
        /// Only this family.
        #[arg(long, value_enum)]
        family: Option<Family>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Family {
    Required,
    Optional,
}

/// One entry of a funds file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FundClaims {
    fund: RewardFundContext,
    #[serde(default)]
    claims: Vec<PendingClaim>,
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbosity)?;

    let output = match cli.command {
        Command::Replay { genesis, blocks, config } => {
            let config = load_config(config.as_deref())?;
            let genesis: scenario::Genesis = read_json(&genesis)?;
            let mut ledger = genesis.build(&config)?;
            let processor = BlockProcessor::new(config);
            let blocks = match blocks {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            scenario::replay(&processor, &mut ledger, blocks)?;
            serde_json::to_value(&ledger)?
        }
        Command::Decode { family, hex } => decode(family, &hex)?,
        Command::Settle { funds, now, config } => {
            let config = load_config(config.as_deref())?;
            settle(read_json(&funds)?, TimePointSec::from_secs(now), &config)?
        }
        Command::Schema { family } => schema(family)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(verbosity: u8) -> eyre::Result<()> {
    let level = match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> eyre::Result<ProtocolConfig> {
    let Some(path) = path else { return Ok(ProtocolConfig::default()) };
    let config = ProtocolConfig::load(path)?;
    info!(target: "sst::ledger", path = %path.display(), "Loaded protocol config");
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> eyre::Result<T> {
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).wrap_err_with(|| format!("failed to parse {}", path.display()))
}

fn decode(family: Family, encoded: &str) -> eyre::Result<Value> {
    let bytes = hex::decode(encoded.trim()).wrap_err("action is not valid hex")?;
    let (id, action) = match family {
        Family::Required => {
            let action: RequiredAutomatedAction = decode_exact(&bytes)?;
            (action.id(), serde_json::to_value(&action)?)
        }
        Family::Optional => {
            let action: OptionalAutomatedAction = decode_exact(&bytes)?;
            (action.id(), serde_json::to_value(&action)?)
        }
    };
    Ok(json!({ "id": id.to_string(), "action": action }))
}

fn settle(
    entries: Vec<FundClaims>,
    now: TimePointSec,
    config: &ProtocolConfig,
) -> eyre::Result<Value> {
    let (mut funds, claims): (Vec<_>, Vec<_>) =
        entries.into_iter().map(|entry| (entry.fund, entry.claims)).unzip();
    let reports = settle_funds(&mut funds, &claims, now, &config.reward_params())?;
    info!(
        target: "sst::ledger",
        %now,
        funds = funds.len(),
        paid = reports.iter().map(|report| report.paid).sum::<i64>(),
        "Settled reward funds"
    );
    Ok(json!({ "reports": reports, "funds": funds }))
}

fn schema(family: Option<Family>) -> eyre::Result<Value> {
    let required = || serde_json::to_value(RequiredAutomatedAction::family_schema());
    let optional = || serde_json::to_value(OptionalAutomatedAction::family_schema());
    Ok(match family {
        Some(Family::Required) => required()?,
        Some(Family::Optional) => optional()?,
        None => json!([required()?, optional()?]),
    })
}
