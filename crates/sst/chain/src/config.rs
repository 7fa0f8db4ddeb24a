//! Protocol parameters.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sst_protocol::{
    constants::{
        CONTENT_CONSTANT, CONVERGENT_RECENT_CLAIMS_SEED, PERCENT_100,
        SST_DEFAULT_PERCENT_CURATION_REWARDS,
    },
    Asset, CurveId, TimePointSec,
};
use sst_rewards::{FundId, RewardFundContext, RewardParams};
use std::path::Path;

/// Fifteen days.
const DEFAULT_RECENT_CLAIMS_DECAY_SECONDS: u32 = 15 * 24 * 60 * 60;

/// Consensus parameters every node must agree on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Window over which recent claims decay to zero.
    pub recent_claims_decay_seconds: u32,
    /// Cap on a single bounded-curve payout, in basis points of the fund.
    pub bounded_curve_ceiling_bps: u16,
    /// Largest encoded block, in bytes.
    pub max_block_size: usize,
    /// Share of the block reserved for required actions, in basis points.
    pub required_actions_partition_percent: u16,
    /// Content constant given to new reward funds.
    pub default_content_constant: u128,
    /// Curation share given to new reward funds, in basis points.
    pub default_percent_curation_rewards: u16,
    /// Recent claims a new fund with a convergent curve starts from.
    pub convergent_recent_claims_seed: u128,
    /// Seconds between reward maintenance passes.
    pub maintenance_interval_seconds: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            recent_claims_decay_seconds: DEFAULT_RECENT_CLAIMS_DECAY_SECONDS,
            bounded_curve_ceiling_bps: 1_000,
            max_block_size: 65_536,
            required_actions_partition_percent: 2_500,
            default_content_constant: CONTENT_CONSTANT,
            default_percent_curation_rewards: SST_DEFAULT_PERCENT_CURATION_REWARDS,
            convergent_recent_claims_seed: CONVERGENT_RECENT_CLAIMS_SEED,
            maintenance_interval_seconds: 3_600,
        }
    }
}

impl ProtocolConfig {
    /// Reads and validates a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&contents)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bps = [
            ("bounded_curve_ceiling_bps", self.bounded_curve_ceiling_bps),
            ("required_actions_partition_percent", self.required_actions_partition_percent),
            ("default_percent_curation_rewards", self.default_percent_curation_rewards),
        ];
        for (field, value) in bps {
            if value > PERCENT_100 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} exceeds {PERCENT_100} basis points"),
                });
            }
        }
        if self.recent_claims_decay_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "recent_claims_decay_seconds",
                reason: "must be positive".to_owned(),
            });
        }
        if self.maintenance_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "maintenance_interval_seconds",
                reason: "must be positive".to_owned(),
            });
        }
        if self.max_block_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_block_size",
                reason: "must be positive".to_owned(),
            });
        }
        Ok(())
    }

    /// Bytes of a block reserved for required actions.
    pub const fn required_actions_partition_size(&self) -> usize {
        let percent = self.required_actions_partition_percent as usize;
        self.max_block_size * percent / PERCENT_100 as usize
    }

    /// A new reward fund with this configuration's content constant and
    /// curation share. Convergent funds start from the configured seed.
    pub fn new_reward_fund(
        &self,
        id: FundId,
        reward_balance: Asset,
        last_update: TimePointSec,
        author_reward_curve: CurveId,
        curation_reward_curve: CurveId,
    ) -> RewardFundContext {
        let mut fund = RewardFundContext::new(id, reward_balance, last_update);
        fund.author_reward_curve = author_reward_curve;
        fund.curation_reward_curve = curation_reward_curve;
        fund.content_constant = self.default_content_constant;
        fund.percent_curation_rewards = self.default_percent_curation_rewards;
        fund.seed_recent_claims(self.convergent_recent_claims_seed);
        fund
    }

    /// Settlement parameters for the reward engine.
    pub const fn reward_params(&self) -> RewardParams {
        RewardParams {
            decay_window_seconds: self.recent_claims_decay_seconds,
            bounded_ceiling_bps: self.bounded_curve_ceiling_bps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recent_claims_decay_seconds, 1_296_000);
        assert_eq!(config.required_actions_partition_size(), 16_384);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_block_size = 1024\nmaintenance_interval_seconds = 60").unwrap();

        let config = ProtocolConfig::load(file.path()).unwrap();
        assert_eq!(config.max_block_size, 1024);
        assert_eq!(config.maintenance_interval_seconds, 60);
        assert_eq!(config.bounded_curve_ceiling_bps, 1_000);
    }

    #[test]
    fn test_new_reward_fund_uses_configured_defaults() {
        let config = ProtocolConfig {
            default_content_constant: 7,
            default_percent_curation_rewards: 5_000,
            convergent_recent_claims_seed: 42,
            ..Default::default()
        };
        let start = TimePointSec::from_secs(60);
        let linear = CurveId::Linear;
        let linear = config.new_reward_fund(FundId(1), Asset::core(10), start, linear, linear);
        assert_eq!(linear.content_constant, 7);
        assert_eq!(linear.percent_curation_rewards, 5_000);
        assert_eq!(linear.last_update, start);
        assert_eq!(linear.recent_claims, 0);

        let convergent = config.new_reward_fund(
            FundId(2),
            Asset::core(10),
            start,
            CurveId::ConvergentLinear,
            CurveId::ConvergentSquareRoot,
        );
        assert_eq!(convergent.recent_claims, 42);
        assert_eq!(convergent.curation_reward_curve, CurveId::ConvergentSquareRoot);

        let config = ProtocolConfig::from_toml("convergent_recent_claims_seed = 1000").unwrap();
        assert_eq!(config.convergent_recent_claims_seed, 1_000);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_matches!(
            ProtocolConfig::from_toml("bounded_curve_ceiling_bps = 10001"),
            Err(ConfigError::Invalid { field: "bounded_curve_ceiling_bps", .. })
        );
        assert_matches!(
            ProtocolConfig::from_toml("recent_claims_decay_seconds = 0"),
            Err(ConfigError::Invalid { field: "recent_claims_decay_seconds", .. })
        );
        assert_matches!(
            ProtocolConfig::from_toml("max_block_size = \"big\""),
            Err(ConfigError::Parse(_))
        );
        assert_matches!(
            ProtocolConfig::load("/nonexistent/sst.toml"),
            Err(ConfigError::Io { .. })
        );
    }
}
