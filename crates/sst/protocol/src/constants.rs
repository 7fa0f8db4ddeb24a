//! Fixed protocol constants.

/// 100% in basis points.
pub const PERCENT_100: u16 = 10_000;

/// 1% in basis points.
pub const PERCENT_1: u16 = PERCENT_100 / 100;

/// Shortest valid account name.
pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;

/// Longest valid account name; also the wire capacity of the type.
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 16;

/// Wire capacity of a unit target.
pub const MAX_UNIT_TARGET_LENGTH: usize = 32;

/// Largest NAI data value.
pub const SST_MAX_NAI: u32 = 99_999_999;

/// Smallest NAI data value.
pub const SST_MIN_NAI: u32 = 1;

/// Most decimal places an asset may carry.
pub const ASSET_MAX_DECIMALS: u8 = 12;

/// Emission count meaning "no end".
pub const SST_EMIT_INDEFINITELY: u32 = u32::MAX;

/// Share of supply seeded into the vesting ballast after launch, in basis points.
pub const SST_BALLAST_SUPPLY_PERCENT: u16 = PERCENT_1 / 10;

/// Vesting shares minted per ballast unit.
pub const SST_INITIAL_VESTING_PER_UNIT: i64 = 1_000_000;

/// Maximum routes in one side of a generation or emissions unit.
pub const SST_MAX_UNIT_ROUTES: usize = 10;

/// Default curvature constant for reward curves.
pub const CONTENT_CONSTANT: u128 = 2_000_000_000_000;

/// Default curation share of a payout, in basis points.
pub const SST_DEFAULT_PERCENT_CURATION_REWARDS: u16 = 25 * PERCENT_1;

/// Recent claims a fresh convergent fund starts from.
pub const CONVERGENT_RECENT_CLAIMS_SEED: u128 = 503_600_561_838_938_636;
