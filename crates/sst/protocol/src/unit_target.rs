//! Unit targets: the destinations of ICO generation units and token emissions.
//!
//! ```text
//! $from               the contributor, liquid
//! $from.vesting       the contributor, vesting
//! $market_maker       the token's market maker
//! $rewards            the token's reward balance
//! $vesting            the token's vesting fund
//! $!<name>.vesting    vesting balance of account <name>
//! <name>              liquid balance of account <name>
//! ```

use crate::{
    codec::{self, CodecError, Decodable, Encodable},
    constants::{MAX_UNIT_TARGET_LENGTH, SST_MAX_UNIT_ROUTES},
    types::AccountName,
    validation::{is_valid_account_name, Validate, ValidationError},
};
use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

const DESTINATION_ACCOUNT_PREFIX: &str = "$!";
const DESTINATION_VESTING_SUFFIX: &str = ".vesting";

/// Contributor, liquid.
pub const DESTINATION_FROM: &str = "$from";
/// Contributor, vesting.
pub const DESTINATION_FROM_VESTING: &str = "$from.vesting";
/// Market maker.
pub const DESTINATION_MARKET_MAKER: &str = "$market_maker";
/// Token reward balance.
pub const DESTINATION_REWARDS: &str = "$rewards";
/// Token vesting fund.
pub const DESTINATION_VESTING: &str = "$vesting";

/// Destination name, at most 32 bytes on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTarget(String);

impl UnitTarget {
    /// Wraps a target without checking it.
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    /// Founder-vesting target for `account`.
    pub fn founder_vesting(account: &AccountName) -> Self {
        Self(format!("{DESTINATION_ACCOUNT_PREFIX}{account}{DESTINATION_VESTING_SUFFIX}"))
    }

    /// The target as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitTarget {
    fn from(target: &str) -> Self {
        Self::new(target)
    }
}

impl From<&AccountName> for UnitTarget {
    fn from(account: &AccountName) -> Self {
        Self::new(account.as_str())
    }
}

impl fmt::Display for UnitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Encodable for UnitTarget {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.encode(out);
    }

    fn length(&self) -> usize {
        self.0.length()
    }
}

impl Decodable for UnitTarget {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        codec::decode_bounded_string(buf, MAX_UNIT_TARGET_LENGTH).map(Self)
    }
}

/// `$from` or `$from.vesting`.
pub fn is_contributor(target: &str) -> bool {
    target == DESTINATION_FROM || target == DESTINATION_FROM_VESTING
}

/// `$market_maker`.
pub fn is_market_maker(target: &str) -> bool {
    target == DESTINATION_MARKET_MAKER
}

/// `$rewards`.
pub fn is_rewards(target: &str) -> bool {
    target == DESTINATION_REWARDS
}

/// `$vesting`.
pub fn is_vesting(target: &str) -> bool {
    target == DESTINATION_VESTING
}

/// `$!<anything>.vesting` with a non-empty middle.
pub fn is_founder_vesting(target: &str) -> bool {
    target.len() > DESTINATION_ACCOUNT_PREFIX.len() + DESTINATION_VESTING_SUFFIX.len() &&
        target.starts_with(DESTINATION_ACCOUNT_PREFIX) &&
        target.ends_with(DESTINATION_VESTING_SUFFIX)
}

/// Anything that is not one of the special `$` destinations.
pub fn is_account_name_type(target: &str) -> bool {
    !(is_contributor(target) || is_rewards(target) || is_market_maker(target) || is_vesting(target))
}

/// Destinations credited as vesting rather than liquid.
pub fn is_vesting_type(target: &str) -> bool {
    target == DESTINATION_FROM_VESTING || is_vesting(target) || is_founder_vesting(target)
}

/// Account a target pays into: the target itself when it is an account name,
/// or `<name>` from `$!<name>.vesting`.
pub fn get_unit_target_account(target: &str) -> Result<AccountName, ValidationError> {
    let fail = |msg: String| Err(ValidationError::UnitTargetAccount(msg));
    if is_contributor(target) {
        return fail(
            "Cannot derive an account name from a contributor special destination.".to_owned(),
        );
    }
    if is_market_maker(target) {
        return fail("The market maker unit target is not a valid account.".to_owned());
    }
    if is_rewards(target) {
        return fail("The rewards unit target is not a valid account.".to_owned());
    }
    if is_valid_account_name(target) {
        return Ok(AccountName::new(target));
    }
    if !is_founder_vesting(target) {
        return fail(format!("Unit target '{target}' is malformed"));
    }
    let end = target.len() - DESTINATION_VESTING_SUFFIX.len();
    let name = &target[DESTINATION_ACCOUNT_PREFIX.len()..end];
    if !is_valid_account_name(name) {
        return fail(format!("The derived unit target account name '{name}' is invalid."));
    }
    Ok(AccountName::new(name))
}

/// Destinations a token emission may credit.
pub fn is_valid_emissions_destination(target: &str) -> bool {
    is_market_maker(target) ||
        is_rewards(target) ||
        is_vesting(target) ||
        is_valid_account_name(target) ||
        is_founder_vesting(target)
}

/// Any recognized destination.
pub fn is_valid_unit_target(target: &str) -> bool {
    is_valid_account_name(target) ||
        is_contributor(target) ||
        is_market_maker(target) ||
        is_rewards(target) ||
        is_vesting(target) ||
        is_founder_vesting(target)
}

/// Destinations allowed on the core side of a generation unit.
pub fn is_valid_ico_core_destination(target: &str) -> bool {
    is_valid_account_name(target) || is_market_maker(target) || is_founder_vesting(target)
}

/// Destinations allowed on the token side of a generation unit.
pub fn is_valid_ico_token_destination(target: &str) -> bool {
    is_valid_account_name(target) ||
        is_contributor(target) ||
        is_rewards(target) ||
        is_market_maker(target) ||
        is_founder_vesting(target)
}

wire_struct! {
    /// How one unit of ICO contribution is routed: core tokens on one side,
    /// newly issued tokens on the other.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GenerationUnit {
        /// Core-token routes and weights.
        pub core_unit: BTreeMap<UnitTarget, u16>,
        /// Token routes and weights.
        pub token_unit: BTreeMap<UnitTarget, u16>,
    }
}

impl GenerationUnit {
    /// Sum of the core-side weights.
    pub fn core_unit_sum(&self) -> u32 {
        self.core_unit.values().map(|w| u32::from(*w)).sum()
    }

    /// Sum of the token-side weights.
    pub fn token_unit_sum(&self) -> u32 {
        self.token_unit.values().map(|w| u32::from(*w)).sum()
    }
}

fn validate_routes(
    routes: &BTreeMap<UnitTarget, u16>,
    side: &'static str,
    allowed: fn(&str) -> bool,
) -> Result<(), ValidationError> {
    if routes.len() > SST_MAX_UNIT_ROUTES {
        return Err(ValidationError::TooManyUnitRoutes {
            side,
            count: routes.len(),
            max: SST_MAX_UNIT_ROUTES,
        });
    }
    for (target, weight) in routes {
        if !allowed(target.as_str()) {
            return Err(ValidationError::InvalidUnitTarget { target: target.clone(), side });
        }
        if *weight == 0 {
            return Err(ValidationError::ZeroUnitWeight { target: target.clone(), side });
        }
    }
    Ok(())
}

impl Validate for GenerationUnit {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.core_unit.is_empty() {
            return Err(ValidationError::EmptyCoreUnit);
        }
        validate_routes(&self.core_unit, "core", is_valid_ico_core_destination)?;
        validate_routes(&self.token_unit, "token", is_valid_ico_token_destination)
    }
}

wire_struct! {
    /// How each emission is split across destinations.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EmissionsUnit {
        /// Token routes and weights.
        pub token_unit: BTreeMap<UnitTarget, u16>,
    }
}

impl EmissionsUnit {
    /// Sum of the weights.
    pub fn token_unit_sum(&self) -> u32 {
        self.token_unit.values().map(|w| u32::from(*w)).sum()
    }
}

impl Validate for EmissionsUnit {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.token_unit.is_empty() {
            return Err(ValidationError::EmptyEmissionsUnit);
        }
        for (target, weight) in &self.token_unit {
            if !is_valid_emissions_destination(target.as_str()) {
                return Err(ValidationError::InvalidEmissionsUnitDestination(target.clone()));
            }
            if *weight == 0 {
                return Err(ValidationError::ZeroEmissionsUnitWeight);
            }
        }
        Ok(())
    }
}
