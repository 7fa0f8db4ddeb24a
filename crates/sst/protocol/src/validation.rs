//! Stateless validation.
//!
//! Everything here is a pure function of the value being checked. Nothing in
//! this module can observe or touch ledger state.

use crate::{
    asset::{AssetSymbol, SymbolSpace},
    constants::{MAX_ACCOUNT_NAME_LENGTH, MIN_ACCOUNT_NAME_LENGTH},
    types::AccountName,
    unit_target::UnitTarget,
};
use thiserror::Error;

/// Context-free rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Account name breaks the naming rules.
    #[error("Account name {0} is invalid")]
    InvalidAccountName(AccountName),

    /// Symbol is not an issuable token symbol.
    #[error("Asset symbol {symbol} is not a valid SST symbol: {reason}")]
    InvalidSstSymbol {
        /// The rejected symbol.
        symbol: AssetSymbol,
        /// Which rule failed.
        reason: String,
    },

    /// Token emission with no destinations.
    #[error("Emissions cannot be empty")]
    EmptyEmissions,

    /// Emission destination outside the recognized set.
    #[error("Emissions destination {0} is invalid")]
    InvalidEmissionsDestination(UnitTarget),

    /// Emission amount of zero or less.
    #[error("Emissions must be greater than 0")]
    NonPositiveEmission,

    /// Emissions unit with no token routes.
    #[error("Emissions token unit cannot be empty")]
    EmptyEmissionsUnit,

    /// Emissions unit route outside the recognized set.
    #[error("Emissions token unit destination {0} is invalid")]
    InvalidEmissionsUnitDestination(UnitTarget),

    /// Emissions unit route with weight zero.
    #[error("Emissions token unit must be greater than 0")]
    ZeroEmissionsUnitWeight,

    /// Generation unit route not allowed for its side.
    #[error("{target} is not a valid {side} unit target")]
    InvalidUnitTarget {
        /// The rejected target.
        target: UnitTarget,
        /// `core` or `token`.
        side: &'static str,
    },

    /// Generation unit route with weight zero.
    #[error("{side} unit weight for {target} must be greater than 0")]
    ZeroUnitWeight {
        /// The offending target.
        target: UnitTarget,
        /// `core` or `token`.
        side: &'static str,
    },

    /// Generation unit without core routes.
    #[error("core unit cannot be empty")]
    EmptyCoreUnit,

    /// Too many routes on one side of a unit.
    #[error("{side} unit has {count} routes, more than the maximum of {max}")]
    TooManyUnitRoutes {
        /// `core` or `token`.
        side: &'static str,
        /// Routes given.
        count: usize,
        /// Routes allowed.
        max: usize,
    },

    /// Unit target that cannot name an account.
    #[error("{0}")]
    UnitTargetAccount(String),
}

/// Capability of checking a value without any ledger context.
pub trait Validate {
    /// Checks the value's own well-formedness.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Account-name syntax: 3 to 16 characters, dot-separated segments of at least
/// three characters that start with a letter, end with a letter or digit and
/// otherwise hold lowercase letters, digits and dashes.
pub fn is_valid_account_name(name: &str) -> bool {
    if !(MIN_ACCOUNT_NAME_LENGTH..=MAX_ACCOUNT_NAME_LENGTH).contains(&name.len()) {
        return false;
    }
    name.split('.').all(|segment| {
        let bytes = segment.as_bytes();
        let [first, middle @ .., last] = bytes else { return false };
        bytes.len() >= MIN_ACCOUNT_NAME_LENGTH &&
            first.is_ascii_lowercase() &&
            (last.is_ascii_lowercase() || last.is_ascii_digit()) &&
            middle.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
    })
}

/// Fails unless `name` follows account-name syntax.
pub fn validate_account_name(name: &AccountName) -> Result<(), ValidationError> {
    if name.is_valid() { Ok(()) } else { Err(ValidationError::InvalidAccountName(name.clone())) }
}

/// Fails unless `symbol` is the liquid symbol of an issuable token.
pub fn validate_sst_symbol(symbol: AssetSymbol) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidSstSymbol { symbol, reason };
    symbol.validate().map_err(|err| invalid(err.to_string()))?;
    if symbol.space() != SymbolSpace::Nai {
        return Err(invalid("symbol is not in the NAI space".to_owned()));
    }
    if symbol.is_vesting() {
        return Err(invalid("symbol is a vesting symbol".to_owned()));
    }
    Ok(())
}
