//! Optional automated actions.

use crate::{
    asset::AssetSymbol,
    types::{AccountName, Extensions, TimePointSec},
    unit_target::{is_valid_emissions_destination, UnitTarget},
    validation::{validate_account_name, validate_sst_symbol, Validate, ValidationError},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

wire_struct! {
    /// Issues one scheduled emission of a token.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TokenEmissionAction {
        /// Account controlling the token.
        pub control_account: AccountName,
        /// Liquid token symbol.
        pub symbol: AssetSymbol,
        /// Scheduled instant of this emission.
        pub emission_time: TimePointSec,
        /// Amount per destination.
        pub emissions: BTreeMap<UnitTarget, i64>,
        /// Reserved.
        pub extensions: Extensions,
    }
}

impl Validate for TokenEmissionAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.control_account)?;
        validate_sst_symbol(self.symbol)?;
        if self.emissions.is_empty() {
            return Err(ValidationError::EmptyEmissions);
        }
        for (destination, amount) in &self.emissions {
            if !is_valid_emissions_destination(destination.as_str()) {
                return Err(ValidationError::InvalidEmissionsDestination(destination.clone()));
            }
            if *amount <= 0 {
                return Err(ValidationError::NonPositiveEmission);
            }
        }
        Ok(())
    }
}

action_family! {
    /// Actions a producer may include. Failing to apply one skips it without
    /// invalidating the block.
    pub enum OptionalAutomatedAction / OptionalActionKind ("optional") {
        /// Emits tokens on schedule.
        TokenEmission(TokenEmissionAction) = 0 as "sst_token_emission",
    }
}

impl OptionalAutomatedAction {
    /// Token the action belongs to.
    pub const fn symbol(&self) -> AssetSymbol {
        match self {
            Self::TokenEmission(a) => a.symbol,
        }
    }
}
