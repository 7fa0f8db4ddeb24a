//! The automated action catalog.
//!
//! ```text
//! required                            optional
//! 0  sst_ico_launch                   0  sst_token_emission
//! 1  sst_ico_evaluation
//! 2  sst_token_launch
//! 3  sst_refund
//! 4  sst_contributor_payout
//! 5  sst_founder_payout
//! ```
//!
//! Ordinals are permanent. New actions are appended to the end of a family;
//! nothing is ever removed or reordered.

mod optional;
mod required;
#[cfg(any(test, feature = "testnet"))]
pub mod testing;

pub use optional::{OptionalActionKind, OptionalAutomatedAction, TokenEmissionAction};
pub use required::{
    ContributionPayout, ContributorPayoutAction, FounderPayoutAction, IcoEvaluationAction,
    IcoLaunchAction, RefundAction, RequiredActionKind, RequiredAutomatedAction, TokenLaunchAction,
};

use crate::{
    asset::AssetSymbol,
    validation::{Validate, ValidationError},
};
use alloy_primitives::B256;
use serde::Serialize;

/// Either family, borrowed. Used where consumers handle both kinds alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AutomatedAction<'a> {
    /// A required action.
    Required(&'a RequiredAutomatedAction),
    /// An optional action.
    Optional(&'a OptionalAutomatedAction),
}

impl AutomatedAction<'_> {
    /// Identifier of the underlying action.
    pub fn id(&self) -> B256 {
        match self {
            Self::Required(action) => action.id(),
            Self::Optional(action) => action.id(),
        }
    }

    /// Name of the underlying action.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required(action) => action.name(),
            Self::Optional(action) => action.name(),
        }
    }

    /// Token the underlying action belongs to.
    pub const fn symbol(&self) -> AssetSymbol {
        match self {
            Self::Required(action) => action.symbol(),
            Self::Optional(action) => action.symbol(),
        }
    }

    /// Whether the action belongs to the required family.
    pub const fn is_required(&self) -> bool {
        matches!(self, Self::Required(_))
    }
}

impl Validate for AutomatedAction<'_> {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Required(action) => action.validate(),
            Self::Optional(action) => action.validate(),
        }
    }
}

impl<'a> From<&'a RequiredAutomatedAction> for AutomatedAction<'a> {
    fn from(action: &'a RequiredAutomatedAction) -> Self {
        Self::Required(action)
    }
}

impl<'a> From<&'a OptionalAutomatedAction> for AutomatedAction<'a> {
    fn from(action: &'a OptionalAutomatedAction) -> Self {
        Self::Optional(action)
    }
}
