//! Required automated actions: the SST ICO lifecycle.

use crate::{
    asset::{Asset, AssetSymbol},
    types::AccountName,
    validation::{validate_account_name, validate_sst_symbol, Validate, ValidationError},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

wire_struct! {
    /// Opens the contribution window of a token's ICO.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct IcoLaunchAction {
        /// Account controlling the token.
        pub control_account: AccountName,
        /// Liquid token symbol.
        pub symbol: AssetSymbol,
    }
}

wire_struct! {
    /// Closes the contribution window and decides launch or refund.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct IcoEvaluationAction {
        /// Account controlling the token.
        pub control_account: AccountName,
        /// Liquid token symbol.
        pub symbol: AssetSymbol,
    }
}

wire_struct! {
    /// Launches a token whose ICO met its minimum.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TokenLaunchAction {
        /// Account controlling the token.
        pub control_account: AccountName,
        /// Liquid token symbol.
        pub symbol: AssetSymbol,
    }
}

wire_struct! {
    /// Returns one contribution of a failed ICO.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RefundAction {
        /// Contributor being refunded.
        pub contributor: AccountName,
        /// Liquid token symbol.
        pub symbol: AssetSymbol,
        /// Contributor-chosen id of the contribution.
        pub contribution_id: u32,
        /// Amount returned.
        pub refund: Asset,
    }
}

wire_struct! {
    /// One credit of an ICO payout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ContributionPayout {
        /// Amount credited.
        pub payout: Asset,
        /// Credit the vesting balance instead of the liquid one.
        pub to_vesting: bool,
    }
}

wire_struct! {
    /// Pays out one contribution of a launched ICO.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ContributorPayoutAction {
        /// Contributor being paid.
        pub contributor: AccountName,
        /// Liquid token symbol.
        pub symbol: AssetSymbol,
        /// Contributor-chosen id of the contribution.
        pub contribution_id: u32,
        /// The contribution being settled.
        pub contribution: Asset,
        /// Credits to the contributor.
        pub payouts: Vec<ContributionPayout>,
    }
}

wire_struct! {
    /// Pays the founders and seeds the market maker and reward balance once
    /// every contributor is paid.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FounderPayoutAction {
        /// Liquid token symbol.
        pub symbol: AssetSymbol,
        /// Credits per founder account.
        pub account_payouts: BTreeMap<AccountName, Vec<ContributionPayout>>,
        /// Core tokens for the market maker.
        pub market_maker_core: i64,
        /// Issued tokens for the market maker.
        pub market_maker_tokens: i64,
        /// Issued tokens for the reward balance.
        pub reward_balance: i64,
    }
}

impl Validate for IcoLaunchAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.control_account)?;
        validate_sst_symbol(self.symbol)
    }
}

impl Validate for IcoEvaluationAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.control_account)?;
        validate_sst_symbol(self.symbol)
    }
}

impl Validate for TokenLaunchAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.control_account)?;
        validate_sst_symbol(self.symbol)
    }
}

impl Validate for RefundAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.contributor)?;
        validate_sst_symbol(self.symbol)
    }
}

impl Validate for ContributorPayoutAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.contributor)?;
        validate_sst_symbol(self.symbol)
    }
}

impl Validate for FounderPayoutAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_sst_symbol(self.symbol)?;
        self.account_payouts.keys().try_for_each(validate_account_name)
    }
}

action_family! {
    /// Actions a block must include once they are due. A block that omits or
    /// fails one is invalid.
    pub enum RequiredAutomatedAction / RequiredActionKind ("required") {
        /// Opens an ICO.
        IcoLaunch(IcoLaunchAction) = 0 as "sst_ico_launch",
        /// Evaluates an ICO.
        IcoEvaluation(IcoEvaluationAction) = 1 as "sst_ico_evaluation",
        /// Launches a token.
        TokenLaunch(TokenLaunchAction) = 2 as "sst_token_launch",
        /// Refunds a contribution.
        Refund(RefundAction) = 3 as "sst_refund",
        /// Pays a contributor.
        ContributorPayout(ContributorPayoutAction) = 4 as "sst_contributor_payout",
        /// Pays the founders.
        FounderPayout(FounderPayoutAction) = 5 as "sst_founder_payout",
    }
}

impl RequiredAutomatedAction {
    /// Token the action belongs to.
    pub const fn symbol(&self) -> AssetSymbol {
        match self {
            Self::IcoLaunch(a) => a.symbol,
            Self::IcoEvaluation(a) => a.symbol,
            Self::TokenLaunch(a) => a.symbol,
            Self::Refund(a) => a.symbol,
            Self::ContributorPayout(a) => a.symbol,
            Self::FounderPayout(a) => a.symbol,
        }
    }
}
