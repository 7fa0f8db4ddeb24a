//! Error taxonomy of the state-transition core.
//!
//! ```text
//! CodecError                    malformed bytes; reject before acceptance
//! ValidationError               stateless rule; reject before acceptance
//! ApplyError                    stateful precondition; fatal for required actions,
//!                               logged and skipped for optional ones
//! ConsensusInvariantViolation   registration or arithmetic bug; abort the block
//! ```

use crate::{
    ico::{IcoOutcome, IcoPhase},
    sst::TokenPhase,
};
use sst_protocol::{
    AccountName, Asset, AssetSymbol, CodecError, TimePointSec, ValidationError,
};
use sst_rewards::{FundId, RewardError};
use std::path::PathBuf;
use thiserror::Error;

/// A stateful precondition failed while applying an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// No token with this symbol.
    #[error("SST {0} does not exist")]
    UnknownToken(AssetSymbol),

    /// Token already exists.
    #[error("SST {0} already exists")]
    TokenExists(AssetSymbol),

    /// No ICO record for this symbol.
    #[error("no ICO exists for SST {0}")]
    UnknownIco(AssetSymbol),

    /// ICO record already exists.
    #[error("an ICO already exists for SST {0}")]
    IcoExists(AssetSymbol),

    /// No such account.
    #[error("account {0} does not exist")]
    UnknownAccount(AccountName),

    /// Account already exists.
    #[error("account {0} already exists")]
    AccountExists(AccountName),

    /// No such reward fund.
    #[error("reward fund {0} does not exist")]
    UnknownRewardFund(FundId),

    /// Reward fund already exists.
    #[error("reward fund {0} already exists")]
    RewardFundExists(FundId),

    /// No contribution under this key.
    #[error("contribution {contribution_id} of {contributor} to {symbol} does not exist")]
    UnknownContribution {
        /// Token contributed to.
        symbol: AssetSymbol,
        /// Contributing account.
        contributor: AccountName,
        /// Contributor-chosen id.
        contribution_id: u32,
    },

    /// Contribution key already used.
    #[error("contribution {contribution_id} of {contributor} to {symbol} already exists")]
    DuplicateContribution {
        /// Token contributed to.
        symbol: AssetSymbol,
        /// Contributing account.
        contributor: AccountName,
        /// Contributor-chosen id.
        contribution_id: u32,
    },

    /// Action names a different control account than the token's.
    #[error("{actual} does not control SST {symbol}, {expected} does")]
    ControlAccountMismatch {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Account controlling the token.
        expected: AccountName,
        /// Account named by the action.
        actual: AccountName,
    },

    /// Token is not in the phase the action requires.
    #[error("SST {symbol} is in phase {actual}, expected {expected}")]
    WrongTokenPhase {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Required phase.
        expected: TokenPhase,
        /// Current phase.
        actual: TokenPhase,
    },

    /// ICO is not in the phase the action requires.
    #[error("ICO of {symbol} is in phase {actual}, expected {expected}")]
    WrongIcoPhase {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Required phase.
        expected: IcoPhase,
        /// Current phase.
        actual: IcoPhase,
    },

    /// ICO has not been evaluated yet.
    #[error("ICO of {0} has not been evaluated")]
    NotEvaluated(AssetSymbol),

    /// Action belongs to the branch the evaluation did not choose.
    #[error("ICO of {symbol} was evaluated to {outcome}, the action requires {required}")]
    WrongBranch {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Recorded outcome.
        outcome: IcoOutcome,
        /// Outcome the action belongs to.
        required: IcoOutcome,
    },

    /// Contribution outside the contribution window.
    #[error("ICO of {symbol} does not accept contributions at {time}")]
    ContributionWindowClosed {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Head time.
        time: TimePointSec,
    },

    /// Amount must be positive and in the expected symbol.
    #[error("invalid amount {0}")]
    InvalidAmount(Asset),

    /// Balance would go negative.
    #[error("insufficient {symbol} balance for {account}: have {balance}, need {required}")]
    InsufficientFunds {
        /// Debited account.
        account: AccountName,
        /// Debited symbol.
        symbol: AssetSymbol,
        /// Current balance.
        balance: i64,
        /// Amount requested.
        required: i64,
    },

    /// Supply would exceed the token's maximum.
    #[error("supply of {symbol} would exceed {max_supply}")]
    MaxSupplyExceeded {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Configured maximum.
        max_supply: i64,
    },

    /// Amount arithmetic left the representable range.
    #[error("amount overflow in {0}")]
    Overflow(&'static str),

    /// Token has no emission due after its last one.
    #[error("SST {0} has no upcoming emission events")]
    NoUpcomingEmission(AssetSymbol),

    /// Emission is not the next scheduled one.
    #[error("emission for {symbol} at {actual} is not the next emission at {expected}")]
    EmissionTimeMismatch {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Next scheduled instant.
        expected: TimePointSec,
        /// Instant named by the action.
        actual: TimePointSec,
    },

    /// Emission is scheduled after the head time.
    #[error("emission for {symbol} at {emission_time} is not due at {head_time}")]
    EmissionNotDue {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Instant named by the action.
        emission_time: TimePointSec,
        /// Current head time.
        head_time: TimePointSec,
    },

    /// Emission amounts differ from the schedule.
    #[error("emission generation mismatch for {0}")]
    EmissionMismatch(AssetSymbol),

    /// Emission schedule parameters are inconsistent.
    #[error("invalid emission schedule for {symbol}: {reason}")]
    InvalidEmissionSchedule {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Which rule failed.
        reason: &'static str,
    },

    /// ICO parameters are inconsistent.
    #[error("invalid ICO setup for {symbol}: {reason}")]
    InvalidIcoSetup {
        /// Token symbol.
        symbol: AssetSymbol,
        /// Which rule failed.
        reason: &'static str,
    },

    /// Block included a required action that is not the front of the queue.
    #[error("unexpected required action {observed}, expected {expected}")]
    UnexpectedRequiredAction {
        /// Name of the front pending action, or `none`.
        expected: &'static str,
        /// Name of the included action.
        observed: &'static str,
    },

    /// Action failed its stateless checks when scheduled.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Internal bug detected during application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusInvariantViolation {
    /// Dispatch table entry does not match the action it was selected for.
    #[error("{family} ordinal {ordinal} dispatched to evaluator for {registered}")]
    DispatchMismatch {
        /// Action family.
        family: &'static str,
        /// Ordinal of the action.
        ordinal: u32,
        /// Name the selected entry is registered under.
        registered: &'static str,
    },

    /// Total supply left the representable range.
    #[error("supply overflow for {0}")]
    SupplyOverflow(AssetSymbol),
}

/// The four kinds an action failure can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ActionErrorKind {
    /// Structural decode failure.
    MalformedEncoding,
    /// Stateless rule violation.
    Validation,
    /// Stateful precondition violation.
    Apply,
    /// Internal bug.
    ConsensusInvariantViolation,
}

/// Failure of one action, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// See [`CodecError`].
    #[error(transparent)]
    MalformedEncoding(#[from] CodecError),
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// See [`ApplyError`].
    #[error(transparent)]
    Apply(#[from] ApplyError),
    /// See [`ConsensusInvariantViolation`].
    #[error(transparent)]
    Invariant(#[from] ConsensusInvariantViolation),
}

impl ActionError {
    /// Kind of the failure.
    pub const fn kind(&self) -> ActionErrorKind {
        match self {
            Self::MalformedEncoding(_) => ActionErrorKind::MalformedEncoding,
            Self::Validation(_) => ActionErrorKind::Validation,
            Self::Apply(_) => ActionErrorKind::Apply,
            Self::Invariant(_) => ActionErrorKind::ConsensusInvariantViolation,
        }
    }
}

/// Failure of the per-interval maintenance pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaintenanceError {
    /// Settlement rejected a fund.
    #[error(transparent)]
    Reward(#[from] RewardError),
    /// Crediting a payout failed.
    #[error(transparent)]
    Ledger(#[from] ApplyError),
}

/// Reasons a block is rejected. The ledger is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Block bytes are malformed.
    #[error("malformed block: {0}")]
    Decode(#[from] CodecError),

    /// Encoded block exceeds the size limit.
    #[error("block of {size} bytes exceeds the {max} byte limit")]
    Oversized {
        /// Encoded size.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Block timestamp precedes the head time.
    #[error("block time {timestamp} precedes head time {head}")]
    TimestampRegression {
        /// Block timestamp.
        timestamp: TimePointSec,
        /// Current head time.
        head: TimePointSec,
    },

    /// An included action failed stateless validation.
    #[error("{name} at index {index} failed validation: {source}")]
    Validation {
        /// Position within its family's list.
        index: usize,
        /// Action name.
        name: &'static str,
        /// Underlying failure.
        source: ValidationError,
    },

    /// A required action failed to apply.
    #[error("required action {name} at index {index} failed: {source}")]
    FatalRequired {
        /// Position in the required list.
        index: usize,
        /// Action name.
        name: &'static str,
        /// Underlying failure.
        source: ActionError,
    },

    /// An optional action hit an internal bug.
    #[error("optional action {name} at index {index} violated a consensus invariant: {source}")]
    Invariant {
        /// Position in the optional list.
        index: usize,
        /// Action name.
        name: &'static str,
        /// Underlying failure.
        source: ConsensusInvariantViolation,
    },

    /// A due required action was left out although the block had room.
    #[error(
        "Expected action was not included in block. total_actions_size: {total_actions_size}, \
         required_actions_partition_size: {partition_size}, pending_action: {pending}"
    )]
    MissingRequired {
        /// Encoded size of the included actions plus the missing one.
        total_actions_size: usize,
        /// Space reserved for required actions.
        partition_size: usize,
        /// Name of the missing action.
        pending: &'static str,
    },

    /// The maintenance pass failed.
    #[error("maintenance failed: {0}")]
    Maintenance(#[from] MaintenanceError),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Which rule failed.
        reason: String,
    },
}
