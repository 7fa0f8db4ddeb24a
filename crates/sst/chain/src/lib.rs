//! SST Ledger State Transitions
//!
//! Applies automated actions to a ledger: the ICO lifecycle of a smart token,
//! its scheduled emissions and the periodic reward fund settlement.
//!
//! ```text
//! ActionBlock ─> BlockProcessor ─> DispatchTable ─┬─> required_evaluators ─┐
//!                     │                           └─> optional_evaluators ─┴─> LedgerStore
//!                     ├─ commit ─> NotificationBus ─> ActionObserver
//!                     └─ maintenance ─> sst_rewards::settle_funds
//! ```
//!
//! Evaluators never see a ledger that will be kept if they fail: blocks are
//! applied to a staged copy that replaces the caller's ledger only once the
//! whole block succeeded.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod block;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod ico;
pub mod maintenance;
pub mod notifications;
pub mod optional_evaluators;
pub mod pending;
pub mod required_evaluators;
pub mod sst;
pub mod state;

pub use block::{ActionBlock, BlockProcessor, BlockReport};
pub use config::ProtocolConfig;
pub use error::{
    ActionError, ActionErrorKind, ApplyError, BlockError, ConfigError, ConsensusInvariantViolation,
    MaintenanceError,
};
pub use evaluator::DispatchTable;
pub use ico::{IcoOutcome, IcoPhase, IcoRecord, IcoSetup};
pub use notifications::{ActionNotification, ActionObserver, NotificationBus};
pub use sst::{EmissionSchedule, SstToken, TokenPhase};
pub use state::{Account, LedgerStore, MemoryLedger};
