//! Block application and production.
//!
//! ```text
//! bytes ─decode─> ActionBlock ─validate (parallel)─> staged copy
//!                                       │ head_time = timestamp
//!                                       │ required actions, each the due queue front
//!                                       │ missing required check
//!                                       │ optional actions, each on a scratch copy
//!                                       │ maintenance when due
//!                                       └─> commit ─> notify observers
//! ```
//!
//! The ledger passed in is only ever replaced by a fully processed copy, so
//! every rejected block leaves it as it was.

use crate::{
    config::ProtocolConfig,
    error::{ActionError, BlockError},
    evaluator::DispatchTable,
    maintenance,
    notifications::NotificationBus,
    pending::{remove_optional_action, take_required_action},
    sst::generate_optional_actions,
    state::LedgerStore,
};
use alloy_primitives::{keccak256, B256};
use bytes::BufMut;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sst_protocol::{
    decode_exact, encode, AutomatedAction, CodecError, Decodable, Encodable,
    OptionalAutomatedAction, RequiredAutomatedAction, TimePointSec, Validate, ValidationError,
};
use sst_rewards::SettlementReport;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// The automated actions of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBlock {
    /// Block time; becomes the head time.
    pub timestamp: TimePointSec,
    /// Required actions, applied first and in order.
    #[serde(default)]
    pub required: Vec<RequiredAutomatedAction>,
    /// Optional actions, applied after the required ones.
    #[serde(default)]
    pub optional: Vec<OptionalAutomatedAction>,
}

impl ActionBlock {
    /// Empty block at `timestamp`.
    pub const fn new(timestamp: TimePointSec) -> Self {
        Self { timestamp, required: Vec::new(), optional: Vec::new() }
    }

    /// keccak256 of the canonical encoding.
    pub fn hash(&self) -> B256 {
        keccak256(encode(self))
    }

    /// Every action, required first.
    pub fn actions(&self) -> impl Iterator<Item = AutomatedAction<'_>> {
        let required = self.required.iter().map(AutomatedAction::from);
        required.chain(self.optional.iter().map(AutomatedAction::from))
    }
}

impl Encodable for ActionBlock {
    fn encode(&self, out: &mut dyn BufMut) {
        self.timestamp.encode(out);
        self.required.encode(out);
        self.optional.encode(out);
    }

    fn length(&self) -> usize {
        self.timestamp.length() + self.required.length() + self.optional.length()
    }
}

impl Decodable for ActionBlock {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            timestamp: Decodable::decode(buf)?,
            required: Decodable::decode(buf)?,
            optional: Decodable::decode(buf)?,
        })
    }
}

/// Outcome of an applied block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    /// Block hash.
    pub hash: B256,
    /// Block time.
    pub timestamp: TimePointSec,
    /// Number of required actions applied.
    pub required_applied: usize,
    /// Indices of the optional actions applied.
    pub optional_applied: Vec<usize>,
    /// Optional actions skipped, with the reason.
    pub optional_skipped: Vec<(usize, ActionError)>,
    /// Reward settlements, when maintenance ran.
    pub settlements: Option<Vec<SettlementReport>>,
}

/// Applies and produces blocks against a ledger.
#[derive(Debug)]
pub struct BlockProcessor {
    config: ProtocolConfig,
    dispatch: &'static DispatchTable,
    notifications: NotificationBus,
}

impl BlockProcessor {
    /// Processor using the production dispatch table.
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            dispatch: DispatchTable::standard(),
            notifications: NotificationBus::default(),
        }
    }

    /// Protocol parameters.
    pub const fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Observers notified of committed blocks.
    pub const fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    /// Decodes an encoded block, rejecting it before decoding if it is too
    /// large.
    pub fn decode_block(&self, bytes: &[u8]) -> Result<ActionBlock, BlockError> {
        let max = self.config.max_block_size;
        if bytes.len() > max {
            return Err(BlockError::Oversized { size: bytes.len(), max });
        }
        Ok(decode_exact(bytes)?)
    }

    /// Decodes and applies an encoded block.
    pub fn apply_encoded_block<L>(
        &self,
        ledger: &mut L,
        bytes: &[u8],
    ) -> Result<BlockReport, BlockError>
    where
        L: LedgerStore + Clone,
    {
        let block = self.decode_block(bytes)?;
        self.apply_block(ledger, &block)
    }

    /// Applies `block` to `ledger` atomically.
    pub fn apply_block<L>(
        &self,
        ledger: &mut L,
        block: &ActionBlock,
    ) -> Result<BlockReport, BlockError>
    where
        L: LedgerStore + Clone,
    {
        let size = block.length();
        if size > self.config.max_block_size {
            return Err(BlockError::Oversized { size, max: self.config.max_block_size });
        }
        validate_actions(block)?;
        let head = ledger.head_time();
        if block.timestamp < head {
            return Err(BlockError::TimestampRegression { timestamp: block.timestamp, head });
        }

        let mut staged = ledger.clone();
        staged.set_head_time(block.timestamp);
        let start_seq = staged.peek_pending_seq();

        let mut required_size = 0;
        for (index, action) in block.required.iter().enumerate() {
            let applied = take_required_action(&mut staged, action)
                .map_err(ActionError::from)
                .and_then(|()| self.dispatch.apply_required(action, &mut staged));
            if let Err(source) = applied {
                error!(
                    target: "sst::block",
                    index,
                    action = action.name(),
                    symbol = %action.symbol(),
                    kind = %source.kind(),
                    %source,
                    "Required action failed"
                );
                return Err(BlockError::FatalRequired { index, name: action.name(), source });
            }
            debug!(
                target: "sst::block",
                index,
                action = action.name(),
                symbol = %action.symbol(),
                "Applied required action"
            );
            required_size += action.length();
        }

        let partition_size = self.config.required_actions_partition_size();
        if let Some(front) = staged.pending_required().first() {
            let total_actions_size = required_size + front.action.length();
            if front.is_due(block.timestamp)
                && front.seq < start_seq
                && total_actions_size <= partition_size
            {
                return Err(BlockError::MissingRequired {
                    total_actions_size,
                    partition_size,
                    pending: front.action.name(),
                });
            }
        }

        let mut optional_applied = Vec::new();
        let mut optional_skipped = Vec::new();
        for (index, action) in block.optional.iter().enumerate() {
            let mut scratch = staged.clone();
            match self.dispatch.apply_optional(action, &mut scratch) {
                Ok(()) => {
                    remove_optional_action(&mut scratch, action.id());
                    staged = scratch;
                    optional_applied.push(index);
                    debug!(
                        target: "sst::block",
                        index,
                        action = action.name(),
                        "Applied optional action"
                    );
                }
                Err(ActionError::Invariant(source)) => {
                    error!(
                        target: "sst::block",
                        index,
                        action = action.name(),
                        %source,
                        "Optional action violated an invariant"
                    );
                    return Err(BlockError::Invariant { index, name: action.name(), source });
                }
                Err(err) => {
                    warn!(
                        target: "sst::block",
                        index,
                        action = action.name(),
                        symbol = %action.symbol(),
                        kind = %err.kind(),
                        %err,
                        "Skipping optional action"
                    );
                    optional_skipped.push((index, err));
                }
            }
        }

        let settlements = if maintenance::is_due(&staged, &self.config, block.timestamp) {
            Some(maintenance::run_maintenance(&mut staged, &self.config, block.timestamp)?)
        } else {
            None
        };

        *ledger = staged;
        let hash = block.hash();
        info!(
            target: "sst::block",
            %hash,
            timestamp = %block.timestamp,
            required = block.required.len(),
            optional = optional_applied.len(),
            skipped = optional_skipped.len(),
            maintenance = settlements.is_some(),
            "Applied block"
        );

        let applied = block.required.iter().map(AutomatedAction::from).chain(
            optional_applied.iter().map(|index| AutomatedAction::from(&block.optional[*index])),
        );
        self.notifications.notify(block, applied);

        Ok(BlockReport {
            hash,
            timestamp: block.timestamp,
            required_applied: block.required.len(),
            optional_applied,
            optional_skipped,
            settlements,
        })
    }

    /// Assembles a block at `timestamp`: the due required actions that fit the
    /// required partition, then every pending or generated optional action
    /// that applies and fits the block.
    pub fn produce_block<L>(
        &self,
        ledger: &L,
        timestamp: TimePointSec,
    ) -> Result<ActionBlock, BlockError>
    where
        L: LedgerStore + Clone,
    {
        let head = ledger.head_time();
        if timestamp < head {
            return Err(BlockError::TimestampRegression { timestamp, head });
        }
        let mut sim = ledger.clone();
        sim.set_head_time(timestamp);
        let mut block = ActionBlock::new(timestamp);

        let partition_size = self.config.required_actions_partition_size();
        let mut required_size = 0;
        while let Some(front) =
            sim.pending_required().first().filter(|front| front.is_due(timestamp))
        {
            let action = front.action.clone();
            let length = action.length();
            if required_size + length > partition_size {
                break;
            }
            let index = block.required.len();
            take_required_action(&mut sim, &action)
                .map_err(ActionError::from)
                .and_then(|()| self.dispatch.apply_required(&action, &mut sim))
                .map_err(|source| BlockError::FatalRequired {
                    index,
                    name: action.name(),
                    source,
                })?;
            required_size += length;
            block.required.push(action);
        }

        let mut seen = BTreeSet::new();
        let candidates: Vec<_> = sim
            .pending_optional()
            .iter()
            .filter(|pending| pending.is_due(timestamp))
            .map(|pending| pending.action.clone())
            .chain(generate_optional_actions(&sim, timestamp))
            .filter(|action| seen.insert(action.id()))
            .collect();
        for action in candidates {
            if action.validate().is_err() {
                continue;
            }
            let mut scratch = sim.clone();
            if self.dispatch.apply_optional(&action, &mut scratch).is_err() {
                continue;
            }
            let id = action.id();
            block.optional.push(action);
            if block.length() > self.config.max_block_size {
                block.optional.pop();
                break;
            }
            remove_optional_action(&mut scratch, id);
            sim = scratch;
        }

        debug!(
            target: "sst::block",
            %timestamp,
            required = block.required.len(),
            optional = block.optional.len(),
            "Produced block"
        );
        Ok(block)
    }
}

/// Stateless validation of every action, in parallel. Reports the first
/// failure in block order.
fn validate_actions(block: &ActionBlock) -> Result<(), BlockError> {
    let invalid = |index: usize, name: &'static str, source: ValidationError| {
        BlockError::Validation { index, name, source }
    };
    let required = block.required.par_iter().enumerate().find_map_first(|(index, action)| {
        action.validate().err().map(|source| invalid(index, action.name(), source))
    });
    if let Some(err) = required {
        return Err(err);
    }
    let optional = block.optional.par_iter().enumerate().find_map_first(|(index, action)| {
        action.validate().err().map(|source| invalid(index, action.name(), source))
    });
    optional.map_or(Ok(()), Err)
}
