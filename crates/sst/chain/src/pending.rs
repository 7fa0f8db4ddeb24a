//! Pending automated action queues.
//!
//! Actions are queued at `max(execution_time, head_time)` and kept sorted by
//! `(execution_time, seq)`, so actions due at the same instant leave the queue
//! in the order they were pushed.

use crate::{
    error::ApplyError,
    state::{LedgerStore, PendingAction},
};
use alloy_primitives::B256;
use sst_protocol::{OptionalAutomatedAction, RequiredAutomatedAction, TimePointSec, Validate};
use tracing::debug;

fn insert_sorted<A>(queue: &mut Vec<PendingAction<A>>, entry: PendingAction<A>) {
    let key = (entry.execution_time, entry.seq);
    let position = queue.partition_point(|queued| (queued.execution_time, queued.seq) <= key);
    queue.insert(position, entry);
}

/// Validates and queues a required action.
pub fn push_required_action(
    ledger: &mut dyn LedgerStore,
    action: impl Into<RequiredAutomatedAction>,
    execution_time: TimePointSec,
) -> Result<(), ApplyError> {
    let action = action.into();
    action.validate()?;
    let execution_time = execution_time.max(ledger.head_time());
    let seq = ledger.next_pending_seq();
    debug!(
        target: "sst::chain",
        action = action.name(),
        symbol = %action.symbol(),
        %execution_time,
        seq,
        "Queued required action"
    );
    insert_sorted(ledger.pending_required_mut(), PendingAction { seq, execution_time, action });
    Ok(())
}

/// Validates and queues an optional action. An action already queued under the
/// same id is left as it is.
pub fn push_optional_action(
    ledger: &mut dyn LedgerStore,
    action: impl Into<OptionalAutomatedAction>,
    execution_time: TimePointSec,
) -> Result<(), ApplyError> {
    let action = action.into();
    action.validate()?;
    let id = action.id();
    if ledger.pending_optional().iter().any(|queued| queued.action.id() == id) {
        return Ok(());
    }
    let execution_time = execution_time.max(ledger.head_time());
    let seq = ledger.next_pending_seq();
    debug!(
        target: "sst::chain",
        action = action.name(),
        %id,
        %execution_time,
        "Queued optional action"
    );
    insert_sorted(ledger.pending_optional_mut(), PendingAction { seq, execution_time, action });
    Ok(())
}

/// Removes the front required action, which must equal `action` and be due at
/// the head time.
pub fn take_required_action(
    ledger: &mut dyn LedgerStore,
    action: &RequiredAutomatedAction,
) -> Result<(), ApplyError> {
    let head_time = ledger.head_time();
    let front = ledger.pending_required().first().filter(|front| front.is_due(head_time));
    if front.is_none_or(|front| front.action != *action) {
        return Err(ApplyError::UnexpectedRequiredAction {
            expected: front.map_or("none", |front| front.action.name()),
            observed: action.name(),
        });
    }
    ledger.pending_required_mut().remove(0);
    Ok(())
}

/// Drops a queued optional action by id. Returns whether one was queued.
pub fn remove_optional_action(ledger: &mut dyn LedgerStore, id: B256) -> bool {
    let queue = ledger.pending_optional_mut();
    let before = queue.len();
    queue.retain(|queued| queued.action.id() != id);
    queue.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryLedger;
    use assert_matches::assert_matches;
    use sst_protocol::{
        AssetSymbol, Extensions, IcoEvaluationAction, IcoLaunchAction, TokenEmissionAction,
        ValidationError,
    };

    fn symbol() -> AssetSymbol {
        AssetSymbol::from_nai_data(10_000_000, 3).unwrap()
    }

    fn launch() -> IcoLaunchAction {
        IcoLaunchAction { control_account: "alice".into(), symbol: symbol() }
    }

    fn evaluation() -> IcoEvaluationAction {
        IcoEvaluationAction { control_account: "alice".into(), symbol: symbol() }
    }

    #[test]
    fn test_queue_order_and_clamping() {
        let mut ledger = MemoryLedger::new(TimePointSec::from_secs(100));
        push_required_action(&mut ledger, evaluation(), TimePointSec::from_secs(200)).unwrap();
        push_required_action(&mut ledger, launch(), TimePointSec::from_secs(50)).unwrap();
        push_required_action(&mut ledger, evaluation(), TimePointSec::from_secs(100)).unwrap();

        let queue: Vec<_> = ledger
            .pending_required()
            .iter()
            .map(|p| (p.execution_time.secs(), p.action.name()))
            .collect();
        assert_eq!(
            queue,
            [(100, "sst_ico_launch"), (100, "sst_ico_evaluation"), (200, "sst_ico_evaluation")]
        );
    }

    #[test]
    fn test_push_validates() {
        let mut ledger = MemoryLedger::new(TimePointSec::ZERO);
        let bad = IcoLaunchAction { control_account: "A".into(), symbol: symbol() };
        assert_matches!(
            push_required_action(&mut ledger, bad, TimePointSec::ZERO),
            Err(ApplyError::Validation(ValidationError::InvalidAccountName(_)))
        );
        assert!(ledger.pending_required().is_empty());
    }

    #[test]
    fn test_take_requires_due_front() {
        let mut ledger = MemoryLedger::new(TimePointSec::from_secs(10));
        push_required_action(&mut ledger, launch(), TimePointSec::from_secs(20)).unwrap();

        let action = RequiredAutomatedAction::from(launch());
        assert_matches!(
            take_required_action(&mut ledger, &action),
            Err(ApplyError::UnexpectedRequiredAction {
                expected: "none",
                observed: "sst_ico_launch"
            })
        );
        ledger.set_head_time(TimePointSec::from_secs(20));
        let other = RequiredAutomatedAction::from(evaluation());
        assert_matches!(
            take_required_action(&mut ledger, &other),
            Err(ApplyError::UnexpectedRequiredAction { expected: "sst_ico_launch", .. })
        );
        take_required_action(&mut ledger, &action).unwrap();
        assert!(ledger.pending_required().is_empty());
    }

    #[test]
    fn test_optional_actions_dedupe_by_id() {
        let mut ledger = MemoryLedger::new(TimePointSec::ZERO);
        let emission = TokenEmissionAction {
            control_account: "alice".into(),
            symbol: symbol(),
            emission_time: TimePointSec::from_secs(5),
            emissions: [("$rewards".into(), 10)].into_iter().collect(),
            extensions: Extensions::new(),
        };
        let id = OptionalAutomatedAction::from(emission.clone()).id();
        push_optional_action(&mut ledger, emission.clone(), TimePointSec::from_secs(5)).unwrap();
        push_optional_action(&mut ledger, emission, TimePointSec::from_secs(9)).unwrap();
        assert_eq!(ledger.pending_optional().len(), 1);

        assert!(remove_optional_action(&mut ledger, id));
        assert!(!remove_optional_action(&mut ledger, id));
    }
}
