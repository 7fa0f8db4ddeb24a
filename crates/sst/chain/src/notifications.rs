//! Read-only notifications about applied automated actions.

use crate::block::ActionBlock;
use alloy_primitives::B256;
use parking_lot::RwLock;
use sst_protocol::{AutomatedAction, TimePointSec};
use std::{fmt, sync::Arc};

/// An action that was applied in a committed block.
#[derive(Debug, Clone, Copy)]
pub struct ActionNotification<'a> {
    /// Identifier of the action.
    pub id: B256,
    /// The action.
    pub action: AutomatedAction<'a>,
    /// Timestamp of the block that applied it.
    pub block_time: TimePointSec,
}

/// Consumer of applied actions.
///
/// Observers run after the block is committed and cannot affect it.
pub trait ActionObserver: Send + Sync {
    /// Called once per applied action, in application order.
    fn on_action(&self, notification: &ActionNotification<'_>);

    /// Called once per committed block, after its actions.
    fn on_block(&self, _block: &ActionBlock) {}
}

/// Registered [`ActionObserver`]s.
#[derive(Default)]
pub struct NotificationBus {
    observers: RwLock<Vec<Arc<dyn ActionObserver>>>,
}

impl NotificationBus {
    /// Registers an observer.
    pub fn subscribe(&self, observer: Arc<dyn ActionObserver>) {
        self.observers.write().push(observer);
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Delivers the applied actions of a committed block to every observer.
    pub fn notify<'a>(
        &self,
        block: &ActionBlock,
        applied: impl IntoIterator<Item = AutomatedAction<'a>>,
    ) {
        let observers = self.observers.read();
        if observers.is_empty() {
            return;
        }
        for action in applied {
            let notification =
                ActionNotification { id: action.id(), action, block_time: block.timestamp };
            for observer in observers.iter() {
                observer.on_action(&notification);
            }
        }
        for observer in observers.iter() {
            observer.on_block(block);
        }
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus").field("observers", &self.observer_count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use sst_protocol::{AssetSymbol, IcoLaunchAction, RequiredAutomatedAction};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(B256, &'static str)>>,
        blocks: Mutex<u32>,
    }

    impl ActionObserver for Recorder {
        fn on_action(&self, notification: &ActionNotification<'_>) {
            self.seen.lock().push((notification.id, notification.action.name()));
        }

        fn on_block(&self, _block: &ActionBlock) {
            *self.blocks.lock() += 1;
        }
    }

    #[test]
    fn test_notify_reaches_every_observer() {
        let bus = NotificationBus::default();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        bus.subscribe(first.clone());
        bus.subscribe(second.clone());

        let action = RequiredAutomatedAction::from(IcoLaunchAction {
            control_account: "alice".into(),
            symbol: AssetSymbol::from_nai_data(10_000_000, 3).unwrap(),
        });
        let block = ActionBlock {
            timestamp: TimePointSec::from_secs(3),
            required: vec![action.clone()],
            optional: Vec::new(),
        };
        bus.notify(&block, block.actions());

        for recorder in [&first, &second] {
            assert_eq!(*recorder.seen.lock(), [(action.id(), "sst_ico_launch")]);
            assert_eq!(*recorder.blocks.lock(), 1);
        }
    }
}
