//! Transition listener registry.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::broadcast;
use tracing::trace;

use super::ActivityEvent;

/// Handle returned by listener registration, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<dyn Fn()>;

pub(crate) struct Listeners {
    next_id: Cell<u64>,
    active: RefCell<Vec<(ListenerId, Callback)>>,
    inactive: RefCell<Vec<(ListenerId, Callback)>>,
    /// Broadcast sender for transition notifications.
    event_tx: broadcast::Sender<ActivityEvent>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            next_id: Cell::new(0),
            active: RefCell::new(Vec::new()),
            inactive: RefCell::new(Vec::new()),
            event_tx,
        }
    }

    fn slot(&self, event: ActivityEvent) -> &RefCell<Vec<(ListenerId, Callback)>> {
        match event {
            ActivityEvent::UserActive => &self.active,
            ActivityEvent::UserInactive => &self.inactive,
        }
    }

    pub(crate) fn add(&self, event: ActivityEvent, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.slot(event).borrow_mut().push((id, callback));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        [&self.active, &self.inactive].into_iter().any(|slot| {
            let mut slot = slot.borrow_mut();
            let before = slot.len();
            slot.retain(|(existing, _)| *existing != id);
            slot.len() != before
        })
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.event_tx.subscribe()
    }

    /// Whether anyone wants to hear about `event`.
    pub(crate) fn is_present(&self, event: ActivityEvent) -> bool {
        !self.slot(event).borrow().is_empty() || self.event_tx.receiver_count() > 0
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// Callbacks are snapshotted first so a callback may add or remove
    /// listeners while being notified.
    pub(crate) fn emit(&self, event: ActivityEvent) {
        if !self.is_present(event) {
            trace!("No {} listener, notification skipped", event);
            return;
        }

        let callbacks: Vec<Callback> = self
            .slot(event)
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }

        // Receivers may have been dropped since the presence check.
        let _ = self.event_tx.send(event);
    }
}
