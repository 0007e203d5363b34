//! Environment binding for the tracker: input subscriptions, the shared
//! marker and a single-shot deadline timer.

mod event_loop;
mod manual;
mod marker;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::tracker::{ActivityState, InputChannel};

pub use event_loop::{EventLoopPlatform, EventLoopTimer};
pub use manual::{ManualPlatform, ManualTimer};
pub use marker::{FileMarker, MarkerSurface, SharedMarker};

/// Callback invoked for every qualifying input on a subscribed channel.
pub type InputHandler = Rc<dyn Fn(InputChannel)>;

/// Callback run once when a scheduled deadline elapses.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Identifies one input subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A pending scheduled callback.
pub trait TimerHandle {
    /// Cancel the callback. A cancelled callback never runs.
    fn cancel(self);
}

/// Everything the tracker needs from its environment.
///
/// All methods run on the single event-loop thread; implementations must not
/// invoke handlers or callbacks synchronously from inside these methods.
pub trait Platform: 'static {
    type Timer: TimerHandle;

    /// Set the shared marker, or clear it entirely with `None`.
    fn set_marker(&self, marker: Option<ActivityState>);

    fn subscribe_input(&self, channel: InputChannel, handler: InputHandler) -> SubscriptionId;

    /// Drop a subscription. Unknown ids are ignored.
    fn unsubscribe_input(&self, channel: InputChannel, id: SubscriptionId);

    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> Self::Timer;
}

/// Input subscription table shared by the platform bindings.
#[derive(Default)]
pub(crate) struct InputSubscriptions {
    next_id: Cell<u64>,
    handlers: RefCell<HashMap<InputChannel, Vec<(SubscriptionId, InputHandler)>>>,
}

impl InputSubscriptions {
    pub(crate) fn subscribe(&self, channel: InputChannel, handler: InputHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers
            .borrow_mut()
            .entry(channel)
            .or_default()
            .push((id, handler));
        id
    }

    pub(crate) fn unsubscribe(&self, channel: InputChannel, id: SubscriptionId) {
        if let Some(handlers) = self.handlers.borrow_mut().get_mut(&channel) {
            handlers.retain(|(existing, _)| *existing != id);
        }
    }

    /// Run every handler subscribed to `channel`.
    ///
    /// The table is not borrowed while handlers run.
    pub(crate) fn dispatch(&self, channel: InputChannel) {
        let handlers: Vec<InputHandler> = self
            .handlers
            .borrow()
            .get(&channel)
            .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(channel);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.borrow().values().map(Vec::len).sum()
    }
}
