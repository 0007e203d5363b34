//! Host-driven binding with a virtual clock.
//!
//! Nothing happens until the host calls [`ManualPlatform::dispatch`] or
//! [`ManualPlatform::advance`], which makes tracker behavior fully
//! deterministic. Used by tests and by hosts that run their own loop.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use super::{InputHandler, InputSubscriptions, Platform, SubscriptionId, TimerCallback, TimerHandle};
use crate::tracker::{ActivityState, InputChannel};

/// Timers are ordered by deadline, then by scheduling order.
type TimerKey = (Duration, u64);

#[derive(Default)]
struct ManualState {
    now: Cell<Duration>,
    next_timer: Cell<u64>,
    timers: RefCell<BTreeMap<TimerKey, TimerCallback>>,
    marker: Cell<Option<ActivityState>>,
    inputs: InputSubscriptions,
}

/// Virtual-clock platform. Clones share the same clock, marker and
/// subscriptions.
#[derive(Clone, Default)]
pub struct ManualPlatform {
    state: Rc<ManualState>,
}

/// Handle to a timer scheduled on a [`ManualPlatform`].
pub struct ManualTimer {
    key: TimerKey,
    state: Weak<ManualState>,
}

impl TimerHandle for ManualTimer {
    fn cancel(self) {
        if let Some(state) = self.state.upgrade() {
            state.timers.borrow_mut().remove(&self.key);
        }
    }
}

impl ManualPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.now.get()
    }

    pub fn marker(&self) -> Option<ActivityState> {
        self.state.marker.get()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.timers.borrow().len()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.inputs.len()
    }

    /// Deliver one qualifying input to the subscribed handlers.
    pub fn dispatch(&self, channel: InputChannel) {
        self.state.inputs.dispatch(channel);
    }

    /// Move the clock forward by `by`, running every timer that falls due on
    /// the way at its own deadline.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            let due = {
                let mut timers = self.state.timers.borrow_mut();
                let next = timers.first_key_value().map(|(&key, _)| key);
                match next {
                    Some(key) if key.0 <= target => timers.remove(&key).map(|cb| (key, cb)),
                    _ => None,
                }
            };
            let Some(((deadline, _), callback)) = due else {
                break;
            };
            self.state.now.set(deadline.max(self.now()));
            callback();
        }
        // A callback may have advanced the clock past `target` already.
        self.state.now.set(target.max(self.now()));
    }
}

impl Platform for ManualPlatform {
    type Timer = ManualTimer;

    fn set_marker(&self, marker: Option<ActivityState>) {
        self.state.marker.set(marker);
    }

    fn subscribe_input(&self, channel: InputChannel, handler: InputHandler) -> SubscriptionId {
        self.state.inputs.subscribe(channel, handler)
    }

    fn unsubscribe_input(&self, channel: InputChannel, id: SubscriptionId) {
        self.state.inputs.unsubscribe(channel, id);
    }

    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> ManualTimer {
        let seq = self.state.next_timer.get();
        self.state.next_timer.set(seq + 1);
        let key = (self.now() + delay, seq);
        self.state.timers.borrow_mut().insert(key, callback);
        ManualTimer {
            key,
            state: Rc::downgrade(&self.state),
        }
    }
}
