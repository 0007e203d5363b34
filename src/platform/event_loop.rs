//! Binding for a tokio current-thread event loop.

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{JoinHandle, LocalSet};
use tokio::time::Instant;
use tracing::debug;

use super::{
    InputHandler, InputSubscriptions, MarkerSurface, Platform, SubscriptionId, TimerCallback,
    TimerHandle,
};
use crate::error::TrackerError;
use crate::tracker::{ActivityState, InputChannel};

struct EventLoopState {
    marker: Box<dyn MarkerSurface>,
    inputs: InputSubscriptions,
    /// Local tasks holding the pending deadlines.
    timers: LocalSet,
}

/// Platform backed by tokio timers.
///
/// Deadlines are local tasks on a [`LocalSet`] owned by the platform, so
/// scheduling works from anywhere on the runtime thread. They only fire while
/// the host drives the platform with [`EventLoopPlatform::run_until`].
/// Clones share the same marker, subscriptions and timers.
#[derive(Clone)]
pub struct EventLoopPlatform {
    state: Rc<EventLoopState>,
}

/// A deadline running as a local task; cancelling aborts it.
pub struct EventLoopTimer(JoinHandle<()>);

impl TimerHandle for EventLoopTimer {
    fn cancel(self) {
        self.0.abort();
    }
}

impl EventLoopPlatform {
    /// Create a binding publishing the marker to `marker`.
    pub fn new(marker: impl MarkerSurface + 'static) -> Result<Self, TrackerError> {
        Handle::try_current()?;
        Ok(Self {
            state: Rc::new(EventLoopState {
                marker: Box::new(marker),
                inputs: InputSubscriptions::default(),
                timers: LocalSet::new(),
            }),
        })
    }

    /// Drive pending deadlines until `future` completes.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.state.timers.run_until(future).await
    }

    /// Deliver one qualifying input to the subscribed handlers.
    pub fn dispatch(&self, channel: InputChannel) {
        self.state.inputs.dispatch(channel);
    }

    pub fn subscription_count(&self) -> usize {
        self.state.inputs.len()
    }
}

impl Platform for EventLoopPlatform {
    type Timer = EventLoopTimer;

    fn set_marker(&self, marker: Option<ActivityState>) {
        self.state.marker.publish(marker);
    }

    fn subscribe_input(&self, channel: InputChannel, handler: InputHandler) -> SubscriptionId {
        self.state.inputs.subscribe(channel, handler)
    }

    fn unsubscribe_input(&self, channel: InputChannel, id: SubscriptionId) {
        self.state.inputs.unsubscribe(channel, id);
    }

    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> EventLoopTimer {
        // The deadline counts from now, not from when the task is first polled.
        let deadline = Instant::now() + delay;
        EventLoopTimer(self.state.timers.spawn_local(async move {
            tokio::time::sleep_until(deadline).await;
            debug!("Deadline of {:?} elapsed", delay);
            callback();
        }))
    }
}
