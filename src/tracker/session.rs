//! The activity tracker session.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use super::listeners::{ListenerId, Listeners};
use super::{ActivityEvent, ActivityState, InputChannel};
use crate::config::TrackerConfig;
use crate::platform::{InputHandler, Platform, SubscriptionId, TimerHandle};

/// The one outstanding deadline, tagged so a superseded expiry can be told
/// apart from the current one.
struct PendingDeadline<T> {
    timer: T,
    seq: u64,
}

struct Session<P: Platform> {
    this: Weak<RefCell<Session<P>>>,
    platform: P,
    listeners: Rc<Listeners>,
    state: ActivityState,
    timeout: Duration,
    pending: Option<PendingDeadline<P::Timer>>,
    next_seq: u64,
    subscriptions: Vec<(InputChannel, SubscriptionId)>,
    registered: bool,
    /// Whether state changes are published to the shared marker.
    update_marker: bool,
}

impl<P: Platform> Session<P> {
    /// Cancel the pending deadline, if any, and arm a fresh one.
    fn rearm(&mut self) {
        self.cancel_pending();

        let seq = self.next_seq;
        self.next_seq += 1;
        let this = self.this.clone();
        let timer = self.platform.schedule_after(
            self.timeout,
            Box::new(move || expire(&this, seq)),
        );
        self.pending = Some(PendingDeadline { timer, seq });
        trace!("Deadline #{} armed for {:?}", seq, self.timeout);
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.cancel();
        }
    }

    fn set_state(&mut self, state: ActivityState) {
        self.state = state;
        if self.update_marker {
            self.platform.set_marker(Some(state));
        }
    }

    /// Returns the notification to emit, if the input caused a transition.
    fn on_input(&mut self, channel: InputChannel) -> Option<ActivityEvent> {
        if !self.registered {
            return None;
        }

        self.cancel_pending();
        let event = match self.state {
            ActivityState::Inactive => {
                debug!("User active again ({})", channel);
                self.set_state(ActivityState::Active);
                Some(ActivityEvent::UserActive)
            }
            ActivityState::Active => None,
        };
        self.rearm();
        event
    }

    fn on_deadline(&mut self, seq: u64) -> Option<ActivityEvent> {
        if !self.registered {
            return None;
        }
        match &self.pending {
            Some(pending) if pending.seq == seq => {}
            _ => {
                trace!("Stale deadline #{} ignored", seq);
                return None;
            }
        }

        // The timer has fired; dropping the handle is all that is left.
        self.pending = None;
        match self.state {
            ActivityState::Active => {
                debug!("User inactive after {:?}", self.timeout);
                self.set_state(ActivityState::Inactive);
                Some(ActivityEvent::UserInactive)
            }
            ActivityState::Inactive => None,
        }
    }
}

fn handle_input<P: Platform>(session: &Weak<RefCell<Session<P>>>, channel: InputChannel) {
    let Some(session) = session.upgrade() else {
        return;
    };
    let (event, listeners) = {
        let mut session = session.borrow_mut();
        (session.on_input(channel), session.listeners.clone())
    };
    if let Some(event) = event {
        listeners.emit(event);
    }
}

fn expire<P: Platform>(session: &Weak<RefCell<Session<P>>>, seq: u64) {
    let Some(session) = session.upgrade() else {
        return;
    };
    let (event, listeners) = {
        let mut session = session.borrow_mut();
        (session.on_deadline(seq), session.listeners.clone())
    };
    if let Some(event) = event {
        listeners.emit(event);
    }
}

/// Tracks user activity through a [`Platform`] binding.
///
/// While registered, every pointer-down, pointer-move or key-down restarts a
/// single inactivity deadline. When the deadline elapses the marker flips to
/// [`ActivityState::Inactive`]; the next input flips it back to
/// [`ActivityState::Active`]. Listeners hear each transition exactly once.
///
/// All calls must happen on the platform's event-loop thread. Listener
/// callbacks run after the tracker's state is committed and may call back
/// into the tracker.
pub struct ActivityTracker<P: Platform> {
    session: Rc<RefCell<Session<P>>>,
}

impl<P: Platform> ActivityTracker<P> {
    /// Create an unregistered tracker with the given inactivity timeout.
    pub fn new(platform: P, timeout: Duration) -> Self {
        let session = Rc::new_cyclic(|this| {
            RefCell::new(Session {
                this: this.clone(),
                platform,
                listeners: Rc::new(Listeners::new()),
                state: ActivityState::Active,
                timeout,
                pending: None,
                next_seq: 0,
                subscriptions: Vec::new(),
                registered: false,
                update_marker: true,
            })
        });
        Self { session }
    }

    pub fn with_config(platform: P, config: &TrackerConfig) -> Self {
        let tracker = Self::new(platform, config.timeout());
        tracker.set_update_marker(config.update_marker);
        tracker
    }

    /// Start tracking. Calling while already registered does nothing.
    pub fn register(&self) {
        let mut session = self.session.borrow_mut();
        if session.registered {
            debug!("Tracker already registered");
            return;
        }

        info!("Tracking user activity with timeout {:?}", session.timeout);
        session.registered = true;
        session.set_state(ActivityState::Active);

        for channel in InputChannel::ALL {
            let this = Rc::downgrade(&self.session);
            let handler: InputHandler = Rc::new(move |channel| handle_input(&this, channel));
            let id = session.platform.subscribe_input(channel, handler);
            session.subscriptions.push((channel, id));
        }

        session.rearm();
    }

    /// Stop tracking and clear the marker. Calling while not registered does
    /// nothing.
    pub fn unregister(&self) {
        let mut session = self.session.borrow_mut();
        if !session.registered {
            return;
        }

        for (channel, id) in std::mem::take(&mut session.subscriptions) {
            session.platform.unsubscribe_input(channel, id);
        }
        session.cancel_pending();
        if session.update_marker {
            session.platform.set_marker(None);
        }
        session.registered = false;
        info!("Stopped tracking user activity");
    }

    /// Change the inactivity timeout.
    ///
    /// A different value restarts the countdown from now without touching the
    /// current state; the same value changes nothing.
    pub fn set_timeout(&self, timeout: Duration) {
        let mut session = self.session.borrow_mut();
        if session.timeout == timeout {
            return;
        }

        debug!("Inactivity timeout {:?} -> {:?}", session.timeout, timeout);
        session.timeout = timeout;
        if session.registered {
            session.rearm();
        }
    }

    pub fn timeout(&self) -> Duration {
        self.session.borrow().timeout
    }

    /// Turn publishing to the shared marker on or off.
    ///
    /// State changes and notifications are unaffected. While registered,
    /// turning it off clears the marker and turning it on publishes the
    /// current state.
    pub fn set_update_marker(&self, update_marker: bool) {
        let mut session = self.session.borrow_mut();
        if session.update_marker == update_marker {
            return;
        }

        debug!("Marker updates {}", if update_marker { "enabled" } else { "disabled" });
        session.update_marker = update_marker;
        if session.registered {
            let marker = update_marker.then_some(session.state);
            session.platform.set_marker(marker);
        }
    }

    pub fn update_marker(&self) -> bool {
        self.session.borrow().update_marker
    }

    /// Current state, or `None` while unregistered.
    pub fn state(&self) -> Option<ActivityState> {
        let session = self.session.borrow();
        session.registered.then_some(session.state)
    }

    pub fn is_registered(&self) -> bool {
        self.session.borrow().registered
    }

    /// Call `listener` every time the user becomes active again.
    pub fn on_user_active(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.listeners().add(ActivityEvent::UserActive, Rc::new(listener))
    }

    /// Call `listener` every time the user becomes inactive.
    pub fn on_user_inactive(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.listeners().add(ActivityEvent::UserInactive, Rc::new(listener))
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners().remove(id)
    }

    /// Subscribe to both kinds of transition notification.
    ///
    /// A live receiver counts as a listener for both kinds.
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.listeners().subscribe()
    }

    fn listeners(&self) -> Rc<Listeners> {
        self.session.borrow().listeners.clone()
    }
}

impl<P: Platform> Drop for ActivityTracker<P> {
    fn drop(&mut self) {
        self.unregister();
    }
}
