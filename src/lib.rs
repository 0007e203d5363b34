//! useractivity - user activity / inactivity tracking.
//!
//! Tracks pointer and keyboard input, flips a shared marker between
//! `useractive` and `userinactive` after a configurable period without input,
//! and notifies listeners on each transition.

pub mod config;
pub mod error;
pub mod host;
pub mod platform;
pub mod tracker;

pub use error::TrackerError;
pub use platform::{EventLoopPlatform, ManualPlatform, Platform};
pub use tracker::{ActivityEvent, ActivityState, ActivityTracker, InputChannel, ListenerId};
