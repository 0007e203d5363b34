//! Activity tracking: the active/inactive state machine and its domain types.

mod listeners;
mod session;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

pub use listeners::ListenerId;
pub use session::ActivityTracker;

/// User activity state, mirrored by the shared marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityState {
    /// User produced qualifying input within the timeout.
    #[serde(rename = "useractive")]
    Active,
    /// No qualifying input for at least the timeout.
    #[serde(rename = "userinactive")]
    Inactive,
}

impl ActivityState {
    /// Marker class name applied to the shared surface.
    pub fn class_name(self) -> &'static str {
        match self {
            ActivityState::Active => "useractive",
            ActivityState::Inactive => "userinactive",
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// A qualifying input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputChannel {
    PointerDown,
    PointerMove,
    KeyDown,
}

impl InputChannel {
    /// All channels a registered tracker listens on.
    pub const ALL: [InputChannel; 3] = [
        InputChannel::PointerDown,
        InputChannel::PointerMove,
        InputChannel::KeyDown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InputChannel::PointerDown => "pointerdown",
            InputChannel::PointerMove => "pointermove",
            InputChannel::KeyDown => "keydown",
        }
    }
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InputChannel {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pointerdown" | "mousedown" => Ok(InputChannel::PointerDown),
            "pointermove" | "mousemove" => Ok(InputChannel::PointerMove),
            "keydown" => Ok(InputChannel::KeyDown),
            other => Err(TrackerError::UnknownChannel(other.to_string())),
        }
    }
}

/// Transition notification. Carries nothing beyond its occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityEvent {
    #[serde(rename = "user-active")]
    UserActive,
    #[serde(rename = "user-inactive")]
    UserInactive,
}

impl ActivityEvent {
    pub fn name(self) -> &'static str {
        match self {
            ActivityEvent::UserActive => "user-active",
            ActivityEvent::UserInactive => "user-inactive",
        }
    }

    /// State entered by this transition.
    pub fn state(self) -> ActivityState {
        match self {
            ActivityEvent::UserActive => ActivityState::Active,
            ActivityEvent::UserInactive => ActivityState::Inactive,
        }
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names() {
        assert_eq!(ActivityState::Active.class_name(), "useractive");
        assert_eq!(ActivityState::Inactive.to_string(), "userinactive");
    }

    #[test]
    fn test_channel_parse_accepts_mouse_aliases() {
        assert_eq!("mousedown".parse::<InputChannel>().unwrap(), InputChannel::PointerDown);
        assert_eq!(" PointerMove ".parse::<InputChannel>().unwrap(), InputChannel::PointerMove);
        assert_eq!("keydown".parse::<InputChannel>().unwrap(), InputChannel::KeyDown);
        assert!(matches!(
            "scroll".parse::<InputChannel>(),
            Err(TrackerError::UnknownChannel(name)) if name == "scroll"
        ));
    }

    #[test]
    fn test_event_serializes_as_name() {
        let json = serde_json::to_string(&ActivityEvent::UserInactive).unwrap();
        assert_eq!(json, "\"user-inactive\"");
        assert_eq!(ActivityEvent::UserActive.state(), ActivityState::Active);
    }
}
