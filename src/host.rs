//! Line protocol spoken by the daemon: commands in on stdin, JSON reports out
//! on stdout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::TrackerError;
use crate::tracker::{ActivityEvent, ActivityState, InputChannel};

/// One line of host input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// A qualifying input on the given channel.
    Input(InputChannel),
    SetTimeout(Duration),
    Register,
    Unregister,
    Status,
    Quit,
}

impl FromStr for HostCommand {
    type Err = TrackerError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(TrackerError::UnknownCommand(String::new()));
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "timeout" => {
                let arg = words.next().unwrap_or_default();
                let ms: u64 = match arg.parse() {
                    Ok(ms) if ms > 0 => ms,
                    _ => return Err(TrackerError::InvalidTimeout(arg.to_string())),
                };
                HostCommand::SetTimeout(Duration::from_millis(ms))
            }
            "register" => HostCommand::Register,
            "unregister" => HostCommand::Unregister,
            "status" => HostCommand::Status,
            "quit" | "exit" => HostCommand::Quit,
            other => match other.parse::<InputChannel>() {
                Ok(channel) => HostCommand::Input(channel),
                Err(_) => return Err(TrackerError::UnknownCommand(line.trim().to_string())),
            },
        };

        if words.next().is_some() {
            return Err(TrackerError::UnknownCommand(line.trim().to_string()));
        }
        Ok(command)
    }
}

/// One line of daemon output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Report {
    Transition {
        timestamp: DateTime<Utc>,
        event: ActivityEvent,
    },
    Status {
        timestamp: DateTime<Utc>,
        state: Option<ActivityState>,
        timeout_ms: u64,
    },
}

impl Report {
    pub fn transition(event: ActivityEvent) -> Self {
        Report::Transition {
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn status(state: Option<ActivityState>, timeout: Duration) -> Self {
        Report::Status {
            timestamp: Utc::now(),
            state,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("mousemove".parse::<HostCommand>().unwrap(), HostCommand::Input(InputChannel::PointerMove));
        assert_eq!("  keydown ".parse::<HostCommand>().unwrap(), HostCommand::Input(InputChannel::KeyDown));
        assert_eq!(
            "timeout 1500".parse::<HostCommand>().unwrap(),
            HostCommand::SetTimeout(Duration::from_millis(1500))
        );
        assert_eq!("REGISTER".parse::<HostCommand>().unwrap(), HostCommand::Register);
        assert_eq!("unregister".parse::<HostCommand>().unwrap(), HostCommand::Unregister);
        assert_eq!("status".parse::<HostCommand>().unwrap(), HostCommand::Status);
        assert_eq!("exit".parse::<HostCommand>().unwrap(), HostCommand::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("timeout".parse::<HostCommand>(), Err(TrackerError::InvalidTimeout(_))));
        assert!(matches!("timeout -5".parse::<HostCommand>(), Err(TrackerError::InvalidTimeout(v)) if v == "-5"));
        assert!(matches!("timeout 0".parse::<HostCommand>(), Err(TrackerError::InvalidTimeout(v)) if v == "0"));
        assert!(matches!("wheel".parse::<HostCommand>(), Err(TrackerError::UnknownCommand(v)) if v == "wheel"));
        assert!(matches!("status now".parse::<HostCommand>(), Err(TrackerError::UnknownCommand(_))));
        assert!(matches!("".parse::<HostCommand>(), Err(TrackerError::UnknownCommand(_))));
    }

    #[test]
    fn test_transition_line() {
        let line = Report::transition(ActivityEvent::UserInactive).to_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "transition");
        assert_eq!(value["event"], "user-inactive");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_status_line() {
        let line = Report::status(Some(ActivityState::Active), Duration::from_secs(4))
            .to_line()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "status");
        assert_eq!(value["state"], "useractive");
        assert_eq!(value["timeout_ms"], 4000);

        let cleared = Report::status(None, Duration::from_secs(4)).to_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&cleared).unwrap();
        assert!(value["state"].is_null());
    }
}
