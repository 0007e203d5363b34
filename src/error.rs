//! Typed errors for the tracker library.

use thiserror::Error;

/// Errors surfaced at the library boundary.
///
/// Tracker operations themselves never fail; these cover constructing a
/// platform binding and parsing host input.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The event-loop binding was created outside a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// An input channel name that is not one of the qualifying inputs.
    #[error("unknown input channel: {0}")]
    UnknownChannel(String),

    /// A host command line that could not be understood.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A timeout argument that is not a positive whole number of milliseconds.
    #[error("invalid timeout value: {0}")]
    InvalidTimeout(String),
}
