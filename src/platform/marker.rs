//! Shared marker surfaces readable by other components.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{trace, warn};

use crate::tracker::ActivityState;

/// Where the active/inactive marker is published.
pub trait MarkerSurface {
    /// Publish `marker`; `None` removes both classes.
    fn publish(&self, marker: Option<ActivityState>);
}

/// In-memory marker. Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct SharedMarker {
    value: Rc<Cell<Option<ActivityState>>>,
}

impl SharedMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current marker, `None` when cleared.
    pub fn get(&self) -> Option<ActivityState> {
        self.value.get()
    }
}

impl MarkerSurface for SharedMarker {
    fn publish(&self, marker: Option<ActivityState>) {
        self.value.set(marker);
    }
}

/// Marker written to a file as the class name, or an empty file when cleared.
#[derive(Debug, Clone)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the published marker.
    pub fn read(&self) -> Option<ActivityState> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match content.trim() {
            "useractive" => Some(ActivityState::Active),
            "userinactive" => Some(ActivityState::Inactive),
            _ => None,
        }
    }
}

impl MarkerSurface for FileMarker {
    fn publish(&self, marker: Option<ActivityState>) {
        let content = marker.map(ActivityState::class_name).unwrap_or_default();
        match std::fs::write(&self.path, content) {
            Ok(()) => trace!("Marker {:?} -> {:?}", self.path, content),
            Err(e) => warn!("Failed to write marker file {:?}: {}", self.path, e),
        }
    }
}
