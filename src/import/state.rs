//! Lifecycle of a download session.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Orchestrator state.
///
/// `Idle → Discovering → Importing → {Completed | Cancelled | Failed}`. A
/// terminal state is kept until the next session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ImportState {
    Idle = 0,
    /// Fetching the landing page and building the chapter list.
    Discovering = 1,
    /// Fetching and persisting chapters in order.
    Importing = 2,
    Completed = 3,
    Cancelled = 4,
    Failed = 5,
}

impl ImportState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Discovering,
            2 => Self::Importing,
            3 => Self::Completed,
            4 => Self::Cancelled,
            5 => Self::Failed,
            _ => Self::Idle,
        }
    }

    /// Whether a session is running in this state.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Discovering | Self::Importing)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Importing => "importing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lock-free holder for an [`ImportState`].
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn get(&self) -> ImportState {
        ImportState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Stores `next` and returns the previous state.
    pub(crate) fn set(&self, next: ImportState) -> ImportState {
        ImportState::from_u8(self.0.swap(next as u8, Ordering::SeqCst))
    }
}
