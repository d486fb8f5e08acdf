//! Import sessions: discover a novel's chapters and persist them in order.

mod config;
mod error;
mod orchestrator;
mod progress;
mod state;

pub use config::EngineConfig;
pub use error::ImportError;
pub use orchestrator::{DownloadOrchestrator, ImportOutcome, is_valid_url};
pub use progress::{NoProgress, ProgressReporter, ProgressUpdate};
pub use state::ImportState;
