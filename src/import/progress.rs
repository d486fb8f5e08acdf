//! Progress side channel for import sessions.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// One persisted chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    /// 1-based count of chapters persisted for the novel so far.
    pub current: usize,
    pub total: usize,
    /// Title of the chapter just persisted.
    pub title: String,
}

/// Receives a [`ProgressUpdate`] after each chapter is persisted.
///
/// Implemented for `Fn(ProgressUpdate)` closures and for bounded
/// `mpsc::Sender<ProgressUpdate>` channels. Reporting never blocks the import.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update);
    }
}

impl ProgressReporter for mpsc::Sender<ProgressUpdate> {
    fn report(&self, update: ProgressUpdate) {
        match self.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                debug!(current = update.current, "progress channel full, update dropped");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn update(current: usize) -> ProgressUpdate {
        ProgressUpdate {
            current,
            total: 3,
            title: format!("Chapter {current}"),
        }
    }

    #[test]
    fn test_closure_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = |u: ProgressUpdate| seen.lock().unwrap().push(u.current);
        reporter.report(update(1));
        reporter.report(update(2));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_channel_reporter_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.report(update(1));
        tx.report(update(2));
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().current, 1);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        tx.report(update(1));
        NoProgress.report(update(1));
    }
}
