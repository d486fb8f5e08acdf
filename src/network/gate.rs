//! Bounded-concurrency admission control for outbound requests.
//!
//! [`RequestGate`] wraps a fair (FIFO) tokio [`Semaphore`]. Work submitted
//! through [`RequestGate::enqueue`] holds one slot for exactly as long as it
//! runs; the slot is returned when the operation completes, fails, or is
//! dropped mid-flight. Callers that need to hold a slot outside of a single
//! future can use the manual [`RequestGate::try_acquire`] /
//! [`RequestGate::release`] pair.
//!
//! # Example
//!
//! ```
//! use novel_importer::network::RequestGate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = RequestGate::new(5);
//! let body = gate.enqueue(|| async { "<html></html>".to_string() }).await?;
//! assert_eq!(gate.active_count(), 0);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use super::constants::DEFAULT_MAX_CONCURRENT;

/// Errors from the request gate.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// The gate was closed and admits no further work.
    #[error("request gate is closed")]
    Closed,
}

/// Counting gate bounding concurrent outbound requests.
#[derive(Debug)]
pub struct RequestGate {
    semaphore: Semaphore,
    max_concurrent: usize,
    /// Operations currently running inside `enqueue`.
    in_flight: AtomicUsize,
    /// Slots held through `try_acquire` and not yet released.
    manual: AtomicUsize,
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

/// Decrements the in-flight counter when the enqueued operation ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RequestGate {
    /// Creates a gate admitting at most `max_concurrent` operations (minimum 1).
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        debug!(max_concurrent, "creating request gate");
        Self {
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            in_flight: AtomicUsize::new(0),
            manual: AtomicUsize::new(0),
        }
    }

    /// Runs `op` once a slot is free, releasing the slot afterwards.
    ///
    /// Waiters are admitted in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] if the gate was closed before a slot was granted.
    pub async fn enqueue<F, Fut, T>(&self, op: F) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| GateError::Closed)?;
        let _in_flight = InFlightGuard::enter(&self.in_flight);
        trace!(active = self.active_count(), "slot granted");

        Ok(op().await)
    }

    /// Number of slots currently held, by enqueued work and manual acquisitions.
    ///
    /// Always within `0..=max_concurrent()`.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Number of enqueued operations currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of free slots.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Configured upper bound.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Whether a new operation would start without waiting.
    #[must_use]
    pub fn can_execute_immediately(&self) -> bool {
        self.semaphore.available_permits() > 0
    }

    /// Takes a slot without waiting. Returns `false` if none is free.
    ///
    /// Every successful call must be paired with one [`RequestGate::release`].
    pub fn try_acquire(&self) -> bool {
        match self.semaphore.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.manual.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns a slot taken with [`RequestGate::try_acquire`].
    ///
    /// A release without a matching acquisition is ignored and returns `false`,
    /// so the gate can never grow beyond `max_concurrent` slots.
    pub fn release(&self) -> bool {
        let released = self
            .manual
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |held| held.checked_sub(1))
            .is_ok();
        if released {
            self.semaphore.add_permits(1);
        } else {
            debug!("release without matching acquisition ignored");
        }
        released
    }

    /// Closes the gate. Pending and future `enqueue` calls fail with [`GateError::Closed`].
    pub fn close(&self) {
        self.semaphore.close();
    }
}
