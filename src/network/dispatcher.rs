//! Connectivity-checked front door to the [`RequestGate`].
//!
//! The dispatcher asks its [`ConnectivityProbe`] before admitting work. When
//! the probe reports offline the request fails immediately with a
//! no-connection [`NetworkError`] and never occupies a gate slot.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use super::connectivity::{AlwaysOnline, ConnectivityProbe};
use super::gate::{GateError, RequestGate};
use super::NetworkError;

impl From<GateError> for NetworkError {
    fn from(error: GateError) -> Self {
        NetworkError::other(error.to_string())
    }
}

/// Routes fallible network operations through the probe and the gate.
#[derive(Clone)]
pub struct Dispatcher {
    gate: Arc<RequestGate>,
    probe: Arc<dyn ConnectivityProbe>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher over a shared gate and probe.
    #[must_use]
    pub fn new(gate: Arc<RequestGate>, probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self { gate, probe }
    }

    /// Creates a dispatcher that never blocks on connectivity.
    #[must_use]
    pub fn without_probe(gate: Arc<RequestGate>) -> Self {
        Self::new(gate, Arc::new(AlwaysOnline))
    }

    /// The gate shared by every request routed through this dispatcher.
    #[must_use]
    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    /// Checks connectivity, then runs `op` inside a gate slot.
    ///
    /// # Errors
    ///
    /// Fails fast with [`NetworkError::no_connection`] when offline, otherwise
    /// returns whatever `op` returns.
    pub async fn execute_request<F, Fut, T>(&self, op: F) -> Result<T, NetworkError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, NetworkError>>,
    {
        if !self.probe.is_online().await {
            warn!("network unavailable, request rejected before admission");
            return Err(NetworkError::no_connection());
        }
        self.execute_request_without_check(op).await
    }

    /// Runs `op` inside a gate slot without consulting the probe.
    ///
    /// # Errors
    ///
    /// Returns whatever `op` returns, or a [`NetworkError`] if the gate is closed.
    pub async fn execute_request_without_check<F, Fut, T>(&self, op: F) -> Result<T, NetworkError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, NetworkError>>,
    {
        debug!(
            active = self.gate.active_count(),
            max = self.gate.max_concurrent(),
            "dispatching request"
        );
        self.gate.enqueue(op).await?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::super::connectivity::ManualProbe;
    use super::*;

    #[tokio::test]
    async fn test_offline_fails_fast_without_slot() {
        let gate = Arc::new(RequestGate::new(1));
        let dispatcher = Dispatcher::new(Arc::clone(&gate), Arc::new(ManualProbe::new(false)));
        let ran = AtomicBool::new(false);

        let result = dispatcher
            .execute_request(|| async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        let error = result.unwrap_err();
        assert!(error.is_no_connection);
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_online_runs_inside_gate() {
        let gate = Arc::new(RequestGate::new(2));
        let dispatcher = Dispatcher::new(Arc::clone(&gate), Arc::new(ManualProbe::new(true)));

        let active_inside = dispatcher
            .execute_request(|| async { Ok(gate.active_count()) })
            .await
            .unwrap();

        assert_eq!(active_inside, 1);
        assert_eq!(gate.active_count(), 0);
    }

    #[tokio::test]
    async fn test_without_check_ignores_probe() {
        let gate = Arc::new(RequestGate::new(1));
        let dispatcher = Dispatcher::new(gate, Arc::new(ManualProbe::new(false)));

        let value = dispatcher
            .execute_request_without_check(|| async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_operation_error_is_passed_through() {
        let dispatcher = Dispatcher::without_probe(Arc::new(RequestGate::default()));
        let result: Result<(), NetworkError> = dispatcher
            .execute_request(|| async { Err(NetworkError::http_status("https://x.test", 503)) })
            .await;
        assert_eq!(result.unwrap_err().status_code, Some(503));
    }

    #[tokio::test]
    async fn test_closed_gate_surfaces_as_network_error() {
        let gate = Arc::new(RequestGate::new(1));
        gate.close();
        let dispatcher = Dispatcher::without_probe(gate);
        let result = dispatcher.execute_request(|| async { Ok(()) }).await;
        assert!(result.unwrap_err().message.contains("closed"));
    }
}
