//! Reachability probes consulted before a request is admitted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

/// Reports whether the network is usable right now.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns `true` when outbound requests can be attempted.
    async fn is_online(&self) -> bool;
}

/// Probe that always reports online; used when the check is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

#[async_trait]
impl ConnectivityProbe for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

/// Probe that opens a TCP connection to a well-known address.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    /// Default probe target (public DNS over TCP).
    pub const DEFAULT_ADDRESS: &'static str = "1.1.1.1:53";

    /// Creates a probe for `address` (`host:port`).
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ADDRESS, Duration::from_secs(3))
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(error)) => {
                debug!(address = %self.address, error = %error, "connectivity probe failed");
                false
            }
            Err(_) => {
                debug!(address = %self.address, "connectivity probe timed out");
                false
            }
        }
    }
}

/// Probe whose answer is set by the caller, e.g. from a platform network callback.
#[derive(Debug)]
pub struct ManualProbe {
    online: AtomicBool,
}

impl ManualProbe {
    /// Creates a probe with the given initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Updates the reported state.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for ManualProbe {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
