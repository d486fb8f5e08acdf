//! Resolved engine settings and the wiring they drive.

use std::sync::Arc;
use std::time::Duration;

use crate::extract::ExtractionService;
use crate::network::constants::{DEFAULT_CHAPTER_DELAY, DEFAULT_MAX_CONCURRENT};
use crate::network::{
    AlwaysOnline, ConnectivityProbe, DEFAULT_MAX_ATTEMPTS, Dispatcher, HttpTransport,
    PolitenessDelay, RequestGate, RetryPolicy, TcpProbe, TransportConfig,
};

/// Settings for building an import engine. The binary fills this from its
/// config file and flags; every field has a working default.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Gate size shared by every fetch.
    pub max_concurrent: usize,
    /// Retries per chapter after the first attempt.
    pub max_retries: u32,
    /// Minimum spacing between requests to one host.
    pub chapter_delay: Duration,
    pub transport: TransportConfig,
    /// Probe connectivity before each request.
    pub connectivity_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_retries: DEFAULT_MAX_ATTEMPTS - 1,
            chapter_delay: DEFAULT_CHAPTER_DELAY,
            transport: TransportConfig::default(),
            connectivity_check: true,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries.saturating_add(1))
    }

    #[must_use]
    pub fn politeness(&self) -> PolitenessDelay {
        PolitenessDelay::new(self.chapter_delay)
    }

    /// A dispatcher over a fresh gate, probing connectivity when enabled.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        let probe: Arc<dyn ConnectivityProbe> = if self.connectivity_check {
            Arc::new(TcpProbe::default())
        } else {
            Arc::new(AlwaysOnline)
        };
        Dispatcher::new(Arc::new(RequestGate::new(self.max_concurrent)), probe)
    }

    /// Builds the HTTP-backed extraction service.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error if the client cannot be created.
    pub fn extraction_service(&self) -> Result<ExtractionService, reqwest::Error> {
        let transport = HttpTransport::new(&self.transport)?;
        Ok(ExtractionService::new(self.dispatcher(), Arc::new(transport)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.retry_policy().max_attempts(), 2);
        assert_eq!(config.politeness().interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_dispatcher_uses_configured_gate_size() {
        let config = EngineConfig {
            max_concurrent: 3,
            connectivity_check: false,
            ..EngineConfig::default()
        };
        assert_eq!(config.dispatcher().gate().max_concurrent(), 3);
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let config = EngineConfig {
            max_retries: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.retry_policy().max_attempts(), 1);
    }
}
