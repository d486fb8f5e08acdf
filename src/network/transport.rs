//! Page transport: fetch a URL and return its decoded body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, instrument};

use super::NetworkError;
use super::constants::{BROWSER_USER_AGENT, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

/// Fetches documents over the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GETs `url` and returns the body as text.
    ///
    /// Non-2xx responses are errors carrying the status code.
    async fn get(&self, url: &str) -> Result<String, NetworkError>;
}

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub read_timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// `reqwest`-backed transport with a cookie store, gzip and browser user agent.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds the underlying HTTP client.
    ///
    /// # Errors
    ///
    /// Returns the builder error if TLS or proxy configuration cannot be loaded.
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .gzip(true)
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<String, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            debug!(status = status.as_u16(), "non-success response");
            return Err(NetworkError::http_status_with_retry_after(
                url,
                status.as_u16(),
                retry_after,
            ));
        }

        response
            .text()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, &e))
    }
}
