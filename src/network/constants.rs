//! Constants for the network layer (timeouts, concurrency, pacing).

use std::time::Duration;

/// Default number of concurrent outbound requests admitted by the gate.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default HTTP connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default HTTP request timeout in seconds.
pub const READ_TIMEOUT_SECS: u64 = 15;

/// Default pause between two chapter requests to the same host.
pub const DEFAULT_CHAPTER_DELAY: Duration = Duration::from_millis(50);

/// Maximum Retry-After value honoured (1 hour).
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Desktop browser user agent; many novel sites serve stripped pages to unknown clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
