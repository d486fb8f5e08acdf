//! Per-host pacing of chapter requests.
//!
//! [`PolitenessDelay`] spaces consecutive requests to the same host by a
//! fixed interval and lets a server push the next slot further out through
//! `Retry-After`. Hosts are tracked independently, so two imports from
//! different sites never wait on each other.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::MAX_RETRY_AFTER;

/// Cumulative wait per host after which a warning is logged.
const CUMULATIVE_WAIT_WARNING: Duration = Duration::from_secs(30);

/// Per-host request pacing.
#[derive(Debug)]
pub struct PolitenessDelay {
    interval: Duration,
    hosts: DashMap<String, Arc<Mutex<HostSlot>>>,
}

#[derive(Debug, Default)]
struct HostSlot {
    /// Earliest instant the next request may start; `None` before the first request.
    next_allowed: Option<Instant>,
    total_waited: Duration,
}

impl PolitenessDelay {
    /// Creates a pacer that keeps `interval` between requests to one host.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            hosts: DashMap::new(),
        }
    }

    /// A pacer that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns the configured interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn slot(&self, host: &str) -> Arc<Mutex<HostSlot>> {
        // Clone the Arc so the map shard is not held while sleeping.
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HostSlot::default())))
            .clone()
    }

    /// Waits until a request to `url`'s host is allowed, then reserves the next slot.
    ///
    /// Returns how long the caller was held back.
    #[instrument(level = "debug", skip(self), fields(host))]
    pub async fn wait(&self, url: &str) -> Duration {
        let host = extract_host(url).unwrap_or_else(|| "unknown".to_string());
        tracing::Span::current().record("host", host.as_str());

        let slot = self.slot(&host);
        let (wait_for, total) = {
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let start = slot.next_allowed.map_or(now, |next| next.max(now));
            slot.next_allowed = Some(start + self.interval);
            let wait_for = start.saturating_duration_since(now);
            slot.total_waited += wait_for;
            (wait_for, slot.total_waited)
        };

        if !wait_for.is_zero() {
            debug!(
                host = %host,
                delay_ms = wait_for.as_millis(),
                cumulative_ms = total.as_millis(),
                "pacing request"
            );
            if total >= CUMULATIVE_WAIT_WARNING {
                warn!(
                    host = %host,
                    cumulative_secs = total.as_secs(),
                    "site is heavily throttling this import"
                );
            }
            tokio::time::sleep(wait_for).await;
        }
        wait_for
    }

    /// Pushes the next allowed request to `url`'s host at least `delay` into the future.
    #[instrument(level = "debug", skip(self))]
    pub fn defer(&self, url: &str, delay: Duration) {
        let host = extract_host(url).unwrap_or_else(|| "unknown".to_string());
        let slot = self.slot(&host);
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let until = Instant::now() + delay;
        slot.next_allowed = Some(slot.next_allowed.map_or(until, |next| next.max(until)));
        debug!(host = %host, delay_ms = delay.as_millis(), "server requested back-off");
    }
}

/// Extracts the lower-cased host of `url`, or `None` if it does not parse.
///
/// ```
/// use novel_importer::network::extract_host;
///
/// assert_eq!(extract_host("https://WWW.Biquge.com/book/1/").as_deref(), Some("www.biquge.com"));
/// assert_eq!(extract_host("not a url"), None);
/// ```
#[must_use]
pub fn extract_host(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
}

/// Parses a `Retry-After` value: delta seconds or an HTTP-date.
///
/// Values above one hour are capped; dates in the past yield zero.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        let seconds = u64::try_from(seconds).ok()?;
        return Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER));
    }

    let when = httpdate::parse_http_date(header_value).ok()?;
    let delay = when
        .duration_since(std::time::SystemTime::now())
        .unwrap_or(Duration::ZERO);
    Some(delay.min(MAX_RETRY_AFTER))
}
