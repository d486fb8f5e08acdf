//! Network plumbing shared by extraction and import.
//!
//! - [`RequestGate`] bounds concurrent outbound requests (default 5, FIFO).
//! - [`Dispatcher`] checks connectivity before admitting work to the gate.
//! - [`NetworkError`] classifies failures; [`RetryPolicy`] decides on retries.
//! - [`Transport`] fetches pages; [`HttpTransport`] is the `reqwest` implementation.
//! - [`PolitenessDelay`] paces consecutive requests to one host.

mod connectivity;
pub mod constants;
mod dispatcher;
mod error;
mod gate;
mod politeness;
mod retry;
mod transport;

pub use connectivity::{AlwaysOnline, ConnectivityProbe, ManualProbe, TcpProbe};
pub use constants::DEFAULT_MAX_CONCURRENT;
pub use dispatcher::Dispatcher;
pub use error::{NetworkError, http_error_message, is_retryable};
pub use gate::{GateError, RequestGate};
pub use politeness::{PolitenessDelay, extract_host, parse_retry_after};
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};
pub use transport::{HttpTransport, Transport, TransportConfig};
