use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

const REQUIRE_SOCKET_TESTS_VAR: &str = "NOVEL_IMPORTER_REQUIRE_SOCKET_TESTS";

#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var(REQUIRE_SOCKET_TESTS_VAR)
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// True when no localhost listener can be bound, so wiremock cannot start.
///
/// Panics instead when socket tests are required by the environment.
#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let location = Location::caller();
    let message = format!(
        "[socket-bound-test] no localhost socket at {}:{}; mock site cannot start",
        location.file(),
        location.line()
    );
    if socket_tests_required() {
        panic!("{message}. Unset {REQUIRE_SOCKET_TESTS_VAR} to allow skipping.");
    }

    eprintln!("{message}. Skipping. Set {REQUIRE_SOCKET_TESTS_VAR}=1 to fail instead.");
    true
}

pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if should_skip_socket_bound_test() {
        None
    } else {
        Some(MockServer::start().await)
    }
}
