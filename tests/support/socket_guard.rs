//! Mock servers for tests that need a localhost socket.
//!
//! Used by the integration tests and, through `#[path]`, by the library's
//! unit tests.

use std::net::TcpListener;

use wiremock::MockServer;

/// Set to `1`, `true` or `yes` to fail instead of skipping.
const REQUIRE_SOCKETS_VAR: &str = "MANGADEX_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_SOCKETS_VAR).is_ok_and(|value| {
        matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
    })
}

/// Starts a wiremock server, or returns `None` when localhost cannot be
/// bound so the calling test can return early.
///
/// # Panics
///
/// Panics when binding fails and the require variable is set.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl std::future::Future<Output = Option<MockServer>> {
    let caller = std::panic::Location::caller();
    let bindable = TcpListener::bind("127.0.0.1:0").is_ok();
    if !bindable {
        assert!(
            !sockets_required(),
            "{caller}: cannot bind a localhost socket and {REQUIRE_SOCKETS_VAR} is set"
        );
        eprintln!("{caller}: cannot bind a localhost socket, skipping mock-server test");
    }
    async move {
        if bindable {
            Some(MockServer::start().await)
        } else {
            None
        }
    }
}
