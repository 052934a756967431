//! Skips socket-bound tests in sandboxes that forbid binding.

use std::io::ErrorKind;

use wiremock::MockServer;

/// Returns true when a loopback TCP socket can be bound.
pub fn sockets_available() -> bool {
    match std::net::TcpListener::bind("127.0.0.1:0") {
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            eprintln!("skipping: loopback sockets are not permitted here ({e})");
            false
        }
        Err(e) => panic!("unexpected bind failure: {e}"),
    }
}

/// Starts a wiremock server, or returns `None` when sockets are unavailable.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if sockets_available() {
        Some(MockServer::start().await)
    } else {
        None
    }
}
