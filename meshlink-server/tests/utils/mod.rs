pub mod ws_client;

pub use ws_client::*;

use meshlink_server::SignalingService;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::Level;

/// Timeout for a frame or event to cross the server (ms).
pub const WAIT_TIMEOUT_MS: u64 = 2000;

/// How long to wait before concluding a frame will not arrive (ms).
pub const QUIET_MS: u64 = 200;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Start a signaling server on an ephemeral port and return its `/ws` URL.
pub async fn spawn_server() -> String {
    spawn_service(SignalingService::new()).await
}

pub async fn spawn_service(service: SignalingService) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(service.run(listener));
    format!("ws://{}/ws", addr)
}

/// Poll `condition` every 10ms until it holds or `timeout_ms` passes.
pub async fn wait_for<F>(timeout_ms: u64, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
