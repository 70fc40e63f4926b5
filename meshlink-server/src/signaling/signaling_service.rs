use crate::room::{ConnectionId, RoomManager};
use crate::signaling::ws_handler;
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Websocket-level keepalive.
///
/// Every connection is pinged each `interval`. One that lets more than
/// `max_missed` pings in a row go by without sending anything is dropped,
/// which announces it as closed to its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub interval: Duration,
    pub max_missed: u32,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_missed: 2,
        }
    }
}

/// Websocket signaling endpoint shared by every connection.
///
/// Clients connect to `GET /ws` and send a `register` frame first; after
/// that their frames are routed inside the room they registered in.
#[derive(Clone, Default)]
pub struct SignalingService {
    rooms: RoomManager,
    next_connection: Arc<AtomicU64>,
    heartbeat: Heartbeat,
}

impl SignalingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn heartbeat(&self) -> Heartbeat {
        self.heartbeat
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub(crate) fn next_connection_id(&self) -> ConnectionId {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self)
    }

    /// Bind `addr` and serve until the process stops.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind signaling server to {}", addr))?;
        self.run(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().context("Listener has no local address")?;
        info!("Signaling server listening on ws://{}/ws", addr);

        axum::serve(listener, self.router())
            .await
            .context("Signaling server stopped")
    }
}
