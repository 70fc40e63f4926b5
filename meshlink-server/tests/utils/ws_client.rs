use futures::{SinkExt, StreamExt};
use meshlink_core::{PeerId, RoomId, SignalMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{QUIET_MS, WAIT_TIMEOUT_MS};

/// Raw websocket client speaking the signaling protocol frame by frame.
pub struct WsClient {
    pub id: PeerId,
    pub room_id: RoomId,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect without registering.
    pub async fn connect(url: &str, id: &str, room: &str) -> Self {
        let (socket, _) = connect_async(url).await.expect("Failed to connect");
        Self {
            id: PeerId::from(id),
            room_id: RoomId::from(room),
            socket,
        }
    }

    /// Connect, register and consume the `register-accept`.
    pub async fn register(url: &str, id: &str, room: &str) -> Self {
        let mut client = Self::connect(url, id, room).await;
        client
            .send(SignalMessage::Register {
                room_id: client.room_id.clone(),
                user_id: client.id.clone(),
            })
            .await;

        let accept = client.recv().await;
        assert_eq!(
            accept,
            Some(SignalMessage::RegisterAccept {
                room_id: client.room_id.clone(),
                id: client.id.clone(),
            })
        );
        client
    }

    pub async fn send(&mut self, msg: SignalMessage) {
        let json = serde_json::to_string(&msg).expect("Failed to encode frame");
        self.socket
            .send(Message::Text(json))
            .await
            .expect("Failed to send frame");
    }

    /// Next signaling frame, or `None` after [`WAIT_TIMEOUT_MS`].
    pub async fn recv(&mut self) -> Option<SignalMessage> {
        self.recv_within(WAIT_TIMEOUT_MS).await
    }

    /// True when nothing arrives for [`QUIET_MS`].
    pub async fn is_quiet(&mut self) -> bool {
        self.recv_within(QUIET_MS).await.is_none()
    }

    async fn recv_within(&mut self, timeout_ms: u64) -> Option<SignalMessage> {
        let wait = Duration::from_millis(timeout_ms);
        loop {
            match tokio::time::timeout(wait, self.socket.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => {
                    return Some(serde_json::from_str(&text).expect("Server sent invalid frame"));
                }
                Ok(Some(Ok(_))) => continue,
                _ => return None,
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.socket.close(None).await;
    }
}
