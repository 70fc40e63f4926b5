use crate::error::SignalingError;
use crate::signaling::signaling_sink::{SignalingEvent, SignalingEvents, SignalingSink};
use futures::{SinkExt, StreamExt};
use meshlink_core::SignalMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

/// Websocket client for the relay signaling server.
///
/// One task writes queued frames, another reads and decodes incoming ones.
/// Whichever finishes first takes the other down, after which a single
/// [`SignalingEvent::Disconnected`] is emitted.
pub struct WsSignaling {
    outgoing: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
}

impl WsSignaling {
    pub async fn connect(url: &str) -> Result<(Self, SignalingEvents), SignalingError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| SignalingError::ConnectionFailed(e.to_string()))?;
        info!("Connected to signaling server at {}", url);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        let _ = events_tx.send(SignalingEvent::Connected);

        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("Failed to write signaling frame: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let recv_events = events_tx.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(frame) = ws_receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<SignalMessage>(&text) {
                        Ok(msg) => {
                            trace!("Signal received: {}", msg.topic());
                            if recv_events.send(SignalingEvent::Message(msg)).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!("Skipping undecodable signaling frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = recv_events.send(SignalingEvent::Error(e.to_string()));
                        break;
                    }
                }
            }
        });

        let state = connected.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = &mut send_task => recv_task.abort(),
                _ = &mut recv_task => send_task.abort(),
            };

            state.store(false, Ordering::SeqCst);
            info!("Signaling connection closed");
            let _ = events_tx.send(SignalingEvent::Disconnected);
        });

        Ok((
            Self {
                outgoing: outgoing_tx,
                connected,
            },
            events_rx,
        ))
    }
}

impl SignalingSink for WsSignaling {
    fn send(&self, message: SignalMessage) -> Result<(), SignalingError> {
        if !self.is_connected() {
            return Err(SignalingError::NotConnected);
        }

        let json =
            serde_json::to_string(&message).map_err(|e| SignalingError::Encode(e.to_string()))?;
        trace!("Sending signal: {}", json);

        self.outgoing
            .send(Message::Text(json))
            .map_err(|_| SignalingError::Closed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.outgoing.send(Message::Close(None));
        }
    }
}
