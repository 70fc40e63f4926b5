use crate::SignalingService;
use crate::room::RoomCommand;
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use meshlink_core::{PeerId, RoomId, SignalMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

/// Identity bound to a connection by its `register` frame.
#[derive(Clone)]
struct Registration {
    peer_id: PeerId,
    room_id: RoomId,
    room_tx: mpsc::Sender<RoomCommand>,
}

async fn handle_socket(socket: WebSocket, service: SignalingService) {
    let conn = service.next_connection_id();
    info!("New WebSocket connection #{}", conn);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SignalMessage>();
    let (registered_tx, mut registered_rx) = oneshot::channel::<Registration>();

    // Pings sent since the client was last heard from
    let unanswered = Arc::new(AtomicU32::new(0));
    let heartbeat = service.heartbeat();

    let mut send_task = tokio::spawn({
        let unanswered = unanswered.clone();

        async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + heartbeat.interval, heartbeat.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let frame = tokio::select! {
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break };
                        match serde_json::to_string(&msg) {
                            Ok(json) => Message::Text(json.into()),
                            Err(e) => {
                                error!("Failed to serialize signal message: {}", e);
                                continue;
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        if unanswered.fetch_add(1, Ordering::Relaxed) >= heartbeat.max_missed {
                            warn!("Connection #{} stopped answering pings", conn);
                            break;
                        }
                        Message::Ping(Bytes::new())
                    }
                };

                if sender.send(frame).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            // Handed to the room on registration; the connection closes once
            // the room drops it.
            let mut tx = Some(tx);
            let mut registered_tx = Some(registered_tx);
            let mut registration: Option<Registration> = None;

            while let Some(Ok(msg)) = receiver.next().await {
                unanswered.store(0, Ordering::Relaxed);

                // Pings from the client are answered by the websocket layer
                let text = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };

                let signal = match serde_json::from_str::<SignalMessage>(&text) {
                    Ok(signal) => signal,
                    Err(e) => {
                        warn!("Invalid SignalMessage on connection #{}: {}", conn, e);
                        continue;
                    }
                };

                match registration.as_ref() {
                    None => match signal {
                        SignalMessage::Register { room_id, user_id } => {
                            let Some(tx) = tx.take() else { break };
                            let room_tx = service.rooms().get_room_sender(&room_id);
                            let join = RoomCommand::Join {
                                peer_id: user_id.clone(),
                                conn,
                                tx,
                            };
                            if let Err(e) = room_tx.send(join).await {
                                error!("Room {} died: {}", room_id, e);
                                break;
                            }

                            let reg = Registration {
                                peer_id: user_id,
                                room_id,
                                room_tx,
                            };
                            if let Some(notify) = registered_tx.take() {
                                let _ = notify.send(reg.clone());
                            }
                            registration = Some(reg);
                        }
                        other => {
                            warn!("Dropped {} on connection #{}: not registered", other.topic(), conn);
                        }
                    },

                    Some(reg) => match signal {
                        SignalMessage::Register { .. } => {
                            warn!("{} is already registered in room {}", reg.peer_id, reg.room_id);
                        }
                        other if other.room_id() != &reg.room_id => {
                            debug!(
                                "Dropped {} from {}: room {} is not {}",
                                other.topic(),
                                reg.peer_id,
                                other.room_id(),
                                reg.room_id
                            );
                        }
                        other => {
                            let cmd = RoomCommand::Forward {
                                from: reg.peer_id.clone(),
                                conn,
                                message: other,
                            };
                            if let Err(e) = reg.room_tx.send(cmd).await {
                                error!("Room {} died: {}", reg.room_id, e);
                                break;
                            }
                        }
                    },
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    if let Ok(reg) = registered_rx.try_recv() {
        let _ = reg
            .room_tx
            .send(RoomCommand::Leave {
                peer_id: reg.peer_id,
                conn,
            })
            .await;
    }

    info!("WebSocket connection #{} closed", conn);
}
