use crate::error::{MeshError, TransportError};
use crate::pool::LinkSnapshot;
use crate::room::{DirectRoom, Hook, ReadyChannel, RelayRoom, RoomCommand};
use crate::signaling::{SignalingEvents, SignalingSink, WsSignaling};
use crate::subscribers::Subscription;
use crate::transport::{TransportConfig, TransportFactory, WebRtcFactory};
use meshlink_core::utils::DEFAULT_CHANNEL_LABEL;
use meshlink_core::{
    IceServerConfig, Payload, PeerDescriptor, PeerId, RoomId, SendReceipt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

pub const DEFAULT_SIGNALING_URL: &str = "ws://127.0.0.1:3000/ws";

/// Backend selected when the container is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Peer-to-peer data channels, bootstrapped through signaling.
    #[default]
    Direct,
    /// Every payload goes through the signaling server.
    Relay,
}

/// Container settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshConfig {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<PeerId>,
    pub room_id: RoomId,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_signaling_url")]
    pub signaling_url: String,
    /// Tried before the public STUN servers.
    #[serde(default)]
    pub ice_servers: Vec<IceServerConfig>,
    #[serde(default = "default_channel_label")]
    pub channel_label: String,
}

fn default_signaling_url() -> String {
    DEFAULT_SIGNALING_URL.to_owned()
}

fn default_channel_label() -> String {
    DEFAULT_CHANNEL_LABEL.to_owned()
}

impl MeshConfig {
    pub fn new(room_id: impl Into<RoomId>) -> Self {
        Self {
            id: None,
            room_id: room_id.into(),
            mode: Mode::default(),
            signaling_url: default_signaling_url(),
            ice_servers: Vec::new(),
            channel_label: default_channel_label(),
        }
    }

    pub fn with_id(mut self, id: impl Into<PeerId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_signaling_url(mut self, url: impl Into<String>) -> Self {
        self.signaling_url = url.into();
        self
    }

    pub fn with_ice_servers(mut self, servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = servers;
        self
    }
}

/// Application handle to one room membership.
///
/// Cheap to clone; every clone drives the same room. All operations are
/// non-blocking and never fail: errors are delivered to `on_error`
/// subscribers. In [`Mode::Relay`], [`Container::send`] behaves exactly like
/// [`Container::broadcast`].
#[derive(Clone)]
pub struct Container {
    id: PeerId,
    room_id: RoomId,
    mode: Mode,
    commands: mpsc::UnboundedSender<RoomCommand>,
    next_subscription: Arc<AtomicU64>,
}

impl Container {
    /// Connect to the signaling server and join `config.room_id` with the
    /// webrtc-rs transport (direct mode) or none (relay mode).
    pub async fn connect(config: MeshConfig) -> Result<Self, MeshError> {
        let (signaling, events) = WsSignaling::connect(&config.signaling_url).await?;
        let signaling: Arc<dyn SignalingSink> = Arc::new(signaling);

        match config.mode {
            Mode::Direct => {
                let transport = TransportConfig::with_ice_servers(config.ice_servers.clone());
                let factory = WebRtcFactory::new(transport)
                    .map_err(|e| TransportError::Negotiation(format!("{:#}", e)))?;
                Ok(Self::direct(config, signaling, events, Arc::new(factory)))
            }
            Mode::Relay => Ok(Self::relay(config, signaling, events)),
        }
    }

    /// Direct-link container over any signaling channel and transport.
    /// Must be called inside a tokio runtime.
    pub fn direct(
        config: MeshConfig,
        signaling: Arc<dyn SignalingSink>,
        events: SignalingEvents,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        let id = config.id.unwrap_or_else(PeerId::random);
        let (commands, command_rx) = mpsc::unbounded_channel();

        let room = DirectRoom::new(
            id.clone(),
            config.room_id.clone(),
            config.channel_label,
            signaling,
            events,
            factory,
            command_rx,
        );
        tokio::spawn(room.run());

        info!("Joined {} as {} (direct)", config.room_id, id);
        Self::handle(id, config.room_id, Mode::Direct, commands)
    }

    /// Relay-only container. Must be called inside a tokio runtime.
    pub fn relay(
        config: MeshConfig,
        signaling: Arc<dyn SignalingSink>,
        events: SignalingEvents,
    ) -> Self {
        let id = config.id.unwrap_or_else(PeerId::random);
        let (commands, command_rx) = mpsc::unbounded_channel();

        let room = RelayRoom::new(
            id.clone(),
            config.room_id.clone(),
            signaling,
            events,
            command_rx,
        );
        tokio::spawn(room.run());

        info!("Joined {} as {} (relay)", config.room_id, id);
        Self::handle(id, config.room_id, Mode::Relay, commands)
    }

    fn handle(
        id: PeerId,
        room_id: RoomId,
        mode: Mode,
        commands: mpsc::UnboundedSender<RoomCommand>,
    ) -> Self {
        Self {
            id,
            room_id,
            mode,
            commands,
            next_subscription: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Send to every linked peer. Peers whose channel is not open yet get the
    /// payload once it opens.
    pub fn broadcast(&self, message: impl Into<Payload>) -> SendReceipt {
        let message = message.into();
        let _ = self.commands.send(RoomCommand::Broadcast(message.clone()));
        SendReceipt::broadcast(self.id.clone(), message)
    }

    /// Send to the listed peers only. Unknown ids are skipped.
    pub fn send(&self, targets: &[PeerId], message: impl Into<Payload>) -> SendReceipt {
        let message = message.into();
        let _ = self.commands.send(RoomCommand::Send {
            targets: targets.to_vec(),
            message: message.clone(),
        });
        SendReceipt::targeted(self.id.clone(), targets, message)
    }

    pub fn on_broadcast<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.subscribe(Hook::Broadcast(Arc::new(callback)))
    }

    pub fn on_join<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[PeerDescriptor]) + Send + Sync + 'static,
    {
        self.subscribe(Hook::Join(Arc::new(callback)))
    }

    pub fn on_leave<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PeerDescriptor) + Send + Sync + 'static,
    {
        self.subscribe(Hook::Leave(Arc::new(callback)))
    }

    /// Called for every channel that becomes ready, and right away for
    /// channels that already are.
    pub fn on_message_channel_ready<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ReadyChannel) + Send + Sync + 'static,
    {
        self.subscribe(Hook::Ready(Arc::new(callback)))
    }

    pub fn on_error<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&MeshError) + Send + Sync + 'static,
    {
        self.subscribe(Hook::Error(Arc::new(callback)))
    }

    fn subscribe(&self, hook: Hook) -> Subscription {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let _ = self.commands.send(RoomCommand::Subscribe(id, hook));
        Subscription::new(id, self.commands.clone())
    }

    /// Empty once the container is closed, and always in relay mode.
    pub async fn links(&self) -> Vec<LinkSnapshot> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(RoomCommand::Links(tx)).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Close every link, drop every callback and close the signaling channel.
    pub fn close(&self) {
        let _ = self.commands.send(RoomCommand::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Resolves once the room has shut down, whether through [`Container::close`]
    /// or because the signaling channel was lost.
    pub async fn closed(&self) {
        self.commands.closed().await
    }
}
