use crate::error::TransportError;
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_engine::{TransportEngine, TransportFactory};
use crate::transport::transport_event::{TransportEvent, TransportEventSender};
use anyhow::{Context, Result};
use async_trait::async_trait;
use meshlink_core::{IceCandidate, Payload, SdpKind, SessionDescription};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, trace};
use webrtc::api::API;
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

type ChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// Builds [`WebRtcEngine`]s that share one webrtc-rs API object.
pub struct WebRtcFactory {
    api: Arc<API>,
    rtc_config: RTCConfiguration,
}

impl WebRtcFactory {
    pub fn new(config: TransportConfig) -> Result<Self> {
        // Codecs are registered even though only data channels are used
        let mut m = MediaEngine::default();
        m.register_default_codecs()
            .context("Failed to register default codecs")?;
        let registry = register_default_interceptors(Registry::new(), &mut m)
            .context("Failed to register default interceptors")?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        Ok(Self {
            api: Arc::new(api),
            rtc_config,
        })
    }
}

impl TransportFactory for WebRtcFactory {
    fn create(&self, events: TransportEventSender) -> Arc<dyn TransportEngine> {
        Arc::new(WebRtcEngine {
            api: self.api.clone(),
            rtc_config: self.rtc_config.clone(),
            events,
            peer_connection: OnceCell::new(),
            channel: Arc::new(Mutex::new(None)),
        })
    }
}

/// One `RTCPeerConnection` plus its single data channel.
pub struct WebRtcEngine {
    api: Arc<API>,
    rtc_config: RTCConfiguration,
    events: TransportEventSender,
    peer_connection: OnceCell<Arc<RTCPeerConnection>>,
    channel: ChannelSlot,
}

impl WebRtcEngine {
    async fn connection(&self) -> Result<&Arc<RTCPeerConnection>, TransportError> {
        self.peer_connection
            .get_or_try_init(|| self.build_connection())
            .await
    }

    async fn build_connection(&self) -> Result<Arc<RTCPeerConnection>, TransportError> {
        let peer_connection = Arc::new(
            self.api
                .new_peer_connection(self.rtc_config.clone())
                .await
                .map_err(negotiation)?,
        );

        let state_events = self.events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let events = state_events.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {}", events.peer_id(), s);
                    if s == RTCPeerConnectionState::Failed {
                        events.emit(TransportEvent::Error(TransportError::Negotiation(
                            "peer connection failed".to_owned(),
                        )));
                    }
                })
            },
        ));

        // Trickle ICE: every local candidate goes out through signaling
        let ice_events = self.events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = ice_events.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                events.emit(TransportEvent::Candidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                }));
            })
        }));

        // Remote side created the channel
        let dc_events = self.events.clone();
        let dc_slot = self.channel.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let events = dc_events.clone();
            let slot = dc_slot.clone();

            Box::pin(async move {
                debug!("DataChannel '{}' announced by {}", dc.label(), events.peer_id());
                events.emit(TransportEvent::DataChannel(dc.label().to_owned()));
                attach_channel(dc, events, slot).await;
            })
        }));

        Ok(peer_connection)
    }

    async fn set_local(
        &self,
        desc: RTCSessionDescription,
    ) -> Result<SessionDescription, TransportError> {
        let pc = self.connection().await?;
        pc.set_local_description(desc.clone())
            .await
            .map_err(negotiation)?;

        let sdp = desc.sdp;
        Ok(match desc.sdp_type {
            RTCSdpType::Answer => SessionDescription::answer(sdp),
            _ => SessionDescription::offer(sdp),
        })
    }
}

#[async_trait]
impl TransportEngine for WebRtcEngine {
    async fn create_data_channel(&self, label: &str) -> Result<(), TransportError> {
        let pc = self.connection().await?;
        let dc = pc
            .create_data_channel(label, None)
            .await
            .map_err(|e| TransportError::Channel(e.to_string()))?;

        attach_channel(dc, self.events.clone(), self.channel.clone()).await;
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        let pc = self.connection().await?;
        let offer = pc.create_offer(None).await.map_err(negotiation)?;
        self.set_local(offer).await
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let pc = self.connection().await?;
        let answer = pc.create_answer(None).await.map_err(negotiation)?;
        self.set_local(answer).await
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        let pc = self.connection().await?;
        let remote = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
        }
        .map_err(negotiation)?;

        pc.set_remote_description(remote)
            .await
            .map_err(negotiation)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let pc = self.connection().await?;
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };

        pc.add_ice_candidate(init).await.map_err(negotiation)
    }

    async fn send(&self, payload: Payload) -> Result<(), TransportError> {
        let channel = self.channel.lock().await.clone();
        let Some(dc) = channel else {
            return Err(TransportError::ChannelNotOpen);
        };
        if dc.ready_state() != RTCDataChannelState::Open {
            return Err(TransportError::ChannelNotOpen);
        }

        let sent = match payload {
            Payload::Text(text) => dc.send_text(text).await,
            Payload::Binary(bytes) => dc.send(&bytes).await,
        };
        sent.map(|_| ())
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.channel.lock().await.take();

        let Some(pc) = self.peer_connection.get() else {
            return Ok(());
        };
        pc.close()
            .await
            .map_err(|e| TransportError::Channel(e.to_string()))
    }
}

/// Stores the channel and forwards its open, message and error callbacks.
///
/// The slot is filled first: `on_open` fires right away for a channel that is
/// already open, and the room may send as soon as it hears about it.
async fn attach_channel(dc: Arc<RTCDataChannel>, events: TransportEventSender, slot: ChannelSlot) {
    *slot.lock().await = Some(dc.clone());

    let open_events = events.clone();
    dc.on_open(Box::new(move || {
        Box::pin(async move {
            info!("DataChannel open for {}", open_events.peer_id());
            open_events.emit(TransportEvent::DataChannelOpen);
        })
    }));

    let msg_events = events.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let events = msg_events.clone();
        Box::pin(async move {
            let payload = if msg.is_string {
                match String::from_utf8(msg.data.to_vec()) {
                    Ok(text) => Payload::Text(text),
                    Err(_) => Payload::Binary(msg.data),
                }
            } else {
                Payload::Binary(msg.data)
            };
            trace!("{} bytes from {}", payload.len(), events.peer_id());
            events.emit(TransportEvent::Message(payload));
        })
    }));

    let err_events = events;
    dc.on_error(Box::new(move |e| {
        let events = err_events.clone();
        Box::pin(async move {
            events.emit(TransportEvent::Error(TransportError::Channel(e.to_string())));
        })
    }));
}

fn negotiation(e: webrtc::Error) -> TransportError {
    TransportError::Negotiation(e.to_string())
}
