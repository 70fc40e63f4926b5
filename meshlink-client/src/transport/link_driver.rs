use crate::error::TransportError;
use crate::transport::transport_engine::TransportEngine;
use crate::transport::transport_event::{LinkEvent, TransportEventSender};
use meshlink_core::{IceCandidate, Payload, SessionDescription};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Work queued for one peer's transport engine.
#[derive(Debug)]
pub(crate) enum EngineOp {
    /// Open the data channel, create an offer and report it.
    Offer { label: String },
    /// Apply a remote offer, create an answer and report it.
    Answer(SessionDescription),
    /// Apply the remote answer to our offer.
    ApplyAnswer(SessionDescription),
    Candidate(IceCandidate),
    Send(Payload),
}

/// Owns a link's transport engine on a dedicated task.
///
/// Operations run strictly in the order they were pushed, so the engine never
/// sees a candidate before the description it belongs to, and payloads leave
/// in FIFO order. Shutting down drops whatever operation is in flight and
/// closes the engine.
pub(crate) struct LinkDriver {
    ops: mpsc::UnboundedSender<EngineOp>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl LinkDriver {
    pub(crate) fn spawn(engine: Arc<dyn TransportEngine>, events: TransportEventSender) -> Self {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(drive(engine, events, ops_rx, shutdown_rx));

        Self {
            ops: ops_tx,
            shutdown: Some(shutdown_tx),
        }
    }

    pub(crate) fn push(&self, op: EngineOp) {
        let _ = self.ops.send(op);
    }

    pub(crate) fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for LinkDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn drive(
    engine: Arc<dyn TransportEngine>,
    events: TransportEventSender,
    mut ops: mpsc::UnboundedReceiver<EngineOp>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let op = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            op = ops.recv() => match op {
                Some(op) => op,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = execute(engine.as_ref(), &events, op) => {}
        }
    }

    if let Err(e) = engine.close().await {
        debug!("Closing transport for {} failed: {}", events.peer_id(), e);
    }
    debug!("Link driver for {} stopped", events.peer_id());
}

async fn execute(engine: &dyn TransportEngine, events: &TransportEventSender, op: EngineOp) {
    match op {
        EngineOp::Offer { label } => match create_offer(engine, &label).await {
            Ok(offer) => {
                events.report(LinkEvent::LocalOffer(offer));
            }
            Err(e) => {
                events.report(LinkEvent::Failed(e));
            }
        },

        EngineOp::Answer(offer) => match answer_offer(engine, offer).await {
            Ok(answer) => {
                events.report(LinkEvent::LocalAnswer(answer));
            }
            Err(e) => {
                events.report(LinkEvent::Failed(e));
            }
        },

        EngineOp::ApplyAnswer(answer) => {
            if let Err(e) = engine.set_remote_description(answer).await {
                events.report(LinkEvent::Failed(e));
            }
        }

        // A rejected candidate leaves the link up. If no pair ever works the
        // engine reports the connection as failed.
        EngineOp::Candidate(candidate) => {
            if let Err(e) = engine.add_ice_candidate(candidate).await {
                warn!("Failed to add ICE candidate for {}: {}", events.peer_id(), e);
            }
        }

        EngineOp::Send(payload) => {
            if let Err(e) = engine.send(payload).await {
                warn!("Failed to send message to peer {}: {}", events.peer_id(), e);
            }
        }
    }
}

async fn create_offer(
    engine: &dyn TransportEngine,
    label: &str,
) -> Result<SessionDescription, TransportError> {
    engine.create_data_channel(label).await?;
    engine.create_offer().await
}

async fn answer_offer(
    engine: &dyn TransportEngine,
    offer: SessionDescription,
) -> Result<SessionDescription, TransportError> {
    engine.set_remote_description(offer).await?;
    engine.create_answer().await
}
