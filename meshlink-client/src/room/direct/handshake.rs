use super::DirectRoom;
use crate::error::{Ignored, MeshError, TransportError};
use crate::pool::HandshakeState;
use crate::room::hooks::ReadyChannel;
use crate::transport::TransportEvent;
use crate::transport::link_driver::EngineOp;
use meshlink_core::{Envelope, IceCandidate, PeerId, SessionDescription, SignalMessage};
use tracing::{debug, info, trace};

impl DirectRoom {
    /// Start a handshake towards `peer_id` unless one is already under way.
    pub(super) fn initiate(&mut self, peer_id: &PeerId) {
        if peer_id == &self.local_id {
            return;
        }

        let factory = self.factory.clone();
        let (link, _) = self
            .pool
            .get_or_create(peer_id, |events| factory.create(events));

        if link.handshake != HandshakeState::Idle {
            trace!("Handshake with {} already in {:?}", peer_id, link.handshake);
            return;
        }

        debug!("Creating offer for {}", peer_id);
        link.handshake = HandshakeState::Offering;
        link.push(EngineOp::Offer {
            label: self.channel_label.clone(),
        });
    }

    pub(super) fn local_offer_ready(&mut self, peer_id: PeerId, offer: SessionDescription) {
        let Some(link) = self.pool.get_live_mut(&peer_id) else {
            return;
        };
        if link.handshake != HandshakeState::Offering {
            trace!("Discarding offer for {}: {}", peer_id, Ignored::UnexpectedState);
            return;
        }
        link.handshake = HandshakeState::AwaitingAnswer;
        let held = link.local_description_sent();

        debug!("Sending offer to {}", peer_id);
        let envelope =
            Envelope::new(self.local_id.clone(), peer_id.clone(), self.room_id.clone(), offer);
        self.signal(SignalMessage::Offer(envelope));
        self.signal_candidates(&peer_id, held);
    }

    pub(super) fn local_answer_ready(&mut self, peer_id: PeerId, answer: SessionDescription) {
        let Some(link) = self.pool.get_live_mut(&peer_id) else {
            return;
        };
        if link.handshake != HandshakeState::AnsweringOffer {
            trace!("Discarding answer for {}: {}", peer_id, Ignored::UnexpectedState);
            return;
        }
        let held = link.local_description_sent();

        debug!("Sending answer to {}", peer_id);
        let envelope =
            Envelope::new(self.local_id.clone(), peer_id.clone(), self.room_id.clone(), answer);
        self.signal(SignalMessage::Answer(envelope));
        self.signal_candidates(&peer_id, held);
    }

    fn signal_candidates(&self, peer_id: &PeerId, candidates: Vec<IceCandidate>) {
        for candidate in candidates {
            let envelope = Envelope::new(
                self.local_id.clone(),
                peer_id.clone(),
                self.room_id.clone(),
                candidate,
            );
            self.signal(SignalMessage::Candidate(envelope));
        }
    }

    /// Remote-initiated handshake.
    ///
    /// Offers racing our own (both sides initiated) are settled by id: the
    /// side whose id sorts greater drops its offer and answers, the other side
    /// ignores the incoming offer and waits for its answer.
    pub(super) fn offer_received(&mut self, sender: PeerId, offer: SessionDescription) {
        if sender == self.local_id {
            return;
        }

        let factory = self.factory.clone();
        let current = self.pool.get_live_mut(&sender).map(|link| link.handshake);

        let link = match current {
            None | Some(HandshakeState::Idle) => {
                let (link, _) = self
                    .pool
                    .get_or_create(&sender, |events| factory.create(events));
                link
            }
            Some(HandshakeState::Offering | HandshakeState::AwaitingAnswer) => {
                if self.local_id < sender {
                    debug!("Offer collision with {}, keeping ours", sender);
                    return;
                }
                debug!("Offer collision with {}, answering theirs", sender);
                match self.pool.renew(&sender, |events| factory.create(events)) {
                    Some(link) => link,
                    None => return,
                }
            }
            Some(state) => {
                trace!("Duplicate offer from {} in {:?}: {}", sender, state, Ignored::UnexpectedState);
                return;
            }
        };

        debug!("Answering offer from {}", sender);
        link.handshake = HandshakeState::AnsweringOffer;
        link.apply_remote(EngineOp::Answer(offer));
    }

    pub(super) fn answer_received(&mut self, sender: PeerId, answer: SessionDescription) {
        let Some(link) = self.pool.get_live_mut(&sender) else {
            trace!("Answer from {}: {}", sender, Ignored::UnknownPeer);
            return;
        };
        if link.handshake != HandshakeState::AwaitingAnswer || link.remote_applied() {
            trace!("Answer from {}: {}", sender, Ignored::UnexpectedState);
            return;
        }

        debug!("Applying answer from {}", sender);
        link.apply_remote(EngineOp::ApplyAnswer(answer));
    }

    pub(super) fn candidate_received(&mut self, sender: PeerId, candidate: IceCandidate) {
        let Some(link) = self.pool.get_live_mut(&sender) else {
            trace!("Candidate from {}: {}", sender, Ignored::UnknownPeer);
            return;
        };
        link.add_remote_candidate(candidate);
    }

    pub(super) fn transport_event(&mut self, peer_id: PeerId, event: TransportEvent) {
        match event {
            TransportEvent::Candidate(candidate) => {
                let Some(link) = self.pool.get_live_mut(&peer_id) else {
                    return;
                };
                if let Some(candidate) = link.local_candidate(candidate) {
                    self.signal_candidates(&peer_id, vec![candidate]);
                } else {
                    trace!("Holding candidate for {} until our description is sent", peer_id);
                }
            }

            TransportEvent::DataChannel(label) => {
                debug!("Data channel '{}' announced by {}", label, peer_id);
            }

            TransportEvent::DataChannelOpen => {
                let Some(link) = self.pool.get_live_mut(&peer_id) else {
                    return;
                };
                if link.mark_open() {
                    info!("Link to {} is open", peer_id);
                    self.hooks.ready(&ReadyChannel::Peer(peer_id));
                }
            }

            TransportEvent::Message(payload) => {
                trace!("{} byte(s) from {}", payload.len(), peer_id);
                self.hooks.receive(payload);
            }

            TransportEvent::Error(e) => self.fail_link(&peer_id, e),
        }
    }

    /// The link becomes a `Closed` tombstone; no retry.
    pub(super) fn fail_link(&mut self, peer_id: &PeerId, source: TransportError) {
        let Some(link) = self.pool.get_live_mut(peer_id) else {
            return;
        };
        link.mark_closed();

        self.hooks.report(MeshError::NegotiationFailure {
            peer: peer_id.clone(),
            source,
        });
    }
}
