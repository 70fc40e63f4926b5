use crate::pool::LinkSnapshot;
use crate::room::hooks::Hook;
use crate::subscribers::SubscriptionId;
use meshlink_core::{Payload, PeerId};
use tokio::sync::oneshot;

/// Requests from the application handle to the room's event loop.
pub(crate) enum RoomCommand {
    Broadcast(Payload),
    Send {
        targets: Vec<PeerId>,
        message: Payload,
    },
    Subscribe(SubscriptionId, Hook),
    Unsubscribe(SubscriptionId),
    Links(oneshot::Sender<Vec<LinkSnapshot>>),
    Close,
}
