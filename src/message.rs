use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Permit, Sender};

use crate::identity::LinkId;
use crate::{link_debug, link_warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateKind {
    Connected,
    Disconnected,
}

/// Notifications a link pushes to its owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    NameChanged {
        link_id: LinkId,
        name: String,
    },

    /// One event per connect/disconnect transition. Observers that only care
    /// about the boolean view use [`LinkEvent::connected_flag`].
    State {
        link_id: LinkId,
        kind: StateKind,
    },

    BytesReceived {
        link_id: LinkId,
        data: Bytes,
    },

    CommunicationError {
        link_name: String,
        reason: String,
    },
}

impl LinkEvent {
    pub fn connected(link_id: LinkId) -> Self {
        LinkEvent::State { link_id, kind: StateKind::Connected }
    }

    pub fn disconnected(link_id: LinkId) -> Self {
        LinkEvent::State { link_id, kind: StateKind::Disconnected }
    }

    /// `Some(true)` / `Some(false)` for state transitions, `None` otherwise.
    pub fn connected_flag(&self) -> Option<bool> {
        match self {
            LinkEvent::State { kind, .. } => Some(*kind == StateKind::Connected),
            _ => None,
        }
    }

    /// Link the event refers to. Errors only carry the link name.
    pub fn link_id(&self) -> Option<LinkId> {
        match self {
            LinkEvent::NameChanged { link_id, .. }
            | LinkEvent::State { link_id, .. }
            | LinkEvent::BytesReceived { link_id, .. } => Some(*link_id),
            LinkEvent::CommunicationError { .. } => None,
        }
    }
}

/// Sending side of the owner's event channel.
#[derive(Clone, Debug)]
pub(crate) struct EventSink {
    tx: Sender<LinkEvent>,
}

impl EventSink {
    pub fn new(tx: Sender<LinkEvent>) -> Self {
        Self { tx }
    }

    /// Waits for room in the channel. `None` once the receiver is gone.
    pub async fn reserve(&self) -> Option<Permit<'_, LinkEvent>> {
        self.tx.reserve().await.ok()
    }

    /// Delivers `event` only if there is room right now.
    pub fn try_emit(&self, event: LinkEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(ev)) => {
                link_warn!("Event channel full, dropping {ev:?}");
            }
            Err(TrySendError::Closed(ev)) => {
                link_debug!("Event receiver gone, dropping {ev:?}");
            }
        }
    }
}
