//! Typed events the manager distributes to individual applications.

use hub_types::{CloseReason, EndpointId, HubId, Session};

/// What an application sees after router activity touching one of its
/// endpoints. Delivered on an unbounded per-endpoint channel; the
/// application drains it on its own schedule.
#[derive(Debug, Clone)]
pub enum AppEvent {
    MessageReceived {
        session: Session,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
        sent_by_initiator: bool,
    },
    SessionOpenRequest(Session),
    SessionOpened(Session),
    SessionClosed(Session, CloseReason),
    EndpointReady {
        hub: HubId,
        endpoint: EndpointId,
    },
}
