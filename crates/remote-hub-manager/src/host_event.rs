//! Notifications queued from router-caller threads, drained by a single
//! dispatch task that owns the async [`crate::host_callback::HostCallback`].
//!
//! Queuing (rather than calling the async host callback inline from a sync
//! `HubCallback` method) is what lets `RemoteHub` satisfy the router's "no
//! blocking, no awaiting" contract for callback invocations while still
//! bridging to an inherently async transport.

use hub_types::{CloseReason, EndpointId, HubId, HubInfo, Session};

pub(crate) enum HostEvent {
    MessageReceived {
        hub: HubId,
        session: Session,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
        sent_by_initiator: bool,
    },
    SessionOpenRequest {
        hub: HubId,
        session: Session,
    },
    SessionOpened {
        hub: HubId,
        session: Session,
    },
    SessionClosed {
        hub: HubId,
        session: Session,
        reason: CloseReason,
    },
    HubRegistered(HubInfo),
    HubUnregistered(HubId),
    EndpointRegistered {
        hub: HubId,
        endpoint: EndpointId,
    },
    EndpointUnregistered {
        hub: HubId,
        endpoint: EndpointId,
    },
}
