//! The interface the router consumes from every registered hub.

use hub_types::{CloseReason, EndpointId, EndpointInfo, HubId, ServiceInfo, Session};

/// Callbacks the router invokes on a hub's behalf.
///
/// Implementations must be `Send + Sync`: the router invokes them from
/// whichever thread is calling the triggering operation, never while
/// holding its own lock. Implementations are therefore free to call back
/// into the router (open/close a session, send a message) from inside a
/// callback; this reentrancy is required by the Remote Hub Manager, which
/// may close a rejected session from inside `on_session_open_request`.
pub trait HubCallback: Send + Sync {
    /// A message arrived for this hub. Returns `false` to signal fatal
    /// session trouble; the router will then close the session with reason
    /// `Unspecified`.
    fn on_message_received(
        &self,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
        session: Session,
        sent_by_initiator: bool,
    ) -> bool;

    /// The peer hub requested a new session; this hub may `ack` or `close`
    /// it, potentially reentrantly from within this call.
    fn on_session_open_request(&self, session: Session);

    /// A pending session this hub participates in is now active.
    fn on_session_opened(&self, session: Session);

    /// A session this hub participated in was closed.
    fn on_session_closed(&self, session: Session, reason: CloseReason);

    /// Enumerate the hub's endpoints.
    fn for_each_endpoint(&self, f: &mut dyn FnMut(&EndpointInfo));

    /// Look up a single endpoint's metadata.
    fn get_endpoint_info(&self, id: EndpointId) -> Option<EndpointInfo>;

    /// Resolve a service descriptor to the endpoint that publishes it.
    fn get_endpoint_for_service(&self, descriptor: &str) -> Option<EndpointId>;

    /// Check whether a specific endpoint publishes a service descriptor.
    fn does_endpoint_have_service(&self, id: EndpointId, descriptor: &str) -> bool;

    /// Enumerate every `(endpoint, service)` pair this hub publishes.
    fn for_each_service(&self, f: &mut dyn FnMut(EndpointId, &ServiceInfo));

    /// A new hub was registered elsewhere in the router.
    fn on_hub_registered(&self, info: &hub_types::HubInfo);

    /// A hub elsewhere in the router was unregistered.
    fn on_hub_unregistered(&self, id: HubId);

    /// An endpoint was registered on some hub (including this one).
    fn on_endpoint_registered(&self, hub: HubId, endpoint: EndpointId);

    /// An endpoint was unregistered on some hub (including this one).
    fn on_endpoint_unregistered(&self, hub: HubId, endpoint: EndpointId);
}
