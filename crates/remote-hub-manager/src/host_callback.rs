//! The outbound interface towards the host-side transport.

use async_trait::async_trait;
use hub_types::{CloseReason, EndpointId, EndpointInfo, HubId, HubInfo, ServiceInfo, Session};

/// Everything the manager tells the host transport. One implementation
/// wraps whatever framing the transport actually uses; this trait only
/// describes the logical calls, mirroring the router-side `HubCallback`.
#[async_trait]
pub trait HostCallback: Send + Sync {
    async fn on_reset(&self);
    async fn on_hub_registered(&self, info: HubInfo);
    async fn on_hub_unregistered(&self, id: HubId);
    async fn on_endpoint_registered(&self, hub: HubId, info: EndpointInfo);
    async fn on_endpoint_service(&self, hub: HubId, endpoint: EndpointId, service: ServiceInfo);
    async fn on_endpoint_ready(&self, hub: HubId, endpoint: EndpointId);
    async fn on_endpoint_unregistered(&self, hub: HubId, endpoint: EndpointId);
    async fn on_message_received(
        &self,
        hub: HubId,
        session: Session,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
        sent_by_initiator: bool,
    ) -> bool;
    async fn on_session_open_request(&self, hub: HubId, session: Session);
    async fn on_session_opened(&self, hub: HubId, session: Session);
    async fn on_session_closed(&self, hub: HubId, session: Session, reason: CloseReason);
}
