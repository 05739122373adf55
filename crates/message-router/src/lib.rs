//! The Message Router: the shared fabric that dispatches messages between
//! endpoints living on different message hubs.
//!
//! See [`MessageRouter`] for the broker itself and [`HubHandle`] for the
//! per-hub façade it vends. Callers implement [`HubCallback`] to receive
//! session and topology notifications.

mod callback;
mod handle;
mod router;

pub use callback::HubCallback;
pub use handle::HubHandle;
pub use router::MessageRouter;

pub use hub_types::{
    format_legacy_service_descriptor, parse_legacy_service_descriptor, CloseReason, EndpointId,
    EndpointInfo, EndpointRef, EndpointType, HubId, HubInfo, RouterError, RouterLimits,
    ServiceFormat, ServiceInfo, Session, SessionId, ENDPOINT_NAME_MAX_LEN,
    MAX_HOST_ENDPOINTS_DEFAULT, MAX_HOST_HUBS_DEFAULT, SERVICE_DESCRIPTOR_MAX_LEN,
};
