//! Shared data model for the message router: identifiers, hub/endpoint/
//! service/session records, reason codes and build-time limits.
//!
//! This crate has no behavior of its own; `message-router` and the hub
//! managers built on top of it own the logic.

mod endpoint;
mod error;
mod hub;
mod ids;
mod limits;
mod reason;
mod service;
mod session;

pub use endpoint::{EndpointInfo, EndpointType, ENDPOINT_NAME_MAX_LEN};
pub use error::RouterError;
pub use hub::HubInfo;
pub use ids::{EndpointId, EndpointRef, HubId, SessionId};
pub use limits::{RouterLimits, MAX_HOST_ENDPOINTS_DEFAULT, MAX_HOST_HUBS_DEFAULT};
pub use reason::CloseReason;
pub use service::{
    format_legacy_service_descriptor, parse_legacy_service_descriptor, ServiceFormat,
    ServiceInfo, SERVICE_DESCRIPTOR_MAX_LEN,
};
pub use session::Session;
