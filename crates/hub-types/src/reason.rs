//! Session-close reason codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason a session was closed, carried in `on_session_closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    Unspecified,
    OutOfMemory,
    Timeout,
    OpenEndpointSessionRequestRejected,
    CloseEndpointSessionRequested,
    EndpointInvalid,
    EndpointGone,
    EndpointCrashed,
    HubReset,
    PermissionDenied,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::Unspecified => "unspecified",
            CloseReason::OutOfMemory => "out_of_memory",
            CloseReason::Timeout => "timeout",
            CloseReason::OpenEndpointSessionRequestRejected => {
                "open_endpoint_session_request_rejected"
            }
            CloseReason::CloseEndpointSessionRequested => "close_endpoint_session_requested",
            CloseReason::EndpointInvalid => "endpoint_invalid",
            CloseReason::EndpointGone => "endpoint_gone",
            CloseReason::EndpointCrashed => "endpoint_crashed",
            CloseReason::HubReset => "hub_reset",
            CloseReason::PermissionDenied => "permission_denied",
        };
        f.write_str(s)
    }
}
