//! Hub, endpoint and session identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a message hub. `0` is both "invalid" and "any",
/// depending on the calling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HubId(pub u64);

impl HubId {
    /// Sentinel meaning "invalid" or "any", depending on context.
    pub const INVALID: HubId = HubId(0);

    /// True when this id is the `0` sentinel.
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl fmt::Display for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for HubId {
    fn from(value: u64) -> Self {
        HubId(value)
    }
}

/// Unique identifier for an endpoint within its owning hub. `0` is both
/// "invalid" and "any", depending on the calling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointId(pub u64);

impl EndpointId {
    /// Sentinel meaning "invalid" or "any", depending on context.
    pub const INVALID: EndpointId = EndpointId(0);

    /// True when this id is the `0` sentinel.
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for EndpointId {
    fn from(value: u64) -> Self {
        EndpointId(value)
    }
}

/// Unique identifier for a session, scoped to the router at any instant.
///
/// `0xFFFF` is invalid. The space is partitioned into a router-assigned
/// range `[0, reserved)` and a caller-assigned reserved range
/// `[reserved, 0xFFFE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u16);

impl SessionId {
    /// Sentinel for "no such session" / "operation failed".
    pub const INVALID: SessionId = SessionId(0xFFFF);

    /// True when this id is the `0xFFFF` sentinel.
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl From<u16> for SessionId {
    fn from(value: u16) -> Self {
        SessionId(value)
    }
}

/// A (hub, endpoint) pair, used throughout the router to name a session
/// participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    pub hub: HubId,
    pub endpoint: EndpointId,
}

impl EndpointRef {
    pub fn new(hub: HubId, endpoint: EndpointId) -> Self {
        Self { hub, endpoint }
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hub, self.endpoint)
    }
}
