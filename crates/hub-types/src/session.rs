//! Session records.

use crate::ids::{EndpointRef, SessionId};
use serde::{Deserialize, Serialize};

/// A named, stateful channel between two endpoints, optionally qualified by
/// a service descriptor.
///
/// Two sessions are *equivalent* when they join the same pair of endpoints
/// (in either order) with the same (present-or-absent) descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub initiator: EndpointRef,
    pub peer: EndpointRef,
    pub active: bool,
    pub service_descriptor: Option<String>,
}

impl Session {
    pub fn new(
        id: SessionId,
        initiator: EndpointRef,
        peer: EndpointRef,
        service_descriptor: Option<String>,
    ) -> Self {
        Self {
            id,
            initiator,
            peer,
            active: false,
            service_descriptor,
        }
    }

    /// True when `self` and `other` would join the same pair of endpoints
    /// with the same service descriptor, regardless of which side initiated.
    pub fn is_equivalent_to(
        &self,
        from: EndpointRef,
        to: EndpointRef,
        service_descriptor: Option<&str>,
    ) -> bool {
        let same_pair = (self.initiator == from && self.peer == to)
            || (self.initiator == to && self.peer == from);
        same_pair && self.service_descriptor.as_deref() == service_descriptor
    }

    /// Returns the endpoint ref on the other hub/endpoint from `from_hub`,
    /// or `None` when `from_hub` matches neither side's hub.
    pub fn other_side(&self, from_hub: crate::ids::HubId) -> Option<EndpointRef> {
        if self.initiator.hub == from_hub {
            Some(self.peer)
        } else if self.peer.hub == from_hub {
            Some(self.initiator)
        } else {
            None
        }
    }

    /// True when both endpoints of the session live on the same hub.
    pub fn is_self_loop(&self) -> bool {
        self.initiator.hub == self.peer.hub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EndpointId, HubId};

    fn ep(hub: u64, endpoint: u64) -> EndpointRef {
        EndpointRef::new(HubId(hub), EndpointId(endpoint))
    }

    #[test]
    fn equivalence_ignores_direction() {
        let s = Session::new(SessionId(1), ep(1, 0x10), ep(2, 0x20), None);
        assert!(s.is_equivalent_to(ep(1, 0x10), ep(2, 0x20), None));
        assert!(s.is_equivalent_to(ep(2, 0x20), ep(1, 0x10), None));
        assert!(!s.is_equivalent_to(ep(2, 0x20), ep(1, 0x10), Some("svc")));
    }

    #[test]
    fn other_side_resolves_correctly() {
        let s = Session::new(SessionId(1), ep(1, 0x10), ep(2, 0x20), None);
        assert_eq!(s.other_side(HubId(1)), Some(ep(2, 0x20)));
        assert_eq!(s.other_side(HubId(2)), Some(ep(1, 0x10)));
        assert_eq!(s.other_side(HubId(3)), None);
    }

    #[test]
    fn detects_self_loop() {
        let s = Session::new(SessionId(1), ep(1, 0x10), ep(1, 0x20), None);
        assert!(s.is_self_loop());
    }
}
