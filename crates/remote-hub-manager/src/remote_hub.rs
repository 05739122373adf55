//! A single mirrored remote hub: its locally-cached endpoint/service list
//! and the `HubCallback` the router invokes on its behalf.

use std::sync::{Arc, Mutex};

use hub_types::{
    CloseReason, EndpointId, EndpointInfo, HubId, HubInfo, ServiceInfo, Session,
    MAX_HOST_ENDPOINTS_DEFAULT,
};
use message_router::HubCallback;
use tokio::sync::mpsc;

use crate::host_event::HostEvent;

struct RemoteEndpoint {
    info: EndpointInfo,
    services: Vec<ServiceInfo>,
}

/// Mirror of one endpoint's registered services and identity, per §4.4:
/// "a bounded list of `Endpoint` records (each with an `EndpointInfo` and
/// its owned set of `ServiceInfo`)".
#[derive(Default)]
pub(crate) struct RemoteHubEndpoints {
    entries: Mutex<Vec<RemoteEndpoint>>,
}

impl RemoteHubEndpoints {
    /// Inserts or replaces `info`'s entry. Fails without modifying anything
    /// when this would grow the table past `MAX_HOST_ENDPOINTS_DEFAULT` (a
    /// replacement of an already-present endpoint never counts against the
    /// cap).
    fn register(&self, info: EndpointInfo, services: Vec<ServiceInfo>) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let is_replacement = entries.iter().any(|e| e.info.id == info.id);
        if !is_replacement && entries.len() >= MAX_HOST_ENDPOINTS_DEFAULT {
            return false;
        }
        entries.retain(|e| e.info.id != info.id);
        entries.push(RemoteEndpoint { info, services });
        true
    }

    fn unregister(&self, endpoint: EndpointId) {
        self.entries.lock().unwrap().retain(|e| e.info.id != endpoint);
    }

    fn get(&self, endpoint: EndpointId) -> Option<EndpointInfo> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.info.id == endpoint)
            .map(|e| e.info.clone())
    }

    fn for_each(&self, mut f: impl FnMut(&EndpointInfo)) {
        for e in self.entries.lock().unwrap().iter() {
            f(&e.info);
        }
    }

    fn for_each_service(&self, mut f: impl FnMut(EndpointId, &ServiceInfo)) {
        for e in self.entries.lock().unwrap().iter() {
            for svc in &e.services {
                f(e.info.id, svc);
            }
        }
    }

    fn get_endpoint_for_service(&self, descriptor: &str) -> Option<EndpointId> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.services.iter().any(|s| s.descriptor == descriptor))
            .map(|e| e.info.id)
    }

    fn does_have_service(&self, endpoint: EndpointId, descriptor: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.info.id == endpoint && e.services.iter().any(|s| s.descriptor == descriptor))
    }
}

/// The router-facing half of one mirrored remote hub: its endpoint mirror
/// and the outbound channel used to forward notifications to the host
/// transport.
///
/// Deliberately holds no [`message_router::HubHandle`]. The router keeps a
/// strong `Arc<dyn HubCallback>` pointing at this same allocation for as
/// long as the hub stays registered, so a handle stored here would make the
/// router and this object keep each other alive forever — the handle lives
/// one level up, in `RemoteHubRecord`, which is the only thing that can
/// drop it and trigger `unregister_hub`.
pub(crate) struct RemoteHub {
    pub(crate) hub_id: HubId,
    pub(crate) endpoints: RemoteHubEndpoints,
    host_events: mpsc::UnboundedSender<HostEvent>,
}

impl RemoteHub {
    pub(crate) fn new(hub_id: HubId, host_events: mpsc::UnboundedSender<HostEvent>) -> Arc<Self> {
        Arc::new(Self {
            hub_id,
            endpoints: RemoteHubEndpoints::default(),
            host_events,
        })
    }

    pub(crate) fn register_endpoint(&self, info: EndpointInfo, services: Vec<ServiceInfo>) -> bool {
        self.endpoints.register(info, services)
    }

    pub(crate) fn unregister_endpoint(&self, endpoint: EndpointId) {
        self.endpoints.unregister(endpoint);
    }
}

impl HubCallback for RemoteHub {
    fn on_message_received(
        &self,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
        session: Session,
        sent_by_initiator: bool,
    ) -> bool {
        self.host_events
            .send(HostEvent::MessageReceived {
                hub: self.hub_id,
                session,
                payload,
                message_type,
                permissions,
                sent_by_initiator,
            })
            .is_ok()
    }

    fn on_session_open_request(&self, session: Session) {
        let _ = self.host_events.send(HostEvent::SessionOpenRequest {
            hub: self.hub_id,
            session,
        });
    }

    fn on_session_opened(&self, session: Session) {
        let _ = self.host_events.send(HostEvent::SessionOpened {
            hub: self.hub_id,
            session,
        });
    }

    fn on_session_closed(&self, session: Session, reason: CloseReason) {
        let _ = self.host_events.send(HostEvent::SessionClosed {
            hub: self.hub_id,
            session,
            reason,
        });
    }

    fn for_each_endpoint(&self, f: &mut dyn FnMut(&EndpointInfo)) {
        self.endpoints.for_each(f);
    }

    fn get_endpoint_info(&self, id: EndpointId) -> Option<EndpointInfo> {
        self.endpoints.get(id)
    }

    fn get_endpoint_for_service(&self, descriptor: &str) -> Option<EndpointId> {
        self.endpoints.get_endpoint_for_service(descriptor)
    }

    fn does_endpoint_have_service(&self, id: EndpointId, descriptor: &str) -> bool {
        self.endpoints.does_have_service(id, descriptor)
    }

    fn for_each_service(&self, f: &mut dyn FnMut(EndpointId, &ServiceInfo)) {
        self.endpoints.for_each_service(f);
    }

    fn on_hub_registered(&self, info: &HubInfo) {
        let _ = self.host_events.send(HostEvent::HubRegistered(info.clone()));
    }

    fn on_hub_unregistered(&self, id: HubId) {
        let _ = self.host_events.send(HostEvent::HubUnregistered(id));
    }

    fn on_endpoint_registered(&self, hub: HubId, endpoint: EndpointId) {
        let _ = self
            .host_events
            .send(HostEvent::EndpointRegistered { hub, endpoint });
    }

    fn on_endpoint_unregistered(&self, hub: HubId, endpoint: EndpointId) {
        let _ = self
            .host_events
            .send(HostEvent::EndpointUnregistered { hub, endpoint });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_types::{EndpointType, ServiceFormat};

    fn info(id: u64) -> EndpointInfo {
        EndpointInfo::new(EndpointId(id), "ep", 1, EndpointType::Generic, 0).unwrap()
    }

    fn svc(descriptor: &str) -> ServiceInfo {
        ServiceInfo::new(descriptor, 1, 0, ServiceFormat::Custom).unwrap()
    }

    #[test]
    fn register_replaces_prior_entry_for_same_endpoint() {
        let endpoints = RemoteHubEndpoints::default();
        endpoints.register(info(1), vec![svc("a")]);
        endpoints.register(info(1), vec![svc("b")]);

        assert!(!endpoints.does_have_service(EndpointId(1), "a"));
        assert!(endpoints.does_have_service(EndpointId(1), "b"));
    }

    #[test]
    fn get_endpoint_for_service_finds_owner() {
        let endpoints = RemoteHubEndpoints::default();
        endpoints.register(info(1), vec![svc("a")]);
        endpoints.register(info(2), vec![svc("b")]);

        assert_eq!(endpoints.get_endpoint_for_service("b"), Some(EndpointId(2)));
        assert_eq!(endpoints.get_endpoint_for_service("missing"), None);
    }

    #[test]
    fn unregister_removes_entry() {
        let endpoints = RemoteHubEndpoints::default();
        endpoints.register(info(1), vec![svc("a")]);
        endpoints.unregister(EndpointId(1));

        assert!(endpoints.get(EndpointId(1)).is_none());
    }

    #[test]
    fn register_rejects_once_table_is_full() {
        let endpoints = RemoteHubEndpoints::default();
        for i in 1..=MAX_HOST_ENDPOINTS_DEFAULT as u64 {
            assert!(endpoints.register(info(i), Vec::new()));
        }

        assert!(!endpoints.register(info(MAX_HOST_ENDPOINTS_DEFAULT as u64 + 1), Vec::new()));
        // Replacing an existing entry still works once the table is full.
        assert!(endpoints.register(info(1), vec![svc("a")]));
    }
}
