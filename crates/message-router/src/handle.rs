//! Per-hub façade returned by `MessageRouter::register_hub`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hub_types::{CloseReason, EndpointId, HubId, Session, SessionId};

use crate::router::MessageRouter;

/// A move-only façade bound to a `(router, hub id)` pair.
///
/// Every operation forwards to the router with the bound hub id. Drop and
/// `unregister()` are idempotent: after either, subsequent calls on the
/// handle are no-ops returning failure/absence.
pub struct HubHandle {
    router: MessageRouter,
    hub: HubId,
    registered: Arc<AtomicBool>,
}

impl HubHandle {
    pub(crate) fn new(router: MessageRouter, hub: HubId) -> Self {
        Self {
            router,
            hub,
            registered: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn hub_id(&self) -> HubId {
        self.hub
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire) && self.router.is_hub_registered(self.hub)
    }

    /// Unregister this hub. Idempotent.
    pub fn unregister(&self) {
        if self.registered.swap(false, Ordering::AcqRel) {
            self.router.unregister_hub(self.hub);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn open_session(
        &self,
        from_endpoint: EndpointId,
        to_hub: HubId,
        to_endpoint: EndpointId,
        service: Option<&str>,
        session_id: Option<SessionId>,
    ) -> SessionId {
        if !self.registered.load(Ordering::Acquire) {
            return SessionId::INVALID;
        }
        self.router
            .open_session(self.hub, from_endpoint, to_hub, to_endpoint, service, session_id)
    }

    pub fn close_session(&self, session_id: SessionId, reason: CloseReason) {
        if !self.registered.load(Ordering::Acquire) {
            return;
        }
        self.router.close_session(self.hub, session_id, reason);
    }

    pub fn on_session_open_complete(&self, session_id: SessionId) {
        if !self.registered.load(Ordering::Acquire) {
            return;
        }
        self.router.on_session_open_complete(self.hub, session_id);
    }

    pub fn get_session(&self, session_id: SessionId) -> Option<Session> {
        if !self.registered.load(Ordering::Acquire) {
            return None;
        }
        self.router.get_session(self.hub, session_id)
    }

    /// Resolve a service descriptor to `(hub, endpoint)`. Pass
    /// `HubId::INVALID` as `hub` to search every registered hub.
    pub fn get_endpoint_for_service(&self, hub: HubId, descriptor: &str) -> Option<(HubId, EndpointId)> {
        if !self.registered.load(Ordering::Acquire) {
            return None;
        }
        self.router.get_endpoint_for_service(hub, descriptor)
    }

    pub fn send_message(
        &self,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
        session_id: SessionId,
        from_endpoint: EndpointId,
    ) -> bool {
        if !self.registered.load(Ordering::Acquire) {
            return false;
        }
        self.router.send_message(
            payload,
            message_type,
            permissions,
            session_id,
            from_endpoint,
            self.hub,
        )
    }

    /// Find the first hub (in registration order) that reports `endpoint`.
    pub fn find_hub_for_endpoint(&self, endpoint: EndpointId) -> Option<HubId> {
        if !self.registered.load(Ordering::Acquire) {
            return None;
        }
        let mut found = None;
        self.router.for_each_endpoint(|hub, info| {
            if found.is_none() && info.id == endpoint {
                found = Some(hub);
            }
        });
        found
    }

    pub fn register_endpoint(&self, endpoint: EndpointId) -> bool {
        if !self.registered.load(Ordering::Acquire) {
            return false;
        }
        self.router.register_endpoint(self.hub, endpoint)
    }

    pub fn unregister_endpoint(&self, endpoint: EndpointId) -> bool {
        if !self.registered.load(Ordering::Acquire) {
            return false;
        }
        self.router.unregister_endpoint(self.hub, endpoint)
    }
}

impl Drop for HubHandle {
    fn drop(&mut self) {
        self.unregister();
    }
}
