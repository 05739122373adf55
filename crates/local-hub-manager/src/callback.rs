//! The `HubCallback` this manager registers with the router.
//!
//! Query methods (`for_each_endpoint`, `get_endpoint_info`, ...) answer
//! directly from [`Shared`] under its own mutexes — no trip through the
//! event loop, so they can never deadlock against a reentrant call. Event
//! methods (`on_session_opened`, ...) fan out to the affected application's
//! channel directly for the same reason; only the ready-event re-check
//! (which touches loop-owned subscription state) is posted onto the loop's
//! channel, fire-and-forget.

use std::sync::Arc;

use hub_types::{CloseReason, EndpointId, EndpointInfo, HubId, HubInfo, ServiceInfo, Session};
use message_router::HubCallback;
use tokio::sync::mpsc;

use crate::events::AppEvent;
use crate::shared::Shared;

/// Posted to the event loop when topology changes in a way that might
/// satisfy a pending ready-event subscription.
pub(crate) enum LoopSignal {
    EndpointAvailable { hub: HubId, endpoint: EndpointId },
}

pub(crate) struct LocalHubCallback {
    pub(crate) shared: Arc<Shared>,
    pub(crate) loop_signals: mpsc::UnboundedSender<LoopSignal>,
}

impl HubCallback for LocalHubCallback {
    fn on_message_received(
        &self,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
        session: Session,
        sent_by_initiator: bool,
    ) -> bool {
        let recipient = if sent_by_initiator {
            session.peer.endpoint
        } else {
            session.initiator.endpoint
        };
        let known = self
            .shared
            .endpoints
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.id == recipient);
        if !known {
            return false;
        }
        self.shared.dispatch(
            recipient,
            AppEvent::MessageReceived {
                session,
                payload,
                message_type,
                permissions,
                sent_by_initiator,
            },
        );
        true
    }

    fn on_session_open_request(&self, session: Session) {
        self.shared
            .dispatch(session.peer.endpoint, AppEvent::SessionOpenRequest(session));
    }

    fn on_session_opened(&self, session: Session) {
        self.shared
            .dispatch(session.initiator.endpoint, AppEvent::SessionOpened(session.clone()));
        self.shared
            .dispatch(session.peer.endpoint, AppEvent::SessionOpened(session));
    }

    fn on_session_closed(&self, session: Session, reason: CloseReason) {
        self.shared.dispatch(
            session.initiator.endpoint,
            AppEvent::SessionClosed(session.clone(), reason),
        );
        self.shared
            .dispatch(session.peer.endpoint, AppEvent::SessionClosed(session, reason));
    }

    fn for_each_endpoint(&self, f: &mut dyn FnMut(&EndpointInfo)) {
        for info in self.shared.endpoints.lock().unwrap().iter() {
            f(info);
        }
    }

    fn get_endpoint_info(&self, id: EndpointId) -> Option<EndpointInfo> {
        self.shared
            .endpoints
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    fn get_endpoint_for_service(&self, descriptor: &str) -> Option<EndpointId> {
        self.shared.published.get_endpoint_for_service(descriptor)
    }

    fn does_endpoint_have_service(&self, id: EndpointId, descriptor: &str) -> bool {
        self.shared.published.does_endpoint_have_service(id, descriptor)
    }

    fn for_each_service(&self, f: &mut dyn FnMut(EndpointId, &ServiceInfo)) {
        self.shared.published.for_each(f);
    }

    fn on_hub_registered(&self, _info: &HubInfo) {}

    fn on_hub_unregistered(&self, _id: HubId) {}

    fn on_endpoint_registered(&self, hub: HubId, endpoint: EndpointId) {
        let _ = self
            .loop_signals
            .send(LoopSignal::EndpointAvailable { hub, endpoint });
    }

    fn on_endpoint_unregistered(&self, _hub: HubId, _endpoint: EndpointId) {}
}
