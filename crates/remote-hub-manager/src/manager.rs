//! Public API surface offered to the host transport: one `RemoteHub` per
//! physically-distinct hub the host has told us about, mirrored behind a
//! concurrent table (mirrors the teacher's `MeshEventNotifier` channel +
//! background dispatch task, generalized from one peer connection to a
//! whole table of mirrored hubs).

use std::sync::Arc;

use dashmap::DashMap;
use hub_types::{
    CloseReason, EndpointId, EndpointInfo, EndpointRef, HubId, HubInfo, ServiceInfo, Session,
    SessionId, MAX_HOST_HUBS_DEFAULT,
};
use message_router::{HubCallback, HubHandle, MessageRouter};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::host_callback::HostCallback;
use crate::host_event::HostEvent;
use crate::remote_hub::RemoteHub;

/// Everything the manager needs to drop a mirrored hub: the handle that
/// unregisters it from the router, and the callback object the router still
/// holds a reference to while registered.
struct RemoteHubRecord {
    handle: HubHandle,
    callback: Arc<RemoteHub>,
}

/// Mirrors every hub and endpoint the host transport has reported, and
/// bridges the router's synchronous `HubCallback` contract to the host's
/// asynchronous [`HostCallback`].
///
/// Cheap to clone; every clone shares the same hub table and dispatch task.
#[derive(Clone)]
pub struct RemoteHubManager {
    router: MessageRouter,
    hubs: Arc<DashMap<HubId, RemoteHubRecord>>,
    host_events: mpsc::UnboundedSender<HostEvent>,
    host_ready: watch::Sender<Option<Arc<dyn HostCallback>>>,
    /// Serializes `reset()` against the dispatch task forwarding ordinary
    /// topology notifications, so a host never sees a stray
    /// `on_hub_registered` interleaved mid-reset.
    embedded_op_mutex: Arc<AsyncMutex<()>>,
}

impl RemoteHubManager {
    pub fn new(router: MessageRouter) -> Self {
        let (host_events_tx, host_events_rx) = mpsc::unbounded_channel();
        let (host_ready_tx, host_ready_rx) =
            watch::channel::<Option<Arc<dyn HostCallback>>>(None);
        let embedded_op_mutex = Arc::new(AsyncMutex::new(()));

        tokio::spawn(run_dispatch(
            router.clone(),
            host_events_rx,
            host_ready_rx,
            embedded_op_mutex.clone(),
        ));

        Self {
            router,
            hubs: Arc::new(DashMap::new()),
            host_events: host_events_tx,
            host_ready: host_ready_tx,
            embedded_op_mutex,
        }
    }

    /// Supply the transport-side callback and replay the router's current
    /// topology onto it. Must be called once before any host-visible
    /// notification can be delivered; safe to call again after a transport
    /// reconnects (acts exactly like [`Self::reset`] but also (re)installs
    /// the callback first).
    pub async fn on_host_transport_ready(&self, callback: Arc<dyn HostCallback>) {
        let _ = self.host_ready.send(Some(callback));
        self.reset().await;
    }

    /// Drop every mirrored hub, then replay the router's full topology in
    /// order: `on_reset`, then per hub `on_hub_registered`, then per
    /// endpoint `on_endpoint_registered`, `on_endpoint_service`* and
    /// `on_endpoint_ready`.
    pub async fn reset(&self) {
        let _guard = self.embedded_op_mutex.lock().await;

        self.hubs.clear();

        let Some(callback) = self.host_ready.borrow().clone() else {
            warn!("reset: host transport not ready yet, topology replay skipped");
            return;
        };

        callback.on_reset().await;

        let mut hub_infos = Vec::new();
        self.router.for_each_message_hub(|info| hub_infos.push(info.clone()));

        for hub_info in hub_infos {
            callback.on_hub_registered(hub_info.clone()).await;

            let mut endpoints = Vec::new();
            self.router
                .for_each_endpoint_of_hub(hub_info.id, |info| endpoints.push(info.clone()));

            for endpoint in endpoints {
                callback.on_endpoint_registered(hub_info.id, endpoint.clone()).await;

                let mut services = Vec::new();
                self.router.for_each_service(|hub, ep, svc| {
                    if hub == hub_info.id && ep == endpoint.id {
                        services.push(svc.clone());
                    }
                });
                for service in services {
                    callback
                        .on_endpoint_service(hub_info.id, endpoint.id, service)
                        .await;
                }

                callback.on_endpoint_ready(hub_info.id, endpoint.id).await;
            }
        }

        info!(hubs = self.hubs.len(), "topology replay complete");
    }

    /// Register a hub the host transport reported. Fails if this manager's
    /// own mirror table is full (see `MAX_HOST_HUBS_DEFAULT`), the router's
    /// hub table is full, or the id/name collides.
    pub fn register_hub(&self, info: HubInfo) -> bool {
        if self.hubs.contains_key(&info.id) {
            return false;
        }
        if self.hubs.len() >= MAX_HOST_HUBS_DEFAULT {
            warn!(hub = %info.id, "register_hub: host hub mirror table full");
            return false;
        }
        let callback = RemoteHub::new(info.id, self.host_events.clone());
        let Some(handle) = self.router.register_hub(info.name.clone(), info.id, callback.clone()) else {
            warn!(hub = %info.id, "register_hub: router rejected registration");
            return false;
        };
        self.hubs.insert(info.id, RemoteHubRecord { handle, callback });
        true
    }

    /// Unregister a previously-mirrored hub. Dropping the record's
    /// `HubHandle` unregisters it from the router, closing every session it
    /// participated in.
    pub fn unregister_hub(&self, id: HubId) {
        self.hubs.remove(&id);
    }

    /// Register an endpoint on a mirrored hub. Fails if the hub is unknown
    /// or the hub's endpoint mirror is full (see `MAX_HOST_ENDPOINTS_DEFAULT`),
    /// in which case the router-side fan-out already performed is undone.
    pub fn register_endpoint(&self, hub: HubId, info: EndpointInfo, services: Vec<ServiceInfo>) -> bool {
        let Some(record) = self.hubs.get(&hub) else {
            warn!(%hub, "register_endpoint: unknown hub");
            return false;
        };
        if !record.handle.register_endpoint(info.id) {
            return false;
        }
        if !record.callback.register_endpoint(info.clone(), services) {
            warn!(%hub, endpoint = %info.id, "register_endpoint: endpoint mirror full, rolling back");
            record.handle.unregister_endpoint(info.id);
            return false;
        }
        true
    }

    pub fn unregister_endpoint(&self, hub: HubId, endpoint: EndpointId) {
        if let Some(record) = self.hubs.get(&hub) {
            record.callback.unregister_endpoint(endpoint);
            record.handle.unregister_endpoint(endpoint);
        }
    }

    /// Open a session on behalf of the host. `session_id` may be
    /// `SessionId::INVALID` to let the router allocate one.
    ///
    /// The router looks for an existing *equivalent* session (same endpoint
    /// pair and service) before it even looks at the requested id, and
    /// returns that session's id instead of opening a new one if it finds
    /// one. When that happens the id the host asked for was never actually
    /// opened, so it is rejected back to the host with
    /// `OpenEndpointSessionRequestRejected`, the same way a host-initiated
    /// refusal of a session it was told about (via
    /// `on_session_open_request`) would be.
    #[allow(clippy::too_many_arguments)]
    pub fn open_session(
        &self,
        hub: HubId,
        from_endpoint: EndpointId,
        to_hub: HubId,
        to_endpoint: EndpointId,
        session_id: SessionId,
        service: Option<&str>,
    ) -> Option<SessionId> {
        let record = self.hubs.get(&hub)?;
        let requested = if session_id.is_invalid() { None } else { Some(session_id) };
        let granted = record
            .handle
            .open_session(from_endpoint, to_hub, to_endpoint, service, requested);
        if granted.is_invalid() {
            return None;
        }
        if let Some(requested_id) = requested {
            if granted != requested_id {
                debug!(
                    %hub, requested = %requested_id, granted = %granted,
                    "open_session: router granted an existing equivalent session, rejecting requested id"
                );
                let rejected = Session::new(
                    requested_id,
                    EndpointRef::new(hub, from_endpoint),
                    EndpointRef::new(to_hub, to_endpoint),
                    service.map(|s| s.to_string()),
                );
                record
                    .callback
                    .on_session_closed(rejected, CloseReason::OpenEndpointSessionRequestRejected);
            }
        }
        Some(granted)
    }

    pub fn ack_session(&self, hub: HubId, session_id: SessionId) {
        if let Some(record) = self.hubs.get(&hub) {
            record.handle.on_session_open_complete(session_id);
        }
    }

    pub fn close_session(&self, hub: HubId, session_id: SessionId, reason: CloseReason) {
        if let Some(record) = self.hubs.get(&hub) {
            record.handle.close_session(session_id, reason);
        }
    }

    pub fn send_message(
        &self,
        hub: HubId,
        from_endpoint: EndpointId,
        session_id: SessionId,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
    ) -> bool {
        let Some(record) = self.hubs.get(&hub) else {
            return false;
        };
        record
            .handle
            .send_message(payload, message_type, permissions, session_id, from_endpoint)
    }
}

async fn run_dispatch(
    router: MessageRouter,
    mut events: mpsc::UnboundedReceiver<HostEvent>,
    ready: watch::Receiver<Option<Arc<dyn HostCallback>>>,
    embedded_op_mutex: Arc<AsyncMutex<()>>,
) {
    while let Some(event) = events.recv().await {
        // Blocks for the duration of any in-flight `reset()`, so topology
        // notifications racing a reset queue up instead of interleaving
        // with the replay.
        let _guard = embedded_op_mutex.lock().await;
        let Some(callback) = ready.borrow().clone() else {
            debug!("dispatch: host transport not ready, dropping event");
            continue;
        };
        dispatch_one(&router, callback.as_ref(), event).await;
    }
}

async fn dispatch_one(router: &MessageRouter, callback: &dyn HostCallback, event: HostEvent) {
    match event {
        HostEvent::MessageReceived {
            hub,
            session,
            payload,
            message_type,
            permissions,
            sent_by_initiator,
        } => {
            callback
                .on_message_received(hub, session, payload, message_type, permissions, sent_by_initiator)
                .await;
        }
        HostEvent::SessionOpenRequest { hub, session } => {
            callback.on_session_open_request(hub, session).await;
        }
        HostEvent::SessionOpened { hub, session } => {
            callback.on_session_opened(hub, session).await;
        }
        HostEvent::SessionClosed { hub, session, reason } => {
            callback.on_session_closed(hub, session, reason).await;
        }
        HostEvent::HubRegistered(info) => {
            callback.on_hub_registered(info).await;
        }
        HostEvent::HubUnregistered(id) => {
            callback.on_hub_unregistered(id).await;
        }
        HostEvent::EndpointRegistered { hub, endpoint } => {
            // The router's own fan-out only carries an id; resolve full
            // metadata before handing it to the host. The endpoint may
            // already be gone by the time this runs (raced by an
            // immediate unregister) in which case there is nothing to
            // report.
            let mut info = None;
            router.for_each_endpoint(|h, candidate| {
                if h == hub && candidate.id == endpoint {
                    info = Some(candidate.clone());
                }
            });
            if let Some(info) = info {
                callback.on_endpoint_registered(hub, info).await;
            }
        }
        HostEvent::EndpointUnregistered { hub, endpoint } => {
            callback.on_endpoint_unregistered(hub, endpoint).await;
        }
    }
}
