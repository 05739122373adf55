//! The Message Router: hub registry, session table, and callback fan-out.

use std::sync::{Arc, Mutex};

use hub_types::{
    CloseReason, EndpointId, EndpointInfo, EndpointRef, HubId, HubInfo, RouterLimits, ServiceInfo,
    Session, SessionId,
};
use tracing::{debug, warn};

use crate::callback::HubCallback;
use crate::handle::HubHandle;

/// Number of wrap-around attempts the router makes when allocating a fresh
/// session id before giving up and returning `SessionId::INVALID`.
const SESSION_ID_ALLOC_ATTEMPTS: usize = 10;

struct HubRecord {
    info: HubInfo,
    callback: Arc<dyn HubCallback>,
}

/// A cheap, cloneable snapshot of one hub's identity and callback, taken
/// under the router lock and used after it is released.
#[derive(Clone)]
struct HubSnapshot {
    id: HubId,
    callback: Arc<dyn HubCallback>,
}

struct RouterState {
    hubs: Vec<HubRecord>,
    sessions: Vec<Session>,
    next_session_id: u16,
}

struct RouterInner {
    limits: RouterLimits,
    state: Mutex<RouterState>,
}

/// The singleton broker: hub registry, endpoint discovery proxying, session
/// table, and fan-out of topology callbacks.
///
/// Thread-safe. A single mutex guards the hub table, the session table and
/// the session-id counter; callbacks are always invoked with the lock
/// released (see module docs on `HubCallback` for the reentrancy this
/// enables).
#[derive(Clone)]
pub struct MessageRouter {
    inner: Arc<RouterInner>,
}

impl MessageRouter {
    pub fn new(limits: RouterLimits) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                limits,
                state: Mutex::new(RouterState {
                    hubs: Vec::new(),
                    sessions: Vec::new(),
                    next_session_id: 0,
                }),
            }),
        }
    }

    pub fn limits(&self) -> RouterLimits {
        self.inner.limits
    }

    /// Register a new hub. Fails if the hub table is full, the name
    /// collides, or the id collides. On success every other currently
    /// registered hub receives `on_hub_registered` before this call
    /// returns.
    pub fn register_hub(
        &self,
        name: impl Into<String>,
        id: HubId,
        callback: Arc<dyn HubCallback>,
    ) -> Option<HubHandle> {
        let name = name.into();
        let info = HubInfo::new(id, name);

        let others = {
            let mut state = self.inner.state.lock().unwrap();
            if state.hubs.len() >= self.inner.limits.max_hubs {
                warn!(hub = %id, "register_hub: hub table full");
                return None;
            }
            if state.hubs.iter().any(|h| h.info.name == info.name) {
                warn!(hub = %id, name = %info.name, "register_hub: name collision");
                return None;
            }
            if state.hubs.iter().any(|h| h.info.id == id) {
                warn!(hub = %id, "register_hub: id collision");
                return None;
            }
            state.hubs.push(HubRecord {
                info: info.clone(),
                callback: callback.clone(),
            });
            snapshot_hubs_except(&state.hubs, id)
        };

        for other in &others {
            other.callback.on_hub_registered(&info);
        }

        Some(HubHandle::new(self.clone(), id))
    }

    /// Remove a hub's record, close every session it participated in
    /// (notifying the other side with reason `HubReset`), and notify every
    /// remaining hub that it unregistered. Idempotent: unregistering an
    /// unknown hub is a no-op.
    pub(crate) fn unregister_hub(&self, id: HubId) {
        let (closed_sessions, remaining) = {
            let mut state = self.inner.state.lock().unwrap();
            let before = state.hubs.len();
            state.hubs.retain(|h| h.info.id != id);
            if state.hubs.len() == before {
                return;
            }

            let mut closed = Vec::new();
            state.sessions.retain(|s| {
                if s.initiator.hub == id || s.peer.hub == id {
                    closed.push(s.clone());
                    false
                } else {
                    true
                }
            });

            let remaining = snapshot_hubs_except(&state.hubs, HubId::INVALID);
            (closed, remaining)
        };

        let find = |hub: HubId| remaining.iter().find(|h| h.id == hub).cloned();
        for session in closed_sessions {
            if let Some(other_hub) = session.other_side(id) {
                if let Some(snapshot) = find(other_hub.hub) {
                    snapshot
                        .callback
                        .on_session_closed(session.clone(), CloseReason::HubReset);
                }
            }
        }

        for other in &remaining {
            other.callback.on_hub_unregistered(id);
        }
    }

    /// Open (or find the existing equivalent of) a session between two
    /// endpoints. Returns `SessionId::INVALID` on any validation failure.
    #[allow(clippy::too_many_arguments)]
    pub fn open_session(
        &self,
        from_hub: HubId,
        from_endpoint: EndpointId,
        to_hub: HubId,
        to_endpoint: EndpointId,
        service: Option<&str>,
        session_id: Option<SessionId>,
    ) -> SessionId {
        if let Some(id) = session_id {
            if !self.inner.limits.is_reserved_session_id(id.0) {
                debug!(session = %id, "open_session: caller id outside reserved range");
                return SessionId::INVALID;
            }
        }

        let (from_cb, to_cb) = {
            let state = self.inner.state.lock().unwrap();
            let from_cb = state.hubs.iter().find(|h| h.info.id == from_hub).map(|h| h.callback.clone());
            let to_cb = state.hubs.iter().find(|h| h.info.id == to_hub).map(|h| h.callback.clone());
            (from_cb, to_cb)
        };
        let (Some(from_cb), Some(to_cb)) = (from_cb, to_cb) else {
            debug!(%from_hub, %to_hub, "open_session: unknown hub");
            return SessionId::INVALID;
        };

        if !endpoint_exists(&*from_cb, from_endpoint) || !endpoint_exists(&*to_cb, to_endpoint) {
            debug!("open_session: endpoint not found on hub");
            return SessionId::INVALID;
        }

        if let Some(descriptor) = service {
            if !to_cb.does_endpoint_have_service(to_endpoint, descriptor) {
                debug!(%to_hub, %to_endpoint, descriptor, "open_session: peer lacks service");
                return SessionId::INVALID;
            }
        }

        let from = EndpointRef::new(from_hub, from_endpoint);
        let to = EndpointRef::new(to_hub, to_endpoint);

        let result = {
            let mut state = self.inner.state.lock().unwrap();

            if let Some(existing) = state
                .sessions
                .iter()
                .find(|s| s.is_equivalent_to(from, to, service))
            {
                return existing.id;
            }

            let id = match session_id {
                Some(id) => {
                    if state.sessions.iter().any(|s| s.id == id) {
                        debug!(session = %id, "open_session: caller id collision");
                        return SessionId::INVALID;
                    }
                    id
                }
                None => {
                    let reserved = self.inner.limits.reserved_session_id;
                    match allocate_session_id(&mut state, reserved) {
                        Some(id) => id,
                        None => {
                            warn!("open_session: session id space exhausted");
                            return SessionId::INVALID;
                        }
                    }
                }
            };

            if state.sessions.len() >= self.inner.limits.max_sessions {
                warn!("open_session: session table full");
                return SessionId::INVALID;
            }

            let session = Session::new(id, from, to, service.map(|s| s.to_string()));
            state.sessions.push(session.clone());
            session
        };

        to_cb.on_session_open_request(result.clone());
        result.id
    }

    /// Remove a session (if `from_hub` is one of its endpoints) and notify
    /// both sides, once each even when both endpoints share a hub.
    pub fn close_session(&self, from_hub: HubId, session_id: SessionId, reason: CloseReason) {
        let (session, notify) = {
            let mut state = self.inner.state.lock().unwrap();
            let idx = state.sessions.iter().position(|s| {
                s.id == session_id && (s.initiator.hub == from_hub || s.peer.hub == from_hub)
            });
            let Some(idx) = idx else { return };
            let session = state.sessions.remove(idx);
            let notify = distinct_hub_callbacks(&state.hubs, &session);
            (session, notify)
        };

        for callback in notify {
            callback.on_session_closed(session.clone(), reason);
        }
    }

    /// Transition a pending session to active and notify both sides.
    /// Idempotent: acking an already-active session emits nothing further.
    pub fn on_session_open_complete(&self, from_hub: HubId, session_id: SessionId) {
        let (session, notify) = {
            let mut state = self.inner.state.lock().unwrap();
            let Some(session) = state.sessions.iter_mut().find(|s| {
                s.id == session_id && (s.initiator.hub == from_hub || s.peer.hub == from_hub)
            }) else {
                return;
            };
            if session.active {
                return;
            }
            session.active = true;
            let session = session.clone();
            let notify = distinct_hub_callbacks(&state.hubs, &session);
            (session, notify)
        };

        for callback in notify {
            callback.on_session_opened(session.clone());
        }
    }

    /// Deliver a message on an active session. Returns `false` (and closes
    /// the session with reason `Unspecified`) when the receiver's callback
    /// rejects it, or immediately when the send itself is invalid.
    pub fn send_message(
        &self,
        payload: Vec<u8>,
        message_type: u32,
        permissions: u32,
        session_id: SessionId,
        from_endpoint: EndpointId,
        from_hub: HubId,
    ) -> bool {
        let (session, sender, recipient_cb) = {
            let state = self.inner.state.lock().unwrap();
            let Some(session) = state.sessions.iter().find(|s| s.id == session_id) else {
                return false;
            };
            if !session.active {
                return false;
            }

            let sender = if from_endpoint.is_invalid() {
                match infer_sender(session, from_hub) {
                    Some(ep) => ep,
                    None => return false,
                }
            } else {
                EndpointRef::new(from_hub, from_endpoint)
            };

            if sender != session.initiator && sender != session.peer {
                return false;
            }

            let recipient = if sender == session.initiator {
                session.peer
            } else {
                session.initiator
            };

            let Some(recipient_cb) = state
                .hubs
                .iter()
                .find(|h| h.info.id == recipient.hub)
                .map(|h| h.callback.clone())
            else {
                return false;
            };

            (session.clone(), sender, recipient_cb)
        };

        let sent_by_initiator = sender == session.initiator;
        let ok = recipient_cb.on_message_received(
            payload,
            message_type,
            permissions,
            session.clone(),
            sent_by_initiator,
        );

        if !ok {
            self.close_session(from_hub, session_id, CloseReason::Unspecified);
        }
        ok
    }

    /// Look up a session, scoped to a hub that actually participates in it.
    pub fn get_session(&self, from_hub: HubId, session_id: SessionId) -> Option<Session> {
        let state = self.inner.state.lock().unwrap();
        state
            .sessions
            .iter()
            .find(|s| {
                s.id == session_id && (s.initiator.hub == from_hub || s.peer.hub == from_hub)
            })
            .cloned()
    }

    pub fn get_endpoint_info(&self, hub: HubId, endpoint: EndpointId) -> Option<EndpointInfo> {
        let callback = self.hub_callback(hub)?;
        callback.get_endpoint_info(endpoint)
    }

    /// Resolve a service descriptor to its `(hub, endpoint)`. When
    /// `hub` is `HubId::INVALID` every hub is searched.
    pub fn get_endpoint_for_service(
        &self,
        hub: HubId,
        descriptor: &str,
    ) -> Option<(HubId, EndpointId)> {
        if hub.is_invalid() {
            for snapshot in self.snapshot_all_hubs() {
                if let Some(endpoint) = snapshot.callback.get_endpoint_for_service(descriptor) {
                    return Some((snapshot.id, endpoint));
                }
            }
            None
        } else {
            let callback = self.hub_callback(hub)?;
            callback
                .get_endpoint_for_service(descriptor)
                .map(|endpoint| (hub, endpoint))
        }
    }

    pub fn does_endpoint_have_service(
        &self,
        hub: HubId,
        endpoint: EndpointId,
        descriptor: &str,
    ) -> bool {
        match self.hub_callback(hub) {
            Some(callback) => callback.does_endpoint_have_service(endpoint, descriptor),
            None => false,
        }
    }

    pub fn for_each_endpoint(&self, mut f: impl FnMut(HubId, &EndpointInfo)) {
        for snapshot in self.snapshot_all_hubs() {
            snapshot.callback.for_each_endpoint(&mut |info| f(snapshot.id, info));
        }
    }

    pub fn for_each_endpoint_of_hub(&self, hub: HubId, mut f: impl FnMut(&EndpointInfo)) {
        if let Some(callback) = self.hub_callback(hub) {
            callback.for_each_endpoint(&mut f);
        }
    }

    pub fn for_each_service(&self, mut f: impl FnMut(HubId, EndpointId, &ServiceInfo)) {
        for snapshot in self.snapshot_all_hubs() {
            snapshot
                .callback
                .for_each_service(&mut |endpoint, info| f(snapshot.id, endpoint, info));
        }
    }

    pub fn for_each_message_hub(&self, mut f: impl FnMut(&HubInfo)) {
        let state = self.inner.state.lock().unwrap();
        for hub in &state.hubs {
            f(&hub.info);
        }
    }

    /// Fan out `on_endpoint_registered` to every *other* hub. Returns
    /// `false` when `hub` is not registered.
    pub fn register_endpoint(&self, hub: HubId, endpoint: EndpointId) -> bool {
        let others = {
            let state = self.inner.state.lock().unwrap();
            if !state.hubs.iter().any(|h| h.info.id == hub) {
                return false;
            }
            snapshot_hubs_except(&state.hubs, hub)
        };
        for other in others {
            other.callback.on_endpoint_registered(hub, endpoint);
        }
        true
    }

    /// Fan out `on_endpoint_unregistered` to every *other* hub. Returns
    /// `false` when `hub` is not registered. The session table is left
    /// untouched: a subsequent send to the gone endpoint will fail
    /// naturally once the owning hub no longer reports it.
    pub fn unregister_endpoint(&self, hub: HubId, endpoint: EndpointId) -> bool {
        let others = {
            let state = self.inner.state.lock().unwrap();
            if !state.hubs.iter().any(|h| h.info.id == hub) {
                return false;
            }
            snapshot_hubs_except(&state.hubs, hub)
        };
        for other in others {
            other.callback.on_endpoint_unregistered(hub, endpoint);
        }
        true
    }

    pub fn is_hub_registered(&self, hub: HubId) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.hubs.iter().any(|h| h.info.id == hub)
    }

    fn hub_callback(&self, hub: HubId) -> Option<Arc<dyn HubCallback>> {
        let state = self.inner.state.lock().unwrap();
        state
            .hubs
            .iter()
            .find(|h| h.info.id == hub)
            .map(|h| h.callback.clone())
    }

    fn snapshot_all_hubs(&self) -> Vec<HubSnapshot> {
        let state = self.inner.state.lock().unwrap();
        snapshot_hubs_except(&state.hubs, HubId::INVALID)
    }
}

fn endpoint_exists(callback: &dyn HubCallback, endpoint: EndpointId) -> bool {
    let mut found = false;
    callback.for_each_endpoint(&mut |info| {
        if info.id == endpoint {
            found = true;
        }
    });
    found
}

fn infer_sender(session: &Session, from_hub: HubId) -> Option<EndpointRef> {
    let initiator_on_hub = session.initiator.hub == from_hub;
    let peer_on_hub = session.peer.hub == from_hub;
    match (initiator_on_hub, peer_on_hub) {
        (true, false) => Some(session.initiator),
        (false, true) => Some(session.peer),
        // Both endpoints on the same hub: ambiguous without an explicit
        // sender endpoint id.
        (true, true) => None,
        (false, false) => None,
    }
}

/// Assign the next unused router-owned session id in `[0, reserved)`,
/// wrapping around and retrying up to `SESSION_ID_ALLOC_ATTEMPTS` times.
fn allocate_session_id(state: &mut RouterState, reserved: u16) -> Option<SessionId> {
    if reserved == 0 {
        return None;
    }
    let mut candidate = state.next_session_id % reserved;
    for _ in 0..SESSION_ID_ALLOC_ATTEMPTS {
        let id = SessionId(candidate);
        if state.sessions.iter().all(|s| s.id != id) {
            state.next_session_id = candidate.wrapping_add(1) % reserved;
            return Some(id);
        }
        candidate = candidate.wrapping_add(1) % reserved;
    }
    None
}

fn snapshot_hubs_except(hubs: &[HubRecord], exclude: HubId) -> Vec<HubSnapshot> {
    hubs.iter()
        .filter(|h| h.info.id != exclude)
        .map(|h| HubSnapshot {
            id: h.info.id,
            callback: h.callback.clone(),
        })
        .collect()
}

fn distinct_hub_callbacks(hubs: &[HubRecord], session: &Session) -> Vec<Arc<dyn HubCallback>> {
    let mut result = Vec::with_capacity(2);
    let mut seen = Vec::with_capacity(2);
    for hub_id in [session.initiator.hub, session.peer.hub] {
        if seen.contains(&hub_id) {
            continue;
        }
        seen.push(hub_id);
        if let Some(record) = hubs.iter().find(|h| h.info.id == hub_id) {
            result.push(record.callback.clone());
        }
    }
    result
}
