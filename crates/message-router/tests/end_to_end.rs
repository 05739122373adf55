//! End-to-end scenarios from spec.md §8 (S1-S6) plus the router's
//! property-based invariants.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use message_router::{
    CloseReason, EndpointId, EndpointInfo, EndpointType, HubCallback, HubId, HubInfo,
    MessageRouter, RouterLimits, ServiceInfo, Session, SessionId,
};

#[derive(Debug, Clone)]
enum Event {
    MessageReceived {
        session: Session,
        payload: Vec<u8>,
        sent_by_initiator: bool,
    },
    SessionOpenRequest(Session),
    SessionOpened(Session),
    SessionClosed(Session, CloseReason),
    HubRegistered(HubId),
    HubUnregistered(HubId),
    EndpointRegistered(HubId, EndpointId),
    EndpointUnregistered(HubId, EndpointId),
}

/// A test double hub: owns its own endpoint/service tables and records
/// every callback it receives, optionally auto-acking session requests.
struct TestHub {
    endpoints: Mutex<Vec<EndpointInfo>>,
    services: Mutex<Vec<(EndpointId, ServiceInfo)>>,
    events: Sender<Event>,
    next_message_result: Mutex<bool>,
}

impl TestHub {
    fn new(events: Sender<Event>) -> Arc<Self> {
        Arc::new(Self {
            endpoints: Mutex::new(Vec::new()),
            services: Mutex::new(Vec::new()),
            events,
            next_message_result: Mutex::new(true),
        })
    }

    fn add_endpoint(&self, id: EndpointId) {
        self.endpoints.lock().unwrap().push(
            EndpointInfo::new(id, format!("ep-{}", id.0), 1, EndpointType::Generic, 0).unwrap(),
        );
    }

    fn fail_next_message(&self) {
        *self.next_message_result.lock().unwrap() = false;
    }
}

impl HubCallback for TestHub {
    fn on_message_received(
        &self,
        payload: Vec<u8>,
        _message_type: u32,
        _permissions: u32,
        session: Session,
        sent_by_initiator: bool,
    ) -> bool {
        let ok = {
            let mut next = self.next_message_result.lock().unwrap();
            let result = *next;
            *next = true;
            result
        };
        self.events
            .send(Event::MessageReceived {
                session,
                payload,
                sent_by_initiator,
            })
            .unwrap();
        ok
    }

    fn on_session_open_request(&self, session: Session) {
        self.events
            .send(Event::SessionOpenRequest(session))
            .unwrap();
    }

    fn on_session_opened(&self, session: Session) {
        self.events.send(Event::SessionOpened(session)).unwrap();
    }

    fn on_session_closed(&self, session: Session, reason: CloseReason) {
        self.events
            .send(Event::SessionClosed(session, reason))
            .unwrap();
    }

    fn for_each_endpoint(&self, f: &mut dyn FnMut(&EndpointInfo)) {
        for ep in self.endpoints.lock().unwrap().iter() {
            f(ep);
        }
    }

    fn get_endpoint_info(&self, id: EndpointId) -> Option<EndpointInfo> {
        self.endpoints
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    fn get_endpoint_for_service(&self, descriptor: &str) -> Option<EndpointId> {
        self.services
            .lock()
            .unwrap()
            .iter()
            .find(|(_, svc)| svc.descriptor == descriptor)
            .map(|(id, _)| *id)
    }

    fn does_endpoint_have_service(&self, id: EndpointId, descriptor: &str) -> bool {
        self.services
            .lock()
            .unwrap()
            .iter()
            .any(|(ep, svc)| *ep == id && svc.descriptor == descriptor)
    }

    fn for_each_service(&self, f: &mut dyn FnMut(EndpointId, &ServiceInfo)) {
        for (ep, svc) in self.services.lock().unwrap().iter() {
            f(*ep, svc);
        }
    }

    fn on_hub_registered(&self, info: &HubInfo) {
        self.events.send(Event::HubRegistered(info.id)).unwrap();
    }

    fn on_hub_unregistered(&self, id: HubId) {
        self.events.send(Event::HubUnregistered(id)).unwrap();
    }

    fn on_endpoint_registered(&self, hub: HubId, endpoint: EndpointId) {
        self.events
            .send(Event::EndpointRegistered(hub, endpoint))
            .unwrap();
    }

    fn on_endpoint_unregistered(&self, hub: HubId, endpoint: EndpointId) {
        self.events
            .send(Event::EndpointUnregistered(hub, endpoint))
            .unwrap();
    }
}

fn drain(rx: &Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

/// S1: open, ack, close round trip between two hubs.
#[test]
fn s1_open_ack_close_round_trip() {
    let router = MessageRouter::new(RouterLimits::default());

    let (tx1, rx1) = channel();
    let (tx2, rx2) = channel();
    let hub1 = TestHub::new(tx1);
    let hub2 = TestHub::new(tx2);
    hub1.add_endpoint(EndpointId(0x10));
    hub2.add_endpoint(EndpointId(0x20));

    let h1 = router
        .register_hub("hub1", HubId(1), hub1.clone())
        .unwrap();
    let h2 = router
        .register_hub("hub2", HubId(2), hub2.clone())
        .unwrap();
    drain(&rx1);
    drain(&rx2);

    let sid = h1.open_session(EndpointId(0x10), HubId(2), EndpointId(0x20), None, None);
    assert!(!sid.is_invalid());

    let events = drain(&rx2);
    assert!(matches!(events.as_slice(), [Event::SessionOpenRequest(_)]));

    h2.on_session_open_complete(sid);

    let e1 = drain(&rx1);
    let e2 = drain(&rx2);
    assert!(matches!(e1.as_slice(), [Event::SessionOpened(_)]));
    assert!(matches!(e2.as_slice(), [Event::SessionOpened(_)]));

    h1.close_session(sid, CloseReason::CloseEndpointSessionRequested);
    let e1 = drain(&rx1);
    let e2 = drain(&rx2);
    assert!(matches!(
        e1.as_slice(),
        [Event::SessionClosed(_, CloseReason::CloseEndpointSessionRequested)]
    ));
    assert!(matches!(
        e2.as_slice(),
        [Event::SessionClosed(_, CloseReason::CloseEndpointSessionRequested)]
    ));
}

/// S2: message round trip carries sender/recipient/payload verbatim.
#[test]
fn s2_send_message_round_trip() {
    let router = MessageRouter::new(RouterLimits::default());
    let (tx1, _rx1) = channel();
    let (tx2, rx2) = channel();
    let hub1 = TestHub::new(tx1);
    let hub2 = TestHub::new(tx2);
    hub1.add_endpoint(EndpointId(0x10));
    hub2.add_endpoint(EndpointId(0x20));

    let h1 = router.register_hub("hub1", HubId(1), hub1).unwrap();
    let h2 = router.register_hub("hub2", HubId(2), hub2).unwrap();

    let sid = h1.open_session(EndpointId(0x10), HubId(2), EndpointId(0x20), None, None);
    h2.on_session_open_complete(sid);
    drain(&rx2);

    let ok = h1.send_message(vec![0xde, 0xad, 0xbe, 0xef], 1, 0, sid, EndpointId(0x10));
    assert!(ok);

    let events = drain(&rx2);
    match events.as_slice() {
        [Event::MessageReceived {
            session,
            payload,
            sent_by_initiator,
        }] => {
            assert_eq!(session.initiator, hub_types::EndpointRef::new(HubId(1), EndpointId(0x10)));
            assert_eq!(session.peer, hub_types::EndpointRef::new(HubId(2), EndpointId(0x20)));
            assert_eq!(payload, &[0xde, 0xad, 0xbe, 0xef]);
            assert!(sent_by_initiator);
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

/// S3: peer rejects the session from inside `on_session_open_request`; the
/// initiator sees exactly one `on_session_closed` and no `on_session_opened`.
#[test]
fn s3_peer_rejects_session() {
    let router = MessageRouter::new(RouterLimits::default());
    let (tx1, rx1) = channel();
    let (tx2, rx2) = channel();
    let hub1 = TestHub::new(tx1);
    let hub2 = TestHub::new(tx2);
    hub1.add_endpoint(EndpointId(0x10));
    hub2.add_endpoint(EndpointId(0x20));

    let h1 = router.register_hub("hub1", HubId(1), hub1).unwrap();
    let h2 = router.register_hub("hub2", HubId(2), hub2).unwrap();
    drain(&rx1);
    drain(&rx2);

    let sid = h1.open_session(EndpointId(0x10), HubId(2), EndpointId(0x20), None, None);
    let events = drain(&rx2);
    assert!(matches!(events.as_slice(), [Event::SessionOpenRequest(_)]));

    // Hub2 rejects synchronously (simulating a reentrant close from within
    // its own on_session_open_request handler).
    h2.close_session(sid, CloseReason::OpenEndpointSessionRequestRejected);

    let e1 = drain(&rx1);
    assert!(matches!(
        e1.as_slice(),
        [Event::SessionClosed(
            _,
            CloseReason::OpenEndpointSessionRequestRejected
        )]
    ));

    // No on_session_opened should ever have fired for this session.
    h2.on_session_open_complete(sid);
    assert!(drain(&rx1).is_empty());
    assert!(drain(&rx2).is_empty());
}

/// S4: capacity exhaustion leaves all prior hubs registered and emits no
/// callback for the rejected registration.
#[test]
fn s4_hub_table_capacity() {
    let router = MessageRouter::new(RouterLimits::new(2, 16));
    let (tx1, _rx1) = channel();
    let (tx2, _rx2) = channel();
    let (tx3, _rx3) = channel();

    let _h1 = router
        .register_hub("hub1", HubId(1), TestHub::new(tx1))
        .unwrap();
    let _h2 = router
        .register_hub("hub2", HubId(2), TestHub::new(tx2))
        .unwrap();

    let h3 = router.register_hub("hub3", HubId(3), TestHub::new(tx3));
    assert!(h3.is_none());

    assert!(router.is_hub_registered(HubId(1)));
    assert!(router.is_hub_registered(HubId(2)));
    assert!(!router.is_hub_registered(HubId(3)));
}

/// S5: a caller-supplied session id outside the reserved range is rejected
/// without firing any callback.
#[test]
fn s5_session_id_outside_reserved_range() {
    let limits = RouterLimits::default();
    let router = MessageRouter::new(limits);
    let (tx1, _rx1) = channel();
    let (tx2, rx2) = channel();
    let hub1 = TestHub::new(tx1);
    let hub2 = TestHub::new(tx2);
    hub1.add_endpoint(EndpointId(0x10));
    hub2.add_endpoint(EndpointId(0x20));

    let h1 = router.register_hub("hub1", HubId(1), hub1).unwrap();
    let _h2 = router.register_hub("hub2", HubId(2), hub2).unwrap();
    drain(&rx2);

    let bad_id = SessionId(limits.reserved_session_id / 2);
    let sid = h1.open_session(
        EndpointId(0x10),
        HubId(2),
        EndpointId(0x20),
        None,
        Some(bad_id),
    );
    assert!(sid.is_invalid());
    assert!(drain(&rx2).is_empty());
}

/// Invariant: opening the same (from, to, descriptor) twice returns the
/// same id and does not duplicate the session.
#[test]
fn invariant_equivalent_open_is_idempotent() {
    let router = MessageRouter::new(RouterLimits::default());
    let (tx1, _rx1) = channel();
    let (tx2, rx2) = channel();
    let hub1 = TestHub::new(tx1);
    let hub2 = TestHub::new(tx2);
    hub1.add_endpoint(EndpointId(0x10));
    hub2.add_endpoint(EndpointId(0x20));

    let h1 = router.register_hub("hub1", HubId(1), hub1).unwrap();
    let _h2 = router.register_hub("hub2", HubId(2), hub2).unwrap();
    drain(&rx2);

    let sid1 = h1.open_session(EndpointId(0x10), HubId(2), EndpointId(0x20), None, None);
    let sid2 = h1.open_session(EndpointId(0x10), HubId(2), EndpointId(0x20), None, None);
    assert_eq!(sid1, sid2);
    // Only one open-request should have been emitted.
    let events = drain(&rx2);
    assert_eq!(events.len(), 1);
}

/// Invariant: send_message on a pending (not yet acked) session fails and
/// emits no on_message_received.
#[test]
fn invariant_send_on_pending_session_fails() {
    let router = MessageRouter::new(RouterLimits::default());
    let (tx1, _rx1) = channel();
    let (tx2, rx2) = channel();
    let hub1 = TestHub::new(tx1);
    let hub2 = TestHub::new(tx2);
    hub1.add_endpoint(EndpointId(0x10));
    hub2.add_endpoint(EndpointId(0x20));

    let h1 = router.register_hub("hub1", HubId(1), hub1).unwrap();
    let _h2 = router.register_hub("hub2", HubId(2), hub2).unwrap();
    drain(&rx2);

    let sid = h1.open_session(EndpointId(0x10), HubId(2), EndpointId(0x20), None, None);
    drain(&rx2);

    let ok = h1.send_message(vec![1, 2, 3], 0, 0, sid, EndpointId(0x10));
    assert!(!ok);
    assert!(drain(&rx2).is_empty());
}

/// Invariant: a `false` return from on_message_received closes the session
/// with reason Unspecified.
#[test]
fn message_rejection_closes_session() {
    let router = MessageRouter::new(RouterLimits::default());
    let (tx1, rx1) = channel();
    let (tx2, rx2) = channel();
    let hub1 = TestHub::new(tx1);
    let hub2 = TestHub::new(tx2);
    hub1.add_endpoint(EndpointId(0x10));
    hub2.add_endpoint(EndpointId(0x20));

    let h1 = router.register_hub("hub1", HubId(1), hub1).unwrap();
    let h2 = router.register_hub("hub2", HubId(2), hub2.clone()).unwrap();

    let sid = h1.open_session(EndpointId(0x10), HubId(2), EndpointId(0x20), None, None);
    h2.on_session_open_complete(sid);
    drain(&rx1);
    drain(&rx2);

    hub2.fail_next_message();
    let ok = h1.send_message(vec![9], 0, 0, sid, EndpointId(0x10));
    assert!(!ok);

    let e1 = drain(&rx1);
    assert!(matches!(
        e1.as_slice(),
        [Event::SessionClosed(_, CloseReason::Unspecified)]
    ));
}

/// Dropping a hub handle closes sessions it participated in with reason
/// HubReset and notifies remaining hubs of the unregistration.
#[test]
fn hub_drop_closes_sessions_and_notifies() {
    let router = MessageRouter::new(RouterLimits::default());
    let (tx1, _rx1) = channel();
    let (tx2, rx2) = channel();
    let hub1 = TestHub::new(tx1);
    let hub2 = TestHub::new(tx2);
    hub1.add_endpoint(EndpointId(0x10));
    hub2.add_endpoint(EndpointId(0x20));

    let h1 = router.register_hub("hub1", HubId(1), hub1).unwrap();
    let _h2 = router.register_hub("hub2", HubId(2), hub2).unwrap();
    drain(&rx2);

    let sid = h1.open_session(EndpointId(0x10), HubId(2), EndpointId(0x20), None, None);
    drain(&rx2);

    drop(h1);

    let events = drain(&rx2);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::SessionClosed(s, CloseReason::HubReset) if s.id == sid)));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::HubUnregistered(HubId(1)))));
}
