//! Public API surface offered to in-process applications, backed by a
//! single-threaded event loop (mirrors the teacher's `SessionManager::run`).

use std::sync::Arc;

use hub_types::{EndpointId, EndpointInfo, HubId, ServiceInfo, SessionId};
use message_router::{HubHandle, MessageRouter};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::callback::{LocalHubCallback, LoopSignal};
use crate::events::AppEvent;
use crate::free_records::{FreeCallback, MessageFreeRecords};
use crate::ready_events::ReadyEventSubscriptions;
use crate::shared::Shared;

/// The identifier this manager always registers under: one local hub
/// represents every in-process application.
pub const LOCAL_HUB_ID: HubId = HubId(1);
pub const LOCAL_HUB_NAME: &str = "local";

enum Command {
    ConfigureReadyEvents {
        app: EndpointId,
        target_hub: HubId,
        target_endpoint: EndpointId,
        service: Option<String>,
        enable: bool,
        reply: oneshot::Sender<bool>,
    },
    OpenSessionAsync {
        from_endpoint: EndpointId,
        to_hub: HubId,
        to_endpoint: EndpointId,
        service: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    OpenDefaultSessionAsync {
        from_endpoint: EndpointId,
        to_hub: HubId,
        to_endpoint: EndpointId,
        service: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    CloseSessionCmd {
        from_endpoint: EndpointId,
        session_id: SessionId,
        reply: oneshot::Sender<bool>,
    },
    SendMessageCmd {
        payload: Option<Vec<u8>>,
        message_type: u32,
        session_id: SessionId,
        permissions: u32,
        free_callback: Option<FreeCallback>,
        from_endpoint: EndpointId,
        reply: oneshot::Sender<bool>,
    },
    PublishServicesCmd {
        from_endpoint: EndpointId,
        services: Vec<ServiceInfo>,
        reply: oneshot::Sender<bool>,
    },
    RegisterEndpoint {
        info: EndpointInfo,
        app_events: mpsc::UnboundedSender<AppEvent>,
        reply: oneshot::Sender<bool>,
    },
    UnregisterEndpoint {
        endpoint: EndpointId,
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running local hub manager. Cheap to clone; every clone
/// shares the same event-loop task.
#[derive(Clone)]
pub struct LocalHubManager {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl LocalHubManager {
    /// Register the single local hub with `router` and spawn its event
    /// loop. Returns `None` if the hub table is already full or the local
    /// hub id/name collides (mirrors `MessageRouter::register_hub`).
    pub fn spawn(router: MessageRouter) -> Option<Self> {
        let shared = Arc::new(Shared::new());
        let (loop_tx, loop_rx) = mpsc::unbounded_channel::<LoopSignal>();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();

        let callback = Arc::new(LocalHubCallback {
            shared: shared.clone(),
            loop_signals: loop_tx,
        });
        let handle = router.register_hub(LOCAL_HUB_NAME, LOCAL_HUB_ID, callback)?;

        let task = LoopState {
            handle,
            shared: shared.clone(),
            ready_subs: ReadyEventSubscriptions::new(),
            free_records: MessageFreeRecords::new(),
            commands: cmd_rx,
            loop_signals: loop_rx,
        };
        tokio::spawn(task.run());

        Some(Self {
            shared,
            commands: cmd_tx,
        })
    }

    /// Register an in-process application's endpoint. Returns the channel
    /// it should poll for router-driven events, or `None` if registration
    /// with the router failed (duplicate id) or the manager has shut down.
    pub async fn register_endpoint(
        &self,
        info: EndpointInfo,
    ) -> Option<mpsc::UnboundedReceiver<AppEvent>> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::RegisterEndpoint {
                info,
                app_events: events_tx,
                reply: reply_tx,
            })
            .ok()?;
        if reply_rx.await.unwrap_or(false) {
            Some(events_rx)
        } else {
            None
        }
    }

    pub async fn unregister_endpoint(&self, endpoint: EndpointId) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .commands
            .send(Command::UnregisterEndpoint {
                endpoint,
                reply: reply_tx,
            })
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn configure_ready_events(
        &self,
        app: EndpointId,
        target_hub: HubId,
        target_endpoint: EndpointId,
        service: Option<String>,
        enable: bool,
    ) -> bool {
        self.call(|reply| Command::ConfigureReadyEvents {
            app,
            target_hub,
            target_endpoint,
            service,
            enable,
            reply,
        })
        .await
    }

    pub async fn open_session_async(
        &self,
        from_endpoint: EndpointId,
        to_hub: HubId,
        to_endpoint: EndpointId,
        service: Option<String>,
    ) -> bool {
        self.call(|reply| Command::OpenSessionAsync {
            from_endpoint,
            to_hub,
            to_endpoint,
            service,
            reply,
        })
        .await
    }

    pub async fn open_default_session_async(
        &self,
        from_endpoint: EndpointId,
        to_hub: HubId,
        to_endpoint: EndpointId,
        service: Option<String>,
    ) -> bool {
        self.call(|reply| Command::OpenDefaultSessionAsync {
            from_endpoint,
            to_hub,
            to_endpoint,
            service,
            reply,
        })
        .await
    }

    pub async fn close_session(&self, from_endpoint: EndpointId, session_id: SessionId) -> bool {
        self.call(|reply| Command::CloseSessionCmd {
            from_endpoint,
            session_id,
            reply,
        })
        .await
    }

    pub async fn send_message(
        &self,
        payload: Option<Vec<u8>>,
        message_type: u32,
        session_id: SessionId,
        permissions: u32,
        free_callback: Option<FreeCallback>,
        from_endpoint: EndpointId,
    ) -> bool {
        debug_assert_eq!(payload.is_none(), free_callback.is_none());
        self.call(|reply| Command::SendMessageCmd {
            payload,
            message_type,
            session_id,
            permissions,
            free_callback,
            from_endpoint,
            reply,
        })
        .await
    }

    pub async fn publish_services(&self, from_endpoint: EndpointId, services: Vec<ServiceInfo>) -> bool {
        self.call(|reply| Command::PublishServicesCmd {
            from_endpoint,
            services,
            reply,
        })
        .await
    }

    async fn call(&self, build: impl FnOnce(oneshot::Sender<bool>) -> Command) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(build(reply_tx)).is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }
}

struct LoopState {
    handle: HubHandle,
    shared: Arc<Shared>,
    ready_subs: ReadyEventSubscriptions,
    free_records: MessageFreeRecords,
    commands: mpsc::UnboundedReceiver<Command>,
    loop_signals: mpsc::UnboundedReceiver<LoopSignal>,
}

impl LoopState {
    async fn run(mut self) {
        info!("local hub manager event loop started");
        loop {
            tokio::select! {
                Some(command) = self.commands.recv() => {
                    self.handle_command(command);
                }
                Some(signal) = self.loop_signals.recv() => {
                    self.handle_signal(signal);
                }
                else => {
                    info!("local hub manager event loop shutting down");
                    break;
                }
            }
        }
    }

    fn handle_signal(&mut self, signal: LoopSignal) {
        match signal {
            LoopSignal::EndpointAvailable { hub, endpoint } => self.on_endpoint_ready_event(hub, endpoint),
        }
    }

    fn on_endpoint_ready_event(&mut self, hub: HubId, endpoint: EndpointId) {
        for sub in self.ready_subs.matching(hub, endpoint) {
            self.shared.dispatch(sub.requesting_app, AppEvent::EndpointReady { hub, endpoint });
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::ConfigureReadyEvents {
                app,
                target_hub,
                target_endpoint,
                service,
                enable,
                reply,
            } => {
                let ok = self.configure_ready_events(app, target_hub, target_endpoint, service, enable);
                let _ = reply.send(ok);
            }
            Command::OpenSessionAsync {
                from_endpoint,
                to_hub,
                to_endpoint,
                service,
                reply,
            } => {
                let id = self.handle.open_session(
                    from_endpoint,
                    to_hub,
                    to_endpoint,
                    service.as_deref(),
                    None,
                );
                let _ = reply.send(!id.is_invalid());
            }
            Command::OpenDefaultSessionAsync {
                from_endpoint,
                to_hub,
                to_endpoint,
                service,
                reply,
            } => {
                let ok = self.open_default_session(from_endpoint, to_hub, to_endpoint, service);
                let _ = reply.send(ok);
            }
            Command::CloseSessionCmd {
                from_endpoint,
                session_id,
                reply,
            } => {
                let ok = self.close_session(from_endpoint, session_id);
                let _ = reply.send(ok);
            }
            Command::SendMessageCmd {
                payload,
                message_type,
                session_id,
                permissions,
                free_callback,
                from_endpoint,
                reply,
            } => {
                let ok = self.send_message(payload, message_type, session_id, permissions, free_callback, from_endpoint);
                let _ = reply.send(ok);
            }
            Command::PublishServicesCmd {
                from_endpoint,
                services,
                reply,
            } => {
                let ok = self.shared.published.publish(from_endpoint, services).is_ok();
                let _ = reply.send(ok);
            }
            Command::RegisterEndpoint { info, app_events, reply } => {
                let id = info.id;
                let registered = self.handle.register_endpoint(id);
                if registered {
                    self.shared.endpoints.lock().unwrap().push(info);
                    self.shared.app_channels.lock().unwrap().insert(id, app_events);
                }
                let _ = reply.send(registered);
            }
            Command::UnregisterEndpoint { endpoint, reply } => {
                self.cleanup_endpoint_resources(endpoint);
                self.handle.unregister_endpoint(endpoint);
                let _ = reply.send(());
            }
        }
    }

    fn configure_ready_events(
        &mut self,
        app: EndpointId,
        target_hub: HubId,
        target_endpoint: EndpointId,
        service: Option<String>,
        enable: bool,
    ) -> bool {
        if enable {
            self.ready_subs
                .subscribe(app, target_hub, target_endpoint, service.clone());
            if let Some(info) = self.lookup_matching_endpoint(target_hub, target_endpoint) {
                self.shared.dispatch(
                    app,
                    AppEvent::EndpointReady {
                        hub: target_hub,
                        endpoint: info.id,
                    },
                );
            }
        } else {
            self.ready_subs
                .unsubscribe(app, target_hub, target_endpoint, service.as_deref());
        }
        true
    }

    fn lookup_matching_endpoint(&self, hub: HubId, endpoint: EndpointId) -> Option<EndpointInfo> {
        if !hub.is_invalid() && hub != LOCAL_HUB_ID {
            return None;
        }
        self.shared
            .endpoints
            .lock()
            .unwrap()
            .iter()
            .find(|e| endpoint.is_invalid() || e.id == endpoint)
            .cloned()
    }

    fn open_default_session(
        &mut self,
        from_endpoint: EndpointId,
        to_hub: HubId,
        to_endpoint: EndpointId,
        service: Option<String>,
    ) -> bool {
        let (to_hub, to_endpoint) = if to_hub.is_invalid() && to_endpoint.is_invalid() {
            let Some(descriptor) = service.as_deref() else {
                warn!("open_default_session_async: no hub/endpoint/service given");
                return false;
            };
            match self.handle.get_endpoint_for_service(HubId::INVALID, descriptor) {
                Some(pair) => pair,
                None => {
                    debug!(descriptor, "open_default_session_async: no endpoint publishes this service");
                    return false;
                }
            }
        } else if to_hub.is_invalid() {
            // to_endpoint is known but its hub isn't: pick the first hub
            // that reports it.
            match self.handle.find_hub_for_endpoint(to_endpoint) {
                Some(hub) => (hub, to_endpoint),
                None => {
                    debug!(%to_endpoint, "open_default_session_async: no hub reports this endpoint");
                    return false;
                }
            }
        } else {
            (to_hub, to_endpoint)
        };

        let id = self.handle.open_session(from_endpoint, to_hub, to_endpoint, service.as_deref(), None);
        !id.is_invalid()
    }

    fn close_session(&mut self, from_endpoint: EndpointId, session_id: SessionId) -> bool {
        let Some(session) = self.handle.get_session(session_id) else {
            return false;
        };
        if session.initiator.endpoint != from_endpoint && session.peer.endpoint != from_endpoint {
            return false;
        }
        self.handle
            .close_session(session_id, hub_types::CloseReason::CloseEndpointSessionRequested);
        true
    }

    fn send_message(
        &mut self,
        payload: Option<Vec<u8>>,
        message_type: u32,
        session_id: SessionId,
        permissions: u32,
        free_callback: Option<FreeCallback>,
        from_endpoint: EndpointId,
    ) -> bool {
        debug_assert_eq!(payload.is_none(), free_callback.is_none());
        let payload = payload.unwrap_or_default();
        let record_id = free_callback.and_then(|cb| self.free_records.register(cb));

        let ok = self
            .handle
            .send_message(payload, message_type, permissions, session_id, from_endpoint);

        if let Some(id) = record_id {
            self.free_records.redeem(id);
        }
        ok
    }

    fn cleanup_endpoint_resources(&mut self, endpoint: EndpointId) {
        self.ready_subs.remove_all_for(endpoint);
        self.shared.published.remove_all_for_endpoint(endpoint);
        self.shared.endpoints.lock().unwrap().retain(|e| e.id != endpoint);
        self.shared.app_channels.lock().unwrap().remove(&endpoint);
        debug!(pending_free_records = self.free_records.pending(), "endpoint resources cleaned up");
    }
}
