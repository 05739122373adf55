//! Per-application subscriptions for endpoint "ready" notifications.
//!
//! Owned exclusively by the manager's event-loop task: every access happens
//! from that single task, so no synchronization is needed here (matching
//! the teacher's pattern of keeping per-loop bookkeeping un-mutexed inside
//! `SessionManager::run`).

use hub_types::{EndpointId, HubId};

#[derive(Debug, Clone)]
pub struct ReadyEventSubscription {
    pub requesting_app: EndpointId,
    pub target_hub: HubId,
    pub target_endpoint: EndpointId,
    pub service: Option<String>,
}

impl ReadyEventSubscription {
    fn matches(&self, hub: HubId, endpoint: EndpointId) -> bool {
        let hub_matches = self.target_hub.is_invalid() || self.target_hub == hub;
        let endpoint_matches = self.target_endpoint.is_invalid() || self.target_endpoint == endpoint;
        hub_matches && endpoint_matches
    }
}

#[derive(Default)]
pub struct ReadyEventSubscriptions {
    entries: Vec<ReadyEventSubscription>,
}

impl ReadyEventSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        requesting_app: EndpointId,
        target_hub: HubId,
        target_endpoint: EndpointId,
        service: Option<String>,
    ) {
        self.entries.retain(|s| {
            !(s.requesting_app == requesting_app
                && s.target_hub == target_hub
                && s.target_endpoint == target_endpoint
                && s.service == service)
        });
        self.entries.push(ReadyEventSubscription {
            requesting_app,
            target_hub,
            target_endpoint,
            service,
        });
    }

    pub fn unsubscribe(
        &mut self,
        requesting_app: EndpointId,
        target_hub: HubId,
        target_endpoint: EndpointId,
        service: Option<&str>,
    ) {
        self.entries.retain(|s| {
            !(s.requesting_app == requesting_app
                && s.target_hub == target_hub
                && s.target_endpoint == target_endpoint
                && s.service.as_deref() == service)
        });
    }

    pub fn remove_all_for(&mut self, requesting_app: EndpointId) {
        self.entries.retain(|s| s.requesting_app != requesting_app);
    }

    /// Every subscription that matches a now-available `(hub, endpoint)`.
    pub fn matching(&self, hub: HubId, endpoint: EndpointId) -> Vec<ReadyEventSubscription> {
        self.entries
            .iter()
            .filter(|s| s.matches(hub, endpoint))
            .cloned()
            .collect()
    }
}
