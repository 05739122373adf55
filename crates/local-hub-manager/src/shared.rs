//! State reachable from arbitrary router caller threads: the endpoint
//! table, the published-service set, and each registered application's
//! outbound event channel.

use std::collections::HashMap;
use std::sync::Mutex;

use hub_types::{EndpointId, EndpointInfo};
use tokio::sync::mpsc;

use crate::events::AppEvent;
use crate::published_services::PublishedServices;

pub(crate) struct Shared {
    pub(crate) endpoints: Mutex<Vec<EndpointInfo>>,
    pub(crate) published: PublishedServices,
    pub(crate) app_channels: Mutex<HashMap<EndpointId, mpsc::UnboundedSender<AppEvent>>>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            endpoints: Mutex::new(Vec::new()),
            published: PublishedServices::new(),
            app_channels: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn dispatch(&self, endpoint: EndpointId, event: AppEvent) {
        let channels = self.app_channels.lock().unwrap();
        if let Some(tx) = channels.get(&endpoint) {
            let _ = tx.send(event);
        }
    }
}
