//! Router daemon binary.
//!
//! Wires a [`MessageRouter`] together with a [`LocalHubManager`] (for
//! in-process applications) and a [`RemoteHubManager`] (for hubs mirrored
//! from a host transport), and keeps them alive until asked to stop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hub_types::{HubId, HubInfo};
use local_hub_manager::LocalHubManager;
use message_router::MessageRouter;
use remote_hub_manager::{HostCallback, RemoteHubManager};
use tracing::{info, warn};

mod config;
mod logging;

use config::RouterConfig;

/// Message router daemon.
#[derive(Parser, Debug)]
#[command(name = "hub-daemon", version, about = "Sensor/context message router daemon")]
struct Args {
    /// Path to the router configuration file.
    #[arg(long, default_value = "router.yaml")]
    config: PathBuf,
}

/// A [`HostCallback`] that only logs. Stands in for a real host transport
/// until one is wired up; demonstrates that a transport only needs to
/// implement this trait to mirror remote hubs through the daemon.
struct LoggingHostCallback;

#[async_trait::async_trait]
impl HostCallback for LoggingHostCallback {
    async fn on_reset(&self) {
        info!("host: reset");
    }
    async fn on_hub_registered(&self, info: HubInfo) {
        info!(hub = %info.id, name = %info.name, "host: hub registered");
    }
    async fn on_hub_unregistered(&self, id: HubId) {
        info!(hub = %id, "host: hub unregistered");
    }
    async fn on_endpoint_registered(&self, hub: HubId, info: hub_types::EndpointInfo) {
        info!(%hub, endpoint = %info.id, name = %info.name, "host: endpoint registered");
    }
    async fn on_endpoint_service(&self, hub: HubId, endpoint: hub_types::EndpointId, service: hub_types::ServiceInfo) {
        info!(%hub, %endpoint, descriptor = %service.descriptor, "host: endpoint service");
    }
    async fn on_endpoint_ready(&self, hub: HubId, endpoint: hub_types::EndpointId) {
        info!(%hub, %endpoint, "host: endpoint ready");
    }
    async fn on_endpoint_unregistered(&self, hub: HubId, endpoint: hub_types::EndpointId) {
        info!(%hub, %endpoint, "host: endpoint unregistered");
    }
    async fn on_message_received(
        &self,
        hub: HubId,
        session: hub_types::Session,
        payload: Vec<u8>,
        message_type: u32,
        _permissions: u32,
        _sent_by_initiator: bool,
    ) -> bool {
        info!(%hub, session = %session.id, message_type, bytes = payload.len(), "host: message received");
        true
    }
    async fn on_session_open_request(&self, hub: HubId, session: hub_types::Session) {
        info!(%hub, session = %session.id, "host: session open request");
    }
    async fn on_session_opened(&self, hub: HubId, session: hub_types::Session) {
        info!(%hub, session = %session.id, "host: session opened");
    }
    async fn on_session_closed(&self, hub: HubId, session: hub_types::Session, reason: hub_types::CloseReason) {
        info!(%hub, session = %session.id, ?reason, "host: session closed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args = Args::parse();
    let config = RouterConfig::load_from_file(&args.config)?;

    let router = MessageRouter::new(config.limits());

    let local = LocalHubManager::spawn(router.clone())
        .ok_or_else(|| anyhow::anyhow!("failed to register local hub with the router"))?;
    info!("local hub manager started");
    // Retained for its registered lifetime; no in-process application has
    // connected to this daemon's demo loop yet.
    let _local = local;

    let remote = RemoteHubManager::new(router.clone());
    remote.on_host_transport_ready(Arc::new(LoggingHostCallback)).await;
    info!("remote hub manager started");

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {e}"))?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {e}"))?;

    info!("router daemon running");
    tokio::select! {
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    warn!("router daemon stopped");
    Ok(())
}
