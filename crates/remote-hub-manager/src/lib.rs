//! Mirrors one or more hubs discovered through a host transport (e.g. the
//! coprocessor side of a host/sensor-hub link), bridging the router's
//! synchronous callback contract to an asynchronous transport.
//!
//! See [`RemoteHubManager`] for the public entry point.

mod host_callback;
mod host_event;
mod remote_hub;

mod manager;

pub use host_callback::HostCallback;
pub use manager::RemoteHubManager;
