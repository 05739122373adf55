//! Hosts every in-process application behind a single local hub,
//! translating router callbacks onto a single-threaded event loop.
//!
//! See [`LocalHubManager`] for the public entry point.

mod callback;
mod events;
mod free_records;
mod published_services;
mod ready_events;
mod shared;

mod manager;

pub use events::AppEvent;
pub use free_records::{FreeCallback, MAX_FREE_RECORDS};
pub use manager::{LocalHubManager, LOCAL_HUB_ID, LOCAL_HUB_NAME};
pub use published_services::PublishError;
