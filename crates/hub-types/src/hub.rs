//! Hub registration metadata.

use crate::ids::HubId;
use serde::{Deserialize, Serialize};

/// Metadata supplied when registering a hub with the router.
///
/// Names must be unique across the router, as must ids; the router rejects
/// registration on either collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubInfo {
    pub id: HubId,
    pub name: String,
}

impl HubInfo {
    pub fn new(id: HubId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
