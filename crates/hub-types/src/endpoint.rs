//! Endpoint registration metadata.

use crate::error::RouterError;
use crate::ids::EndpointId;
use serde::{Deserialize, Serialize};

/// Maximum length of an endpoint's display name (null-terminated on the
/// wire, so this bounds the string content itself).
pub const ENDPOINT_NAME_MAX_LEN: usize = 50;

/// The kind of participant an endpoint represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointType {
    HostFramework,
    HostApp,
    HostNative,
    Nanoapp,
    Generic,
}

/// Metadata describing an endpoint registered on a hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub id: EndpointId,
    pub name: String,
    pub version: u32,
    pub r#type: EndpointType,
    /// Bitmask of permissions this endpoint requires from its peers.
    pub required_permissions: u32,
}

impl EndpointInfo {
    pub fn new(
        id: EndpointId,
        name: impl Into<String>,
        version: u32,
        r#type: EndpointType,
        required_permissions: u32,
    ) -> Result<Self, RouterError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RouterError::EmptyName);
        }
        if name.len() > ENDPOINT_NAME_MAX_LEN {
            return Err(RouterError::NameTooLong {
                max: ENDPOINT_NAME_MAX_LEN,
            });
        }
        Ok(Self {
            id,
            name,
            version,
            r#type,
            required_permissions,
        })
    }
}
