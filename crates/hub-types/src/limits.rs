//! Build-time capacity and partitioning knobs for the router.

use serde::{Deserialize, Serialize};

/// Compile/config-time limits for a `MessageRouter` instance.
///
/// All router- and manager-owned collections are bounded; dynamic growth is
/// forbidden inside the core. Insertion failure is a first-class outcome,
/// not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterLimits {
    /// Maximum number of hubs the router will track simultaneously.
    pub max_hubs: usize,
    /// Maximum number of sessions the router will track simultaneously.
    pub max_sessions: usize,
    /// First session id in the caller-assignable reserved range.
    pub reserved_session_id: u16,
}

impl RouterLimits {
    pub const DEFAULT_RESERVED_SESSION_ID: u16 = 0x8000;

    pub fn new(max_hubs: usize, max_sessions: usize) -> Self {
        Self {
            max_hubs,
            max_sessions,
            reserved_session_id: Self::DEFAULT_RESERVED_SESSION_ID,
        }
    }

    /// True when `id` falls in the caller-assignable reserved range
    /// `[reserved_session_id, 0xFFFE]`.
    pub fn is_reserved_session_id(&self, id: u16) -> bool {
        id >= self.reserved_session_id && id != 0xFFFF
    }
}

impl Default for RouterLimits {
    fn default() -> Self {
        Self::new(32, 256)
    }
}

/// Maximum number of hubs mirrored by a Remote Hub Manager. Must be
/// strictly less than `RouterLimits::max_hubs` so the local hub always has
/// room in the router's own table.
pub const MAX_HOST_HUBS_DEFAULT: usize = 16;

/// Maximum number of endpoints a Remote Hub Manager will mirror per hub.
pub const MAX_HOST_ENDPOINTS_DEFAULT: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_range_excludes_invalid_sentinel() {
        let limits = RouterLimits::default();
        assert!(!limits.is_reserved_session_id(0xFFFF));
        assert!(limits.is_reserved_session_id(0x8000));
        assert!(!limits.is_reserved_session_id(0x7FFF));
    }
}
