//! Configuration handling for the router daemon.
//!
//! Reads a YAML file and layers environment-variable overrides on top,
//! falling back to defaults whenever the file is missing or malformed.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Router daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Name the local hub registers under.
    pub local_hub_name: String,
    /// Maximum number of hubs the router will track simultaneously.
    pub max_hubs: usize,
    /// Maximum number of sessions the router will track simultaneously.
    pub max_sessions: usize,
    /// First session id in the caller-assignable reserved range.
    pub reserved_session_id: u16,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            local_hub_name: "local".to_string(),
            max_hubs: 32,
            max_sessions: 256,
            reserved_session_id: hub_types::RouterLimits::DEFAULT_RESERVED_SESSION_ID,
        }
    }
}

/// Root configuration structure, matching the on-disk YAML shape.
#[derive(Debug, Deserialize)]
struct RootConfig {
    router: Option<RouterSection>,
}

#[derive(Debug, Deserialize)]
struct RouterSection {
    local_hub_name: Option<String>,
    max_hubs: Option<usize>,
    max_sessions: Option<usize>,
    reserved_session_id: Option<u16>,
}

impl RouterConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides. A missing or unparseable file is not fatal: defaults are
    /// used and a warning is logged.
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            if let Ok(root) = serde_yaml::from_str::<RootConfig>(&content) {
                config.apply_root_config(root);
                info!("loaded configuration from {:?}", config_path.as_ref());
            } else {
                warn!("failed to parse config file {:?}, using defaults", config_path.as_ref());
            }
        } else {
            warn!("config file {:?} not found, using defaults", config_path.as_ref());
        }

        config.apply_environment_overrides();

        info!(
            local_hub_name = %config.local_hub_name,
            max_hubs = config.max_hubs,
            max_sessions = config.max_sessions,
            reserved_session_id = config.reserved_session_id,
            "final router configuration"
        );

        Ok(config)
    }

    fn apply_root_config(&mut self, root: RootConfig) {
        let Some(router) = root.router else { return };
        if let Some(name) = router.local_hub_name {
            self.local_hub_name = name;
        }
        if let Some(max_hubs) = router.max_hubs {
            self.max_hubs = max_hubs;
        }
        if let Some(max_sessions) = router.max_sessions {
            self.max_sessions = max_sessions;
        }
        if let Some(reserved) = router.reserved_session_id {
            self.reserved_session_id = reserved;
        }
    }

    fn apply_environment_overrides(&mut self) {
        if let Ok(name) = std::env::var("ROUTER_LOCAL_HUB_NAME") {
            self.local_hub_name = name;
            info!("local hub name overridden by environment: {}", self.local_hub_name);
        }
        if let Ok(max_hubs) = std::env::var("ROUTER_MAX_HUBS") {
            if let Ok(value) = max_hubs.parse::<usize>() {
                self.max_hubs = value;
                info!("max_hubs overridden by environment: {}", value);
            }
        }
        if let Ok(max_sessions) = std::env::var("ROUTER_MAX_SESSIONS") {
            if let Ok(value) = max_sessions.parse::<usize>() {
                self.max_sessions = value;
                info!("max_sessions overridden by environment: {}", value);
            }
        }
        if let Ok(reserved) = std::env::var("ROUTER_RESERVED_SESSION_ID") {
            if let Ok(value) = reserved.parse::<u16>() {
                self.reserved_session_id = value;
                info!("reserved_session_id overridden by environment: {}", value);
            }
        }
    }

    pub fn limits(&self) -> hub_types::RouterLimits {
        hub_types::RouterLimits {
            max_hubs: self.max_hubs,
            max_sessions: self.max_sessions,
            reserved_session_id: self.reserved_session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_matches_router_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.local_hub_name, "local");
        assert_eq!(config.max_hubs, 32);
        assert_eq!(config.max_sessions, 256);
    }

    #[test]
    fn load_from_file_applies_yaml_values() {
        let yaml = r#"
router:
  local_hub_name: sensor-hub
  max_hubs: 8
  max_sessions: 64
  reserved_session_id: 40000
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = RouterConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.local_hub_name, "sensor-hub");
        assert_eq!(config.max_hubs, 8);
        assert_eq!(config.max_sessions, 64);
        assert_eq!(config.reserved_session_id, 40000);
    }

    #[test]
    fn load_from_file_falls_back_to_defaults_when_missing() {
        let config = RouterConfig::load_from_file("/nonexistent/path/config.yaml").unwrap();
        assert_eq!(config.local_hub_name, RouterConfig::default().local_hub_name);
    }
}
