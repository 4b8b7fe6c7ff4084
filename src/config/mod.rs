//! Configuration module
//!
//! This module handles service configuration: built-in defaults, an optional
//! JSON file, `NETWORK_ADMIN_*` environment variables and command line
//! overrides, in increasing order of priority.

mod defaults;
mod error;
mod loader;
mod validator;

pub use self::defaults::{ENV_PREFIX, SESSION_COOKIE};
pub use self::error::{ConfigError, Result};
pub use self::loader::{load_config, ConfigOverrides};
pub use self::validator::{normalize_config, validate_config};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Service configuration
///
/// Paths name fixed filesystem locations on the appliance; tests point them
/// at temporary directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdminConfig {
    // --- Listener ---

    /// Listening port
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Bind address (IP literal)
    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    // --- Files ---

    /// File holding the shared admin token
    #[serde(default = "defaults::token_file")]
    pub token_file: PathBuf,

    /// Log file, `None` logs to stderr
    #[serde(default = "defaults::log_file")]
    pub log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    /// Directory holding declarative network configuration
    #[serde(default = "defaults::netplan_dir")]
    pub netplan_dir: PathBuf,

    /// File name of the document owned by this service inside `netplan_dir`
    #[serde(default = "defaults::netplan_file_name")]
    pub netplan_file_name: String,

    /// Resolver configuration read for current DNS servers
    #[serde(default = "defaults::resolv_conf")]
    pub resolv_conf: PathBuf,

    /// Compose file used for service status
    #[serde(default = "defaults::compose_file")]
    pub compose_file: PathBuf,

    /// Environment file passed to compose
    #[serde(default = "defaults::compose_env_file")]
    pub compose_env_file: PathBuf,

    // --- Limits and timing ---

    /// Idle session timeout in seconds
    #[serde(default = "defaults::session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Maximum POST requests per client within the rate window
    #[serde(default = "defaults::rate_limit")]
    pub rate_limit: usize,

    /// Rate window in seconds
    #[serde(default = "defaults::rate_window_secs")]
    pub rate_window_secs: u64,

    /// Delay between writing a configuration and activating it
    #[serde(default = "defaults::apply_delay_secs")]
    pub apply_delay_secs: u64,

    /// Upper bound for any external command
    #[serde(default = "defaults::command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Timeout for the hostname change command
    #[serde(default = "defaults::hostname_timeout_secs")]
    pub hostname_timeout_secs: u64,

    /// Request body cap in bytes
    #[serde(default = "defaults::max_body_bytes")]
    pub max_body_bytes: usize,

    /// Interval between sweeps of expired sessions and rate windows
    #[serde(default = "defaults::sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            bind_address: defaults::bind_address(),
            token_file: defaults::token_file(),
            log_file: defaults::log_file(),
            log_level: defaults::log_level(),
            netplan_dir: defaults::netplan_dir(),
            netplan_file_name: defaults::netplan_file_name(),
            resolv_conf: defaults::resolv_conf(),
            compose_file: defaults::compose_file(),
            compose_env_file: defaults::compose_env_file(),
            session_timeout_secs: defaults::session_timeout_secs(),
            rate_limit: defaults::rate_limit(),
            rate_window_secs: defaults::rate_window_secs(),
            apply_delay_secs: defaults::apply_delay_secs(),
            command_timeout_secs: defaults::command_timeout_secs(),
            hostname_timeout_secs: defaults::hostname_timeout_secs(),
            max_body_bytes: defaults::max_body_bytes(),
            sweep_interval_secs: defaults::sweep_interval_secs(),
        }
    }
}

impl AdminConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }

    /// Socket address to listen on
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip = self.bind_address.parse().map_err(|e| {
            ConfigError::InvalidValue("bind_address".to_string(), format!("{}", e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Full path of the managed netplan document
    pub fn netplan_file(&self) -> PathBuf {
        self.netplan_dir.join(&self.netplan_file_name)
    }

    /// Log file path, if logging to a file
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn apply_delay(&self) -> Duration {
        Duration::from_secs(self.apply_delay_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn hostname_timeout(&self) -> Duration {
        Duration::from_secs(self.hostname_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Log the configuration
pub fn log_config(config: &AdminConfig) {
    use log::info;

    if !log::log_enabled!(log::Level::Info) {
        return;
    }

    info!("=== Configuration ===");
    info!("  Listen: {}:{}", config.bind_address, config.port);
    info!("  Token file: {}", config.token_file.display());
    info!("  Managed file: {}", config.netplan_file().display());
    info!("  Session timeout: {}s", config.session_timeout_secs);
    info!(
        "  Rate limit: {} requests / {}s",
        config.rate_limit, config.rate_window_secs
    );
    info!("  Apply delay: {}s", config.apply_delay_secs);
    info!("  Command timeout: {}s", config.command_timeout_secs);
    info!("=====================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AdminConfig::default();
        assert_eq!(config.port, 9090);
        assert_eq!(config.session_timeout(), Duration::from_secs(3600));
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.rate_window(), Duration::from_secs(60));
        assert_eq!(config.apply_delay(), Duration::from_secs(2));
        assert_eq!(config.max_body_bytes, 65536);
        assert_eq!(
            config.netplan_file(),
            PathBuf::from("/etc/netplan/99-safeschool-static.yaml")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_listen_addr() {
        let mut config = AdminConfig::default();
        config.bind_address = "127.0.0.1".to_string();
        config.port = 8080;
        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:8080");

        config.bind_address = "not-an-ip".to_string();
        assert!(config.listen_addr().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AdminConfig = serde_json::from_str(r#"{"port": 8081}"#).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.netplan_file_name, "99-safeschool-static.yaml");
    }
}
