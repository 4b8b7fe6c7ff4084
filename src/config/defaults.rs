//! Default configuration values
//!
//! This module provides default values for configuration options.
//! It is the single source of truth for defaults used by serde and by the
//! `Default` implementation of [`AdminConfig`](super::AdminConfig).

use std::path::PathBuf;

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "NETWORK_ADMIN";

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Default listening port
pub fn port() -> u16 {
    9090
}

/// Default bind address
pub fn bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Default admin token location
pub fn token_file() -> PathBuf {
    PathBuf::from("/etc/safeschool/admin-token")
}

/// Default log file
pub fn log_file() -> Option<PathBuf> {
    Some(PathBuf::from("/var/log/safeschool/network-admin.log"))
}

/// Default log level
pub fn log_level() -> String {
    "info".to_string()
}

/// Default managed netplan directory
pub fn netplan_dir() -> PathBuf {
    PathBuf::from("/etc/netplan")
}

/// Default file name of the managed netplan document
pub fn netplan_file_name() -> String {
    "99-safeschool-static.yaml".to_string()
}

/// Default resolver configuration
pub fn resolv_conf() -> PathBuf {
    PathBuf::from("/etc/resolv.conf")
}

/// Idle session timeout in seconds
pub fn session_timeout_secs() -> u64 {
    3600
}

/// Maximum state-changing requests per client within the window
pub fn rate_limit() -> usize {
    5
}

/// Rate limit window in seconds
pub fn rate_window_secs() -> u64 {
    60
}

/// Delay before activating a written configuration, in seconds
pub fn apply_delay_secs() -> u64 {
    2
}

/// Upper bound for any external command, in seconds
pub fn command_timeout_secs() -> u64 {
    15
}

/// Timeout for the hostname change command, in seconds
pub fn hostname_timeout_secs() -> u64 {
    10
}

/// Request body cap in bytes
pub fn max_body_bytes() -> usize {
    64 * 1024
}

/// Interval between sweeps of expired sessions and rate windows, in seconds
pub fn sweep_interval_secs() -> u64 {
    300
}

/// Compose file describing the appliance services
pub fn compose_file() -> PathBuf {
    PathBuf::from("/opt/safeschool/deploy/edge/docker-compose.yml")
}

/// Environment file passed to compose
pub fn compose_env_file() -> PathBuf {
    PathBuf::from("/opt/safeschool/deploy/edge/.env")
}
