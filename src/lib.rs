//! Edge Network Admin: on-device network configuration service
//!
//! A small HTTP service that lets an operator holding the shared admin
//! token inspect and change the network configuration of an edge appliance.
//!
//! # Main Features
//!
//! - Token login with cookie sessions and sliding idle expiry
//! - Per-address rate limiting of mutating requests
//! - Validation and rendering of static or DHCP netplan configuration
//! - Atomic replacement of the managed netplan file and delayed activation
//! - Read-only network, system and container service status
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use edge_netadmin::admin::start_admin_server;
//! use edge_netadmin::config::{load_config, ConfigOverrides};
//! use edge_netadmin::system::ProcessRunner;
//!
//! #[tokio::main]
//! async fn main() -> edge_netadmin::Result<()> {
//!     let config = load_config(None, ConfigOverrides::default())?;
//!     start_admin_server(config, Arc::new(ProcessRunner)).await
//! }
//! ```

// Public modules
pub mod admin;
pub mod common;
pub mod config;
pub mod netplan;
pub mod system;

// Re-export commonly used structures and functions for convenience
pub use common::{NetAdminError, Result};
pub use config::AdminConfig;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
