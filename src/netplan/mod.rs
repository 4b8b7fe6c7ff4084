//! Netplan configuration pipeline
//!
//! # Data flow
//!
//! ```text
//! ProposedNetworkConfig (from the wire)
//!     → validator.rs  (field-by-field checks, interface resolution)
//!     → ValidatedConfig
//!     → render.rs     (netplan v2 document)
//!     → RenderedArtifact
//!     → applier.rs    (cleanup, atomic write, hostname, delayed activation)
//! ```

pub mod applier;
pub mod render;
pub mod validator;

use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use thiserror::Error;

pub use applier::{ApplyOutcome, ConfigApplier};
pub use render::{render, DEFAULT_NAMESERVERS};
pub use validator::{validate, validate_hostname};

/// A network configuration as submitted by a client
///
/// Fields hold the raw strings received; nothing here has been checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposedNetworkConfig {
    pub dhcp: bool,
    pub ip: String,
    pub cidr: String,
    pub gateway: String,
    pub dns1: String,
    pub dns2: String,
    pub hostname: String,
    /// Interface to configure; `None` means the default-route interface
    pub interface: Option<String>,
}

/// Addressing mode of a validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMode {
    Dhcp,
    Static {
        address: Ipv4Addr,
        prefix: u8,
        gateway: Ipv4Addr,
        /// Only the nameservers the client supplied, in order
        nameservers: Vec<Ipv4Addr>,
    },
}

/// A configuration that passed every validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub interface: String,
    pub mode: NetworkMode,
    pub hostname: Option<String>,
}

/// Netplan document for exactly one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub interface: String,
    pub content: String,
}

/// Where the client should expect to reach the device after activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedAddress {
    Static(Ipv4Addr),
    Dhcp,
}

impl fmt::Display for AppliedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppliedAddress::Static(addr) => write!(f, "{}", addr),
            AppliedAddress::Dhcp => write!(f, "dhcp"),
        }
    }
}

impl From<&NetworkMode> for AppliedAddress {
    fn from(mode: &NetworkMode) -> Self {
        match mode {
            NetworkMode::Dhcp => AppliedAddress::Dhcp,
            NetworkMode::Static { address, .. } => AppliedAddress::Static(*address),
        }
    }
}

/// Field-specific validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid IP address for {field}: '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("CIDR must be an integer between 1 and 32, got '{0}'")]
    InvalidCidr(String),

    #[error("Invalid hostname: '{0}'")]
    InvalidHostname(String),

    #[error("Invalid or unknown interface: '{0}'")]
    InvalidInterface(String),

    #[error("No network interface found")]
    NoInterface,
}

/// Failures persisting a rendered configuration
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Filesystem task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Validate a proposal and render it in one step
pub fn validate_and_render(
    proposed: &ProposedNetworkConfig,
    current_interface: Option<&str>,
    generated_at: chrono::DateTime<chrono::Utc>,
) -> Result<(ValidatedConfig, RenderedArtifact), ValidationError> {
    let validated = validate(proposed, current_interface)?;
    let artifact = render(&validated, generated_at);
    Ok((validated, artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_applied_address_display() {
        assert_eq!(AppliedAddress::Dhcp.to_string(), "dhcp");
        assert_eq!(
            AppliedAddress::Static(Ipv4Addr::new(192, 168, 1, 50)).to_string(),
            "192.168.1.50"
        );
    }

    #[test]
    fn test_validate_and_render_rejects_before_rendering() {
        let proposed = ProposedNetworkConfig {
            ip: "192.168.1.50".to_string(),
            cidr: "33".to_string(),
            gateway: "192.168.1.1".to_string(),
            ..ProposedNetworkConfig::default()
        };
        let at = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let result = validate_and_render(&proposed, Some("eth0"), at);
        assert_eq!(result, Err(ValidationError::InvalidCidr("33".to_string())));
    }
}
