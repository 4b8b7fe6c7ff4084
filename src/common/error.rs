//! Error handling module
//!
//! This module defines the process-level error type and result alias used by
//! the service bootstrap (configuration, logging, listener).

use thiserror::Error;
use std::io;

/// Network admin service error type
#[derive(Error, Debug)]
pub enum NetAdminError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `NetAdminError`.
pub type Result<T> = std::result::Result<T, NetAdminError>;
