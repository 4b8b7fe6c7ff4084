//! Admin API Module
//!
//! HTTP surface of the network admin service:
//! - shared-token login issuing cookie sessions
//! - per-address rate limiting of POST requests
//! - read-only network, system and service status
//! - network and hostname changes
//! - embedded HTML UI
//!
//! # Architecture
//!
//! Requests are served by axum on the tokio runtime. The session table and
//! the rate table are owned service objects inside [`AppState`], each with
//! its own lock.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod html;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod token;
pub mod types;

// Re-exports for convenience
pub use error::{AdminError, AdminResult};
pub use rate_limit::RateLimiter;
pub use server::{build_router, serve, start_admin_server, AppState};
pub use session::SessionManager;
pub use token::{TokenCheck, TokenStore};
