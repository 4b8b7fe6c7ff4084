//! Authentication and Throttling Middleware
//!
//! Two layers guard the API:
//! - [`client_gate`] wraps the whole router. It records the client address
//!   for handlers and applies the per-address rate limit to every POST,
//!   before any authentication happens.
//! - [`require_session`] wraps the protected routes and rejects requests
//!   without a live session cookie.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use http::{header, HeaderMap, Method};
use log::warn;

use crate::admin::error::AdminError;
use crate::admin::server::AppState;
use crate::config::SESSION_COOKIE;

/// Address of the connected client, set by [`client_gate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Record the client address and rate limit POST requests
pub async fn client_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AdminError> {
    // Without connect info (e.g. a router served directly in tests) every
    // client shares the unspecified address.
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if req.method() == Method::POST && !state.limiter.allow(ip) {
        warn!("Rate limit exceeded for {} on {}", ip, req.uri().path());
        metrics::counter!("netadmin_rate_limited_total").increment(1);
        return Err(AdminError::RateLimited);
    }

    req.extensions_mut().insert(ClientIp(ip));
    Ok(next.run(req).await)
}

/// Reject requests without a valid session cookie
pub async fn require_session(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AdminError> {
    let authenticated = session_id(req.headers()).is_some_and(|id| state.sessions.validate(id));

    if !authenticated {
        return Err(AdminError::Unauthorized);
    }

    Ok(next.run(req).await)
}

/// Value of the session cookie, if the request carries one
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(id: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, id, max_age_secs
    )
}
