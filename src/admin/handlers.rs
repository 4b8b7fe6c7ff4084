//! Admin API Request Handlers

use axum::{
    extract::{Extension, State},
    http::header,
    response::{Html, IntoResponse, Json, Response},
};
use chrono::Utc;
use log::{info, warn};

use crate::admin::auth::{session_cookie, ClientIp};
use crate::admin::error::{AdminError, AdminResult};
use crate::admin::server::AppState;
use crate::admin::token::TokenCheck;
use crate::admin::types::{
    AuthRequest, HostnameRequest, HostnameResponse, JsonBody, NetworkUpdateRequest,
    NetworkUpdateResponse, OkResponse,
};
use crate::netplan::{validate_and_render, validate_hostname, ProposedNetworkConfig, ValidationError};
use crate::system::{CurrentNetworkInfo, ServiceStatus, SystemInfo};

/// Admin UI (no auth required)
pub async fn serve_ui() -> Html<&'static str> {
    Html(crate::admin::html::ui_html())
}

/// Exchange the admin token for a session cookie
pub async fn authenticate(
    State(state): State<AppState>,
    Extension(ClientIp(client)): Extension<ClientIp>,
    JsonBody(request): JsonBody<AuthRequest>,
) -> AdminResult<Response> {
    match state.tokens.check(&request.token) {
        TokenCheck::NotConfigured => {
            warn!("Login attempt from {} but no admin token is configured", client);
            Err(AdminError::TokenNotConfigured)
        }
        TokenCheck::Mismatch => {
            warn!("Failed login attempt from {}", client);
            metrics::counter!("netadmin_auth_failures_total").increment(1);
            Err(AdminError::Unauthorized)
        }
        TokenCheck::Valid => {
            let id = state.sessions.create();
            let cookie = session_cookie(&id, state.sessions.timeout().as_secs());
            info!("Successful login from {}", client);

            Ok(([(header::SET_COOKIE, cookie)], Json(OkResponse { ok: true })).into_response())
        }
    }
}

pub async fn get_network(State(state): State<AppState>) -> Json<CurrentNetworkInfo> {
    Json(state.inspector.current_network_info().await)
}

pub async fn get_system(State(state): State<AppState>) -> Json<SystemInfo> {
    Json(state.status.system_info().await)
}

pub async fn get_services(State(state): State<AppState>) -> Json<Vec<ServiceStatus>> {
    Json(state.status.service_statuses().await)
}

/// Validate, write and schedule a new network configuration
pub async fn post_network(
    State(state): State<AppState>,
    Extension(ClientIp(client)): Extension<ClientIp>,
    JsonBody(request): JsonBody<NetworkUpdateRequest>,
) -> AdminResult<Json<NetworkUpdateResponse>> {
    let proposed = ProposedNetworkConfig::from(request);

    let needs_default = proposed
        .interface
        .as_deref()
        .map_or(true, |name| name.trim().is_empty());
    let current_interface = if needs_default {
        state.inspector.default_interface().await
    } else {
        None
    };

    let (validated, artifact) =
        validate_and_render(&proposed, current_interface.as_deref(), Utc::now()).map_err(|e| {
            warn!("Rejected network configuration from {}: {}", client, e);
            e
        })?;

    // A document for a missing link would replace the uplink's configuration.
    if !needs_default && !state.inspector.interface_exists(&validated.interface).await {
        warn!(
            "Rejected network configuration from {}: unknown interface {}",
            client, validated.interface
        );
        return Err(ValidationError::InvalidInterface(validated.interface).into());
    }

    let outcome = state.applier.apply(&validated, &artifact).await.map_err(|e| {
        warn!("Failed to apply network configuration from {}: {}", client, e);
        e
    })?;
    info!(
        "Network configuration for {} applied by {}, new address {}",
        validated.interface, client, outcome.address
    );

    // The activation handle is dropped; the task runs to completion on its own.
    Ok(Json(NetworkUpdateResponse {
        ok: true,
        new_ip: outcome.address.to_string(),
    }))
}

/// Change the hostname without touching the network configuration
pub async fn post_hostname(
    State(state): State<AppState>,
    Extension(ClientIp(client)): Extension<ClientIp>,
    JsonBody(request): JsonBody<HostnameRequest>,
) -> AdminResult<Json<HostnameResponse>> {
    let hostname = request.hostname.trim();
    validate_hostname(hostname).map_err(|e| AdminError::BadRequest(e.to_string()))?;

    state.applier.set_hostname(hostname).await.map_err(|e| {
        warn!("Failed to set hostname for {}: {}", client, e);
        e
    })?;
    info!("Hostname set to {} by {}", hostname, client);

    Ok(Json(HostnameResponse {
        ok: true,
        hostname: hostname.to_string(),
    }))
}

/// Fallback for unknown paths
pub async fn not_found() -> AdminError {
    AdminError::NotFound
}
