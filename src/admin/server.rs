//! Admin HTTP Server Module
//!
//! Builds the shared state and the axum router, and runs the listener.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::{header, HeaderValue};
use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::admin::auth::{client_gate, require_session};
use crate::admin::handlers;
use crate::admin::rate_limit::RateLimiter;
use crate::admin::session::SessionManager;
use crate::admin::token::TokenStore;
use crate::common::{NetAdminError, Result};
use crate::config::AdminConfig;
use crate::netplan::ConfigApplier;
use crate::system::{CommandRunner, NetworkInspector, StatusCollector};

/// Services shared by every request
///
/// Built once at startup. The session and rate tables each have their own
/// lock; nothing holds both.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AdminConfig>,
    pub tokens: Arc<TokenStore>,
    pub sessions: Arc<SessionManager>,
    pub limiter: Arc<RateLimiter>,
    pub inspector: Arc<NetworkInspector>,
    pub status: Arc<StatusCollector>,
    pub applier: Arc<ConfigApplier>,
}

impl AppState {
    pub fn new(config: AdminConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let command_timeout = config.command_timeout();

        let inspector = NetworkInspector::new(
            Arc::clone(&runner),
            config.netplan_dir.clone(),
            config.resolv_conf.clone(),
            command_timeout,
        );
        let status = StatusCollector::new(
            Arc::clone(&runner),
            config.compose_file.clone(),
            config.compose_env_file.clone(),
            command_timeout,
        );
        let applier = ConfigApplier::new(
            config.netplan_dir.clone(),
            config.netplan_file_name.clone(),
            config.apply_delay(),
            command_timeout,
            config.hostname_timeout(),
            runner,
        );

        Self {
            tokens: Arc::new(TokenStore::new(config.token_file.clone())),
            sessions: Arc::new(SessionManager::new(config.session_timeout())),
            limiter: Arc::new(RateLimiter::new(config.rate_limit, config.rate_window())),
            inspector: Arc::new(inspector),
            status: Arc::new(status),
            applier: Arc::new(applier),
            config: Arc::new(config),
        }
    }
}

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    // Routes that require a session
    let protected = Router::new()
        .route("/api/network", get(handlers::get_network).post(handlers::post_network))
        .route("/api/system", get(handlers::get_system))
        .route("/api/services", get(handlers::get_services))
        .route("/api/hostname", post(handlers::post_hostname))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        // Public routes
        .route("/", get(handlers::serve_ui))
        .route("/api/auth", post(handlers::authenticate))
        .merge(protected)
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
                // Throttling runs for every request, ahead of the session check
                .layer(middleware::from_fn_with_state(state.clone(), client_gate)),
        )
        .with_state(state)
}

/// Periodically drop idle sessions and stale rate windows
///
/// Returns `None` when sweeping is disabled (zero interval).
pub fn spawn_sweeper(state: &AppState) -> Option<JoinHandle<()>> {
    let period = state.config.sweep_interval();
    if period.is_zero() {
        return None;
    }

    let sessions = Arc::clone(&state.sessions);
    let limiter = Arc::clone(&state.limiter);

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let expired = sessions.sweep();
            let idle = limiter.sweep();
            if expired > 0 || idle > 0 {
                debug!("Swept {} expired sessions and {} idle clients", expired, idle);
            }
        }
    }))
}

/// Serve the API on `listener` until `shutdown` completes
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = spawn_sweeper(&state);
    let app = build_router(state);

    let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| NetAdminError::Server(e.to_string()));

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    result
}

/// Start the admin HTTP server and run until Ctrl+C
pub async fn start_admin_server(config: AdminConfig, runner: Arc<dyn CommandRunner>) -> Result<()> {
    let addr = config.listen_addr()?;
    let state = AppState::new(config, runner);

    let listener = TcpListener::bind(addr).await?;
    info!("Network admin listening on http://{}", addr);

    serve(listener, state, shutdown_signal()).await?;

    info!("Network admin stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }
}
