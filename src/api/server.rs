//! HTTP server for the dashboard API and (optionally) the built UI bundle.

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::billing::{BillingApi, OpenRouterApi};
use crate::config::DashboardConfig;
use crate::platform::OpenClaw;
use crate::runner::{CommandRunner, ProcessRunner};

/// Port the UI expects the proxy on.
pub const DEFAULT_PORT: u16 = 3001;

/// How many ports past the requested one to try before giving up.
const PORT_SEARCH_SPAN: u16 = 100;

/// Shared application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
    pub cli: Arc<OpenClaw>,
    pub billing: Arc<dyn BillingApi>,
}

impl AppState {
    /// State wired to the real CLI and billing API.
    pub fn new(config: DashboardConfig) -> Self {
        let billing = Arc::new(OpenRouterApi::from_config(&config));
        Self::with_parts(config, Arc::new(ProcessRunner::new()), billing)
    }

    pub fn with_parts(
        config: DashboardConfig,
        runner: Arc<dyn CommandRunner>,
        billing: Arc<dyn BillingApi>,
    ) -> Self {
        let cli = OpenClaw::from_config(runner, &config);
        Self {
            config: Arc::new(config),
            cli: Arc::new(cli),
            billing,
        }
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the router. Requests outside `/api` are served from `static_dir`
/// when given, with `index.html` for client-side routes.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/sessions_list", get(handlers::sessions))
        .route("/api/sessions", get(handlers::sessions))
        .route("/api/cron/list", get(handlers::cron_list))
        .route("/api/cron/status", get(handlers::cron_status))
        .route("/api/cron/runs", get(handlers::cron_runs))
        .route("/api/cron/run", post(handlers::cron_run))
        .route("/api/cron/toggle", post(handlers::cron_toggle))
        .route("/api/status", get(handlers::status))
        .route("/api/health", get(handlers::health))
        .route("/api/activity", get(handlers::activity))
        .route("/api/brief", get(handlers::brief))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/history", get(handlers::history))
        .route("/api/memory/search", get(handlers::memory_search))
        .route("/api/memory/content", get(handlers::memory_content))
        .route("/api/memory/status", get(handlers::memory_status))
        .route("/api/goals", get(handlers::goals))
        .route("/api/agents", get(handlers::agents))
        .route("/api/config", get(handlers::config))
        .route("/api/channels", get(handlers::channels))
        .route("/api/gateway/health", get(handlers::gateway_health))
        .route("/api/gateway/status", get(handlers::gateway_status))
        .route("/api/openrouter/key", get(handlers::openrouter_key))
        .route("/api/openrouter/usage", get(handlers::openrouter_usage))
        .route("/api/emergency/stop", post(handlers::emergency_stop))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => {
            let assets = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            api.fallback_service(assets)
        }
        None => api,
    };

    app.layer(cors_layer()).layer(TraceLayer::new_for_http())
}

/// First port at or after `start` that can be bound on `host`.
pub fn find_available_port(host: &str, start: u16) -> Option<u16> {
    let ip: std::net::IpAddr = host.parse().ok()?;
    (start..=start.saturating_add(PORT_SEARCH_SPAN))
        .find(|&port| StdTcpListener::bind(SocketAddr::from((ip, port))).is_ok())
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn start_server(
    state: AppState,
    host: &str,
    port: u16,
    static_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state, static_dir.as_deref());

    let host_addr: std::net::IpAddr = host
        .parse()
        .map_err(|e| format!("Invalid host address '{}': {}", host, e))?;
    let addr = SocketAddr::from((host_addr, port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, static_dir = ?static_dir, "dashboard API listening");
    println!("Jerry dashboard API at http://{}", addr);
    println!("Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown requested");
}
