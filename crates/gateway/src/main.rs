//! Textspace API Gateway
//!
//! The entry point for every remote-callable function.
//! Handles:
//! - User authentication and workspace token checks
//! - Rate limiting, timeouts, and body limits
//! - Request routing to the text and comment functions
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    BoxError, Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use textspace_common::{
    auth::{JwtManager, WorkspaceTokenManager},
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, MemoryStore, Repository, WorkspaceStore, DEMO_USER_ID},
    errors::AppError,
    functions, metrics,
};
use tokio::signal;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::RateLimitState;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn WorkspaceStore>,
    pub jwt: Arc<JwtManager>,
    pub workspace_tokens: Arc<WorkspaceTokenManager>,
}

impl AppState {
    /// Build the state, failing when the token secrets are not configured
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn WorkspaceStore>) -> anyhow::Result<Self> {
        let jwt = JwtManager::new(config.jwt_secret()?, config.auth.jwt_expiration_secs);
        let workspace_tokens = WorkspaceTokenManager::new(
            config.workspace_token_secret()?,
            config.auth.workspace_token_expiration_secs,
            config.auth.workspace_token_refresh_secs,
        );

        Ok(Self {
            config,
            store,
            jwt: Arc::new(jwt),
            workspace_tokens: Arc::new(workspace_tokens),
        })
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);

    info!(
        version = textspace_common::VERSION,
        service = %config.observability.service_name,
        "Starting Textspace API Gateway"
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    let config = Arc::new(config);
    let store = open_store(&config).await?;

    // Create app state
    let state = AppState::new(config.clone(), store)?;

    if config.uses_memory_store() {
        let token = state.jwt.generate_token(DEMO_USER_ID)?;
        warn!(
            user_id = DEMO_USER_ID,
            token = %token,
            "Running on the in-memory demo store; use this id token for the demo user"
        );
    }

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Pick the store named by `database.url`
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn WorkspaceStore>> {
    if config.uses_memory_store() {
        return Ok(Arc::new(MemoryStore::with_demo_data()));
    }

    let pool = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        pool.migrate().await?;
    }

    Ok(Arc::new(Repository::new(pool)))
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let rate_limit = &state.config.rate_limit;
    let limiter = rate_limit
        .enabled
        .then(|| RateLimitState::new(rate_limit.requests_per_second, rate_limit.burst));

    // Function routes
    let api_routes = Router::new()
        // Text functions
        .route(&functions::path(functions::CREATE_TEXT), post(handlers::texts::create_text))
        .route(&functions::path(functions::GET_TEXTS), post(handlers::texts::get_texts))
        .route(&functions::path(functions::UPDATE_TEXT), post(handlers::texts::update_text))
        .route(&functions::path(functions::DELETE_TEXT), post(handlers::texts::delete_text))

        // Comment functions
        .route(&functions::path(functions::CREATE_COMMENT), post(handlers::comments::create_comment))
        .route(&functions::path(functions::GET_COMMENTS), post(handlers::comments::get_comments))
        .route(&functions::path(functions::DELETE_COMMENT), post(handlers::comments::delete_comment))

        // Workspace tokens
        .route(
            &functions::path(functions::GET_WORKSPACE_TOKENS),
            post(handlers::workspaces::get_workspace_tokens),
        );

    let api_routes = match limiter {
        Some(limiter) => api_routes.route_layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        )),
        None => api_routes,
    };

    // Outside the limiter so rejected calls are counted too
    let api_routes =
        api_routes.route_layer(axum::middleware::from_fn(middleware::metrics::track_metrics));

    // Compose the app
    let app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(state.config.server.max_body_bytes));

    with_timeout(app, state.config.request_timeout())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Fail calls running longer than `timeout` with an envelope
fn with_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_timeout_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::ServiceUnavailable {
            message: "request timed out".to_string(),
        }
    } else {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
