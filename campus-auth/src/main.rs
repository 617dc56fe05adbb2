use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;

use campus_auth::{
    build_router,
    config::AuthConfig,
    services::{CredentialService, JwtService, PgDirectory, RedisStore, SmtpMailer},
    AppState,
};
use campus_core::middleware::rate_limit::create_ip_rate_limiter;
use campus_core::observability::logging::init_tracing;
use campus_core::observability::metrics::init_metrics;

#[tokio::main]
async fn main() -> Result<(), campus_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    let metrics = init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting campus auth service"
    );

    // Directory database (read-only collaborator)
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    let directory = Arc::new(PgDirectory::new(pool));
    tracing::info!("Directory connection initialized");

    // Expiring key-value store backing the credential lifecycle
    let store = Arc::new(
        RedisStore::new(&config.redis)
            .await
            .map_err(campus_core::error::AppError::InternalError)?,
    );
    let credentials = CredentialService::new(store.clone());
    tracing::info!("Credential store initialized");

    let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

    let jwt = JwtService::new(&config.jwt)
        .map_err(campus_core::error::AppError::InternalError)?;
    tracing::info!("JWT service initialized");

    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized");

    let state = AppState {
        config: config.clone(),
        jwt,
        store,
        credentials,
        directory,
        mailer,
        metrics,
        ip_rate_limiter,
    };

    let app = build_router(state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
