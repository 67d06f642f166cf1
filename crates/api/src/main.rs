use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use patchdock_pipeline::{runner::PipelineRunner, PipelineContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use patchdock_api::config::ServerConfig;
use patchdock_api::router::build_app_router;
use patchdock_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patchdock_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = patchdock_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    patchdock_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    patchdock_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Capability clients ---
    let pipeline = PipelineContext {
        pool: pool.clone(),
        github: Arc::new(patchdock_github::GitHubClient::from_env()),
        vercel: Arc::new(patchdock_vercel::VercelClient::from_env()),
        stripe: Arc::new(patchdock_stripe::StripeClient::from_env()),
        ai: Arc::new(patchdock_ai::AiClient::from_env()),
    };
    tracing::info!("Capability clients initialised");

    // --- Background services ---
    let cancel = tokio_util::sync::CancellationToken::new();

    let runner = PipelineRunner::new(pipeline.clone());
    let runner_cancel = cancel.clone();
    let runner_handle = tokio::spawn(async move {
        runner.run(runner_cancel).await;
    });

    let poller_ctx = pipeline.clone();
    let poller_cancel = cancel.clone();
    let poller_handle = tokio::spawn(async move {
        patchdock_pipeline::poller::run(poller_ctx, poller_cancel).await;
    });

    tracing::info!("Background services started (pipeline runner, deployment poller)");

    // --- App state / router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        pipeline,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(timeout, runner_handle).await;
    let _ = tokio::time::timeout(timeout, poller_handle).await;
    tracing::info!("Background services stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
