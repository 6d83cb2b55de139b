//! belvo_bridge - Belvo aggregation backend API
//!
//! Loads configuration, opens the store, and serves the HTTP API until
//! Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use sqlx::postgres::PgPoolOptions;

use belvo_bridge::auth::JwtService;
use belvo_bridge::belvo::BelvoClient;
use belvo_bridge::jobs::JobScheduler;
use belvo_bridge::store::{MemoryStore, PgStore};
use belvo_bridge::{build_router, db, init_tracing, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        belvo_api = %config.belvo.api_url,
        "Starting belvo_bridge server"
    );

    let jwt = JwtService::new(&config.jwt);
    let belvo = BelvoClient::new(&config.belvo)?;

    let (state, pool) = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");

            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;

            db::verify_connection(&pool).await?;

            // Verify database schema
            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }

            tracing::info!("Database connected successfully");
            (
                AppState::new(PgStore::new(pool.clone()), jwt, belvo),
                Some(pool),
            )
        }
        None => {
            if config.is_production() {
                return Err(anyhow::anyhow!("DATABASE_URL is required in production"));
            }
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            (AppState::new(MemoryStore::new(), jwt, belvo), None)
        }
    };

    // No mail transport: outside production, reset codes go back in the response
    let state = state.with_exposed_reset_codes(!config.is_production());

    let jobs = JobScheduler::new(state.revoked_tokens.clone(), state.reset_codes.clone()).start();

    let app = build_router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    jobs.abort();
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
