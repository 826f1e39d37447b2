use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use moodsync_api::auth::rate_limit::spawn_cleanup_worker;
use moodsync_api::config::Config;
use moodsync_api::services::sms::{SmsScheduler, TwilioSender};
use moodsync_api::storage::postgres::PgStorage;
use moodsync_api::{db, error, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodsync_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);
    error::expose_internal_details(config.environment.is_development());

    let db = db::create_pool(&config)
        .await
        .context("Failed to connect to the database")?;
    db::run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let sms = match config.twilio.clone() {
        Some(twilio) => Some(SmsScheduler::new(Arc::new(
            TwilioSender::new(twilio).context("Failed to build SMS client")?,
        ))),
        None => {
            tracing::warn!("Twilio credentials missing, SMS scheduling disabled");
            None
        }
    };

    let state = AppState::new(Arc::new(PgStorage::new(db)), config.clone(), sms);
    spawn_cleanup_worker(state.rate_limiter.clone());

    let app = router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    // Client IP feeds the rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
