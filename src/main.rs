//! fleet-billing: subscription and entitlement service
//!
//! Long-running service that:
//! - Holds the source of truth for user subscriptions (one active per user)
//! - Runs the payment-gated self-purchase flow (gateway order + signature
//!   verification before any entitlement is granted)
//! - Exposes an admin override path that assigns/cancels plans directly
//! - Sweeps elapsed subscriptions to `expired` on a schedule

mod api;
mod auth;
mod config;
mod db;
mod error;
mod models;
mod razorpay;
mod services;
mod state;
mod util;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_billing=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting fleet-billing (env: {})", config.environment);

    // Initialize application state (connects + migrates)
    let state = AppState::new(&config).await?;

    let app = api::create_router(state.clone());

    // Scheduled expiry sweep; the only producer of `expired`
    let sweep_pool = state.pool.clone();
    let sweep_interval = config.expiry_sweep_interval_secs;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            services::lifecycle::expire_due(&sweep_pool).await;
        }
    });

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("fleet-billing listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
