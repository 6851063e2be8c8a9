//! Application state for fleet-billing

use sqlx::PgPool;

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// HTTP client for gateway calls, built with a bounded request timeout
    pub http: reqwest::Client,
    /// Razorpay publishable key id
    pub razorpay_key_id: String,
    /// Razorpay key secret
    pub razorpay_key_secret: String,
    /// Currency quoted to the gateway
    pub currency: String,
    /// JWT secret for request authentication
    pub jwt_secret: String,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.gateway_timeout_secs))
            .build()?;

        Ok(Self {
            pool,
            http,
            razorpay_key_id: config.razorpay_key_id.clone(),
            razorpay_key_secret: config.razorpay_key_secret.clone(),
            currency: config.currency.clone(),
            jwt_secret: config.jwt_secret.clone(),
        })
    }
}
