//! Billing service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret shared with the identity service
    pub jwt_secret: String,
    /// Razorpay publishable key id (exposed to the checkout widget)
    pub razorpay_key_id: String,
    /// Razorpay key secret (order auth + signature verification)
    pub razorpay_key_secret: String,
    /// Currency code quoted to the gateway
    pub currency: String,
    /// Bound on every gateway call, seconds
    pub gateway_timeout_secs: u64,
    /// Interval between expiry sweeps, seconds
    pub expiry_sweep_interval_secs: u64,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            razorpay_key_id: Self::require_secret("RAZORPAY_KEY_ID", &environment)?,
            razorpay_key_secret: Self::require_secret("RAZORPAY_KEY_SECRET", &environment)?,
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "INR".into()),
            gateway_timeout_secs: std::env::var("GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            expiry_sweep_interval_secs: std::env::var("EXPIRY_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            environment,
        })
    }
}
