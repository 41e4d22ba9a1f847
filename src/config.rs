use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

/// Limits applied by the fraud checks.
#[derive(Debug, Clone)]
pub struct FraudThresholds {
    /// Amounts above this are allowed but flagged for review.
    pub high_amount_review: f64,
    /// Amounts above this are blocked outright.
    pub high_amount_critical: f64,
    pub max_submissions_per_hour: u64,
    pub max_users_per_ip: u64,
}

impl Default for FraudThresholds {
    fn default() -> Self {
        Self {
            high_amount_review: 10_000.0,
            high_amount_critical: 50_000.0,
            max_submissions_per_hour: 5,
            max_users_per_ip: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
    pub block_duration: Duration,
    pub store_timeout: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(3600),
            block_duration: Duration::from_secs(3600),
            store_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    // Hosted datastore (PostgREST + RPC)
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub http_timeout: Duration,

    // Admin role cache second tier
    pub redis_url: Option<String>,

    // Email function endpoint for workflow notifications
    pub notify_webhook_url: Option<String>,

    // Submission rules
    pub max_purchase_amount: f64,
    pub default_cashback_percent: f64,
    pub fraud: FraudThresholds,

    pub rate_limit: RateLimitPolicy,
    pub store_timeout: Duration,
    pub bulk_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let environment = Self::parse_environment()?;
        let store_timeout = Duration::from_secs(env_or("STORE_TIMEOUT_SECS", 5)?);

        let config = Self {
            environment,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 8080)?,

            supabase_url: std::env::var("SUPABASE_URL").ok(),
            supabase_service_key: std::env::var("SUPABASE_SERVICE_KEY").ok(),
            http_timeout: Duration::from_secs(env_or("HTTP_TIMEOUT_SECS", 30)?),

            redis_url: std::env::var("REDIS_URL").ok(),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),

            max_purchase_amount: env_or("MAX_PURCHASE_AMOUNT", 100_000.0)?,
            default_cashback_percent: env_or("DEFAULT_CASHBACK_PERCENT", 10.0)?,
            fraud: FraudThresholds {
                high_amount_review: env_or("HIGH_AMOUNT_REVIEW", 10_000.0)?,
                high_amount_critical: env_or("HIGH_AMOUNT_CRITICAL", 50_000.0)?,
                max_submissions_per_hour: env_or("MAX_SUBMISSIONS_PER_HOUR", 5)?,
                max_users_per_ip: env_or("MAX_USERS_PER_IP", 5)?,
            },

            rate_limit: RateLimitPolicy {
                max_attempts: env_or("RATE_LIMIT_MAX_ATTEMPTS", 10)?,
                window: Duration::from_secs(env_or("RATE_LIMIT_WINDOW_SECS", 3600)?),
                block_duration: Duration::from_secs(env_or("RATE_LIMIT_BLOCK_SECS", 3600)?),
                store_timeout,
            },
            store_timeout,
            bulk_delay: Duration::from_millis(env_or("BULK_DELAY_MS", 100)?),
        };

        config.validate()?;
        Ok(config)
    }

    /// True when no hosted datastore is configured and the in-memory store
    /// should be used instead.
    pub fn uses_memory_store(&self) -> bool {
        self.supabase_url.is_none() && self.environment == Environment::Development
    }

    fn parse_environment() -> Result<Environment> {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.environment != Environment::Development {
            if self.supabase_url.is_none() {
                bail!("SUPABASE_URL required outside development");
            }
            if self.supabase_service_key.is_none() {
                bail!("SUPABASE_SERVICE_KEY required outside development");
            }
        }
        if let Some(url) = &self.supabase_url {
            if !url.starts_with("http") {
                bail!("SUPABASE_URL must be HTTP(S) URL");
            }
        }
        if let Some(url) = &self.notify_webhook_url {
            if !url.starts_with("http") {
                bail!("NOTIFY_WEBHOOK_URL must be HTTP(S) URL");
            }
        }

        if self.max_purchase_amount <= 0.0 {
            bail!("MAX_PURCHASE_AMOUNT must be positive");
        }
        if !(0.0..=100.0).contains(&self.default_cashback_percent) {
            bail!("DEFAULT_CASHBACK_PERCENT must be between 0 and 100");
        }
        if self.fraud.high_amount_review >= self.fraud.high_amount_critical {
            bail!("HIGH_AMOUNT_REVIEW must be below HIGH_AMOUNT_CRITICAL");
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}
