use anyhow::{Context, Result};
use cashback_guard::{
    config::Config,
    middleware::AdminGate,
    routes::{create_router, AppState},
    services::*,
    store::{
        AdminDirectory, AuditStore, FirmDirectory, FraudStore, MemoryStore, PayoutStore,
        RateLimitStore, SessionDirectory, SubmissionStore, SupabaseStore,
    },
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ADMIN_ROLE_TTL_SECS: u64 = 300;

/// One handle per datastore concern, all backed by the same store.
struct Stores {
    submissions: Arc<dyn SubmissionStore>,
    fraud: Arc<dyn FraudStore>,
    payouts: Arc<dyn PayoutStore>,
    audit: Arc<dyn AuditStore>,
    rate_limits: Arc<dyn RateLimitStore>,
    admins: Arc<dyn AdminDirectory>,
    sessions: Arc<dyn SessionDirectory>,
    firms: Arc<dyn FirmDirectory>,
}

impl Stores {
    fn backed_by<S>(store: Arc<S>) -> Self
    where
        S: SubmissionStore
            + FraudStore
            + PayoutStore
            + AuditStore
            + RateLimitStore
            + AdminDirectory
            + SessionDirectory
            + FirmDirectory
            + 'static,
    {
        Self {
            submissions: store.clone(),
            fraud: store.clone(),
            payouts: store.clone(),
            audit: store.clone(),
            rate_limits: store.clone(),
            admins: store.clone(),
            sessions: store.clone(),
            firms: store,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting cashback-guard v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);

    let stores = if config.uses_memory_store() {
        tracing::warn!("No SUPABASE_URL configured, using in-memory datastore");
        Stores::backed_by(Arc::new(MemoryStore::new()))
    } else {
        let url = config
            .supabase_url
            .as_deref()
            .context("SUPABASE_URL is not set")?;
        let key = config
            .supabase_service_key
            .as_deref()
            .context("SUPABASE_SERVICE_KEY is not set")?;
        Stores::backed_by(Arc::new(SupabaseStore::new(url, key, config.http_timeout)?))
    };

    let cache = Arc::new(
        CacheService::new(config.redis_url.as_deref(), Duration::from_secs(ADMIN_ROLE_TTL_SECS))
            .await,
    );
    let audit = AuditTrail::new(stores.audit.clone(), config.store_timeout);
    let alerts = Arc::new(FraudAlertStore::new(stores.fraud.clone(), audit.clone()));
    let detector = Arc::new(FraudDetector::new(
        stores.fraud.clone(),
        (*alerts).clone(),
        config.fraud.clone(),
    ));
    let validator = Arc::new(SubmissionValidator::new(detector, config.max_purchase_amount));
    let rate_limiter = RateLimiter::new(stores.rate_limits.clone(), config.rate_limit.clone());

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            let client = reqwest::Client::builder()
                .timeout(config.http_timeout)
                .build()?;
            Arc::new(WebhookNotifier::new(url.clone(), client))
        }
        None => {
            tracing::info!("No NOTIFY_WEBHOOK_URL configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };

    let intake = Arc::new(SubmissionService::new(
        validator,
        stores.submissions.clone(),
        stores.firms.clone(),
        rate_limiter,
        audit.clone(),
        config.default_cashback_percent,
    ));
    let workflow = Arc::new(AdminWorkflow::new(
        stores.submissions.clone(),
        stores.payouts.clone(),
        audit,
        notifier,
        config.bulk_delay,
    ));
    let gate = Arc::new(AdminGate::new(
        stores.sessions.clone(),
        stores.admins.clone(),
        cache.clone(),
        ADMIN_ROLE_TTL_SECS,
    ));

    let state = AppState {
        intake,
        workflow,
        alerts,
        submissions: stores.submissions,
        cache,
        started_at: Instant::now(),
    };
    let app = create_router(state, gate);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl+c: {}", e);
        return;
    }
    tracing::info!("Shutting down gracefully...");
}
