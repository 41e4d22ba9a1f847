use crate::config::RateLimitPolicy;
use crate::models::RateLimitBucket;
use crate::store::{RateLimitStore, StoreResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: DateTime<Utc> },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Sliding-window attempt counter over the `rate_limits` store.
///
/// Bookkeeping is non-critical: store errors and timeouts allow the request.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn check(&self, identifier: &str, action_type: &str) -> RateDecision {
        let attempt = self.record_attempt(identifier, action_type, Utc::now());
        match tokio::time::timeout(self.policy.store_timeout, attempt).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                tracing::warn!(identifier, action_type, error = %e, "Rate limit check failed, allowing");
                RateDecision::Allowed { remaining: 0 }
            }
            Err(_) => {
                tracing::warn!(identifier, action_type, "Rate limit check timed out, allowing");
                RateDecision::Allowed { remaining: 0 }
            }
        }
    }

    pub async fn reset(&self, identifier: &str, action_type: &str) {
        let reset = self.store.reset_bucket(identifier, action_type);
        match tokio::time::timeout(self.policy.store_timeout, reset).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(identifier, action_type, error = %e, "Rate limit reset failed"),
            Err(_) => tracing::warn!(identifier, action_type, "Rate limit reset timed out"),
        }
    }

    async fn record_attempt(
        &self,
        identifier: &str,
        action_type: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<RateDecision> {
        let window = to_chrono(self.policy.window);
        let existing = self.store.get_bucket(identifier, action_type).await?;

        let mut bucket = match existing {
            Some(bucket) => {
                if let Some(until) = bucket.blocked_until {
                    if until > now {
                        return Ok(RateDecision::Limited { retry_after: until });
                    }
                }
                if bucket.window_start + window <= now || bucket.blocked_until.is_some() {
                    fresh_bucket(identifier, action_type, now)
                } else {
                    bucket
                }
            }
            None => fresh_bucket(identifier, action_type, now),
        };

        bucket.attempts += 1;

        let decision = if bucket.attempts > self.policy.max_attempts {
            let until = now + to_chrono(self.policy.block_duration);
            bucket.blocked_until = Some(until);
            tracing::info!(identifier, action_type, until = %until, "Rate limit exceeded, blocking");
            RateDecision::Limited { retry_after: until }
        } else {
            RateDecision::Allowed {
                remaining: self.policy.max_attempts - bucket.attempts,
            }
        };

        self.store.save_bucket(&bucket).await?;
        Ok(decision)
    }
}

fn fresh_bucket(identifier: &str, action_type: &str, now: DateTime<Utc>) -> RateLimitBucket {
    RateLimitBucket {
        identifier: identifier.to_string(),
        action_type: action_type.to_string(),
        attempts: 0,
        window_start: now,
        blocked_until: None,
    }
}

fn to_chrono(duration: std::time::Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::hours(1))
}
