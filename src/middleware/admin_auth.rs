use crate::error::CashbackError;
use crate::services::CacheService;
use crate::store::{AdminDirectory, SessionDirectory};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub admin_id: String,
    pub role: String,
}

/// Resolves a bearer access token to a user through the auth service, then
/// checks that user against the `is_admin` / `get_admin_role` RPCs.
/// Positive role lookups are cached by user id.
pub struct AdminGate {
    sessions: Arc<dyn SessionDirectory>,
    directory: Arc<dyn AdminDirectory>,
    cache: Arc<CacheService>,
    ttl_secs: u64,
}

impl AdminGate {
    pub fn new(
        sessions: Arc<dyn SessionDirectory>,
        directory: Arc<dyn AdminDirectory>,
        cache: Arc<CacheService>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            sessions,
            directory,
            cache,
            ttl_secs,
        }
    }

    pub async fn authorize(&self, access_token: Option<&str>) -> Result<AdminIdentity, CashbackError> {
        let Some(token) = access_token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Err(CashbackError::Unauthorized);
        };

        let Some(admin_id) = self.sessions.user_for_token(token).await? else {
            tracing::warn!("Admin request with invalid access token");
            return Err(CashbackError::Unauthorized);
        };

        let cache_key = format!("admin_role:{}", admin_id);
        if let Some(role) = self.cache.get::<String>(&cache_key).await.ok().flatten() {
            tracing::debug!("Admin role cache hit for {}", admin_id);
            return Ok(AdminIdentity { admin_id, role });
        }

        if !self.directory.is_admin(&admin_id).await? {
            tracing::warn!(user_id = %admin_id, "Non-admin attempted admin action");
            return Err(CashbackError::Forbidden);
        }

        let role = self
            .directory
            .get_admin_role(&admin_id)
            .await?
            .unwrap_or_else(|| "admin".to_string());

        if let Err(e) = self.cache.set(&cache_key, &role, self.ttl_secs).await {
            tracing::warn!(admin_id = %admin_id, error = %e, "Failed to cache admin role");
        }

        tracing::info!(admin_id = %admin_id, role = %role, "Admin authorized");

        Ok(AdminIdentity { admin_id, role })
    }
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

pub async fn admin_auth_layer(
    State(gate): State<Arc<AdminGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, CashbackError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token);

    let identity = gate.authorize(token).await?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
