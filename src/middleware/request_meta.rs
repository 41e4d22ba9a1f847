use crate::models::RequestMeta;
use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// Records the client IP and user agent in request extensions so handlers
/// can pass them to audit entries and the IP velocity check.
pub async fn capture_request_meta(mut request: Request, next: Next) -> Response {
    let meta = request_meta(request.headers());
    tracing::debug!(ip = ?meta.ip_address, "Request metadata captured");
    request.extensions_mut().insert(meta);

    next.run(request).await
}

pub fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    // First hop of X-Forwarded-For is the original client.
    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_string);

    RequestMeta {
        ip_address,
        user_agent: header("user-agent").map(str::to_string),
    }
}
