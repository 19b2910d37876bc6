//! Per-client rate limiting middleware.
//!
//! Applies sliding-window limits per client address:
//! - 30 searches per minute
//! - 300 searches per hour

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Extract a rate-limit key from the request.
///
/// The peer address wins when the server was started with connect info;
/// otherwise the first `X-Forwarded-For` hop, then a shared bucket.
fn rate_key(req: &Request<axum::body::Body>) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("ip:{}", addr.ip());
    }
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|ip| format!("ip:{ip}"))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Returns 429 if the client exceeded its window.
/// Accesses `ApiContext` from request extensions.
pub async fn limit(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = rate_key(&req);

    // MutexGuard is !Send, dropped before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&key).map_err(|retry_after| {
            tracing::warn!(key = %key, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }
        })?;
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn key_prefers_connect_info() {
        let mut req = Request::builder()
            .header("X-Forwarded-For", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.1:5555".parse::<SocketAddr>().unwrap()));
        assert_eq!(rate_key(&req), "ip:192.0.2.1");
    }

    #[test]
    fn key_falls_back_to_forwarded_for() {
        let req = Request::builder()
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(rate_key(&req), "ip:203.0.113.9");
    }

    #[test]
    fn key_defaults_to_anonymous() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(rate_key(&req), "anonymous");
    }
}
