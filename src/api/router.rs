//! HTTP router.
//!
//! Returns a composable `Router` mounted under `/api/`:
//! - `POST /api/search` behind the per-client rate limiter
//! - `GET /api/health` unthrottled

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router with default rate limits.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build router from a pre-constructed `ApiContext`.
pub fn api_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    // Extension must be outermost so the rate middleware can extract ApiContext.
    let search = Router::new()
        .route("/api/search", post(endpoints::search::search))
        .layer(DefaultBodyLimit::max(endpoints::search::MAX_BODY_BYTES))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    let open = Router::new()
        .route("/api/health", get(endpoints::health::check))
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new().merge(search).merge(open).layer(cors)
}
