//! HTTP surface of the analytics API.

mod client_ip;
mod error;
mod handlers;
mod middleware;
mod state;

pub use client_ip::{ClientIp, resolve_client_ip};
pub use error::ApiError;
pub use middleware::RequestContext;
pub use state::HttpState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use middleware::{log_responses, set_request_context};

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/track", post(handlers::track))
        .route("/api/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .layer(CorsLayer::permissive())
}
