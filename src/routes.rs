// src/routes.rs
use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::api;
use crate::middleware::{rate_limit::write_rate_limit, security::security_headers};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Write endpoints share a per-client budget.
    let writes = Router::new()
        .route("/courses/:id/reviews", post(api::create_review))
        .route_layer(from_fn_with_state(state.clone(), write_rate_limit));

    let api_v1 = Router::new()
        .route("/courses", get(api::list_courses))
        .route("/courses/:id", get(api::get_course))
        .route("/courses/:id/eval-summary", get(api::get_eval_summary))
        .route("/search", get(api::search_courses))
        .route("/trending", get(api::trending))
        .route("/majors", get(api::list_majors))
        .route("/tags", get(api::list_tags))
        .merge(writes);

    Router::new()
        .nest("/api/v1", api_v1)
        .route("/health", get(health_check))
        .with_state(state.clone())
        .layer(from_fn_with_state(state, security_headers))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthCheckResponse>) {
    let database_ok = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "health check: database unreachable");
            false
        }
    };
    let backend = state.cache.backend();
    let cache_healthy = matches!(backend.ping().await, Ok(true));

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthCheckResponse {
            status: if database_ok { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "ok" } else { "error" }.to_string(),
            cache: backend.name().to_string(),
            cache_healthy,
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub cache: String,
    pub cache_healthy: bool,
}
