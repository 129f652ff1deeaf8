use axum::{routing::get, Json, Router};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ThrottleConfig;
use crate::errors::ThrottleError;
use crate::middleware::rate_limited;
use crate::models::{Greeting, HealthResponse};

pub fn build_router(config: &ThrottleConfig) -> Result<Router, ThrottleError> {
    // One limiter for every caller of `/`. `route_layer` keeps the 405
    // fallback for other methods outside the window.
    let root_limit = rate_limited(config.max_calls, config.time_frame)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(read_root).route_layer(root_limit))
        .route("/health", get(health_check))
        .layer(cors);

    Ok(app)
}

async fn read_root() -> Json<Greeting> {
    Json(Greeting {
        hello: "World".to_string(),
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    })
}
