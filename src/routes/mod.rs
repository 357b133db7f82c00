// HTTP query surface for the dashboard. Read-only: consumers pull, nothing is pushed.

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::metrics_cache::MetricsCache;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) cache: Arc<MetricsCache>,
    pub(crate) config: AppConfig,
}

pub fn app(cache: Arc<MetricsCache>, config: AppConfig) -> Router {
    let state = AppState { cache, config };
    Router::new()
        .route("/", get(|| async { "netbakeoff query surface" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/metrics", get(http::metrics_handler)) // GET /api/metrics
        .route("/api/flags", get(http::flags_handler)) // GET /api/flags
        .route("/api/correlation", get(http::correlation_handler)) // GET /api/correlation
        .route("/api/phases", get(http::phases_handler)) // GET /api/phases
        .route("/api/ranking", get(http::ranking_handler)) // GET /api/ranking
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
