// GET handlers: version and the derived-data queries.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::comparator::{rank_phases, summarize_phases};
use crate::correlation::{correlate, correlation_counts};
use crate::models::{BadMomentFlag, BucketMetrics, ScoredBucket, Source, TimeRange};
use crate::version::{NAME, VERSION};

/// Common query parameters. `from`/`to` are epoch ms, half-open; both optional.
#[derive(Debug, Deserialize)]
pub(super) struct RangeParams {
    from: Option<i64>,
    to: Option<i64>,
    source: Option<Source>,
    phase: Option<String>,
}

impl RangeParams {
    fn range(&self) -> Result<TimeRange, ApiError> {
        let start = self.from.unwrap_or(i64::MIN);
        let end = self.to.unwrap_or(i64::MAX);
        TimeRange::new(start, end)
            .ok_or_else(|| ApiError::BadRequest(format!("from ({start}) must be <= to ({end})")))
    }
}

pub(super) enum ApiError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": msg }))).into_response()
            }
            ApiError::Internal(e) => {
                tracing::warn!(error = %e, "query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

async fn load(state: &AppState, params: &RangeParams) -> Result<Vec<ScoredBucket>, ApiError> {
    let range = params.range()?;
    Ok(state
        .cache
        .get_range(range, params.source, params.phase.as_deref())
        .await?)
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/metrics: BucketMetrics for the range.
pub(super) async fn metrics_handler(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<BucketMetrics>>, ApiError> {
    let rows = load(&state, &params).await?;
    Ok(Json(rows.into_iter().map(|r| r.metrics).collect()))
}

/// GET /api/flags: BadMomentFlag for the range.
pub(super) async fn flags_handler(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<BadMomentFlag>>, ApiError> {
    let rows = load(&state, &params).await?;
    Ok(Json(rows.into_iter().map(|r| r.flag).collect()))
}

/// GET /api/correlation: per-interval LAN/WAN verdicts plus counts. `source` is ignored.
pub(super) async fn correlation_handler(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let range = params.range()?;
    let rows = state
        .cache
        .get_range(range, None, params.phase.as_deref())
        .await?;
    let (lan, wan): (Vec<BadMomentFlag>, Vec<BadMomentFlag>) = rows
        .into_iter()
        .map(|r| r.flag)
        .partition(|f| f.bucket.source == Source::Lan);
    let intervals = correlate(&lan, &wan);
    let counts = correlation_counts(&intervals);
    Ok(Json(serde_json::json!({
        "intervals": intervals,
        "counts": counts,
    })))
}

/// GET /api/phases: PhaseSummary per phase.
pub(super) async fn phases_handler(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = load(&state, &params).await?;
    Ok(Json(summarize_phases(&rows)))
}

/// GET /api/ranking: phases ranked best-first. Defaults to comparator.source.
pub(super) async fn ranking_handler(
    State(state): State<AppState>,
    Query(mut params): Query<RangeParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.source.is_none() {
        params.source = state.config.comparator.source;
    }
    let rows = load(&state, &params).await?;
    let ranking = rank_phases(summarize_phases(&rows), &state.config.comparator.weights);
    Ok(Json(ranking))
}
