use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::{error::AppResult, AppState};

// ── GET /api/analytics/metrics ────────────────────────────────────────────────

pub async fn report_metrics(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let metrics = state.metrics.read().await;
    let cached_reports = state.cache.read().await.len();

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "entry_count": metrics.entries.len(),
            "entries": metrics.entries,
            "aggregated": metrics.aggregated(),
            "cached_reports": cached_reports,
            "ascii_table": metrics.ascii_table(),
        })),
    ))
}

// ── GET /api/analytics/metrics/export/csv ────────────────────────────────────

pub async fn export_csv(State(state): State<AppState>) -> AppResult<Response> {
    let csv = state.metrics.read().await.to_csv()?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"analytics_metrics.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

// ── DELETE /api/analytics/reset ───────────────────────────────────────────────

pub async fn reset(State(state): State<AppState>) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let cached = {
        let mut cache = state.cache.write().await;
        let n = cache.len();
        cache.clear();
        n
    };
    let entries = {
        let mut metrics = state.metrics.write().await;
        let n = metrics.entries.len();
        metrics.clear();
        n
    };

    info!(cached, entries, "Cleared report cache and run metrics");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "cleared_reports": cached,
            "cleared_metric_entries": entries,
        })),
    ))
}
