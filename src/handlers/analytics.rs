use std::time::Instant;

use anyhow::anyhow;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    analytics::{Dashboard, Granularity, ReportKind, ReportPayload, ReportWindow},
    config::AnalyticsConfig,
    error::{AnalyticsResult, AppError, AppResult},
    AppState,
};

/// Optional window overrides accepted by every analytics endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct WindowParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub granularity: Option<Granularity>,
}

impl WindowParams {
    /// Fills the gaps from config: `end` defaults to `today`, `start` to
    /// `window_days` before `end`. Windows longer than `max_window_days`
    /// are rejected.
    pub fn resolve(&self, config: &AnalyticsConfig, today: NaiveDate) -> AppResult<ReportWindow> {
        let granularity = self.granularity.unwrap_or(config.granularity);
        let end = self.end.unwrap_or(today);
        let window = match self.start {
            Some(start) => ReportWindow::new(start, end, granularity)
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
            None => ReportWindow::ending(end, config.window_days, granularity),
        };
        if window.days() > config.max_window_days {
            return Err(AppError::BadRequest(format!(
                "window of {} days exceeds the {} day limit",
                window.days(),
                config.max_window_days
            )));
        }
        Ok(window)
    }
}

pub struct LoadedReports {
    /// `None` when everything came from the cache.
    pub run_id: Option<Uuid>,
    pub reports: Vec<(ReportKind, AnalyticsResult<ReportPayload>)>,
}

/// Serves `kinds` from the cache where fresh and computes the rest in one run.
pub async fn load_reports(state: &AppState, window: ReportWindow, kinds: &[ReportKind]) -> LoadedReports {
    let mut reports = Vec::with_capacity(kinds.len());
    let mut missing = Vec::new();
    {
        let cache = state.cache.read().await;
        for &kind in kinds {
            match cache.get(&window, kind) {
                Some(payload) => reports.push((kind, Ok(payload))),
                None => missing.push(kind),
            }
        }
    }

    if missing.is_empty() {
        debug!(start = %window.start, end = %window.end, "Served reports from cache");
        return LoadedReports {
            run_id: None,
            reports,
        };
    }

    let run = state.engine.run(&state.db, window, &missing).await;
    state.metrics.write().await.record_run(&run);
    {
        let mut cache = state.cache.write().await;
        for report in &run.reports {
            if let Ok(payload) = &report.result {
                cache.put(window, payload.clone());
            }
        }
    }

    reports.extend(run.reports.into_iter().map(|r| (r.kind, r.result)));
    reports.sort_by_key(|(kind, _)| *kind);
    LoadedReports {
        run_id: Some(run.run_id),
        reports,
    }
}

async fn single_report(
    state: &AppState,
    params: &WindowParams,
    kind: ReportKind,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let window = params.resolve(state.engine.config(), Utc::now().date_naive())?;
    let start = Instant::now();
    let loaded = load_reports(state, window, &[kind]).await;

    let (_, result) = loaded
        .reports
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no result produced for {}", kind))?;
    let payload = result?;

    info!(
        report = %kind,
        cached = loaded.run_id.is_none(),
        elapsed_ms = start.elapsed().as_millis(),
        "Served report"
    );

    Ok((StatusCode::OK, Json(payload.to_json())))
}

// ── GET /api/analytics/inventory-health ───────────────────────────────────────

pub async fn inventory_health(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    single_report(&state, &params, ReportKind::InventoryHealth).await
}

// ── GET /api/analytics/usage-patterns ─────────────────────────────────────────

pub async fn usage_patterns(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    single_report(&state, &params, ReportKind::UsagePatterns).await
}

// ── GET /api/analytics/cost-analysis ──────────────────────────────────────────

pub async fn cost_analysis(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    single_report(&state, &params, ReportKind::CostAnalysis).await
}

// ── GET /api/analytics/dashboard ──────────────────────────────────────────────

/// All three reports. Always 200; failed reports carry an error marker.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> AppResult<(StatusCode, Json<Dashboard>)> {
    let window = params.resolve(state.engine.config(), Utc::now().date_naive())?;
    let start = Instant::now();
    let loaded = load_reports(&state, window, &ReportKind::ALL).await;

    let mut dashboard = Dashboard::new(window);
    dashboard.run_id = loaded.run_id;
    for (kind, result) in loaded.reports {
        dashboard.set(kind, result);
    }

    info!(
        failed = dashboard.failures().len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Served dashboard"
    );

    Ok((StatusCode::OK, Json(dashboard)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn defaults_come_from_config() {
        let config = AnalyticsConfig::default();
        let w = WindowParams::default().resolve(&config, d(2024, 6, 30)).unwrap();
        assert_eq!(w.end, d(2024, 6, 30));
        assert_eq!(w.days(), config.window_days);
        assert_eq!(w.granularity, config.granularity);
    }

    #[test]
    fn explicit_range_is_used() {
        let params = WindowParams {
            start: Some(d(2024, 1, 1)),
            end: Some(d(2024, 1, 31)),
            granularity: Some(Granularity::Day),
        };
        let w = params.resolve(&AnalyticsConfig::default(), d(2024, 6, 30)).unwrap();
        assert_eq!((w.start, w.end, w.granularity), (d(2024, 1, 1), d(2024, 1, 31), Granularity::Day));
    }

    #[test]
    fn oversized_window_is_bad_request() {
        let params = WindowParams {
            start: Some(d(1, 1, 1)),
            end: Some(d(9999, 12, 31)),
            granularity: Some(Granularity::Day),
        };
        let err = params.resolve(&AnalyticsConfig::default(), d(2024, 6, 30)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("limit")));
    }

    #[test]
    fn window_at_the_limit_is_accepted() {
        let config = AnalyticsConfig {
            max_window_days: 31,
            ..AnalyticsConfig::default()
        };
        let params = WindowParams {
            start: Some(d(2024, 1, 1)),
            end: Some(d(2024, 1, 31)),
            granularity: None,
        };
        assert_eq!(params.resolve(&config, d(2024, 6, 30)).unwrap().days(), 31);

        let params = WindowParams {
            end: Some(d(2024, 2, 1)),
            ..params
        };
        assert!(params.resolve(&config, d(2024, 6, 30)).is_err());
    }

    #[test]
    fn start_after_end_is_bad_request() {
        let params = WindowParams {
            start: Some(d(2024, 7, 1)),
            ..WindowParams::default()
        };
        let err = params.resolve(&AnalyticsConfig::default(), d(2024, 6, 30)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
