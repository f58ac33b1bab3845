use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AnalyticsConfig;
use crate::db::InventorySource;
use crate::error::{AnalyticsError, AnalyticsResult};

use super::compute::{compute_report, Snapshot};
use super::report::{ReportKind, ReportPayload};
use super::usage::{ReportWindow, UsageByPart};

type ReportBuilder = fn(
    ReportKind,
    &Snapshot,
    &UsageByPart,
    &ReportWindow,
    &AnalyticsConfig,
) -> AnalyticsResult<ReportPayload>;

/// Outcome of one report within a run.
#[derive(Debug, Clone)]
pub struct ReportRun {
    pub kind: ReportKind,
    pub result: AnalyticsResult<ReportPayload>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: Uuid,
    pub part_count: usize,
    /// Ordered like `ReportKind`.
    pub reports: Vec<ReportRun>,
}

/// Orchestrates snapshot fetch, aggregation and the per-report pipelines.
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    config: Arc<AnalyticsConfig>,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Fetches parts, then their usage inside the window.
    pub async fn fetch_snapshot<S: InventorySource>(
        &self,
        source: &S,
        window: &ReportWindow,
    ) -> AnalyticsResult<Snapshot> {
        let parts = with_retry("fetch_parts", &self.config, || source.fetch_parts()).await?;
        let ids: Vec<String> = parts.iter().map(|p| p.part_id.clone()).collect();
        let usage = with_retry("fetch_usage", &self.config, || {
            source.fetch_usage(&ids, window.start, window.end)
        })
        .await?;
        Ok(Snapshot { parts, usage })
    }

    /// One complete run: fetch, aggregate once, compute `kinds` in isolation.
    ///
    /// Never fails as a whole; every requested report gets its own result.
    pub async fn run<S: InventorySource>(
        &self,
        source: &S,
        window: ReportWindow,
        kinds: &[ReportKind],
    ) -> RunOutput {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        let snapshot = match self.fetch_snapshot(source, &window).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%run_id, error = %err, "Snapshot fetch failed; all requested reports degraded");
                return RunOutput {
                    run_id,
                    part_count: 0,
                    reports: kinds
                        .iter()
                        .map(|&kind| ReportRun {
                            kind,
                            result: Err(err.clone()),
                            elapsed: started.elapsed(),
                        })
                        .collect(),
                };
            }
        };

        info!(
            %run_id,
            parts = snapshot.parts.len(),
            usage_records = snapshot.usage.len(),
            start = %window.start,
            end = %window.end,
            granularity = %window.granularity,
            "Snapshot loaded"
        );

        self.compute(run_id, Arc::new(snapshot), window, kinds).await
    }

    /// Computes `kinds` over an already fetched snapshot.
    pub async fn compute(
        &self,
        run_id: Uuid,
        snapshot: Arc<Snapshot>,
        window: ReportWindow,
        kinds: &[ReportKind],
    ) -> RunOutput {
        self.compute_with(run_id, snapshot, window, kinds, compute_report)
            .await
    }

    async fn compute_with(
        &self,
        run_id: Uuid,
        snapshot: Arc<Snapshot>,
        window: ReportWindow,
        kinds: &[ReportKind],
        build: ReportBuilder,
    ) -> RunOutput {
        let part_count = snapshot.parts.len();
        let budget = self.config.report_timeout;

        let aggregated = {
            let snapshot = Arc::clone(&snapshot);
            run_isolated("usage_aggregation", budget, move || snapshot.aggregate(&window)).await
        };
        let usage = match aggregated {
            Ok(usage) => Arc::new(usage),
            Err(err) => {
                warn!(%run_id, error = %err, "Usage aggregation failed; all requested reports degraded");
                return RunOutput {
                    run_id,
                    part_count,
                    reports: kinds
                        .iter()
                        .map(|&kind| ReportRun {
                            kind,
                            result: Err(err.clone()),
                            elapsed: Duration::ZERO,
                        })
                        .collect(),
                };
            }
        };

        let mut join_set: JoinSet<ReportRun> = JoinSet::new();
        for &kind in kinds {
            let snapshot = Arc::clone(&snapshot);
            let usage = Arc::clone(&usage);
            let config = Arc::clone(&self.config);
            join_set.spawn(async move {
                let started = Instant::now();
                let result = run_isolated(kind.as_str(), budget, move || {
                    build(kind, &snapshot, &usage, &window, &config)
                })
                .await;
                ReportRun {
                    kind,
                    result,
                    elapsed: started.elapsed(),
                }
            });
        }

        let mut reports = Vec::with_capacity(kinds.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => warn!(%run_id, error = %e, "Report task did not complete"),
            }
        }
        // A task lost above still owes its slot a marker.
        for &kind in kinds {
            if !reports.iter().any(|r| r.kind == kind) {
                reports.push(ReportRun {
                    kind,
                    result: Err(AnalyticsError::ComputationFailed(format!(
                        "{} task was cancelled",
                        kind
                    ))),
                    elapsed: Duration::ZERO,
                });
            }
        }
        reports.sort_by_key(|r| r.kind);

        for report in &reports {
            match &report.result {
                Ok(_) => debug!(
                    %run_id,
                    report = %report.kind,
                    elapsed_ms = report.elapsed.as_millis(),
                    "Report computed"
                ),
                Err(err) => warn!(
                    %run_id,
                    report = %report.kind,
                    code = err.code(),
                    error = %err,
                    "Report degraded"
                ),
            }
        }

        RunOutput {
            run_id,
            part_count,
            reports,
        }
    }
}

/// Runs a CPU-bound step on the blocking pool under a time budget.
///
/// A panic becomes `ComputationFailed`; an overrun becomes
/// `ComputationTimeout`. The blocking thread is left to finish on its own.
pub async fn run_isolated<T, F>(label: &str, budget: Duration, f: F) -> AnalyticsResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AnalyticsResult<T> + Send + 'static,
{
    match tokio::time::timeout(budget, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(AnalyticsError::ComputationFailed(format!(
            "{} panicked: {}",
            label, join_err
        ))),
        Err(_) => Err(AnalyticsError::ComputationTimeout {
            report: label.to_string(),
            budget_ms: budget.as_millis() as u64,
        }),
    }
}

/// Retries retryable failures with jittered exponential backoff.
async fn with_retry<T, F, Fut>(label: &str, config: &AnalyticsConfig, mut op: F) -> AnalyticsResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AnalyticsResult<T>>,
{
    let attempts = config.fetch_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < attempts => {
                let delay = backoff_delay(config.fetch_backoff, attempt);
                warn!(
                    op = label,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Upstream fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `base * 2^(attempt-1)` plus up to half of that again as jitter.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1u32 << (attempt - 1).min(10));
    let jitter_ms = exp.as_millis() as u64 / 2;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    };
    exp + Duration::from_millis(jitter)
}
