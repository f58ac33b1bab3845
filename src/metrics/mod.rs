use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::analytics::facade::RunOutput;

/// One computed report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    pub timestamp: DateTime<Utc>,
    pub run_id: Uuid,
    pub report: String, // "inventory_health" | "usage_patterns" | "cost_analysis"
    pub duration_ns: u64,
    pub duration_ms: f64,
    pub part_count: usize,
    pub success: bool,
    pub error_code: Option<String>,
}

impl MetricEntry {
    pub fn new(
        run_id: Uuid,
        report: impl Into<String>,
        duration_ns: u64,
        part_count: usize,
        error_code: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            report: report.into(),
            duration_ns,
            duration_ms: duration_ns as f64 / 1_000_000.0,
            part_count,
            success: error_code.is_none(),
            error_code,
        }
    }
}

/// In-memory history of report computations.
#[derive(Debug, Default)]
pub struct MetricsStore {
    pub entries: Vec<MetricEntry>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: MetricEntry) {
        self.entries.push(entry);
    }

    /// One entry per report of the run.
    pub fn record_run(&mut self, run: &RunOutput) {
        for report in &run.reports {
            self.record(MetricEntry::new(
                run.run_id,
                report.kind.as_str(),
                report.elapsed.as_nanos() as u64,
                run.part_count,
                report.result.as_ref().err().map(|e| e.code().to_string()),
            ));
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Aggregate stats per report.
    pub fn aggregated(&self) -> Vec<AggregatedMetric> {
        let mut map: HashMap<String, Vec<&MetricEntry>> = HashMap::new();

        for e in &self.entries {
            map.entry(e.report.clone()).or_default().push(e);
        }

        let mut out: Vec<AggregatedMetric> = map
            .into_iter()
            .map(|(report, entries)| {
                let count = entries.len();
                let failures = entries.iter().filter(|e| !e.success).count();
                let mut sorted: Vec<u64> = entries.iter().map(|e| e.duration_ns).collect();
                sorted.sort_unstable();
                let total: u64 = sorted.iter().sum();
                let avg = total / count as u64;
                let min = *sorted.first().unwrap_or(&0);
                let max = *sorted.last().unwrap_or(&0);
                let p50 = sorted[count / 2];
                let p95 = sorted[((count as f64 * 0.95) as usize).min(count.saturating_sub(1))];
                let p99 = sorted[((count as f64 * 0.99) as usize).min(count.saturating_sub(1))];

                AggregatedMetric {
                    report,
                    sample_count: count,
                    failure_count: failures,
                    min_ns: min,
                    max_ns: max,
                    avg_ns: avg,
                    p50_ns: p50,
                    p95_ns: p95,
                    p99_ns: p99,
                    avg_ms: avg as f64 / 1_000_000.0,
                    p95_ms: p95 as f64 / 1_000_000.0,
                }
            })
            .collect();

        out.sort_by(|a, b| a.report.cmp(&b.report));
        out
    }

    /// Export all entries as a CSV string.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record([
            "timestamp",
            "run_id",
            "report",
            "duration_ns",
            "duration_ms",
            "part_count",
            "success",
            "error_code",
        ])?;

        for e in &self.entries {
            wtr.write_record([
                e.timestamp.to_rfc3339(),
                e.run_id.to_string(),
                e.report.clone(),
                e.duration_ns.to_string(),
                format!("{:.6}", e.duration_ms),
                e.part_count.to_string(),
                e.success.to_string(),
                e.error_code.clone().unwrap_or_default(),
            ])?;
        }

        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }

    /// Render a simple ASCII comparison table.
    pub fn ascii_table(&self) -> String {
        let agg = self.aggregated();
        if agg.is_empty() {
            return "No report runs recorded yet.".to_string();
        }

        let mut out = String::new();
        out.push_str(&format!(
            "\n{:<20} {:>10} {:>10} {:>12} {:>12} {:>12} {:>12}\n",
            "Report", "Runs", "Failed", "Avg (ms)", "P50 (ms)", "P95 (ms)", "P99 (ms)"
        ));
        out.push_str(&"-".repeat(94));
        out.push('\n');

        for row in &agg {
            out.push_str(&format!(
                "{:<20} {:>10} {:>10} {:>12.3} {:>12.3} {:>12.3} {:>12.3}\n",
                row.report,
                row.sample_count,
                row.failure_count,
                row.avg_ns as f64 / 1_000_000.0,
                row.p50_ns as f64 / 1_000_000.0,
                row.p95_ns as f64 / 1_000_000.0,
                row.p99_ns as f64 / 1_000_000.0,
            ));
        }

        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub report: String,
    pub sample_count: usize,
    pub failure_count: usize,
    pub min_ns: u64,
    pub max_ns: u64,
    pub avg_ns: u64,
    pub p50_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub avg_ms: f64,
    pub p95_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MetricsStore {
        let run = Uuid::new_v4();
        let mut store = MetricsStore::new();
        store.record(MetricEntry::new(run, "cost_analysis", 2_000_000, 10, None));
        store.record(MetricEntry::new(run, "cost_analysis", 4_000_000, 10, None));
        store.record(MetricEntry::new(
            run,
            "usage_patterns",
            1_000_000,
            10,
            Some("computation_timeout".to_string()),
        ));
        store
    }

    #[test]
    fn aggregated_groups_by_report() {
        let agg = store().aggregated();
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].report, "cost_analysis");
        assert_eq!(agg[0].sample_count, 2);
        assert_eq!(agg[0].avg_ns, 3_000_000);
        assert_eq!(agg[0].min_ns, 2_000_000);
        assert_eq!(agg[1].failure_count, 1);
    }

    #[test]
    fn csv_has_header_and_one_row_per_entry() {
        let csv = store().to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("timestamp,run_id,report"));
        assert!(lines[3].ends_with("false,computation_timeout"));
    }

    #[test]
    fn ascii_table_when_empty() {
        assert_eq!(MetricsStore::new().ascii_table(), "No report runs recorded yet.");
        assert!(store().ascii_table().contains("usage_patterns"));
    }

    #[test]
    fn clear_removes_entries() {
        let mut s = store();
        s.clear();
        assert!(s.entries.is_empty());
    }
}
