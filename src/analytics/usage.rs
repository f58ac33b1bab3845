//! Usage aggregation: raw transactions → per-part, per-period series.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::UsageRecord;

/// Bucket size of a usage series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
}

#[derive(Debug, Error)]
#[error("unknown granularity {0:?} (expected \"day\" or \"month\")")]
pub struct ParseGranularityError(String);

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "month" | "monthly" => Ok(Self::Month),
            _ => Err(ParseGranularityError(s.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => f.write_str("day"),
            Self::Month => f.write_str("month"),
        }
    }
}

/// Inclusive date range plus bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
}

impl ReportWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, granularity: Granularity) -> AnalyticsResult<Self> {
        if start > end {
            return Err(AnalyticsError::invalid_input(
                "*",
                format!("window start {} is after end {}", start, end),
            ));
        }
        Ok(Self {
            start,
            end,
            granularity,
        })
    }

    /// Window of `days` days ending on (and including) `end`.
    pub fn ending(end: NaiveDate, days: i64, granularity: Granularity) -> Self {
        Self {
            start: end - Duration::days(days.max(1) - 1),
            end,
            granularity,
        }
    }

    /// Number of calendar days covered, always ≥ 1.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Start date of every period in the window, in order.
    pub fn periods(&self) -> Vec<NaiveDate> {
        match self.granularity {
            Granularity::Day => self.start.iter_days().take(self.days() as usize).collect(),
            Granularity::Month => {
                let count = month_index(self.end) - month_index(self.start) + 1;
                let first = first_of_month(self.start);
                (0..count)
                    .filter_map(|i| first.checked_add_months(chrono::Months::new(i as u32)))
                    .collect()
            }
        }
    }

    fn period_index(&self, date: NaiveDate) -> usize {
        match self.granularity {
            Granularity::Day => (date - self.start).num_days() as usize,
            Granularity::Month => (month_index(date) - month_index(self.start)) as usize,
        }
    }
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Zero-filled usage totals, one entry per window period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSeries {
    pub part_id: String,
    pub points: Vec<(NaiveDate, i64)>,
}

impl UsageSeries {
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, q)| *q as f64)
    }

    pub fn non_zero_periods(&self) -> usize {
        self.points.iter().filter(|(_, q)| *q != 0).count()
    }
}

/// Per-part statistics over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub total: i64,
    /// Mean usage per period.
    pub mean: f64,
    /// Sample (n-1) variance of usage per period.
    pub variance: f64,
    /// Mean usage per calendar day.
    pub daily_velocity: f64,
    /// Coefficient of variation of per-period usage, clamped to [0, 1].
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartUsage {
    pub series: UsageSeries,
    pub stats: UsageStats,
}

/// Aggregated usage keyed by part id, in first-seen order.
pub type UsageByPart = IndexMap<String, PartUsage>;

/// Reduces raw records into one zero-filled series per part.
///
/// Every id in `part_ids` gets an entry even without usage; ids that only
/// appear in `records` are appended after them. Records outside the window
/// are ignored. A negative record quantity rejects the whole aggregation.
pub fn aggregate<'a>(
    part_ids: impl IntoIterator<Item = &'a str>,
    records: &[UsageRecord],
    window: &ReportWindow,
) -> AnalyticsResult<UsageByPart> {
    let periods = window.periods();
    let mut buckets: IndexMap<String, Vec<i64>> = part_ids
        .into_iter()
        .map(|id| (id.to_string(), vec![0; periods.len()]))
        .collect();

    for record in records {
        if record.quantity < 0 {
            return Err(AnalyticsError::invalid_input(
                &record.part_id,
                format!(
                    "usage on {} has negative quantity {}",
                    record.usage_date, record.quantity
                ),
            ));
        }
        if !window.contains(record.usage_date) {
            continue;
        }
        let totals = buckets
            .entry(record.part_id.clone())
            .or_insert_with(|| vec![0; periods.len()]);
        totals[window.period_index(record.usage_date)] += record.quantity;
    }

    Ok(buckets
        .into_iter()
        .map(|(part_id, totals)| {
            let stats = stats_of(&totals, window.days());
            let series = UsageSeries {
                part_id: part_id.clone(),
                points: periods.iter().copied().zip(totals).collect(),
            };
            (part_id, PartUsage { series, stats })
        })
        .collect())
}

fn stats_of(totals: &[i64], window_days: i64) -> UsageStats {
    if totals.is_empty() {
        return UsageStats::default();
    }
    let n = totals.len() as f64;
    let total: i64 = totals.iter().sum();
    let mean = total as f64 / n;
    let variance = if totals.len() < 2 {
        0.0
    } else {
        totals
            .iter()
            .map(|&q| {
                let d = q as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / (n - 1.0)
    };
    let volatility = if mean > 0.0 {
        (variance.sqrt() / mean).clamp(0.0, 1.0)
    } else {
        0.0
    };

    UsageStats {
        total,
        mean,
        variance,
        daily_velocity: total as f64 / window_days as f64,
        volatility,
    }
}
