//! Response payloads of the three analytics reports.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AnalyticsError, ErrorMarker};

use super::reorder::ReorderTrigger;
use super::risk::DaysUntilStockout;
use super::trend::TrendDirection;
use super::usage::ReportWindow;
use super::cost::{ExcessItem, HighValueItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    InventoryHealth,
    UsagePatterns,
    CostAnalysis,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [
        ReportKind::InventoryHealth,
        ReportKind::UsagePatterns,
        ReportKind::CostAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InventoryHealth => "inventory_health",
            Self::UsagePatterns => "usage_patterns",
            Self::CostAnalysis => "cost_analysis",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Inventory health ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryHealthReport {
    pub average_turnover_rate: f64,
    pub total_parts_count: usize,
    /// Stock above zero but under the minimum.
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    pub reorder_recommendations: Vec<ReorderRow>,
    pub high_risk_parts: Vec<HighRiskPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderRow {
    pub part_id: String,
    pub name: String,
    pub current_quantity: i64,
    pub minimum_quantity: i64,
    pub days_until_stockout: DaysUntilStockout,
    pub recommended_order: i64,
    pub trigger: ReorderTrigger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighRiskPart {
    pub part_id: String,
    pub name: String,
    pub risk_score: f64,
    pub days_until_stockout: DaysUntilStockout,
}

// ── Usage patterns ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsagePatternsReport {
    pub monthly_usage: Vec<UsageRow>,
    pub trends: Vec<TrendRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRow {
    pub date: NaiveDate,
    pub part_id: String,
    pub name: String,
    pub quantity_used: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub part_id: String,
    pub name: String,
    pub trend: f64,
    pub trend_direction: TrendDirection,
}

// ── Cost analysis ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnalysisReport {
    pub total_inventory_value: f64,
    pub annual_holding_cost: f64,
    pub potential_savings: f64,
    pub high_value_items: Vec<HighValueItem>,
    pub excess_inventory_items: Vec<ExcessItem>,
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// Any one of the three reports.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportPayload {
    InventoryHealth(InventoryHealthReport),
    UsagePatterns(UsagePatternsReport),
    CostAnalysis(CostAnalysisReport),
}

impl ReportPayload {
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::InventoryHealth(_) => ReportKind::InventoryHealth,
            Self::UsagePatterns(_) => ReportKind::UsagePatterns,
            Self::CostAnalysis(_) => ReportKind::CostAnalysis,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            Self::InventoryHealth(r) => serde_json::to_value(r),
            Self::UsagePatterns(r) => serde_json::to_value(r),
            Self::CostAnalysis(r) => serde_json::to_value(r),
        };
        // Report structs contain only plain data and always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// A report slot: either the payload itself or an error marker in its place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportOutcome<T> {
    Ready(T),
    Failed { error: ErrorMarker },
}

impl<T> ReportOutcome<T> {
    pub fn failed(err: &AnalyticsError) -> Self {
        Self::Failed {
            error: err.marker(),
        }
    }
}

/// All requested reports of one window. Unrequested slots are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Absent when every report came from the cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    pub window: ReportWindow,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_health: Option<ReportOutcome<InventoryHealthReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_patterns: Option<ReportOutcome<UsagePatternsReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_analysis: Option<ReportOutcome<CostAnalysisReport>>,
}

impl Dashboard {
    pub fn new(window: ReportWindow) -> Self {
        Self {
            run_id: None,
            window,
            generated_at: Utc::now(),
            inventory_health: None,
            usage_patterns: None,
            cost_analysis: None,
        }
    }

    pub fn set(&mut self, kind: ReportKind, result: Result<ReportPayload, AnalyticsError>) {
        match result {
            Ok(ReportPayload::InventoryHealth(r)) => self.inventory_health = Some(ReportOutcome::Ready(r)),
            Ok(ReportPayload::UsagePatterns(r)) => self.usage_patterns = Some(ReportOutcome::Ready(r)),
            Ok(ReportPayload::CostAnalysis(r)) => self.cost_analysis = Some(ReportOutcome::Ready(r)),
            Err(err) => match kind {
                ReportKind::InventoryHealth => self.inventory_health = Some(ReportOutcome::failed(&err)),
                ReportKind::UsagePatterns => self.usage_patterns = Some(ReportOutcome::failed(&err)),
                ReportKind::CostAnalysis => self.cost_analysis = Some(ReportOutcome::failed(&err)),
            },
        }
    }

    /// Error codes of failed slots, keyed by report name.
    pub fn failures(&self) -> Vec<(ReportKind, &ErrorMarker)> {
        let mut out = Vec::new();
        if let Some(ReportOutcome::Failed { error }) = &self.inventory_health {
            out.push((ReportKind::InventoryHealth, error));
        }
        if let Some(ReportOutcome::Failed { error }) = &self.usage_patterns {
            out.push((ReportKind::UsagePatterns, error));
        }
        if let Some(ReportOutcome::Failed { error }) = &self.cost_analysis {
            out.push((ReportKind::CostAnalysis, error));
        }
        out
    }
}
