//! Pure report builders over one immutable snapshot.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsResult;
use crate::models::{Part, UsageRecord};

use super::cost::{self, CostPolicy};
use super::reorder::{self, ReorderPolicy};
use super::report::*;
use super::risk::{self, RiskAssessment, RiskParams};
use super::trend::{self, TrendThresholds};
use super::usage::{self, ReportWindow, UsageByPart, UsageStats};

/// Parts and usage fetched once at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub parts: Vec<Part>,
    pub usage: Vec<UsageRecord>,
}

impl Snapshot {
    pub fn aggregate(&self, window: &ReportWindow) -> AnalyticsResult<UsageByPart> {
        usage::aggregate(
            self.parts.iter().map(|p| p.part_id.as_str()),
            &self.usage,
            window,
        )
    }
}

pub fn compute_report(
    kind: ReportKind,
    snapshot: &Snapshot,
    usage: &UsageByPart,
    window: &ReportWindow,
    config: &AnalyticsConfig,
) -> AnalyticsResult<ReportPayload> {
    Ok(match kind {
        ReportKind::InventoryHealth => {
            ReportPayload::InventoryHealth(inventory_health(snapshot, usage, window, config)?)
        }
        ReportKind::UsagePatterns => ReportPayload::UsagePatterns(usage_patterns(snapshot, usage, config)),
        ReportKind::CostAnalysis => ReportPayload::CostAnalysis(cost_analysis(snapshot, usage, config)?),
    })
}

fn stats_for(usage: &UsageByPart, part_id: &str) -> UsageStats {
    usage.get(part_id).map(|u| u.stats).unwrap_or_default()
}

/// Annualized turnover for one part, `None` when it held no stock at all.
///
/// Stock at the window start is taken as `quantity + used`, so the average
/// level is `quantity + used / 2`.
pub fn turnover_rate(quantity: i64, used: i64, window_days: i64) -> Option<f64> {
    let average_level = quantity as f64 + used as f64 / 2.0;
    if average_level <= 0.0 {
        return None;
    }
    Some(used as f64 / average_level * 365.0 / window_days as f64)
}

pub fn inventory_health(
    snapshot: &Snapshot,
    usage: &UsageByPart,
    window: &ReportWindow,
    config: &AnalyticsConfig,
) -> AnalyticsResult<InventoryHealthReport> {
    let params = RiskParams::from(config);
    let policy = ReorderPolicy::from(config);

    let assessed: Vec<(&Part, UsageStats, RiskAssessment)> = snapshot
        .parts
        .par_iter()
        .map(|part| {
            let stats = stats_for(usage, &part.part_id);
            risk::assess(part, &stats, &params).map(|risk| (part, stats, risk))
        })
        .collect::<AnalyticsResult<_>>()?;

    let turnovers: Vec<f64> = assessed
        .iter()
        .filter_map(|(part, stats, _)| turnover_rate(part.quantity, stats.total, window.days()))
        .collect();
    let average_turnover_rate = if turnovers.is_empty() {
        0.0
    } else {
        turnovers.iter().sum::<f64>() / turnovers.len() as f64
    };

    let names: HashMap<&str, &Part> = snapshot
        .parts
        .iter()
        .map(|p| (p.part_id.as_str(), p))
        .collect();

    let reorder_recommendations = reorder::recommend(
        assessed
            .iter()
            .map(|(part, stats, risk)| (*part, stats.daily_velocity, risk)),
        &policy,
    )
    .into_iter()
    .filter_map(|rec| {
        let part = names.get(rec.part_id.as_str())?;
        Some(ReorderRow {
            part_id: rec.part_id,
            name: part.name.clone(),
            current_quantity: part.quantity,
            minimum_quantity: part.minimum_quantity,
            days_until_stockout: rec.days_until_stockout,
            recommended_order: rec.recommended_order,
            trigger: rec.trigger,
        })
    })
    .collect();

    let mut high_risk: Vec<(&Part, &RiskAssessment)> = assessed
        .iter()
        .filter(|(_, _, risk)| risk.risk_score >= config.high_risk_threshold)
        .map(|(part, _, risk)| (*part, risk))
        .collect();
    high_risk.sort_by(|(a, ra), (b, rb)| {
        rb.risk_score
            .total_cmp(&ra.risk_score)
            .then_with(|| a.part_id.cmp(&b.part_id))
    });

    Ok(InventoryHealthReport {
        average_turnover_rate,
        total_parts_count: snapshot.parts.len(),
        low_stock_count: snapshot.parts.iter().filter(|p| p.is_low_stock()).count(),
        out_of_stock_count: snapshot.parts.iter().filter(|p| p.is_out_of_stock()).count(),
        reorder_recommendations,
        high_risk_parts: high_risk
            .into_iter()
            .map(|(part, risk)| HighRiskPart {
                part_id: part.part_id.clone(),
                name: part.name.clone(),
                risk_score: risk.risk_score,
                days_until_stockout: risk.days_until_stockout,
            })
            .collect(),
    })
}

pub fn usage_patterns(
    snapshot: &Snapshot,
    usage: &UsageByPart,
    config: &AnalyticsConfig,
) -> UsagePatternsReport {
    let thresholds = TrendThresholds {
        up: config.trend_up_threshold,
        down: config.trend_down_threshold,
    };
    let names: HashMap<&str, &str> = snapshot
        .parts
        .iter()
        .map(|p| (p.part_id.as_str(), p.name.as_str()))
        .collect();
    let name_of = |id: &str| names.get(id).copied().unwrap_or(id).to_string();

    let mut monthly_usage: Vec<UsageRow> = usage
        .values()
        .flat_map(|u| {
            u.series
                .points
                .iter()
                .filter(|(_, quantity)| *quantity > 0)
                .map(move |(date, quantity)| UsageRow {
                    date: *date,
                    part_id: u.series.part_id.clone(),
                    name: name_of(&u.series.part_id),
                    quantity_used: *quantity,
                })
        })
        .collect();
    monthly_usage.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.part_id.cmp(&b.part_id)));

    let entries: Vec<_> = usage.values().collect();
    let mut trends: Vec<TrendRow> = entries
        .par_iter()
        .map(|u| {
            let t = trend::classify(&u.series, thresholds);
            TrendRow {
                part_id: u.series.part_id.clone(),
                name: name_of(&u.series.part_id),
                trend: t.value,
                trend_direction: t.direction,
            }
        })
        .collect();
    trends.sort_by(|a, b| a.part_id.cmp(&b.part_id));

    UsagePatternsReport {
        monthly_usage,
        trends,
    }
}

pub fn cost_analysis(
    snapshot: &Snapshot,
    usage: &UsageByPart,
    config: &AnalyticsConfig,
) -> AnalyticsResult<CostAnalysisReport> {
    let summary = cost::analyze(&snapshot.parts, usage, &CostPolicy::from(config))?;
    Ok(CostAnalysisReport {
        total_inventory_value: summary.total_inventory_value,
        annual_holding_cost: summary.annual_holding_cost,
        potential_savings: summary.potential_savings,
        high_value_items: summary.high_value_items,
        excess_inventory_items: summary.excess_inventory_items,
    })
}
