use rayon::prelude::*;
use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::Part;

use super::usage::UsageByPart;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostPolicy {
    /// Fraction of inventory value spent per year on holding it.
    pub holding_cost_rate: f64,
    pub excess_horizon_days: f64,
    pub excess_slack_factor: f64,
    pub top_k: usize,
}

impl From<&AnalyticsConfig> for CostPolicy {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            holding_cost_rate: config.holding_cost_rate,
            excess_horizon_days: config.excess_horizon_days,
            excess_slack_factor: config.excess_slack_factor,
            top_k: config.top_k,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighValueItem {
    pub part_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_cost: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcessItem {
    pub part_id: String,
    pub name: String,
    pub excess_quantity: i64,
    pub potential_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_inventory_value: f64,
    pub annual_holding_cost: f64,
    pub potential_savings: f64,
    pub high_value_items: Vec<HighValueItem>,
    pub excess_inventory_items: Vec<ExcessItem>,
}

fn validate(part: &Part) -> AnalyticsResult<()> {
    if part.quantity < 0 {
        return Err(AnalyticsError::invalid_input(
            &part.part_id,
            format!("current quantity is negative ({})", part.quantity),
        ));
    }
    if !part.unit_cost.is_finite() || part.unit_cost < 0.0 {
        return Err(AnalyticsError::invalid_input(
            &part.part_id,
            format!("unit cost must be finite and >= 0 (got {})", part.unit_cost),
        ));
    }
    Ok(())
}

/// Quantity held beyond `velocity * horizon`, reported only once stock
/// exceeds that threshold scaled by the slack factor.
pub fn excess_quantity(quantity: i64, velocity: f64, policy: &CostPolicy) -> Option<i64> {
    let threshold = velocity * policy.excess_horizon_days;
    if quantity as f64 <= threshold * policy.excess_slack_factor {
        return None;
    }
    let excess = (quantity as f64 - threshold).floor();
    (excess >= 1.0).then_some(excess as i64)
}

pub fn analyze(parts: &[Part], usage: &UsageByPart, policy: &CostPolicy) -> AnalyticsResult<CostSummary> {
    parts.iter().try_for_each(validate)?;

    // Sequential so the sum does not depend on how rayon splits the work.
    let total_inventory_value: f64 = parts.iter().map(Part::total_value).sum();

    let mut excess_inventory_items: Vec<ExcessItem> = parts
        .par_iter()
        .filter_map(|part| {
            let velocity = usage
                .get(&part.part_id)
                .map(|u| u.stats.daily_velocity)
                .unwrap_or(0.0);
            excess_quantity(part.quantity, velocity, policy).map(|excess| ExcessItem {
                part_id: part.part_id.clone(),
                name: part.name.clone(),
                excess_quantity: excess,
                potential_savings: excess as f64 * part.unit_cost * policy.holding_cost_rate,
            })
        })
        .collect();
    excess_inventory_items.sort_by(|a, b| {
        b.potential_savings
            .total_cmp(&a.potential_savings)
            .then_with(|| a.part_id.cmp(&b.part_id))
    });
    let potential_savings = excess_inventory_items
        .iter()
        .map(|item| item.potential_savings)
        .sum();

    Ok(CostSummary {
        total_inventory_value,
        annual_holding_cost: total_inventory_value * policy.holding_cost_rate,
        potential_savings,
        high_value_items: top_by_value(parts, policy.top_k),
        excess_inventory_items,
    })
}

/// Top `k` parts by stock value, ties broken by part id ascending.
pub fn top_by_value(parts: &[Part], k: usize) -> Vec<HighValueItem> {
    let mut ranked: Vec<&Part> = parts.iter().collect();
    ranked.sort_by(|a, b| {
        b.total_value()
            .total_cmp(&a.total_value())
            .then_with(|| a.part_id.cmp(&b.part_id))
    });
    ranked
        .into_iter()
        .take(k)
        .map(|p| HighValueItem {
            part_id: p.part_id.clone(),
            name: p.name.clone(),
            quantity: p.quantity,
            unit_cost: p.unit_cost,
            total_value: p.total_value(),
        })
        .collect()
}
