use std::cmp::Ordering;

use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::models::Part;

use super::risk::{DaysUntilStockout, RiskAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderTrigger {
    BelowMinimum,
    ProjectedStockout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderRecommendation {
    pub part_id: String,
    pub recommended_order: i64,
    pub trigger: ReorderTrigger,
    pub risk_score: f64,
    pub days_until_stockout: DaysUntilStockout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReorderPolicy {
    /// Projected stockouts closer than this qualify for a reorder.
    pub horizon_days: f64,
    pub lead_time_days: f64,
    pub safety_stock: i64,
}

impl From<&AnalyticsConfig> for ReorderPolicy {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            horizon_days: config.reorder_horizon_days,
            lead_time_days: config.lead_time_days,
            safety_stock: config.safety_stock,
        }
    }
}

/// Returns a recommendation when the part is below its minimum or is
/// projected to stock out inside the policy horizon.
///
/// The order covers the larger of the gap to minimum and the lead-time
/// demand plus safety stock.
pub fn recommend_part(
    part: &Part,
    velocity: f64,
    risk: &RiskAssessment,
    policy: &ReorderPolicy,
) -> Option<ReorderRecommendation> {
    let trigger = if part.is_below_minimum() {
        ReorderTrigger::BelowMinimum
    } else if risk.days_until_stockout.is_within(policy.horizon_days) {
        ReorderTrigger::ProjectedStockout
    } else {
        return None;
    };

    let to_minimum = part.minimum_quantity - part.quantity;
    let lead_time_demand = (velocity * policy.lead_time_days).ceil() as i64;
    let to_cover_lead_time = lead_time_demand + policy.safety_stock - part.quantity;

    Some(ReorderRecommendation {
        part_id: part.part_id.clone(),
        recommended_order: to_minimum.max(to_cover_lead_time).max(0),
        trigger,
        risk_score: risk.risk_score,
        days_until_stockout: risk.days_until_stockout,
    })
}

/// Highest risk first, then part id for a stable order.
pub fn by_priority(a: &ReorderRecommendation, b: &ReorderRecommendation) -> Ordering {
    b.risk_score
        .total_cmp(&a.risk_score)
        .then_with(|| a.part_id.cmp(&b.part_id))
}

/// Sorted recommendations for every qualifying `(part, velocity, risk)`.
pub fn recommend<'a>(
    candidates: impl IntoIterator<Item = (&'a Part, f64, &'a RiskAssessment)>,
    policy: &ReorderPolicy,
) -> Vec<ReorderRecommendation> {
    let mut out: Vec<ReorderRecommendation> = candidates
        .into_iter()
        .filter_map(|(part, velocity, risk)| recommend_part(part, velocity, risk, policy))
        .collect();
    out.sort_by(by_priority);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::risk::{estimate, RiskParams};
    use crate::models::part;

    fn policy() -> ReorderPolicy {
        ReorderPolicy {
            horizon_days: 14.0,
            lead_time_days: 7.0,
            safety_stock: 0,
        }
    }

    fn risk_of(p: &Part, velocity: f64) -> RiskAssessment {
        let params = RiskParams {
            proximity_weight: 0.7,
            volatility_weight: 0.3,
            horizon_days: 30.0,
        };
        estimate(&p.part_id, p.quantity, p.minimum_quantity, velocity, 0.0, &params).unwrap()
    }

    #[test]
    fn p001_scenario_orders_at_least_the_gap() {
        let p = part("P001", 5, 10, 2.5);
        let rec = recommend_part(&p, 1.0, &risk_of(&p, 1.0), &policy()).unwrap();
        assert_eq!(rec.trigger, ReorderTrigger::BelowMinimum);
        assert!(rec.recommended_order >= 5);
        assert_eq!(rec.days_until_stockout, DaysUntilStockout::Days(5.0));
    }

    #[test]
    fn projected_stockout_qualifies_above_minimum() {
        // 20 units at 2/day → 10 days, inside the 14 day horizon
        let p = part("P002", 20, 5, 1.0);
        let rec = recommend_part(&p, 2.0, &risk_of(&p, 2.0), &policy()).unwrap();
        assert_eq!(rec.trigger, ReorderTrigger::ProjectedStockout);
        // lead time demand 14 - 20 on hand → floored at 0; gap to minimum negative
        assert_eq!(rec.recommended_order, 0);
    }

    #[test]
    fn larger_candidate_quantity_wins() {
        let p = part("P003", 4, 6, 1.0);
        let policy = ReorderPolicy {
            safety_stock: 10,
            ..policy()
        };
        // gap 2 vs ceil(1.5 * 7) + 10 - 4 = 17
        let rec = recommend_part(&p, 1.5, &risk_of(&p, 1.5), &policy).unwrap();
        assert_eq!(rec.recommended_order, 17);
    }

    #[test]
    fn healthy_part_gets_no_recommendation() {
        let p = part("P004", 100, 5, 1.0);
        assert!(recommend_part(&p, 1.0, &risk_of(&p, 1.0), &policy()).is_none());
        assert!(recommend_part(&p, 0.0, &risk_of(&p, 0.0), &policy()).is_none());
    }

    #[test]
    fn one_recommendation_per_part_when_both_conditions_hold() {
        let p = part("P005", 2, 10, 1.0);
        let risk = risk_of(&p, 5.0);
        let recs = recommend([(&p, 5.0, &risk)], &policy());
        assert_eq!(recs.len(), 1);
        // gap 8 vs ceil(35) - 2 = 33
        assert_eq!(recs[0].recommended_order, 33);
    }

    #[test]
    fn sorted_by_risk_then_part_id_and_idempotent() {
        let parts = vec![
            part("P020", 10, 0, 1.0),
            part("P010", 1, 5, 1.0),
            part("P001", 2, 5, 1.0),
            part("P030", 5, 0, 1.0),
        ];
        let risks: Vec<RiskAssessment> = parts.iter().map(|p| risk_of(p, 1.0)).collect();
        let run = || {
            recommend(
                parts.iter().zip(risks.iter()).map(|(p, r)| (p, 1.0, r)),
                &policy(),
            )
        };

        let first = run();
        let ids: Vec<&str> = first.iter().map(|r| r.part_id.as_str()).collect();
        assert_eq!(ids, vec!["P001", "P010", "P030", "P020"]);
        assert_eq!(first, run(), "Recommender must be idempotent");
    }
}
