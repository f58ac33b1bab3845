use serde::{Serialize, Serializer};

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::Part;

use super::usage::UsageStats;

/// Projected time to run out of stock at the current velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DaysUntilStockout {
    Days(f64),
    /// Velocity is zero: no depletion is projected.
    Unbounded,
}

impl DaysUntilStockout {
    pub fn is_within(&self, horizon_days: f64) -> bool {
        matches!(self, Self::Days(d) if *d < horizon_days)
    }
}

/// Serialized as a number of days, or `null` when unbounded.
impl Serialize for DaysUntilStockout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Days(d) => serializer.serialize_f64(*d),
            Self::Unbounded => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub part_id: String,
    pub days_until_stockout: DaysUntilStockout,
    /// In [0, 1].
    pub risk_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    pub proximity_weight: f64,
    pub volatility_weight: f64,
    pub horizon_days: f64,
}

impl From<&AnalyticsConfig> for RiskParams {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            proximity_weight: config.risk_weight_proximity,
            volatility_weight: config.risk_weight_volatility,
            horizon_days: config.risk_horizon_days,
        }
    }
}

pub fn days_until_stockout(quantity: i64, velocity: f64) -> DaysUntilStockout {
    if velocity > 0.0 {
        DaysUntilStockout::Days(quantity as f64 / velocity)
    } else {
        DaysUntilStockout::Unbounded
    }
}

/// Scores stockout risk for one part.
///
/// `risk = w1 * proximity + w2 * volatility`, where proximity is
/// `1 - days / horizon` clamped to [0, 1] (0 when unbounded). Stock at or
/// below the minimum is always 1.0.
pub fn estimate(
    part_id: &str,
    quantity: i64,
    minimum_quantity: i64,
    velocity: f64,
    volatility: f64,
    params: &RiskParams,
) -> AnalyticsResult<RiskAssessment> {
    if quantity < 0 {
        return Err(AnalyticsError::invalid_input(
            part_id,
            format!("current quantity is negative ({})", quantity),
        ));
    }
    if minimum_quantity < 0 {
        return Err(AnalyticsError::invalid_input(
            part_id,
            format!("minimum quantity is negative ({})", minimum_quantity),
        ));
    }
    if !velocity.is_finite() || velocity < 0.0 {
        return Err(AnalyticsError::invalid_input(
            part_id,
            format!("usage velocity must be finite and >= 0 (got {})", velocity),
        ));
    }

    let days = days_until_stockout(quantity, velocity);

    let risk_score = if quantity <= minimum_quantity {
        1.0
    } else {
        let proximity = match days {
            DaysUntilStockout::Days(d) => (1.0 - d / params.horizon_days).clamp(0.0, 1.0),
            DaysUntilStockout::Unbounded => 0.0,
        };
        let volatility = if volatility.is_finite() {
            volatility.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (params.proximity_weight * proximity + params.volatility_weight * volatility)
            .clamp(0.0, 1.0)
    };

    Ok(RiskAssessment {
        part_id: part_id.to_string(),
        days_until_stockout: days,
        risk_score,
    })
}

pub fn assess(part: &Part, stats: &UsageStats, params: &RiskParams) -> AnalyticsResult<RiskAssessment> {
    estimate(
        &part.part_id,
        part.quantity,
        part.minimum_quantity,
        stats.daily_velocity,
        stats.volatility,
        params,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RiskParams {
        RiskParams {
            proximity_weight: 0.7,
            volatility_weight: 0.3,
            horizon_days: 30.0,
        }
    }

    #[test]
    fn zero_velocity_is_unbounded() {
        let r = estimate("P001", 50, 10, 0.0, 0.0, &params()).unwrap();
        assert_eq!(r.days_until_stockout, DaysUntilStockout::Unbounded);
        assert_eq!(r.risk_score, 0.0);
    }

    #[test]
    fn zero_velocity_and_zero_stock_does_not_divide() {
        let r = estimate("P001", 0, 0, 0.0, 0.0, &params()).unwrap();
        assert_eq!(r.days_until_stockout, DaysUntilStockout::Unbounded);
        assert_eq!(r.risk_score, 1.0, "empty stock sits at its minimum");
    }

    #[test]
    fn below_minimum_forces_full_risk_regardless_of_velocity() {
        for velocity in [0.0, 0.001, 1.0, 1_000.0] {
            let r = estimate("P001", 5, 10, velocity, 0.0, &params()).unwrap();
            assert_eq!(r.risk_score, 1.0, "velocity {}", velocity);
        }
    }

    #[test]
    fn p001_scenario() {
        let r = estimate("P001", 5, 10, 1.0, 0.0, &params()).unwrap();
        assert_eq!(r.days_until_stockout, DaysUntilStockout::Days(5.0));
        assert_eq!(r.risk_score, 1.0);
    }

    #[test]
    fn proximity_term_follows_formula() {
        // 15 days on a 30 day horizon → proximity 0.5
        let r = estimate("P002", 30, 0, 2.0, 0.0, &params()).unwrap();
        assert!((r.risk_score - 0.35).abs() < 1e-12);
    }

    #[test]
    fn volatility_raises_risk() {
        let calm = estimate("P002", 30, 0, 2.0, 0.0, &params()).unwrap();
        let noisy = estimate("P002", 30, 0, 2.0, 0.8, &params()).unwrap();
        assert!(noisy.risk_score > calm.risk_score);
        assert!((noisy.risk_score - (0.35 + 0.24)).abs() < 1e-12);
    }

    #[test]
    fn risk_is_monotonic_in_stockout_proximity() {
        let far = estimate("P002", 100, 0, 2.0, 0.2, &params()).unwrap();
        let near = estimate("P002", 10, 0, 2.0, 0.2, &params()).unwrap();
        assert!(near.risk_score >= far.risk_score);
    }

    #[test]
    fn score_stays_in_unit_interval() {
        let r = estimate("P002", 1, 0, 100.0, 5.0, &params()).unwrap();
        assert!((0.0..=1.0).contains(&r.risk_score));
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert!(matches!(
            estimate("P003", -1, 0, 1.0, 0.0, &params()),
            Err(AnalyticsError::InvalidInput { part_id, .. }) if part_id == "P003"
        ));
        assert!(estimate("P003", 1, -1, 1.0, 0.0, &params()).is_err());
        assert!(estimate("P003", 1, 0, -0.5, 0.0, &params()).is_err());
        assert!(estimate("P003", 1, 0, f64::NAN, 0.0, &params()).is_err());
    }

    #[test]
    fn unbounded_serializes_as_null() {
        let json = serde_json::to_value(DaysUntilStockout::Unbounded).unwrap();
        assert!(json.is_null());
        let json = serde_json::to_value(DaysUntilStockout::Days(7.5)).unwrap();
        assert_eq!(json, serde_json::json!(7.5));
    }
}
