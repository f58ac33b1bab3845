use serde::Serialize;

use super::usage::UsageSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    /// OLS slope per period divided by the series mean.
    pub value: f64,
    pub direction: TrendDirection,
}

impl Trend {
    pub const FLAT: Trend = Trend {
        value: 0.0,
        direction: TrendDirection::Stable,
    };
}

/// Classification cut-offs for the normalized slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendThresholds {
    pub up: f64,
    pub down: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self { up: 0.05, down: -0.05 }
    }
}

/// Fits usage against period index and labels the normalized slope.
///
/// Fewer than two non-zero periods is not enough signal for a fit and is
/// reported as flat.
pub fn classify(series: &UsageSeries, thresholds: TrendThresholds) -> Trend {
    if series.non_zero_periods() < 2 {
        return Trend::FLAT;
    }

    let ys: Vec<f64> = series.values().collect();
    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;
    if mean_y <= 0.0 {
        return Trend::FLAT;
    }

    let (cov, var_x) = ys
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, var), (i, y)| {
            let dx = i as f64 - mean_x;
            (cov + dx * (y - mean_y), var + dx * dx)
        });
    if var_x == 0.0 {
        return Trend::FLAT;
    }

    let value = (cov / var_x) / mean_y;
    let direction = if value > thresholds.up {
        TrendDirection::Increasing
    } else if value < thresholds.down {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Trend { value, direction }
}
