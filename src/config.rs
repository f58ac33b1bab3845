use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context};

use crate::analytics::Granularity;

/// Process-level settings. Nothing here is visible to the analytics engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub frontend_url: String,
    pub production_url: Option<String>,
    /// Replace the origin allow-list with `*`.
    pub cors_allow_any: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 8000)?,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            production_url: std::env::var("PRODUCTION_URL").ok().filter(|s| !s.is_empty()),
            cors_allow_any: env_or("CORS_ALLOW_ANY", false)?,
        })
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.clone()];
        if let Some(url) = &self.production_url {
            origins.push(url.clone());
        }
        origins
    }
}

/// Tunables of the analytics engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    /// Length of the default reporting window, ending today.
    pub window_days: i64,
    /// Longest window a caller may request.
    pub max_window_days: i64,
    pub granularity: Granularity,

    // risk
    pub risk_weight_proximity: f64,
    pub risk_weight_volatility: f64,
    pub risk_horizon_days: f64,
    pub high_risk_threshold: f64,

    // trend
    pub trend_up_threshold: f64,
    pub trend_down_threshold: f64,

    // reorder
    pub reorder_horizon_days: f64,
    pub lead_time_days: f64,
    pub safety_stock: i64,

    // cost
    pub holding_cost_rate: f64,
    pub excess_horizon_days: f64,
    pub excess_slack_factor: f64,
    pub top_k: usize,

    // facade
    pub report_timeout: Duration,
    pub fetch_attempts: u32,
    pub fetch_backoff: Duration,
    pub cache_ttl: Duration,
    /// Zero disables the background refresh.
    pub refresh_interval: Duration,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_days: 180,
            max_window_days: 1_830,
            granularity: Granularity::Month,
            risk_weight_proximity: 0.7,
            risk_weight_volatility: 0.3,
            risk_horizon_days: 30.0,
            high_risk_threshold: 0.7,
            trend_up_threshold: 0.05,
            trend_down_threshold: -0.05,
            reorder_horizon_days: 14.0,
            lead_time_days: 7.0,
            safety_stock: 0,
            holding_cost_rate: 0.10,
            excess_horizon_days: 90.0,
            excess_slack_factor: 1.0,
            top_k: 10,
            report_timeout: Duration::from_millis(5_000),
            fetch_attempts: 3,
            fetch_backoff: Duration::from_millis(200),
            cache_ttl: Duration::from_secs(300),
            refresh_interval: Duration::ZERO,
        }
    }
}

impl AnalyticsConfig {
    /// Reads `ANALYTICS_*` variables over the defaults and validates the result.
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();
        let config = Self {
            window_days: env_or("ANALYTICS_WINDOW_DAYS", d.window_days)?,
            max_window_days: env_or("ANALYTICS_MAX_WINDOW_DAYS", d.max_window_days)?,
            granularity: env_or("ANALYTICS_GRANULARITY", d.granularity)?,
            risk_weight_proximity: env_or("ANALYTICS_RISK_WEIGHT_PROXIMITY", d.risk_weight_proximity)?,
            risk_weight_volatility: env_or(
                "ANALYTICS_RISK_WEIGHT_VOLATILITY",
                d.risk_weight_volatility,
            )?,
            risk_horizon_days: env_or("ANALYTICS_RISK_HORIZON_DAYS", d.risk_horizon_days)?,
            high_risk_threshold: env_or("ANALYTICS_HIGH_RISK_THRESHOLD", d.high_risk_threshold)?,
            trend_up_threshold: env_or("ANALYTICS_TREND_UP_THRESHOLD", d.trend_up_threshold)?,
            trend_down_threshold: env_or("ANALYTICS_TREND_DOWN_THRESHOLD", d.trend_down_threshold)?,
            reorder_horizon_days: env_or("ANALYTICS_REORDER_HORIZON_DAYS", d.reorder_horizon_days)?,
            lead_time_days: env_or("ANALYTICS_LEAD_TIME_DAYS", d.lead_time_days)?,
            safety_stock: env_or("ANALYTICS_SAFETY_STOCK", d.safety_stock)?,
            holding_cost_rate: env_or("ANALYTICS_HOLDING_COST_RATE", d.holding_cost_rate)?,
            excess_horizon_days: env_or("ANALYTICS_EXCESS_HORIZON_DAYS", d.excess_horizon_days)?,
            excess_slack_factor: env_or("ANALYTICS_EXCESS_SLACK_FACTOR", d.excess_slack_factor)?,
            top_k: env_or("ANALYTICS_TOP_K", d.top_k)?,
            report_timeout: Duration::from_millis(env_or("ANALYTICS_REPORT_TIMEOUT_MS", 5_000)?),
            fetch_attempts: env_or("ANALYTICS_FETCH_ATTEMPTS", d.fetch_attempts)?,
            fetch_backoff: Duration::from_millis(env_or("ANALYTICS_FETCH_BACKOFF_MS", 200)?),
            cache_ttl: Duration::from_secs(env_or("ANALYTICS_CACHE_TTL_SECS", 300)?),
            refresh_interval: Duration::from_secs(env_or("ANALYTICS_REFRESH_INTERVAL_SECS", 0)?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.window_days > 0, "window_days must be > 0");
        ensure!(
            self.window_days <= self.max_window_days,
            "window_days must be <= max_window_days ({})",
            self.max_window_days
        );
        ensure!(
            self.risk_weight_proximity >= 0.0 && self.risk_weight_volatility >= 0.0,
            "risk weights must be >= 0"
        );
        ensure!(
            (self.risk_weight_proximity + self.risk_weight_volatility - 1.0).abs() < 1e-9,
            "risk weights must sum to 1 (got {} + {})",
            self.risk_weight_proximity,
            self.risk_weight_volatility
        );
        ensure!(self.risk_horizon_days > 0.0, "risk_horizon_days must be > 0");
        ensure!(
            (0.0..=1.0).contains(&self.high_risk_threshold),
            "high_risk_threshold must be within [0, 1]"
        );
        ensure!(
            self.trend_up_threshold >= self.trend_down_threshold,
            "trend_up_threshold must be >= trend_down_threshold"
        );
        ensure!(self.reorder_horizon_days >= 0.0, "reorder_horizon_days must be >= 0");
        ensure!(self.lead_time_days >= 0.0, "lead_time_days must be >= 0");
        ensure!(self.safety_stock >= 0, "safety_stock must be >= 0");
        ensure!(self.holding_cost_rate >= 0.0, "holding_cost_rate must be >= 0");
        ensure!(self.excess_horizon_days >= 0.0, "excess_horizon_days must be >= 0");
        ensure!(self.excess_slack_factor >= 0.0, "excess_slack_factor must be >= 0");
        ensure!(self.top_k > 0, "top_k must be > 0");
        ensure!(self.fetch_attempts > 0, "fetch_attempts must be > 0");
        ensure!(!self.report_timeout.is_zero(), "report_timeout must be > 0");
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value (got {:?})", key, raw)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AnalyticsConfig::default().validate().unwrap();
    }

    #[test]
    fn weights_must_sum_to_one() {
        let config = AnalyticsConfig {
            risk_weight_proximity: 0.5,
            risk_weight_volatility: 0.4,
            ..AnalyticsConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1"));
    }

    #[test]
    fn default_window_must_fit_the_cap() {
        let config = AnalyticsConfig {
            window_days: 400,
            max_window_days: 365,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn top_k_zero_is_rejected() {
        let config = AnalyticsConfig {
            top_k: 0,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_trend_thresholds_are_rejected() {
        let config = AnalyticsConfig {
            trend_up_threshold: -0.1,
            trend_down_threshold: 0.1,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn allowed_origins_include_production_url_when_set() {
        let config = Config {
            database_url: "postgres://localhost/test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_connections: 1,
            frontend_url: "http://localhost:3000".to_string(),
            production_url: Some("https://inventory.example.com".to_string()),
            cors_allow_any: false,
        };
        assert_eq!(
            config.allowed_origins(),
            vec!["http://localhost:3000", "https://inventory.example.com"]
        );
    }
}
