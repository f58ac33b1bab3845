//! Inventory analytics engine.
//!
//! Data flows one way: usage records are aggregated into per-part series,
//! which feed trend classification and risk estimation, which in turn feed
//! reorder recommendations and cost analysis. [`facade::AnalyticsEngine`]
//! runs the three reports over one snapshot with per-report isolation.

pub mod cache;
pub mod compute;
pub mod cost;
pub mod facade;
pub mod reorder;
pub mod report;
pub mod risk;
pub mod trend;
pub mod usage;

pub use cache::ReportCache;
pub use facade::AnalyticsEngine;
pub use report::{Dashboard, ReportKind, ReportPayload};
pub use usage::{Granularity, ReportWindow};
