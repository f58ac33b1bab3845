use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;

use super::InventorySource;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{Part, UsageRecord};

/// In-memory source for tests. Can fail its first N calls.
#[derive(Debug, Default)]
pub struct MemorySource {
    parts: Vec<Part>,
    usage: Vec<UsageRecord>,
    fail_first: usize,
    calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(parts: Vec<Part>, usage: Vec<UsageRecord>) -> Self {
        Self {
            parts,
            usage,
            ..Self::default()
        }
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> AnalyticsResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(AnalyticsError::DataUnavailable(format!(
                "simulated outage (call {})",
                call + 1
            )));
        }
        Ok(())
    }
}

impl InventorySource for MemorySource {
    async fn fetch_parts(&self) -> AnalyticsResult<Vec<Part>> {
        self.check()?;
        Ok(self.parts.clone())
    }

    async fn fetch_usage(
        &self,
        part_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> AnalyticsResult<Vec<UsageRecord>> {
        self.check()?;
        Ok(self
            .usage
            .iter()
            .filter(|r| part_ids.contains(&r.part_id))
            .filter(|r| r.usage_date >= start && r.usage_date <= end)
            .cloned()
            .collect())
    }
}
