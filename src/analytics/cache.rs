use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::report::{ReportKind, ReportPayload};
use super::usage::ReportWindow;

/// Successful reports kept in memory per window for a bounded time.
/// Failed reports are never stored.
#[derive(Debug)]
pub struct ReportCache {
    ttl: Duration,
    entries: HashMap<(ReportWindow, ReportKind), (Instant, ReportPayload)>,
}

impl ReportCache {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, window: &ReportWindow, kind: ReportKind) -> Option<ReportPayload> {
        self.get_at(window, kind, Instant::now())
    }

    fn get_at(&self, window: &ReportWindow, kind: ReportKind, now: Instant) -> Option<ReportPayload> {
        let (stored_at, payload) = self.entries.get(&(*window, kind))?;
        (now.duration_since(*stored_at) < self.ttl).then(|| payload.clone())
    }

    /// Stores `payload`, dropping whatever has expired first.
    pub fn put(&mut self, window: ReportWindow, payload: ReportPayload) {
        self.put_at(window, payload, Instant::now());
    }

    fn put_at(&mut self, window: ReportWindow, payload: ReportPayload, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        self.evict_expired_at(now);
        self.entries.insert((window, payload.kind()), (now, payload));
    }

    /// Drops expired entries.
    pub fn evict_expired(&mut self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    fn evict_expired_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, (stored_at, _)| now.saturating_duration_since(*stored_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::report::UsagePatternsReport;
    use crate::analytics::usage::Granularity;
    use chrono::NaiveDate;

    fn window() -> ReportWindow {
        ReportWindow::ending(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(), 30, Granularity::Day)
    }

    fn payload() -> ReportPayload {
        ReportPayload::UsagePatterns(UsagePatternsReport {
            monthly_usage: vec![],
            trends: vec![],
        })
    }

    #[test]
    fn fresh_entry_is_returned() {
        let mut cache = ReportCache::new(Duration::from_secs(60));
        cache.put(window(), payload());
        assert_eq!(cache.get(&window(), ReportKind::UsagePatterns), Some(payload()));
        assert_eq!(cache.get(&window(), ReportKind::CostAnalysis), None);
    }

    #[test]
    fn expired_entry_is_ignored() {
        let mut cache = ReportCache::new(Duration::from_secs(60));
        cache.put(window(), payload());
        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(cache.get_at(&window(), ReportKind::UsagePatterns, later), None);
    }

    #[test]
    fn different_window_misses() {
        let mut cache = ReportCache::new(Duration::from_secs(60));
        cache.put(window(), payload());
        let mut other = window();
        other.granularity = Granularity::Month;
        assert_eq!(cache.get(&other, ReportKind::UsagePatterns), None);
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let mut cache = ReportCache::new(Duration::ZERO);
        cache.put(window(), payload());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn put_drops_expired_entries() {
        let mut cache = ReportCache::new(Duration::from_secs(60));
        let start = Instant::now();
        for offset in 0..100 {
            let w = ReportWindow::ending(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset),
                30,
                Granularity::Day,
            );
            cache.put_at(w, payload(), start);
        }
        assert_eq!(cache.len(), 100);

        cache.put_at(window(), payload(), start + Duration::from_secs(61));
        assert_eq!(cache.len(), 1, "Only the fresh entry survives");
        assert!(cache.get_at(&window(), ReportKind::UsagePatterns, start + Duration::from_secs(62)).is_some());
    }

    #[test]
    fn evict_expired_keeps_fresh_entries() {
        let mut cache = ReportCache::new(Duration::from_secs(60));
        cache.put(window(), payload());
        assert_eq!(cache.evict_expired(), 0);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
