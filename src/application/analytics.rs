//! In-memory visit store and the statistics served to the dashboard.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use metrics::{counter, gauge};
use quaderno_api_types::{RecentVisitor, StatsResponse, TopPage, TrackRequest};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::domain::analytics::VisitRecord;

pub const DEFAULT_VISIT_CAPACITY: usize = 10_000;
pub const DEFAULT_TOP_PAGES: usize = 10;
pub const DEFAULT_RECENT_VISITORS: usize = 20;

pub const METRIC_VISITS_TRACKED: &str = "quaderno_visits_tracked_total";
pub const METRIC_VISITS_EVICTED: &str = "quaderno_visits_evicted_total";
pub const METRIC_VISIT_STORE_LEN: &str = "quaderno_visit_store_len";

const FALLBACK_TOP_PAGE: &str = "/";

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("visit store lock poisoned")]
    StorePoisoned,
}

/// Multiset of keys; a key disappears when its last occurrence is removed.
#[derive(Debug, Default)]
struct KeyCounts {
    counts: HashMap<String, usize>,
}

impl KeyCounts {
    fn add(&mut self, key: &str) {
        *self.counts.entry(key.to_string()).or_default() += 1;
    }

    fn remove(&mut self, key: &str) {
        if let Some(count) = self.counts.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(key);
            }
        }
    }

    fn distinct(&self) -> usize {
        self.counts.len()
    }
}

/// Bounded FIFO of visit records with a distinct-IP count that always
/// describes exactly the retained records.
#[derive(Debug)]
pub struct VisitStore {
    records: VecDeque<VisitRecord>,
    capacity: usize,
    ips: KeyCounts,
}

impl VisitStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_VISIT_CAPACITY)),
            capacity,
            ips: KeyCounts::default(),
        }
    }

    /// Append a record, returning the oldest one when capacity is exceeded.
    pub fn push(&mut self, record: VisitRecord) -> Option<VisitRecord> {
        self.ips.add(record.ip());
        self.records.push_back(record);

        if self.records.len() <= self.capacity {
            return None;
        }
        let evicted = self.records.pop_front()?;
        self.ips.remove(evicted.ip());
        Some(evicted)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn distinct_ips(&self) -> usize {
        self.ips.distinct()
    }

    /// Visitors are identified by IP.
    pub fn unique_visitors(&self) -> usize {
        self.distinct_ips()
    }

    /// Oldest first.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = &VisitRecord> {
        self.records.iter()
    }

    pub fn stats(&self, top_pages: usize, recent_visitors: usize) -> StatsResponse {
        // Insertion order of first appearance breaks count ties.
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for path in self.records.iter().filter_map(VisitRecord::path) {
            let count = counts.entry(path).or_insert_with(|| {
                order.push(path);
                0
            });
            *count += 1;
        }

        let mut ranked: Vec<TopPage> = order
            .into_iter()
            .map(|path| TopPage {
                path: path.to_string(),
                count: counts.get(path).copied().unwrap_or_default(),
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(top_pages);

        let recent = self
            .records
            .iter()
            .rev()
            .take(recent_visitors)
            .map(|record| RecentVisitor {
                ip: record.ip().to_string(),
                path: record.path().map(str::to_string),
                timestamp: record.timestamp(),
            })
            .collect();

        StatsResponse {
            total_views: self.records.len() as u64,
            distinct_ips: self.distinct_ips() as u64,
            unique_visitors: self.unique_visitors() as u64,
            top_page: ranked
                .first()
                .map(|page| page.path.clone())
                .unwrap_or_else(|| FALLBACK_TOP_PAGE.to_string()),
            top_pages: ranked,
            recent_visitors: recent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsLimits {
    pub capacity: usize,
    pub top_pages: usize,
    pub recent_visitors: usize,
}

impl Default for AnalyticsLimits {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_VISIT_CAPACITY,
            top_pages: DEFAULT_TOP_PAGES,
            recent_visitors: DEFAULT_RECENT_VISITORS,
        }
    }
}

/// Shared entry point for the tracking and stats handlers.
#[derive(Debug)]
pub struct AnalyticsService {
    store: Mutex<VisitStore>,
    limits: AnalyticsLimits,
}

impl AnalyticsService {
    pub fn new(limits: AnalyticsLimits) -> Self {
        Self {
            store: Mutex::new(VisitStore::new(limits.capacity)),
            limits,
        }
    }

    pub fn limits(&self) -> AnalyticsLimits {
        self.limits
    }

    pub fn track(
        &self,
        fields: TrackRequest,
        ip: &str,
        now: OffsetDateTime,
    ) -> Result<(), AnalyticsError> {
        let record = VisitRecord::new(fields, ip, now);
        let mut store = self.lock()?;
        let evicted = store.push(record);
        let len = store.len();
        drop(store);

        counter!(METRIC_VISITS_TRACKED).increment(1);
        gauge!(METRIC_VISIT_STORE_LEN).set(len as f64);
        if let Some(evicted) = evicted {
            counter!(METRIC_VISITS_EVICTED).increment(1);
            debug!(
                target = "quaderno::analytics",
                evicted_ip = evicted.ip(),
                evicted_at = %evicted.timestamp(),
                "Visit store at capacity; evicted oldest record"
            );
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<StatsResponse, AnalyticsError> {
        let store = self.lock()?;
        Ok(store.stats(self.limits.top_pages, self.limits.recent_visitors))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, VisitStore>, AnalyticsError> {
        self.store.lock().map_err(|_| {
            error!(
                target = "quaderno::analytics",
                "Visit store lock poisoned"
            );
            AnalyticsError::StorePoisoned
        })
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new(AnalyticsLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use time::{Duration, macros::datetime};

    fn fields(value: Value) -> TrackRequest {
        value.as_object().cloned().expect("object")
    }

    fn visit(path: &str, ip: &str, minute: i64) -> VisitRecord {
        VisitRecord::new(
            fields(json!({ "path": path })),
            ip,
            datetime!(2024-05-01 12:00 UTC) + Duration::minutes(minute),
        )
    }

    #[test]
    fn evicts_oldest_record_past_capacity() {
        let mut store = VisitStore::new(DEFAULT_VISIT_CAPACITY);
        for index in 0..=DEFAULT_VISIT_CAPACITY {
            let path = format!("/page/{index}");
            store.push(visit(&path, "198.51.100.1", index as i64));
        }

        assert_eq!(store.len(), DEFAULT_VISIT_CAPACITY);
        let paths: Vec<_> = store.records().filter_map(VisitRecord::path).collect();
        assert!(!paths.contains(&"/page/0"));
        assert_eq!(paths.first(), Some(&"/page/1"));
        assert_eq!(paths.last(), Some(&"/page/10000"));
    }

    #[test]
    fn distinct_ips_follow_the_retained_window() {
        let mut store = VisitStore::new(2);
        store.push(visit("/", "203.0.113.1", 0));
        store.push(visit("/", "203.0.113.2", 1));
        assert_eq!(store.distinct_ips(), 2);

        let evicted = store.push(visit("/", "203.0.113.2", 2)).expect("evicted");
        assert_eq!(evicted.ip(), "203.0.113.1");
        assert_eq!(store.distinct_ips(), 1);
        assert_eq!(store.unique_visitors(), 1);
    }

    #[test]
    fn unique_visitors_count_ips_not_client_ids() {
        let mut store = VisitStore::new(10);
        let now = datetime!(2024-05-01 12:00 UTC);
        store.push(VisitRecord::new(
            fields(json!({"path": "/", "visitorId": "visitor_1_a"})),
            "203.0.113.1",
            now,
        ));
        store.push(VisitRecord::new(
            fields(json!({"path": "/", "visitorId": "visitor_2_b"})),
            "203.0.113.1",
            now,
        ));
        store.push(VisitRecord::new(
            fields(json!({"path": "/"})),
            "203.0.113.2",
            now,
        ));

        assert_eq!(store.distinct_ips(), 2);
        assert_eq!(store.unique_visitors(), 2);
    }

    #[test]
    fn stats_rank_pages_with_stable_ties() {
        let mut store = VisitStore::new(100);
        store.push(visit("/b", "203.0.113.1", 0));
        store.push(visit("/a", "203.0.113.1", 1));
        store.push(visit("/c", "203.0.113.1", 2));
        store.push(visit("/c", "203.0.113.1", 3));
        store.push(VisitRecord::new(
            fields(json!({"path": 42})),
            "203.0.113.1",
            datetime!(2024-05-01 13:00 UTC),
        ));

        let stats = store.stats(DEFAULT_TOP_PAGES, DEFAULT_RECENT_VISITORS);
        assert_eq!(stats.total_views, 5);
        assert_eq!(stats.top_page, "/c");
        let ranked: Vec<_> = stats
            .top_pages
            .iter()
            .map(|page| (page.path.as_str(), page.count))
            .collect();
        assert_eq!(ranked, vec![("/c", 2), ("/b", 1), ("/a", 1)]);

        assert_eq!(stats.recent_visitors.len(), 5);
        assert_eq!(stats.recent_visitors[0].path, None);
        assert_eq!(stats.recent_visitors[1].path.as_deref(), Some("/c"));
    }

    #[test]
    fn stats_respect_limits() {
        let mut store = VisitStore::new(100);
        for index in 0..30 {
            store.push(visit(&format!("/p{index}"), "203.0.113.1", index));
        }

        let stats = store.stats(DEFAULT_TOP_PAGES, DEFAULT_RECENT_VISITORS);
        assert_eq!(stats.top_pages.len(), DEFAULT_TOP_PAGES);
        assert_eq!(stats.top_pages[0].path, "/p0");
        assert_eq!(stats.recent_visitors.len(), DEFAULT_RECENT_VISITORS);
        assert_eq!(stats.recent_visitors[0].path.as_deref(), Some("/p29"));
    }

    #[test]
    fn empty_store_falls_back_to_root_page() {
        let stats = VisitStore::new(10).stats(DEFAULT_TOP_PAGES, DEFAULT_RECENT_VISITORS);
        assert_eq!(stats.total_views, 0);
        assert_eq!(stats.top_page, "/");
        assert!(stats.top_pages.is_empty());
        assert!(stats.recent_visitors.is_empty());
    }

    #[test]
    fn service_tracks_with_server_fields() {
        let service = AnalyticsService::default();
        service
            .track(
                fields(json!({"path": "/notes", "ip": "spoofed"})),
                "192.0.2.7",
                datetime!(2024-05-01 12:00 UTC),
            )
            .expect("track");

        let stats = service.stats().expect("stats");
        assert_eq!(stats.recent_visitors[0].ip, "192.0.2.7");
        assert_eq!(stats.recent_visitors[0].timestamp, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn poisoned_store_is_reported() {
        let service = std::sync::Arc::new(AnalyticsService::default());
        let poisoner = std::sync::Arc::clone(&service);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.store.lock().expect("lock");
            panic!("poison the store");
        })
        .join();

        assert!(matches!(service.stats(), Err(AnalyticsError::StorePoisoned)));
        assert!(matches!(
            service.track(TrackRequest::new(), "192.0.2.7", datetime!(2024-05-01 12:00 UTC)),
            Err(AnalyticsError::StorePoisoned)
        ));
    }
}
