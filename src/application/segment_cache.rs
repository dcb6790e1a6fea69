// Level-indexed cache of historical aggregate segments
use crate::application::history_repository::HistoryError;
use crate::domain::segment::{segment_indices, SegmentKey, SegmentLevels};
use crate::domain::telemetry::AggregateBucket;
use crate::domain::viewport::Viewport;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_STALENESS_MS: f64 = 5000.0;

#[derive(Debug, Clone)]
pub struct SegmentCacheEntry {
    pub buckets: Vec<AggregateBucket>,
    pub fetched_at_ms: f64,
    /// The last fetch for this key failed.
    pub failed: bool,
}

/// Historical buckets covering an interval at one level.
#[derive(Debug)]
pub struct CoveredBuckets<'a> {
    pub level: i32,
    pub buckets: Vec<&'a AggregateBucket>,
}

/// Entries are never evicted. Failed fetches still leave an entry behind and
/// are retried once it is stale, in any mode.
#[derive(Debug)]
pub struct SegmentCache {
    levels: SegmentLevels,
    entries: HashMap<SegmentKey, SegmentCacheEntry>,
    in_flight: HashSet<SegmentKey>,
    staleness_ms: f64,
    check_for_new_data: bool,
}

impl SegmentCache {
    pub fn new(levels: SegmentLevels, staleness_ms: f64) -> Self {
        Self {
            levels,
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            staleness_ms,
            check_for_new_data: false,
        }
    }

    pub fn levels(&self) -> &SegmentLevels {
        &self.levels
    }

    pub fn set_check_for_new_data(&mut self, enabled: bool) {
        self.check_for_new_data = enabled;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &SegmentKey) -> Option<&SegmentCacheEntry> {
        self.entries.get(key)
    }

    pub fn covering_keys(&self, series_code: &str, interval: &Viewport) -> Vec<SegmentKey> {
        let level = self.levels.level_for(interval);
        segment_indices(level, interval)
            .map(|index| SegmentKey::new(series_code, level, index))
            .collect()
    }

    /// Keys that must be requested now to cover `interval`. The returned
    /// keys are marked in flight until `store` is called for them.
    pub fn plan_fetches(
        &mut self,
        series_code: &str,
        interval: &Viewport,
        now_ms: f64,
    ) -> Vec<SegmentKey> {
        let wanted: Vec<SegmentKey> = self
            .covering_keys(series_code, interval)
            .into_iter()
            .filter(|key| self.needs_fetch(key, now_ms))
            .collect();

        for key in &wanted {
            tracing::debug!(
                "Requesting segment {}/{}/{}",
                key.series_code,
                key.level,
                key.index
            );
            self.in_flight.insert(key.clone());
        }
        wanted
    }

    fn needs_fetch(&self, key: &SegmentKey, now_ms: f64) -> bool {
        if self.in_flight.contains(key) {
            return false;
        }
        match self.get(key) {
            None => true,
            Some(entry) => {
                (entry.failed || self.check_for_new_data)
                    && now_ms - entry.fetched_at_ms > self.staleness_ms
            }
        }
    }

    /// Record a fetch outcome. Returns true when the cached data changed.
    pub fn store(
        &mut self,
        key: SegmentKey,
        result: Result<Vec<AggregateBucket>, HistoryError>,
        now_ms: f64,
    ) -> bool {
        self.in_flight.remove(&key);
        match result {
            Ok(buckets) => {
                self.entries.insert(
                    key,
                    SegmentCacheEntry {
                        buckets,
                        fetched_at_ms: now_ms,
                        failed: false,
                    },
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Segment fetch {}/{}/{} failed: {}",
                    key.series_code,
                    key.level,
                    key.index,
                    e
                );
                self.entries
                    .entry(key)
                    .and_modify(|entry| {
                        entry.fetched_at_ms = now_ms;
                        entry.failed = true;
                    })
                    .or_insert(SegmentCacheEntry {
                        buckets: Vec::new(),
                        fetched_at_ms: now_ms,
                        failed: true,
                    });
                false
            }
        }
    }

    /// Cached buckets of every segment covering `interval`, ascending by time.
    pub fn buckets(&self, series_code: &str, interval: &Viewport) -> CoveredBuckets<'_> {
        let level = self.levels.level_for(interval);
        let buckets = segment_indices(level, interval)
            .filter_map(|index| self.entries.get(&SegmentKey::new(series_code, level, index)))
            .flat_map(|entry| entry.buckets.iter())
            .collect();
        CoveredBuckets { level, buckets }
    }
}
