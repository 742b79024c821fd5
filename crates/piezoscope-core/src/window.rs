//! Per-sensor sliding window storage.
//!
//! Buffers keep samples in arrival order. Every append prunes samples older
//! than the retention window, so memory stays bounded without a background
//! sweep even when nobody reads.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

use crate::sample::{Sample, SensorKey};

/// Time-bounded sample buffers keyed by sensor.
#[derive(Debug)]
pub struct SensorWindowStore {
    windows: RwLock<HashMap<SensorKey, VecDeque<Sample>>>,
    retention_ms: i64,
}

impl SensorWindowStore {
    /// Create a store retaining samples for `retention_ms` (W).
    pub fn new(retention_ms: i64) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            retention_ms: retention_ms.max(0),
        }
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }

    /// Append `samples` after the existing buffer for `key`, then prune.
    ///
    /// Samples are not re-sorted; an empty `samples` still prunes.
    pub fn append(&self, key: &SensorKey, samples: impl IntoIterator<Item = Sample>, now: i64) {
        let mut windows = self.windows.write();
        let buffer = windows.entry(key.clone()).or_default();
        buffer.extend(samples);
        prune(buffer, now, self.retention_ms);
    }

    /// Append several keys under one write lock.
    ///
    /// Readers see either none or all of the keys of one batch updated.
    pub fn append_batch(&self, entries: impl IntoIterator<Item = (SensorKey, Vec<Sample>)>, now: i64) {
        let mut windows = self.windows.write();
        for (key, samples) in entries {
            let buffer = windows.entry(key).or_default();
            buffer.extend(samples);
            prune(buffer, now, self.retention_ms);
        }
    }

    /// Samples of `key` with `time` in `[now - W, now]`, in buffer order.
    ///
    /// Never mutates the buffer; an unknown key yields an empty vector.
    pub fn snapshot(&self, key: &SensorKey, now: i64) -> Vec<Sample> {
        let windows = self.windows.read();
        let Some(buffer) = windows.get(key) else {
            return Vec::new();
        };
        let min_time = now.saturating_sub(self.retention_ms);
        buffer
            .iter()
            .filter(|sample| sample.time >= min_time && sample.time <= now)
            .copied()
            .collect()
    }

    /// Every physically stored sample of `key`, including ones a snapshot
    /// would hide, in buffer order.
    pub fn buffered(&self, key: &SensorKey) -> Vec<Sample> {
        self.windows
            .read()
            .get(key)
            .map(|buffer| buffer.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of physically stored samples for `key`, expired ones included.
    pub fn stored_len(&self, key: &SensorKey) -> usize {
        self.windows.read().get(key).map_or(0, VecDeque::len)
    }

    /// Total physically stored samples across all keys.
    pub fn total_len(&self) -> usize {
        self.windows.read().values().map(VecDeque::len).sum()
    }

    /// Keys that have received at least one append, sorted.
    pub fn keys(&self) -> Vec<SensorKey> {
        let mut keys: Vec<SensorKey> = self.windows.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

impl Default for SensorWindowStore {
    fn default() -> Self {
        Self::new(crate::DEFAULT_WINDOW_MS)
    }
}

fn prune(buffer: &mut VecDeque<Sample>, now: i64, retention_ms: i64) {
    buffer.retain(|sample| sample.age_ms(now) <= retention_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: i64 = 20_000;

    fn key(name: &str) -> SensorKey {
        SensorKey::from(name)
    }

    #[test]
    fn test_append_and_snapshot() {
        let store = SensorWindowStore::new(W);
        let k = key("Sensor1");

        store.append(&k, [Sample::new(1_000, 1.0), Sample::new(1_010, 2.0)], 1_010);

        assert_eq!(store.snapshot(&k, 1_010), vec![Sample::new(1_000, 1.0), Sample::new(1_010, 2.0)]);
    }

    #[test]
    fn test_unknown_key_is_empty() {
        let store = SensorWindowStore::new(W);
        assert!(store.snapshot(&key("nope"), 0).is_empty());
        assert_eq!(store.stored_len(&key("nope")), 0);
    }

    #[test]
    fn test_append_prunes_expired() {
        let store = SensorWindowStore::new(W);
        let k = key("Sensor1");

        store.append(&k, [Sample::new(0, 1.0)], 0);
        store.append(&k, [Sample::new(W + 1, 2.0)], W + 1);

        assert_eq!(store.stored_len(&k), 1);
        assert_eq!(store.snapshot(&k, W + 1), vec![Sample::new(W + 1, 2.0)]);
    }

    #[test]
    fn test_sample_exactly_w_old_is_kept() {
        let store = SensorWindowStore::new(W);
        let k = key("Sensor1");

        store.append(&k, [Sample::new(0, 1.0)], W);
        assert_eq!(store.stored_len(&k), 1);
        assert_eq!(store.snapshot(&k, W).len(), 1);
    }

    #[test]
    fn test_empty_append_physically_prunes() {
        let store = SensorWindowStore::new(W);
        let k = key("Sensor1");
        let now = 5_000;

        store.append(&k, [Sample::new(now, 1.0)], now);
        let later = now + W + 1;

        assert!(store.snapshot(&k, later).is_empty());
        assert_eq!(store.stored_len(&k), 1, "snapshot must not mutate");

        store.append(&k, Vec::new(), later);
        assert_eq!(store.stored_len(&k), 0);
    }

    #[test]
    fn test_out_of_order_samples_keep_arrival_order() {
        let store = SensorWindowStore::new(W);
        let k = key("Sensor1");

        store.append(&k, [Sample::new(200, 2.0), Sample::new(100, 1.0)], 300);

        let times: Vec<i64> = store.snapshot(&k, 300).iter().map(|s| s.time).collect();
        assert_eq!(times, vec![200, 100]);
    }

    #[test]
    fn test_stale_sample_behind_fresh_one_is_pruned() {
        let store = SensorWindowStore::new(W);
        let k = key("Sensor1");
        let now = 100_000;

        store.append(&k, [Sample::new(now, 1.0), Sample::new(now - W - 5, 0.5)], now);
        assert_eq!(store.stored_len(&k), 1);
    }

    #[test]
    fn test_future_samples_retained_but_not_displayed() {
        let store = SensorWindowStore::new(W);
        let k = key("Sensor1");

        store.append(&k, [Sample::new(2_000, 1.0)], 1_000);
        assert_eq!(store.stored_len(&k), 1);
        assert!(store.snapshot(&k, 1_000).is_empty());
        assert_eq!(store.snapshot(&k, 2_000).len(), 1);
    }

    #[test]
    fn test_append_batch_updates_all_keys() {
        let store = SensorWindowStore::new(W);
        store.append_batch(
            vec![
                (key("A"), vec![Sample::new(10, 1.0)]),
                (key("B"), vec![Sample::new(10, 2.0), Sample::new(11, 3.0)]),
            ],
            11,
        );

        assert_eq!(store.keys(), vec![key("A"), key("B")]);
        assert_eq!(store.total_len(), 3);
    }

    #[test]
    fn test_default_uses_default_window() {
        let store = SensorWindowStore::default();
        assert_eq!(store.total_len(), 0);
        assert_eq!(store.retention_ms(), crate::DEFAULT_WINDOW_MS);
    }
}
