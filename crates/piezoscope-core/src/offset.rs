//! Clock offset estimation between remote device clocks and the local clock.
//!
//! Each estimator keeps the last N `remote - local` differences in a FIFO
//! together with their running sum, so `observe` is O(1) and the average is
//! always the mean of at most N admitted samples.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

/// Bounded running-average estimator of `remote - local` in milliseconds.
#[derive(Debug, Clone)]
pub struct ClockOffsetEstimator {
    samples: VecDeque<i64>,
    capacity: usize,
    sum: i128,
}

impl ClockOffsetEstimator {
    /// Create an estimator averaging over at most `capacity` samples.
    ///
    /// A capacity of zero is treated as one. Storage grows on demand, so a
    /// large capacity costs nothing until samples arrive.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(crate::DEFAULT_OFFSET_SAMPLES)),
            capacity,
            sum: 0,
        }
    }

    /// Admit one offset sample derived from a remote/local timestamp pair.
    pub fn observe(&mut self, remote_ms: i64, local_ms: i64) {
        self.push(remote_ms.saturating_sub(local_ms));
    }

    /// Admit a precomputed `remote - local` offset.
    pub fn push(&mut self, offset_ms: i64) {
        if self.samples.len() == self.capacity {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= i128::from(old);
            }
        }

        self.samples.push_back(offset_ms);
        self.sum += i128::from(offset_ms);
    }

    /// Current mean offset; zero until the first observation.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.sum as f64 / self.samples.len() as f64
    }

    /// Translate a remote timestamp into the local time base.
    pub fn correct(&self, remote_ms: i64) -> i64 {
        let corrected = (remote_ms as f64 - self.average()).round();
        if corrected.is_finite() {
            corrected as i64
        } else {
            remote_ms
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// How topics share clock offset estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetScope {
    /// One estimator for every topic (all devices assumed to share a clock).
    #[default]
    Global,
    /// One estimator per topic.
    PerTopic,
}

const GLOBAL_GROUP: &str = "*";

/// Owns the estimators for every clock group.
#[derive(Debug, Clone)]
pub struct OffsetRegistry {
    scope: OffsetScope,
    capacity: usize,
    estimators: HashMap<String, ClockOffsetEstimator>,
}

impl OffsetRegistry {
    pub fn new(scope: OffsetScope, capacity: usize) -> Self {
        Self {
            scope,
            capacity,
            estimators: HashMap::new(),
        }
    }

    pub fn scope(&self) -> OffsetScope {
        self.scope
    }

    fn group<'a>(&self, topic: &'a str) -> &'a str {
        match self.scope {
            OffsetScope::Global => GLOBAL_GROUP,
            OffsetScope::PerTopic => topic,
        }
    }

    /// Estimator responsible for `topic`, created on first use.
    pub fn estimator_mut(&mut self, topic: &str) -> &mut ClockOffsetEstimator {
        let group = self.group(topic);
        let capacity = self.capacity;
        self.estimators
            .entry(group.to_string())
            .or_insert_with(|| ClockOffsetEstimator::new(capacity))
    }

    pub fn estimator(&self, topic: &str) -> Option<&ClockOffsetEstimator> {
        self.estimators.get(self.group(topic))
    }

    /// Current offset applied to `topic`, zero if nothing was observed yet.
    pub fn offset_ms(&self, topic: &str) -> f64 {
        self.estimator(topic)
            .map(ClockOffsetEstimator::average)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_before_capacity() {
        let mut est = ClockOffsetEstimator::new(3);

        est.push(1);
        assert!((est.average() - 1.0).abs() < 1e-9);

        est.push(2);
        est.push(3);
        assert!((est.average() - 2.0).abs() < 1e-9);

        est.push(4);
        assert!((est.average() - 3.0).abs() < 1e-9);
        assert_eq!(est.len(), 3);
    }

    #[test]
    fn test_twenty_five_observations_keep_last_twenty() {
        let mut est = ClockOffsetEstimator::new(20);
        for offset in 1..=25 {
            est.push(offset);
        }
        assert!((est.average() - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_correct_without_observations_is_identity() {
        let est = ClockOffsetEstimator::new(20);
        assert_eq!(est.correct(1_700_000_000_123), 1_700_000_000_123);
    }

    #[test]
    fn test_observe_negative_offset() {
        let mut est = ClockOffsetEstimator::new(20);
        let t = 1_700_000_000_000;
        est.observe(t, t + 50);
        assert!((est.average() + 50.0).abs() < 1e-9);
        assert_eq!(est.correct(t), t + 50);
    }

    #[test]
    fn test_correct_rounds_fractional_average() {
        let mut est = ClockOffsetEstimator::new(2);
        est.push(1);
        est.push(2);
        // 1.5 average: 100 - 1.5 = 98.5 rounds away from zero
        assert_eq!(est.correct(100), 99);
    }

    #[test]
    fn test_huge_capacity_does_not_reserve_up_front() {
        let mut est = ClockOffsetEstimator::new(usize::MAX);
        est.observe(1_000, 1_050);
        est.observe(2_000, 2_030);
        assert_eq!(est.capacity(), usize::MAX);
        assert_eq!(est.len(), 2);
        assert!((est.average() + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_capacity_treated_as_one() {
        let mut est = ClockOffsetEstimator::new(0);
        est.push(7);
        est.push(9);
        assert_eq!(est.capacity(), 1);
        assert!((est.average() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_registry_global_scope_shares_estimator() {
        let mut registry = OffsetRegistry::new(OffsetScope::Global, 20);
        registry.estimator_mut("dev/a").push(100);
        assert!((registry.offset_ms("dev/b") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_registry_per_topic_scope_isolates_estimators() {
        let mut registry = OffsetRegistry::new(OffsetScope::PerTopic, 20);
        registry.estimator_mut("dev/a").push(100);
        registry.estimator_mut("dev/b").push(-40);
        assert!((registry.offset_ms("dev/a") - 100.0).abs() < 1e-9);
        assert!((registry.offset_ms("dev/b") + 40.0).abs() < 1e-9);
        assert!(registry.offset_ms("dev/c").abs() < 1e-9);
    }
}
