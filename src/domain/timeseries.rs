//! Sliding window of mid-price samples with age-based eviction.

use crate::domain::tick::Sample;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    samples: VecDeque<Sample>,
    window_seconds: f64,
}

impl TimeSeriesBuffer {
    pub fn new(window_seconds: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            window_seconds,
        }
    }

    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Replace contents with `samples` sorted by timestamp. Equal
    /// timestamps keep their input order.
    pub fn seed(&mut self, mut samples: Vec<Sample>) {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.samples = samples.into();
    }

    /// Push the newest sample. Arrival order is the caller's job.
    pub fn append(&mut self, sample: Sample) {
        debug_assert!(
            self.samples
                .back()
                .is_none_or(|last| last.timestamp <= sample.timestamp),
            "samples must arrive in timestamp order"
        );
        self.samples.push_back(sample);
    }

    /// Drop samples with `timestamp < cutoff` from the front. Returns how
    /// many were removed.
    pub fn evict_older_than(&mut self, cutoff: f64) -> usize {
        let mut evicted = 0;
        while self.samples.front().is_some_and(|s| s.timestamp < cutoff) {
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Evict everything older than one window before `now`.
    pub fn evict_expired(&mut self, now: f64) -> usize {
        self.evict_older_than(now - self.window_seconds)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// newest.timestamp - oldest.timestamp, zero when fewer than two samples.
    pub fn span(&self) -> f64 {
        match (self.oldest(), self.newest()) {
            (Some(a), Some(b)) => b.timestamp - a.timestamp,
            _ => 0.0,
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> {
        self.samples.iter()
    }

    /// The last `n` samples, oldest first.
    pub fn recent(&self, n: usize) -> impl DoubleEndedIterator<Item = &Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip)
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(timestamp: f64, value: f64) -> Sample {
        Sample { timestamp, value }
    }

    #[test]
    fn seed_sorts_by_timestamp() {
        let mut buf = TimeSeriesBuffer::new(1800.0);
        buf.seed(vec![sample(3.0, 30.0), sample(1.0, 10.0), sample(2.0, 20.0)]);
        let ts: Vec<f64> = buf.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn seed_with_nothing_leaves_buffer_empty() {
        let mut buf = TimeSeriesBuffer::new(1800.0);
        buf.append(sample(1.0, 1.0));
        buf.seed(Vec::new());
        assert!(buf.is_empty());
        assert_eq!(buf.span(), 0.0);
    }

    #[test]
    fn duplicate_timestamps_are_kept() {
        let mut buf = TimeSeriesBuffer::new(1800.0);
        buf.append(sample(5.0, 1.0));
        buf.append(sample(5.0, 2.0));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn evict_removes_only_older_samples() {
        let mut buf = TimeSeriesBuffer::new(1800.0);
        for t in 0..10 {
            buf.append(sample(t as f64, t as f64));
        }
        let removed = buf.evict_older_than(4.0);
        assert_eq!(removed, 4);
        assert_eq!(buf.oldest().unwrap().timestamp, 4.0);
        assert_eq!(buf.newest().unwrap().timestamp, 9.0);
    }

    #[test]
    fn evict_expired_uses_window() {
        let mut buf = TimeSeriesBuffer::new(60.0);
        for t in 0..=120 {
            buf.append(sample(t as f64, 1.0));
        }
        buf.evict_expired(120.0);
        assert_eq!(buf.oldest().unwrap().timestamp, 60.0);
        assert_eq!(buf.span(), 60.0);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut buf = TimeSeriesBuffer::new(1800.0);
        for t in 0..5 {
            buf.append(sample(t as f64, t as f64 * 10.0));
        }
        let tail: Vec<f64> = buf.recent(2).map(|s| s.value).collect();
        assert_eq!(tail, vec![30.0, 40.0]);
        assert_eq!(buf.recent(100).count(), 5);
    }

    proptest! {
        #[test]
        fn eviction_leaves_nothing_below_cutoff(
            mut stamps in prop::collection::vec(0.0f64..10_000.0, 0..200),
            cutoff in 0.0f64..10_000.0,
        ) {
            stamps.sort_by(|a, b| a.total_cmp(b));
            let mut buf = TimeSeriesBuffer::new(1800.0);
            for t in &stamps {
                buf.append(sample(*t, 1.0));
            }
            buf.evict_older_than(cutoff);
            prop_assert!(buf.iter().all(|s| s.timestamp >= cutoff));
            let expected = stamps.iter().filter(|t| **t >= cutoff).count();
            prop_assert_eq!(buf.len(), expected);
        }

        #[test]
        fn window_span_stays_bounded(
            gaps in prop::collection::vec(0.01f64..0.5, 1..2000),
        ) {
            let window = 30.0;
            let poll = 0.5;
            let mut buf = TimeSeriesBuffer::new(window);
            let mut now = 0.0;
            for gap in gaps {
                now += gap;
                buf.append(sample(now, 1.0));
                buf.evict_expired(now);
                prop_assert!(buf.span() <= window + poll);
            }
        }
    }
}
