//! Timing accounting for modules and processing loops.

use std::collections::VecDeque;
use std::time::Duration;

/// Bounded history of durations with summary statistics.
///
/// Keeps the most recent `capacity` samples; older samples are dropped.
#[derive(Debug, Clone)]
pub struct TimingStats {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl TimingStats {
    /// Number of samples kept by [`Default`].
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Creates an empty history holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Records a sample, evicting the oldest one when full.
    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    /// Largest sample held.
    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }

    /// Mean of the samples held.
    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        self.samples.iter().copied()
    }
}

impl Default for TimingStats {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = TimingStats::default();
        assert!(stats.is_empty());
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.last(), None);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut stats = TimingStats::new(3);
        for ms in [10, 20, 30, 40] {
            stats.push(Duration::from_millis(ms));
        }
        assert_eq!(stats.len(), 3);
        assert_eq!(
            stats.iter().collect::<Vec<_>>(),
            vec![
                Duration::from_millis(20),
                Duration::from_millis(30),
                Duration::from_millis(40)
            ]
        );
        assert_eq!(stats.mean(), Some(Duration::from_millis(30)));
        assert_eq!(stats.max(), Some(Duration::from_millis(40)));
    }
}
