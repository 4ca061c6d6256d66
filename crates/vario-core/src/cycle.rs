//! Per-tick processing context.
//!
//! A [`Cycle`] is created by the processing loop once per tick and handed to
//! every fetch and `process` call made during that tick. It freezes the notion
//! of "now" for the whole tick: every module sees the same number, time and
//! time delta, no matter how deep in the pull chain it runs.

use core::time::Duration;

/// Immutable context of a single processing tick.
///
/// Cycle numbers are strictly increasing within one processing loop and start
/// at 1, so `0` can be used as "never" by per-cycle memos.
#[derive(Debug, Clone)]
pub struct Cycle {
    number: u64,
    update_time: Duration,
    update_dt: Duration,
    intended_update_dt: Duration,
    logger: tracing::Span,
}

impl Cycle {
    /// Creates a cycle record.
    ///
    /// `update_time` is measured from the start of the processing loop,
    /// `update_dt` is the measured time since the previous cycle and
    /// `intended_update_dt` is the loop period.
    pub fn new(
        number: u64,
        update_time: Duration,
        update_dt: Duration,
        intended_update_dt: Duration,
    ) -> Self {
        Self {
            number,
            update_time,
            update_dt,
            intended_update_dt,
            logger: tracing::debug_span!("cycle", number),
        }
    }

    /// Returns the cycle that follows this one after `dt`.
    ///
    /// Handy for driving a graph by hand in tests and tools; the processing
    /// loop builds its cycles from the wall clock instead.
    pub fn next(&self, dt: Duration) -> Self {
        Self::new(
            self.number + 1,
            self.update_time + dt,
            dt,
            self.intended_update_dt,
        )
    }

    /// Sequential cycle number.
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Time of this cycle, relative to the start of the loop.
    #[inline]
    pub fn update_time(&self) -> Duration {
        self.update_time
    }

    /// Measured time since the previous cycle.
    #[inline]
    pub fn update_dt(&self) -> Duration {
        self.update_dt
    }

    /// The loop period this cycle was scheduled with.
    #[inline]
    pub fn intended_update_dt(&self) -> Duration {
        self.intended_update_dt
    }

    /// Span scoping all log records emitted while this cycle runs.
    #[inline]
    pub fn logger(&self) -> &tracing::Span {
        &self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_advances_number_and_time() {
        let first = Cycle::new(1, Duration::ZERO, Duration::from_secs(1), Duration::from_secs(1));
        let second = first.next(Duration::from_millis(250));

        assert_eq!(second.number(), 2);
        assert_eq!(second.update_time(), Duration::from_millis(250));
        assert_eq!(second.update_dt(), Duration::from_millis(250));
        assert_eq!(second.intended_update_dt(), Duration::from_secs(1));
    }
}
