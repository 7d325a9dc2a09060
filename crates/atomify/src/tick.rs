//! # Tick Clock
//!
//! Fixed-cadence scheduling and timing statistics for the sync engine.
//!
//! ## Overruns
//!
//! Ticks never overlap. When a tick runs past the start of the next slot,
//! the next tick starts as soon as the late one finishes and is counted as
//! deferred; the schedule then continues from that point rather than
//! trying to catch up with a burst.
//!
//! ```text
//! slots:   |----c----|----c----|----c----|
//! ticks:   [t1]      [----t2-------][t3] [t4]
//!                                   ^ deferred, starts at t2's end
//! ```

use std::time::{Duration, Instant};

/// Longest cadence a clock will schedule; longer ones are clamped.
pub const MAX_CADENCE: Duration = Duration::from_secs(60 * 60);

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks that published a snapshot.
    pub completed_ticks: u64,
    /// Ticks that failed.
    pub failed_ticks: u64,
    /// Ticks that started late because the previous one overran.
    pub deferred_ticks: u64,
    /// Ticks that took longer than the cadence.
    pub late_ticks: u64,
    /// Shortest tick, microseconds (`u64::MAX` before the first tick).
    pub min_tick_us: u64,
    /// Longest tick, microseconds.
    pub max_tick_us: u64,
    /// Rolling average tick duration, microseconds.
    pub avg_tick_us: u64,
}

impl TickStats {
    fn empty(cadence: Duration) -> Self {
        Self {
            completed_ticks: 0,
            failed_ticks: 0,
            deferred_ticks: 0,
            late_ticks: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: duration_us(cadence),
        }
    }

    /// Ticks run, successful or not.
    #[inline]
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.completed_ticks + self.failed_ticks
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::empty(Duration::ZERO)
    }
}

fn duration_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// When the next tick should start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NextTick {
    /// Start time of the next tick.
    pub at: Instant,
    /// Set if the previous tick overran its slot.
    pub lag: Option<Duration>,
}

/// Tick counter, scheduler and statistics.
#[derive(Clone, Debug)]
pub struct TickClock {
    cadence: Duration,
    tick_count: u64,
    stats: TickStats,
}

impl TickClock {
    /// Creates a clock at `cadence`, clamped to [`MAX_CADENCE`].
    #[must_use]
    pub fn new(cadence: Duration) -> Self {
        let cadence = cadence.min(MAX_CADENCE);
        Self {
            cadence,
            tick_count: 0,
            stats: TickStats::empty(cadence),
        }
    }

    /// Target interval between tick starts.
    #[must_use]
    pub const fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Changes the cadence (clamped to [`MAX_CADENCE`]); statistics are kept.
    pub fn set_cadence(&mut self, cadence: Duration) {
        self.cadence = cadence.min(MAX_CADENCE);
    }

    /// Marks the start of a tick.
    ///
    /// # Returns
    ///
    /// The new tick number (starting at 1) and the start instant.
    pub fn begin_tick(&mut self) -> (u64, Instant) {
        self.tick_count += 1;
        (self.tick_count, Instant::now())
    }

    /// Marks the end of a tick and records its duration.
    pub fn end_tick(&mut self, start: Instant, succeeded: bool) -> Duration {
        let duration = start.elapsed();
        let us = duration_us(duration);

        if succeeded {
            self.stats.completed_ticks += 1;
        } else {
            self.stats.failed_ticks += 1;
        }
        self.stats.min_tick_us = self.stats.min_tick_us.min(us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(us);
        self.stats.avg_tick_us = (self.stats.avg_tick_us.saturating_mul(15).saturating_add(us)) / 16;
        if duration > self.cadence {
            self.stats.late_ticks += 1;
        }

        duration
    }

    /// Computes when the tick after the one that started at `started`
    /// should run, given that it finished at `now`.
    pub fn schedule(&mut self, started: Instant, now: Instant) -> NextTick {
        let slot = started + self.cadence;
        if now > slot {
            self.stats.deferred_ticks += 1;
            NextTick {
                at: now,
                lag: Some(now - slot),
            }
        } else {
            NextTick { at: slot, lag: None }
        }
    }

    /// Ticks begun so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Clears statistics; the tick counter keeps running.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::empty(self.cadence);
    }
}
