//! Time spent in a tutorial detail view.
//!
//! The tracker is driven by explicit `Instant`s so it can be ticked by a real
//! interval or by tests. Seconds leave the tracker in [`Flush`]es; the caller
//! sends them and reports back with [`TimeTracker::acknowledge`] or
//! [`TimeTracker::fail`].
//!
//! `confirmed_secs` is the watermark: it only moves when the backend has
//! acknowledged a flush. A failed flush is not re-sent; its seconds stay in
//! the displayed total but never reach the watermark.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// A window is flushed once it has been open this long.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Seconds handed to the backend in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flush {
    pub id: u64,
    pub secs: u64,
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub display_secs: u64,
    pub flush: Option<Flush>,
}

#[derive(Debug, Clone)]
pub struct TimeTracker {
    confirmed_secs: u64,
    in_flight: BTreeMap<u64, u64>,
    dropped_secs: u64,
    window_start: Instant,
    next_flush_id: u64,
    flush_interval: Duration,
}

impl TimeTracker {
    /// Start tracking at `now`, on top of `confirmed_secs` already stored by
    /// the backend.
    #[must_use]
    pub fn new(confirmed_secs: u64, now: Instant) -> Self {
        Self {
            confirmed_secs,
            in_flight: BTreeMap::new(),
            dropped_secs: 0,
            window_start: now,
            next_flush_id: 1,
            flush_interval: FLUSH_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval.max(Duration::from_secs(1));
        self
    }

    /// Seconds the backend has acknowledged.
    #[must_use]
    pub fn confirmed_secs(&self) -> u64 {
        self.confirmed_secs
    }

    /// Seconds handed out but not yet acknowledged or failed.
    #[must_use]
    pub fn in_flight_secs(&self) -> u64 {
        self.in_flight.values().sum()
    }

    /// Seconds whose flush failed. They are not retried.
    #[must_use]
    pub fn dropped_secs(&self) -> u64 {
        self.dropped_secs
    }

    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Whole seconds in the current unflushed window.
    #[must_use]
    pub fn window_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.window_start).as_secs()
    }

    /// Total shown to the learner. Never goes down on a failed flush.
    #[must_use]
    pub fn display_secs(&self, now: Instant) -> u64 {
        self.confirmed_secs + self.in_flight_secs() + self.dropped_secs + self.window_secs(now)
    }

    /// Advance the tracker. Issues a flush when the window reached the flush
    /// interval; the window restarts at `now` as soon as the flush is issued.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let window = now.saturating_duration_since(self.window_start);
        let flush = if window >= self.flush_interval {
            Some(self.issue(window.as_secs(), now))
        } else {
            None
        };
        Tick {
            display_secs: self.display_secs(now),
            flush,
        }
    }

    /// Close the session. Flushes whatever is left in the window, however
    /// short; returns `None` when there is nothing to send.
    pub fn finish(&mut self, now: Instant) -> Option<Flush> {
        let secs = self.window_secs(now);
        if secs == 0 {
            self.window_start = now;
            return None;
        }
        Some(self.issue(secs, now))
    }

    /// The backend stored the flush: move its seconds to the watermark.
    /// Unknown or already settled ids are ignored.
    pub fn acknowledge(&mut self, flush_id: u64) {
        if let Some(secs) = self.in_flight.remove(&flush_id) {
            self.confirmed_secs += secs;
        }
    }

    /// The flush did not reach the backend. Its seconds are dropped from the
    /// watermark path but stay in the displayed total.
    pub fn fail(&mut self, flush_id: u64) {
        if let Some(secs) = self.in_flight.remove(&flush_id) {
            self.dropped_secs += secs;
        }
    }

    fn issue(&mut self, secs: u64, now: Instant) -> Flush {
        // Keep the sub-second remainder in the next window.
        let whole = Duration::from_secs(secs);
        self.window_start = (self.window_start + whole).min(now);
        let id = self.next_flush_id;
        self.next_flush_id += 1;
        self.in_flight.insert(id, secs);
        Flush { id, secs }
    }
}
