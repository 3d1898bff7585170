//! Time sources for stamping new events.
//!
//! The clock is read once per command, when events are built. Nothing on
//! the apply path reads it; projections take their timestamps from the
//! event envelope.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

/// Supplies the timestamp stamped on new events.
pub trait Clock: Send + Sync + core::fmt::Debug {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time at microsecond precision, the finest the durable log
/// stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// A clock that starts at a fixed instant and advances by a fixed step on
/// every read, so consecutive events get distinct, predictable times.
#[derive(Debug)]
pub struct ManualClock {
    start: DateTime<Utc>,
    step_millis: i64,
    reads: AtomicI64,
}

impl ManualClock {
    /// A clock starting at `start` that advances one second per read.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_step(start, TimeDelta::seconds(1))
    }

    /// A clock starting at `start` that advances `step` per read.
    pub fn with_step(start: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            start,
            step_millis: step.num_milliseconds(),
            reads: AtomicI64::new(0),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.reads.fetch_add(1, Ordering::Relaxed);
        let offset = TimeDelta::milliseconds(n.saturating_mul(self.step_millis));
        self.start.checked_add_signed(offset).unwrap_or(self.start)
    }
}
