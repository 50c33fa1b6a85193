use std::fmt;
use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Sub;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// A wall-clock instant in milliseconds, supplied by the caller.
///
/// The coordinator never reads a clock: every entry point receives `now`
/// from the executor that drives it, and every deadline the coordinator
/// emits (next heartbeat, stepdown wait) is a `Date` for the executor to
/// honour.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Date(u64);

impl Date {
    pub const MIN: Date = Date(0);
    pub const MAX: Date = Date(u64::MAX);

    pub fn from_millis(millis: u64) -> Self {
        Date(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// The amount of time from `earlier` to this instant, or zero if
    /// `earlier` is later than this one.
    pub fn saturating_duration_since(&self, earlier: Date) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Date {
    type Output = Date;

    fn add(self, rhs: Duration) -> Self::Output {
        Date(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

impl AddAssign<Duration> for Date {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<Duration> for Date {
    type Output = Date;

    fn sub(self, rhs: Duration) -> Self::Output {
        Date(self.0.saturating_sub(rhs.as_millis() as u64))
    }
}

impl Sub<Date> for Date {
    type Output = Duration;

    fn sub(self, rhs: Date) -> Self::Output {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
