use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// A position in the replicated operation log, `(seconds, increment)`.
///
/// Ordering is lexicographic: seconds first, then the increment that
/// distinguishes operations within the same second.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Timestamp {
    pub secs: u32,
    pub inc: u32,
}

impl Timestamp {
    pub fn new(secs: u32, inc: u32) -> Self {
        Self { secs, inc }
    }

    pub fn is_null(&self) -> bool {
        self.secs == 0 && self.inc == 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.secs, self.inc)
    }
}

/// A totally ordered `(timestamp, term)` pair identifying an operation in
/// the replicated log.
///
/// The derived ordering is lexicographic with the timestamp as the major
/// key, so an op written in a later term but at an earlier timestamp sorts
/// before one with a later timestamp. `OpTime::default()` is the zero
/// op-time, the minimum of the order.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct OpTime {
    pub timestamp: Timestamp,
    pub term: u64,
}

impl OpTime {
    pub fn new(timestamp: Timestamp, term: u64) -> Self {
        Self { timestamp, term }
    }

    /// True for the zero op-time, i.e., no operation at all.
    pub fn is_null(&self) -> bool {
        self.timestamp.is_null() && self.term == 0
    }
}

impl fmt::Display for OpTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp, self.term)
    }
}
