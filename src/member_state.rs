use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// The state a member reports on the wire.
///
/// Richer than [`Role`](crate::Role): several states map to the follower
/// role, and `Secondary` maps to either follower or candidate.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub enum MemberState {
    #[default]
    Startup,
    Primary,
    Secondary,
    Recovering,
    Startup2,
    Unknown,
    Arbiter,
    Down,
    Rollback,
    Removed,
}

impl MemberState {
    /// The numeric code used on the wire and in status output.
    pub fn code(&self) -> i32 {
        match self {
            MemberState::Startup => 0,
            MemberState::Primary => 1,
            MemberState::Secondary => 2,
            MemberState::Recovering => 3,
            MemberState::Startup2 => 5,
            MemberState::Unknown => 6,
            MemberState::Arbiter => 7,
            MemberState::Down => 8,
            MemberState::Rollback => 9,
            MemberState::Removed => 10,
        }
    }

    pub fn is_primary(&self) -> bool {
        *self == MemberState::Primary
    }

    pub fn is_secondary(&self) -> bool {
        *self == MemberState::Secondary
    }

    /// States a node may serve reads from, and thus replicate from.
    pub fn is_readable(&self) -> bool {
        matches!(self, MemberState::Primary | MemberState::Secondary)
    }

    /// States the applier may put a follower into.
    pub fn is_follower_mode(&self) -> bool {
        matches!(
            self,
            MemberState::Secondary
                | MemberState::Startup2
                | MemberState::Recovering
                | MemberState::Rollback
        )
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberState::Startup => "STARTUP",
            MemberState::Primary => "PRIMARY",
            MemberState::Secondary => "SECONDARY",
            MemberState::Recovering => "RECOVERING",
            MemberState::Startup2 => "STARTUP2",
            MemberState::Unknown => "UNKNOWN",
            MemberState::Arbiter => "ARBITER",
            MemberState::Down => "DOWN",
            MemberState::Rollback => "ROLLBACK",
            MemberState::Removed => "REMOVED",
        };
        write!(f, "{}", s)
    }
}
