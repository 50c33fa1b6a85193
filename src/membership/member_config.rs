use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::node::HostAndPort;
use crate::node::MemberId;

/// One member's entry in the replica set configuration.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MemberConfig {
    pub id: MemberId,
    pub host: HostAndPort,

    /// Election priority; `0` means not electable.
    pub priority: f64,

    /// Number of votes this member casts, `0` or `1`.
    pub votes: u32,

    /// Arbitrary key/value tags used by tag-pattern write concerns.
    pub tags: BTreeMap<String, String>,

    /// Arbiters vote but carry no data.
    pub arbiter_only: bool,

    /// Hidden members are invisible to clients but replicate normally.
    pub hidden: bool,

    /// Whether this member builds indexes; a member that does not cannot
    /// feed one that does.
    pub build_indexes: bool,

    /// Intentional replication delay for this member.
    pub slave_delay: Duration,
}

impl MemberConfig {
    pub fn new(id: MemberId, host: HostAndPort) -> Self {
        Self {
            id,
            host,
            priority: 1.0,
            votes: 1,
            tags: BTreeMap::new(),
            arbiter_only: false,
            hidden: false,
            build_indexes: true,
            slave_delay: Duration::ZERO,
        }
    }

    pub fn is_voter(&self) -> bool {
        self.votes > 0
    }

    /// Whether this member may ever stand for election.
    pub fn is_electable(&self) -> bool {
        !self.arbiter_only && self.priority > 0.0
    }
}

impl fmt::Display for MemberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{id:{} host:{} p:{} v:{}}}", self.id, self.host, self.priority, self.votes)
    }
}
