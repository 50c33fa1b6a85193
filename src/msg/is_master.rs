use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::node::ElectionId;
use crate::node::HostAndPort;
use crate::optime::OpTime;
use crate::time::Date;

/// The `lastWrite` block of an `ismaster` reply.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct LastWrite {
    pub op_time: OpTime,
    pub last_write_date: Date,
    pub majority_op_time: OpTime,
}

/// Reply to an `ismaster` request from a replica set member.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct IsMasterResponse {
    pub is_master: bool,
    pub secondary: bool,
    pub set_name: String,
    pub set_version: i64,
    /// Client-visible electable members.
    pub hosts: Vec<HostAndPort>,
    /// Client-visible priority-0 members.
    pub passives: Vec<HostAndPort>,
    pub arbiters: Vec<HostAndPort>,
    pub primary: Option<HostAndPort>,
    pub me: Option<HostAndPort>,

    // Flags describing this node's own member entry.
    pub arbiter_only: bool,
    pub passive: bool,
    pub hidden: bool,
    pub build_indexes: bool,
    pub slave_delay: Duration,
    pub tags: BTreeMap<String, String>,

    /// Present while this node is an established master.
    pub election_id: Option<ElectionId>,
    pub last_write: Option<LastWrite>,
}
