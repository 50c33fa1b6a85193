use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::node::HostAndPort;
use crate::optime::OpTime;
use crate::optime::Timestamp;
use crate::time::Date;

/// Caller-supplied inputs to `prepare_status_response`.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
pub struct ReplSetStatusArgs {
    pub now: Date,
    pub self_uptime: Duration,
    pub read_concern_majority_op_time: OpTime,
    pub initial_sync_status: Option<String>,
}

/// One member's record in a `replSetGetStatus` reply.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MemberStatus {
    pub id: i64,
    pub name: HostAndPort,
    /// `1.0` up, `0.0` down.
    pub health: f64,
    pub state: i32,
    pub state_str: String,
    pub uptime: Duration,
    pub op_time: Option<OpTime>,
    pub sync_source: Option<HostAndPort>,
    pub last_heartbeat: Option<Date>,
    pub last_heartbeat_recv: Option<Date>,
    pub last_heartbeat_message: String,
    pub auth_authenticated: bool,
    pub ping_ms: Option<u64>,
    pub config_version: i64,
    pub is_self: bool,
    /// Only reported for a primary.
    pub election_time: Option<Timestamp>,
    /// Only reported for self while in maintenance mode.
    pub maintenance_mode: Option<i32>,
}

/// The op-time block of a `replSetGetStatus` reply.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct StatusOpTimes {
    pub last_committed_op_time: OpTime,
    pub read_concern_majority_op_time: OpTime,
    pub applied_op_time: OpTime,
    pub durable_op_time: OpTime,
}

/// Reply to a `replSetGetStatus` request.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetStatusResponse {
    pub set_name: String,
    pub date: Date,
    pub my_state: i32,
    pub term: u64,
    pub sync_source: Option<HostAndPort>,
    pub heartbeat_interval_millis: u64,
    pub op_times: StatusOpTimes,
    pub initial_sync_status: Option<String>,
    pub members: Vec<MemberStatus>,
}
