use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::node::HostAndPort;
use crate::node::MemberId;
use crate::optime::OpTime;

/// Arguments of a protocol-version-0 heartbeat request.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetHeartbeatArgs {
    pub set_name: String,
    pub config_version: i64,
    pub sender_host: Option<HostAndPort>,
    pub sender_id: Option<MemberId>,
    /// Probe sent while initiating a set, before any config exists.
    pub check_empty: bool,
}

impl fmt::Display for ReplSetHeartbeatArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hb{{{} v{}}}", self.set_name, self.config_version)
    }
}

/// Arguments of a protocol-version-1 heartbeat request.
///
/// PV1 adds the sender's term and last applied op-time to the exchange.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetHeartbeatArgsV1 {
    pub term: u64,
    pub set_name: String,
    pub config_version: i64,
    pub sender_host: Option<HostAndPort>,
    pub sender_id: Option<MemberId>,
    pub last_applied_op_time: OpTime,
}

impl fmt::Display for ReplSetHeartbeatArgsV1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hb{{{} v{} t{} applied:{}}}",
            self.set_name, self.config_version, self.term, self.last_applied_op_time
        )
    }
}
