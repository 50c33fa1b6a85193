//! Protocol-version-0 election commands.
//!
//! PV0 elects by comparing freshness over heartbeat-learned op-times and
//! leases each vote for a fixed window instead of persisting it per term.

use serde::Deserialize;
use serde::Serialize;

use crate::node::HostAndPort;
use crate::node::MemberId;
use crate::optime::Timestamp;

/// Arguments of a `replSetFresh` probe: "am I fresher than you?"
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetFreshArgs {
    pub set_name: String,
    pub who: HostAndPort,
    pub id: MemberId,
    pub config_version: i64,
    pub op_time: Timestamp,
}

/// Reply to a `replSetFresh` probe.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetFreshResponse {
    /// True when this node has seen more of the log than the caller.
    pub fresher: bool,
    /// Our latest applied timestamp.
    pub op_time: Timestamp,
    /// Hard objection: the caller must not stand for election.
    pub veto: bool,
    pub info: String,
}

/// Arguments of a `replSetElect` vote solicitation.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetElectArgs {
    pub set_name: String,
    pub who_id: MemberId,
    pub config_version: i64,
    /// Identifier of this election round, echoed in the reply.
    pub round: u64,
}

/// Reply to a `replSetElect` solicitation.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetElectResponse {
    /// Our vote weight, `0` when withheld, or a large negative veto.
    pub vote: i64,
    pub round: u64,
}

impl ReplSetElectResponse {
    /// The veto weight: overwhelms any combination of positive votes.
    pub const VETO: i64 = -10_000;
}
