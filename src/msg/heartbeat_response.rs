use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::display_ext::DisplayOptionExt;
use crate::member_state::MemberState;
use crate::membership::ReplicaSetConfig;
use crate::node::HostAndPort;
use crate::optime::OpTime;
use crate::optime::Timestamp;

/// A heartbeat reply, shared by both protocol versions.
///
/// Optional fields are only populated when the responder has them: a
/// node without an initialized config reports `config_version: -2` and
/// nothing else; a responder whose config is newer than the requester's
/// attaches the full config so the requester can reconfigure.
#[derive(Debug, Clone)]
#[derive(PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetHeartbeatResponse {
    pub set_name: String,
    pub term: u64,
    pub state: MemberState,
    pub config_version: i64,
    pub applied_op_time: Option<OpTime>,
    pub durable_op_time: Option<OpTime>,
    /// The responder's view of the current primary.
    pub primary_index: Option<usize>,
    /// Set when the responder is itself primary.
    pub election_time: Option<Timestamp>,
    /// Who the responder replicates from, as a config index.
    pub sync_source_index: Option<usize>,
    pub sync_source: Option<HostAndPort>,
    /// Attached when the requester's config version trails ours.
    pub config: Option<ReplicaSetConfig>,
    pub heartbeat_message: String,
}

impl Default for ReplSetHeartbeatResponse {
    fn default() -> Self {
        Self {
            set_name: String::new(),
            term: 0,
            state: MemberState::Unknown,
            config_version: -2,
            applied_op_time: None,
            durable_op_time: None,
            primary_index: None,
            election_time: None,
            sync_source_index: None,
            sync_source: None,
            config: None,
            heartbeat_message: String::new(),
        }
    }
}

impl ReplSetHeartbeatResponse {
    /// Whether the responder claims to be primary.
    pub fn claims_primary(&self) -> bool {
        self.state.is_primary()
    }
}

impl fmt::Display for ReplSetHeartbeatResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hb-resp{{{} t{} {} v{} applied:{}}}",
            self.set_name,
            self.term,
            self.state,
            self.config_version,
            self.applied_op_time.display()
        )
    }
}
