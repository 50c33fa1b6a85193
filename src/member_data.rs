use std::fmt;

use crate::member_state::MemberState;
use crate::msg::ReplSetHeartbeatResponse;
use crate::node::HostAndPort;
use crate::node::MemberId;
use crate::node::ReplicationId;
use crate::optime::OpTime;
use crate::optime::Timestamp;
use crate::time::Date;

/// Health of a peer as observed through heartbeats.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq)]
pub enum MemberHealth {
    /// No heartbeat outcome observed yet.
    #[default]
    Unknown,
    Up,
    Down,
}

/// The mutable liveness record the coordinator keeps for every configured
/// member, including itself, plus transient rid-keyed entries for legacy
/// replicas.
///
/// Records live in a vector parallel to the installed config's member
/// list and are reconciled by member id on every config reinstall.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq)]
pub struct MemberData {
    pub(crate) config_index: Option<usize>,
    pub(crate) member_id: MemberId,
    pub(crate) rid: Option<ReplicationId>,
    pub(crate) is_self: bool,
    pub(crate) host: HostAndPort,

    pub(crate) health: MemberHealth,
    pub(crate) state: MemberState,

    /// When the current unbroken up period began.
    pub(crate) up_since: Option<Date>,
    /// When the last heartbeat *reply* arrived from this member.
    pub(crate) last_heartbeat: Option<Date>,
    /// When we last *received* a heartbeat request from this member.
    pub(crate) last_heartbeat_recv: Option<Date>,
    /// Last liveness evidence in either direction.
    pub(crate) last_update: Date,
    /// Set once `last_update` has aged past the election timeout.
    pub(crate) last_update_stale: bool,

    pub(crate) last_applied: OpTime,
    pub(crate) last_durable: OpTime,
    /// Wall time at which `last_applied` last advanced.
    pub(crate) last_applied_wall: Date,
    /// The term the member last reported in a heartbeat reply.
    pub(crate) reported_term: u64,

    pub(crate) auth_issue: bool,
    pub(crate) heartbeat_message: String,
    pub(crate) sync_source: Option<HostAndPort>,
    pub(crate) election_time: Option<Timestamp>,

    /// Config version and set name the member last reported.
    pub(crate) config_version: i64,
    pub(crate) set_name: String,

    /// Whether any heartbeat outcome has been seen since the last
    /// heartbeat restart.
    pub(crate) updated_since_restart: bool,
}

impl MemberData {
    pub(crate) fn new(config_index: usize, member_id: MemberId, host: HostAndPort) -> Self {
        Self {
            config_index: Some(config_index),
            member_id,
            host,
            config_version: -1,
            ..Default::default()
        }
    }

    pub(crate) fn new_for_rid(rid: ReplicationId) -> Self {
        Self {
            config_index: None,
            member_id: MemberId(-1),
            rid: Some(rid),
            config_version: -1,
            ..Default::default()
        }
    }

    pub fn host(&self) -> &HostAndPort {
        &self.host
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn state(&self) -> MemberState {
        self.state
    }

    pub fn health(&self) -> MemberHealth {
        self.health
    }

    pub fn is_up(&self) -> bool {
        self.health == MemberHealth::Up
    }

    /// Not known to be down; an unknown member may still be up.
    pub fn maybe_up(&self) -> bool {
        self.health != MemberHealth::Down
    }

    pub fn last_applied(&self) -> OpTime {
        self.last_applied
    }

    pub fn last_durable(&self) -> OpTime {
        self.last_durable
    }

    pub fn sync_source(&self) -> Option<&HostAndPort> {
        self.sync_source.as_ref()
    }

    pub fn last_update(&self) -> Date {
        self.last_update
    }

    pub fn last_heartbeat(&self) -> Option<Date> {
        self.last_heartbeat
    }

    pub fn heartbeat_message(&self) -> &str {
        &self.heartbeat_message
    }

    /// The set name this member last reported about itself.
    pub fn reported_set_name(&self) -> &str {
        &self.set_name
    }

    pub fn has_auth_issue(&self) -> bool {
        self.auth_issue
    }

    pub fn is_stale(&self) -> bool {
        self.last_update_stale
    }

    /// Ingest a successful heartbeat reply.
    pub(crate) fn set_up_values(&mut self, now: Date, hb: &ReplSetHeartbeatResponse) {
        if self.health != MemberHealth::Up {
            self.up_since = Some(now);
        }
        self.health = MemberHealth::Up;
        self.state = hb.state;
        self.last_heartbeat = Some(now);
        self.last_update = now;
        self.last_update_stale = false;
        self.auth_issue = false;
        self.updated_since_restart = true;
        self.heartbeat_message.clear();
        self.sync_source = hb.sync_source.clone();
        self.election_time = hb.election_time;
        self.config_version = hb.config_version;
        self.set_name = hb.set_name.clone();
        self.reported_term = hb.term;

        // A rolled-back peer may legitimately report an earlier op-time.
        if let Some(applied) = hb.applied_op_time {
            self.last_applied = applied;
        }
        if let Some(durable) = hb.durable_op_time {
            self.last_durable = durable;
        }
    }

    /// Record a failed heartbeat exchange; the member is now down.
    pub(crate) fn set_down_values(&mut self, now: Date, heartbeat_message: impl ToString) {
        self.health = MemberHealth::Down;
        self.state = MemberState::Down;
        self.up_since = None;
        self.last_heartbeat = Some(now);
        self.last_update = now;
        self.updated_since_restart = true;
        self.heartbeat_message = heartbeat_message.to_string();
        self.sync_source = None;
        self.election_time = None;
    }

    pub(crate) fn set_auth_issue(&mut self, now: Date) {
        self.set_down_values(now, "");
        self.auth_issue = true;
    }

    /// Record liveness evidence from an incoming heartbeat request.
    pub(crate) fn received_heartbeat_request(&mut self, now: Date) {
        self.last_heartbeat_recv = Some(now);
        self.last_update = now;
        self.last_update_stale = false;
    }

    pub(crate) fn advance_last_applied(&mut self, now: Date, op: OpTime) -> bool {
        self.last_update = now;
        self.last_update_stale = false;
        if op > self.last_applied {
            self.last_applied = op;
            self.last_applied_wall = now;
            true
        } else {
            false
        }
    }

    pub(crate) fn advance_last_durable(&mut self, now: Date, op: OpTime) -> bool {
        self.last_update = now;
        self.last_update_stale = false;
        if op > self.last_durable {
            self.last_durable = op;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for MemberData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{{state:{} applied:{} durable:{}}}",
            self.host, self.state, self.last_applied, self.last_durable
        )
    }
}
