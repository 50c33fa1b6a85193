//! The topology coordinator: the pure-logic nucleus that decides what
//! role this node plays, who the primary is, who to replicate from, when
//! to stand for election and when to step down.
//!
//! The coordinator performs no I/O, holds no locks and never reads a
//! clock; every entry point receives `now` from the executor that owns
//! the instance, and every decision comes back as a returned value.

mod commit;
mod election;
mod heartbeat;
mod prepare;
mod stepdown;
mod sync_source;

#[cfg(test)]
mod commit_test;
#[cfg(test)]
mod stepdown_test;
#[cfg(test)]
mod sync_source_test;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod update_config_test;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Duration;

pub use election::StartElectionReason;
pub use heartbeat::PingStats;
pub use stepdown::PrepareFreezeResponseResult;
pub use sync_source::ChainingPreference;

use crate::config::TopologyOptions;
use crate::display_ext::DisplayOptionExt;
use crate::last_vote::LastVote;
use crate::member_data::MemberData;
use crate::member_state::MemberState;
use crate::membership::ReplicaSetConfig;
use crate::node::ElectionId;
use crate::node::HostAndPort;
use crate::node::MemberId;
use crate::node::ReplicationId;
use crate::optime::OpTime;
use crate::optime::Timestamp;
use crate::role::LeaderMode;
use crate::role::Role;
use crate::time::Date;

/// Outcome of feeding an observed term into the coordinator.
#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq)]
pub enum UpdateTermResult {
    /// The observed term is not newer than ours.
    AlreadyUpToDate,
    /// The term advanced and this node was leader: the executor must
    /// drive an unconditional stepdown.
    TriggerStepDown,
    /// The term advanced.
    UpdatedTerm,
}

/// PV0 vote lease: a freshness vote binds the voter for this long.
pub(crate) const VOTE_LEASE: Duration = Duration::from_secs(30);

/// A vote leased to a PV0 candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VoteLease {
    pub(crate) when: Date,
    pub(crate) who_id: MemberId,
}

/// The replication topology coordinator.
///
/// Owned and serialised by the replication executor; all methods are
/// synchronous and non-blocking.
#[derive(Debug)]
pub struct TopologyCoordinator {
    pub(crate) options: TopologyOptions,

    pub(crate) role: Role,
    pub(crate) term: u64,
    /// Reported state while a follower; only `Secondary` is electable.
    pub(crate) follower_mode: MemberState,

    pub(crate) rs_config: ReplicaSetConfig,
    pub(crate) self_index: Option<usize>,

    /// One record per config member, parallel to `rs_config.members`,
    /// plus a trailing self record when this node is not in the config.
    pub(crate) member_data: Vec<MemberData>,
    /// Transient rid-keyed records for legacy replicas.
    pub(crate) slave_data: Vec<MemberData>,
    pub(crate) ping_stats: BTreeMap<HostAndPort, PingStats>,

    pub(crate) primary_index: Option<usize>,
    pub(crate) sync_source: Option<HostAndPort>,
    pub(crate) force_sync_source_index: Option<usize>,
    pub(crate) sync_source_blacklist: BTreeMap<HostAndPort, Date>,

    pub(crate) last_committed_op: OpTime,
    /// Commit floor installed on transition to master: nothing from an
    /// earlier term may be declared committed until this op is.
    pub(crate) first_op_time_of_term: Option<OpTime>,

    pub(crate) last_vote: LastVote,
    pub(crate) vote_lease: Option<VoteLease>,
    pub(crate) election_id: Option<ElectionId>,
    pub(crate) election_time: Option<Timestamp>,

    /// This node will not stand for election before this time.
    pub(crate) election_sleep_until: Date,
    /// End of the current freeze / post-stepdown window.
    pub(crate) stepdown_until: Date,
    /// When the current no-primary countdown began.
    pub(crate) election_timeout_started_at: Date,

    pub(crate) maintenance_mode_count: i32,
    pub(crate) storage_engine_supports_read_committed: bool,
}

impl TopologyCoordinator {
    pub fn new(options: TopologyOptions) -> Self {
        let mut self_data = MemberData::default();
        self_data.is_self = true;

        Self {
            options,
            role: Role::Follower,
            term: 0,
            follower_mode: MemberState::Startup2,
            rs_config: ReplicaSetConfig::default(),
            self_index: None,
            member_data: vec![self_data],
            slave_data: Vec::new(),
            ping_stats: BTreeMap::new(),
            primary_index: None,
            sync_source: None,
            force_sync_source_index: None,
            sync_source_blacklist: BTreeMap::new(),
            last_committed_op: OpTime::default(),
            first_op_time_of_term: None,
            last_vote: LastVote::default(),
            vote_lease: None,
            election_id: None,
            election_time: None,
            election_sleep_until: Date::MIN,
            stepdown_until: Date::MIN,
            election_timeout_started_at: Date::MIN,
            maintenance_mode_count: 0,
            storage_engine_supports_read_committed: true,
        }
    }

    // --- state inspection

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn term(&self) -> u64 {
        self.term
    }

    /// The state this node reports on the wire.
    pub fn member_state(&self) -> MemberState {
        if self.role.is_leader() {
            return MemberState::Primary;
        }
        let Some(i) = self.self_index else {
            return if self.rs_config.is_initialized() {
                MemberState::Removed
            } else {
                MemberState::Startup
            };
        };
        if self.rs_config.member(i).arbiter_only {
            return MemberState::Arbiter;
        }
        if self.maintenance_mode_count > 0 {
            return MemberState::Recovering;
        }
        self.follower_mode
    }

    pub fn can_accept_writes(&self) -> bool {
        self.role.can_accept_writes()
    }

    pub fn is_stepping_down(&self) -> bool {
        self.role.is_stepping_down()
    }

    pub fn rs_config(&self) -> &ReplicaSetConfig {
        &self.rs_config
    }

    pub fn self_index(&self) -> Option<usize> {
        self.self_index
    }

    pub fn current_primary_index(&self) -> Option<usize> {
        self.primary_index
    }

    pub fn set_primary_index(&mut self, primary_index: Option<usize>) {
        self.primary_index = primary_index;
    }

    pub fn sync_source_address(&self) -> Option<&HostAndPort> {
        self.sync_source.as_ref()
    }

    /// The end of the current freeze / post-stepdown window.
    pub fn step_down_time(&self) -> Date {
        self.stepdown_until
    }

    pub fn maintenance_count(&self) -> i32 {
        self.maintenance_mode_count
    }

    pub fn election_id(&self) -> Option<ElectionId> {
        self.election_id
    }

    pub fn election_time(&self) -> Option<Timestamp> {
        self.election_time
    }

    pub fn last_vote(&self) -> LastVote {
        self.last_vote
    }

    /// Seed the in-memory vote record from stable storage at startup.
    pub fn load_last_vote(&mut self, last_vote: LastVote) {
        self.last_vote = last_vote;
    }

    pub fn set_storage_engine_supports_read_committed(&mut self, supported: bool) {
        self.storage_engine_supports_read_committed = supported;
    }

    // --- member table access

    pub fn member_data(&self) -> &[MemberData] {
        &self.member_data
    }

    pub(crate) fn self_data_index(&self) -> usize {
        if let Some(i) = self.self_index {
            return i;
        }
        self.member_data
            .iter()
            .position(|m| m.is_self)
            .expect("coordinator always keeps a member record for itself")
    }

    pub fn my_member_data(&self) -> &MemberData {
        &self.member_data[self.self_data_index()]
    }

    pub fn my_last_applied_op_time(&self) -> OpTime {
        self.my_member_data().last_applied
    }

    pub fn my_last_durable_op_time(&self) -> OpTime {
        self.my_member_data().last_durable
    }

    pub fn set_my_last_applied_op_time(&mut self, now: Date, op: OpTime) {
        let i = self.self_data_index();
        self.member_data[i].advance_last_applied(now, op);
    }

    pub fn set_my_last_durable_op_time(&mut self, now: Date, op: OpTime) {
        let i = self.self_data_index();
        self.member_data[i].advance_last_durable(now, op);
    }

    pub fn set_my_heartbeat_message(&mut self, now: Date, msg: impl ToString) {
        let i = self.self_data_index();
        self.member_data[i].heartbeat_message = msg.to_string();
        self.member_data[i].last_update = now;
    }

    pub fn find_member_data_by_id(&self, member_id: MemberId) -> Option<&MemberData> {
        self.member_data.iter().find(|m| m.member_id == member_id)
    }

    pub fn find_member_data_by_rid(&self, rid: ReplicationId) -> Option<&MemberData> {
        self.slave_data.iter().find(|m| m.rid == Some(rid))
    }

    /// Record progress for a legacy rid-keyed replica, creating its
    /// record on first contact.
    pub fn add_slave_member_data(&mut self, rid: ReplicationId) -> &mut MemberData {
        if let Some(i) = self.slave_data.iter().position(|m| m.rid == Some(rid)) {
            return &mut self.slave_data[i];
        }
        self.slave_data.push(MemberData::new_for_rid(rid));
        self.slave_data.last_mut().unwrap()
    }

    /// All hosts that are neither down nor ourself.
    pub fn get_maybe_up_hosts(&self) -> Vec<HostAndPort> {
        self.member_data
            .iter()
            .filter(|m| !m.is_self && m.maybe_up())
            .map(|m| m.host.clone())
            .collect()
    }

    // --- basic state manipulation

    /// Fold an observed term into ours.
    ///
    /// Terms only ever grow; seeing a newer one while leading forces an
    /// unconditional stepdown, which the executor must drive.
    pub fn update_term(&mut self, term: u64, now: Date) -> UpdateTermResult {
        if term <= self.term {
            return UpdateTermResult::AlreadyUpToDate;
        }

        tracing::info!(from = self.term, to = term, "updating term");
        self.term = term;
        self.election_timeout_started_at = now;

        if self.role.is_leader() {
            return UpdateTermResult::TriggerStepDown;
        }
        UpdateTermResult::UpdatedTerm
    }

    /// Set the reported mode of this node while it is a follower.
    ///
    /// Only `Secondary` leaves the node electable; the applier uses the
    /// other modes to suppress candidacy during startup, rollback and
    /// recovery.
    pub fn set_follower_mode(&mut self, new_mode: MemberState) {
        assert!(
            new_mode.is_follower_mode(),
            "illegal follower mode: {new_mode}"
        );
        assert!(
            !self.role.is_leader(),
            "cannot set follower mode while leader"
        );
        self.follower_mode = new_mode;
    }

    /// Adjust the maintenance mode counter by `inc`.
    ///
    /// Only legal on a follower; driving the count negative is a
    /// programmer error.
    pub fn adjust_maintenance_count(&mut self, inc: i32) {
        assert!(
            self.role.is_follower(),
            "maintenance mode requires the follower role"
        );
        self.maintenance_mode_count += inc;
        assert!(
            self.maintenance_mode_count >= 0,
            "maintenance mode count must not go negative"
        );
    }

    /// The node may report itself electable but will not stand for
    /// election before `new_time`.
    pub fn set_election_sleep_until(&mut self, new_time: Date) {
        self.election_sleep_until = new_time;
    }

    /// Atomically install a new replica set configuration.
    ///
    /// `self_index` of `None` means this node was removed. Any
    /// outstanding election must be wrapped up (win or lose) before the
    /// config is installed.
    pub fn update_config(&mut self, new_config: ReplicaSetConfig, self_index: Option<usize>, now: Date) {
        debug_assert!(new_config.validate(self_index).is_ok());
        debug_assert!(
            !self.role.is_candidate(),
            "elections must be wrapped up before installing a config"
        );

        tracing::info!(config = %new_config, self_index = ?self_index, "installing replica set config");

        if new_config.term > self.term {
            self.term = new_config.term;
            if self.role.is_leader() {
                // Forced reset: a config committed in a newer term proves
                // another primary exists.
                self.role = Role::Follower;
                self.election_id = None;
                self.election_time = None;
                self.first_op_time_of_term = None;
            }
        }

        self.reconcile_member_data(&new_config, self_index);
        self.rs_config = new_config;
        self.self_index = self_index;

        if self_index.is_none() && self.role.is_leader() {
            self.role = Role::Follower;
            self.election_id = None;
            self.election_time = None;
            self.first_op_time_of_term = None;
        }

        self.primary_index = if self.role.is_leader() { self_index } else { None };

        self.force_sync_source_index = None;
        if let Some(source) = &self.sync_source {
            if self.rs_config.find_member_by_host(source).is_none() {
                self.sync_source = None;
            }
        }

        self.election_timeout_started_at = now;
        self.restart_heartbeats();
        tracing::debug!(
            sync_source = %self.sync_source.display_or("-"),
            primary = ?self.primary_index,
            "topology view after config install"
        );
    }

    /// Rebuild the member table for a new config, carrying over what we
    /// knew about members that survive, keyed by member id.
    fn reconcile_member_data(&mut self, new_config: &ReplicaSetConfig, self_index: Option<usize>) {
        let old = std::mem::take(&mut self.member_data);
        let old_self = old.iter().find(|m| m.is_self).cloned();

        let mut new_data = Vec::with_capacity(new_config.members.len());
        for (i, member) in new_config.members.iter().enumerate() {
            let is_self = Some(i) == self_index;

            let mut data = if is_self {
                old_self.clone().unwrap_or_default()
            } else {
                old.iter()
                    .find(|m| !m.is_self && m.member_id == member.id && m.host == member.host)
                    .cloned()
                    .unwrap_or_else(|| MemberData::new(i, member.id, member.host.clone()))
            };

            data.config_index = Some(i);
            data.member_id = member.id;
            data.host = member.host.clone();
            data.is_self = is_self;
            new_data.push(data);
        }

        if self_index.is_none() {
            let mut data = old_self.unwrap_or_default();
            data.config_index = None;
            data.is_self = true;
            new_data.push(data);
        }

        self.member_data = new_data;
    }

    // --- timing helpers: config settings override process options

    pub(crate) fn heartbeat_interval(&self) -> Duration {
        self.rs_config.heartbeat_interval(self.options.heartbeat_interval())
    }

    pub(crate) fn heartbeat_timeout(&self) -> Duration {
        self.rs_config.heartbeat_timeout(self.options.heartbeat_timeout())
    }

    pub(crate) fn election_timeout(&self) -> Duration {
        self.rs_config.election_timeout(self.options.election_timeout())
    }

    // --- role plumbing

    /// Move between leader modes, enforcing the legal transitions.
    pub(crate) fn set_leader_mode(&mut self, next: LeaderMode) {
        let Role::Leader(mode) = self.role else {
            panic!("cannot set leader mode {next} while {}", self.role);
        };
        assert!(
            mode.can_transition_to(next),
            "illegal leader mode transition: {mode} -> {next}"
        );
        tracing::debug!(from = %mode, to = %next, "leader mode transition");
        self.role = Role::Leader(next);
    }

    /// Count of voting members currently visible (self always counts).
    pub(crate) fn visible_voting_members(&self) -> usize {
        self.member_data
            .iter()
            .filter(|m| {
                let Some(i) = m.config_index else {
                    return false;
                };
                self.rs_config.member(i).is_voter() && (m.is_self || (m.is_up() && !m.is_stale()))
            })
            .count()
    }

    pub(crate) fn see_majority_of_voters(&self) -> bool {
        self.visible_voting_members() >= self.rs_config.majority_vote_count()
    }

    /// Reset the staleness bookkeeping for every member.
    pub fn reset_all_member_timeouts(&mut self, now: Date) {
        for m in &mut self.member_data {
            m.last_update = now;
            m.last_update_stale = false;
        }
    }

    /// Reset staleness for the members in `member_set` only.
    pub fn reset_member_timeouts(&mut self, now: Date, member_set: &BTreeSet<HostAndPort>) {
        for m in &mut self.member_data {
            if member_set.contains(&m.host) {
                m.last_update = now;
                m.last_update_stale = false;
            }
        }
    }
}
