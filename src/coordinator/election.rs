//! Vote handling and candidacy: PV1 term-based votes with a persisted
//! vote record, the legacy PV0 freshness/elect commands, and the state
//! updates around winning or losing an election.

use crate::coordinator::TopologyCoordinator;
use crate::coordinator::VoteLease;
use crate::coordinator::VOTE_LEASE;
use crate::error::TopologyError;
use crate::last_vote::LastVote;
use crate::member_state::MemberState;
use crate::msg::ReplSetElectArgs;
use crate::msg::ReplSetElectResponse;
use crate::msg::ReplSetFreshArgs;
use crate::msg::ReplSetFreshResponse;
use crate::msg::ReplSetRequestVotesArgs;
use crate::msg::ReplSetRequestVotesResponse;
use crate::node::ElectionId;
use crate::optime::OpTime;
use crate::optime::Timestamp;
use crate::role::LeaderMode;
use crate::role::Role;
use crate::time::Date;

/// Why a node is standing for election.
#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq)]
pub enum StartElectionReason {
    /// No primary seen for a full election timeout.
    ElectionTimeout,
    /// This node outranks the current primary.
    PriorityTakeover,
    /// An operator asked this node to step up.
    StepUpRequest,
    /// The current primary is still catching up and this node is ahead.
    CatchupTakeover,
}

impl TopologyCoordinator {
    /// Answer a PV1 vote request, updating the in-memory vote record on
    /// a granted, non-dry-run vote.
    ///
    /// The executor must persist `last_vote()` through the storage
    /// collaborator before the reply goes out on the wire; an
    /// unpersisted granted vote must never be visible to the candidate.
    pub fn process_replset_request_votes(
        &mut self,
        args: &ReplSetRequestVotesArgs,
    ) -> ReplSetRequestVotesResponse {
        let mut resp = ReplSetRequestVotesResponse {
            term: self.term,
            vote_granted: false,
            reason: String::new(),
        };

        if !self.rs_config.is_initialized() {
            resp.reason = "no replica set config installed".to_string();
            return resp;
        }
        if args.term < self.term {
            resp.reason = "candidate's term is lower than mine".to_string();
            return resp;
        }
        if args.set_name != self.rs_config.set_name {
            resp.reason = "candidate's set name differs from mine".to_string();
            return resp;
        }
        if args.config_version < self.rs_config.version {
            resp.reason = "candidate's config version differs from mine".to_string();
            return resp;
        }
        if self.last_vote.term == args.term && self.last_vote.candidate_index != args.candidate_index {
            resp.reason = format!(
                "already voted for another candidate ({}) this term ({})",
                self.last_vote.candidate_index, self.last_vote.term
            );
            return resp;
        }
        if args.last_committed_op < self.my_last_applied_op_time() {
            resp.reason = "candidate's data is staler than ours".to_string();
            return resp;
        }

        if !args.dry_run {
            self.last_vote = LastVote::new(args.term, args.candidate_index);
        }
        tracing::info!(
            term = args.term,
            candidate = args.candidate_index,
            dry_run = args.dry_run,
            "granting vote"
        );
        resp.vote_granted = true;
        resp
    }

    /// Cast a PV0 freshness vote for ourself, honouring the vote lease.
    ///
    /// Returns false when another candidate holds our lease.
    pub fn vote_for_myself(&mut self, now: Date) -> bool {
        assert!(self.role.is_candidate(), "only a candidate votes for itself");

        let my_id = self.self_index.map(|i| self.rs_config.member(i).id);
        let Some(my_id) = my_id else {
            return false;
        };

        if let Some(lease) = self.vote_lease {
            if now < lease.when + VOTE_LEASE && lease.who_id != my_id {
                tracing::debug!(leased_to = %lease.who_id, "vote is leased to another candidate");
                return false;
            }
        }
        self.vote_lease = Some(VoteLease {
            when: now,
            who_id: my_id,
        });
        true
    }

    /// Record a PV1 vote for ourself in the current term.
    pub fn vote_for_myself_v1(&mut self) {
        assert!(self.role.is_candidate(), "only a candidate votes for itself");
        let self_index = self.self_index.expect("a candidate is always in its config");
        self.last_vote = LastVote::new(self.term, self_index as i64);
    }

    /// Record the identifiers of the election being run.
    pub fn set_election_info(&mut self, election_id: ElectionId, election_time: Timestamp) {
        self.election_id = Some(election_id);
        self.election_time = Some(election_time);
    }

    /// The election was won: become leader-elect.
    ///
    /// It is a programmer error to call this while not a candidate.
    pub fn process_win_election(&mut self, election_id: ElectionId, election_time: Timestamp) {
        assert!(
            self.role.is_candidate(),
            "processed an election win while not a candidate"
        );
        tracing::info!(term = self.term, %election_id, "election won");

        self.role = Role::Leader(LeaderMode::LeaderElect);
        self.set_election_info(election_id, election_time);
        self.primary_index = self.self_index;
        self.first_op_time_of_term = None;
        // A new primary replicates from nobody.
        self.sync_source = None;
        self.force_sync_source_index = None;
    }

    /// The election was lost: back to follower.
    ///
    /// It is a programmer error to call this while not a candidate.
    pub fn process_lose_election(&mut self) {
        assert!(
            self.role.is_candidate(),
            "processed an election loss while not a candidate"
        );
        tracing::info!(term = self.term, "election lost");
        self.role = Role::Follower;
    }

    /// Catchup and drain are done: start accepting writes.
    ///
    /// `first_op_time_of_term` is the floor below which nothing may be
    /// declared committed during this tenure, so that ops from before
    /// our election cannot count as committed until our election itself
    /// is.
    pub fn complete_transition_to_primary(&mut self, first_op_time_of_term: OpTime) {
        self.set_leader_mode(LeaderMode::Master);
        self.first_op_time_of_term = Some(first_op_time_of_term);
        tracing::info!(floor = %first_op_time_of_term, "transition to primary complete");
    }

    /// Transition to candidate if nothing forbids it.
    pub fn become_candidate_if_electable(
        &mut self,
        now: Date,
        reason: StartElectionReason,
    ) -> Result<(), TopologyError> {
        if !self.role.is_follower() {
            return Err(TopologyError::not_secondary(format!(
                "cannot stand for election while {}",
                self.role
            )));
        }

        let require_no_primary = reason == StartElectionReason::ElectionTimeout;
        if let Some(reason) = self.unelectable_reason(now, require_no_primary) {
            return Err(TopologyError::Unelectable { reason });
        }

        tracing::info!(?reason, term = self.term, "becoming candidate");
        self.role = Role::Candidate;
        Ok(())
    }

    /// The read-only electability probe behind
    /// [`become_candidate_if_electable`](Self::become_candidate_if_electable).
    pub fn check_should_stand_for_election(&self, now: Date) -> Result<(), TopologyError> {
        if !self.role.is_follower() {
            return Err(TopologyError::not_secondary(format!(
                "cannot stand for election while {}",
                self.role
            )));
        }
        if let Some(reason) = self.unelectable_reason(now, true) {
            return Err(TopologyError::Unelectable { reason });
        }
        if !self.see_majority_of_voters() {
            return Err(TopologyError::Unelectable {
                reason: "node cannot see a majority of voters".to_string(),
            });
        }
        Ok(())
    }

    /// A lone-voter set re-elects itself as soon as its stepdown window
    /// ends, instead of waiting for heartbeat traffic.
    pub fn become_candidate_if_stepdown_period_over_and_single_node_set(&mut self, now: Date) -> bool {
        if !self.rs_config.is_single_node_set() || !self.role.is_follower() {
            return false;
        }
        if now < self.stepdown_until {
            return false;
        }
        if self.unelectable_reason(now, false).is_some() {
            return false;
        }
        tracing::info!("single-node set: re-entering candidacy");
        self.role = Role::Candidate;
        true
    }

    /// Why this node may not stand for election right now, or `None`
    /// when it may.
    pub(crate) fn unelectable_reason(&self, now: Date, require_no_primary: bool) -> Option<String> {
        let mut reasons = Vec::new();

        if !self.rs_config.is_initialized() {
            reasons.push("node has no valid replica set config".to_string());
        } else if let Some(i) = self.self_index {
            let member = self.rs_config.member(i);
            if member.arbiter_only {
                reasons.push("node is an arbiter".to_string());
            }
            if member.priority == 0.0 {
                reasons.push("node has zero priority".to_string());
            }
        } else {
            reasons.push("node is not a member of the replica set config".to_string());
        }

        if self.rs_config.protocol_version == 1 && !self.storage_engine_supports_read_committed {
            reasons.push(
                "storage engine does not support read committed, which protocol version 1 elections require"
                    .to_string(),
            );
        }
        if self.follower_mode != MemberState::Secondary {
            reasons.push(format!("node is not in secondary state ({})", self.follower_mode));
        }
        if self.maintenance_mode_count > 0 {
            reasons.push("node is in maintenance mode".to_string());
        }
        if now < self.stepdown_until {
            reasons.push(format!("stepdown period active until {}", self.stepdown_until));
        }
        if now < self.election_sleep_until {
            reasons.push(format!("election sleep active until {}", self.election_sleep_until));
        }
        if self.my_last_applied_op_time().is_null() {
            reasons.push("node has no applied operations".to_string());
        }
        if require_no_primary {
            let primary_visible = self
                .member_data
                .iter()
                .any(|m| !m.is_self && m.is_up() && m.state.is_primary());
            if primary_visible {
                reasons.push("a primary is already visible".to_string());
            }
        }

        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        }
    }

    /// Answer a PV0 `replSetFresh` probe from a would-be candidate.
    pub fn prepare_fresh_response(
        &mut self,
        args: &ReplSetFreshArgs,
        now: Date,
    ) -> Result<ReplSetFreshResponse, TopologyError> {
        if !self.rs_config.is_initialized() {
            return Err(TopologyError::NotYetInitialized);
        }
        if self.rs_config.protocol_version != 0 {
            return Err(TopologyError::invalid_config(
                "replSetFresh is only supported by protocol version 0",
            ));
        }
        if args.set_name != self.rs_config.set_name {
            return Err(TopologyError::InconsistentReplicaSetNames {
                ours: self.rs_config.set_name.clone(),
                theirs: args.set_name.clone(),
            });
        }
        if self.self_index.map(|i| self.rs_config.member(i).id) == Some(args.id) {
            return Err(TopologyError::InvalidOptions {
                reason: "received replSetFresh command from member with the same member id as ourself"
                    .to_string(),
            });
        }

        let my_timestamp = self.my_last_applied_op_time().timestamp;
        let mut resp = ReplSetFreshResponse {
            fresher: self.rs_config.version > args.config_version || my_timestamp > args.op_time,
            op_time: my_timestamp,
            veto: false,
            info: String::new(),
        };

        if let Some(veto) = self.veto_for_hopeful(args, now) {
            resp.veto = true;
            resp.info = veto;
        }
        Ok(resp)
    }

    /// A hard objection to `args.id` standing for election, if we have
    /// one.
    fn veto_for_hopeful(&self, args: &ReplSetFreshArgs, _now: Date) -> Option<String> {
        if args.config_version < self.rs_config.version {
            return Some(format!(
                "member {} has a stale config version ({} < {})",
                args.who, args.config_version, self.rs_config.version
            ));
        }

        let Some((hopeful_index, hopeful)) = self.rs_config.find_member_by_id(args.id) else {
            return Some(format!("could not find member with id {}", args.id));
        };

        if self.role.is_leader() && self.my_last_applied_op_time().timestamp >= args.op_time {
            return Some(format!(
                "I am already primary, {} can try again once I've stepped down",
                hopeful.host
            ));
        }

        if let Some(primary_index) = self.primary_index {
            if primary_index != hopeful_index
                && self.member_data[primary_index].last_applied.timestamp >= args.op_time
            {
                return Some(format!(
                    "{} is trying to elect itself but {} is already primary and more up-to-date",
                    hopeful.host,
                    self.member_data[primary_index].host
                ));
            }
        }

        // A higher-priority member that is caught up to the hopeful
        // should win instead.
        for (i, member) in self.rs_config.members.iter().enumerate() {
            if member.priority <= hopeful.priority || !member.is_electable() {
                continue;
            }
            let data = &self.member_data[i];
            let caught_up = data.is_self || data.is_up();
            if caught_up && data.last_applied.timestamp >= args.op_time {
                return Some(format!(
                    "{} has lower priority than {}",
                    hopeful.host, member.host
                ));
            }
        }

        None
    }

    /// Answer a PV0 `replSetElect` vote solicitation.
    pub fn prepare_elect_response(
        &mut self,
        args: &ReplSetElectArgs,
        now: Date,
    ) -> Result<ReplSetElectResponse, TopologyError> {
        if !self.rs_config.is_initialized() {
            return Err(TopologyError::NotYetInitialized);
        }
        if self.rs_config.protocol_version != 0 {
            return Err(TopologyError::invalid_config(
                "replSetElect is only supported by protocol version 0",
            ));
        }
        if args.set_name != self.rs_config.set_name {
            return Err(TopologyError::InconsistentReplicaSetNames {
                ours: self.rs_config.set_name.clone(),
                theirs: args.set_name.clone(),
            });
        }

        let mut resp = ReplSetElectResponse {
            vote: 0,
            round: args.round,
        };

        if args.config_version < self.rs_config.version {
            tracing::info!(candidate = %args.who_id, "vetoing election: stale config version");
            resp.vote = ReplSetElectResponse::VETO;
            return Ok(resp);
        }

        let Some((hopeful_index, _)) = self.rs_config.find_member_by_id(args.who_id) else {
            tracing::info!(candidate = %args.who_id, "vetoing election: unknown member");
            resp.vote = ReplSetElectResponse::VETO;
            return Ok(resp);
        };

        if let Some(primary_index) = self.primary_index {
            if primary_index != hopeful_index
                && self.member_data[primary_index].last_applied
                    >= self.member_data[hopeful_index].last_applied
            {
                tracing::info!(candidate = %args.who_id, "vetoing election: a fresher primary exists");
                resp.vote = ReplSetElectResponse::VETO;
                return Ok(resp);
            }
        }

        if let Some(lease) = self.vote_lease {
            if now < lease.when + VOTE_LEASE && lease.who_id != args.who_id {
                tracing::info!(
                    candidate = %args.who_id,
                    leased_to = %lease.who_id,
                    "withholding vote: lease active"
                );
                return Ok(resp);
            }
        }

        self.vote_lease = Some(VoteLease {
            when: now,
            who_id: args.who_id,
        });
        resp.vote = self
            .self_index
            .map(|i| self.rs_config.member(i).votes as i64)
            .unwrap_or(0);
        Ok(resp)
    }
}
