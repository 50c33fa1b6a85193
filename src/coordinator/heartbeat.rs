//! Outgoing heartbeat construction and ingestion of replies, liveness
//! timeouts and the per-peer ping statistics backing both.

use std::time::Duration;

use crate::action::HeartbeatResponseAction;
use crate::coordinator::TopologyCoordinator;
use crate::error::TopologyError;
use crate::member_data::MemberHealth;
use crate::member_state::MemberState;
use crate::msg::ReplSetHeartbeatArgs;
use crate::msg::ReplSetHeartbeatArgsV1;
use crate::msg::ReplSetHeartbeatResponse;
use crate::node::HostAndPort;
use crate::optime::OpTime;
use crate::role::Role;
use crate::time::Date;

/// How many consecutive failed attempts are retried immediately before a
/// peer is declared down, provided the heartbeat window has not passed.
pub(crate) const MAX_HEARTBEAT_RETRIES: u32 = 2;

/// Round-trip bookkeeping for one peer.
///
/// Tracks a smoothed round-trip average for sync-source ranking, the
/// start of the in-flight heartbeat to suppress duplicate concurrent
/// requests, and the consecutive-failure count driving retries.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq)]
pub struct PingStats {
    count: u64,
    average_ms: Option<u64>,
    last_started: Option<Date>,
    in_flight: bool,
    failures_since_last_start: u32,
}

impl PingStats {
    /// Note that a heartbeat to this peer started at `now`.
    ///
    /// A second start while one is in flight is ignored so that retries
    /// are accounted against the original deadline.
    pub(crate) fn start(&mut self, now: Date) {
        if self.in_flight {
            return;
        }
        self.in_flight = true;
        self.last_started = Some(now);
        self.failures_since_last_start = 0;
    }

    pub(crate) fn hit(&mut self, rtt: Duration) {
        let rtt_ms = rtt.as_millis() as u64;
        self.count += 1;
        self.in_flight = false;
        self.failures_since_last_start = 0;
        self.average_ms = Some(match self.average_ms {
            None => rtt_ms,
            Some(avg) => (avg * 4 + rtt_ms) / 5,
        });
    }

    pub(crate) fn miss(&mut self) {
        self.in_flight = false;
        self.failures_since_last_start += 1;
    }

    pub fn average(&self) -> Option<Duration> {
        self.average_ms.map(Duration::from_millis)
    }

    /// Number of completed heartbeat exchanges with this peer.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub(crate) fn last_started(&self) -> Option<Date> {
        self.last_started
    }

    pub(crate) fn failures_since_last_start(&self) -> u32 {
        self.failures_since_last_start
    }
}

impl TopologyCoordinator {
    /// Build a protocol-version-0 heartbeat request for `target`.
    ///
    /// Returns the arguments and the deadline the executor should apply
    /// to the exchange. Must be paired with a later
    /// `process_heartbeat_response` for the same target.
    pub fn prepare_heartbeat_request(
        &mut self,
        now: Date,
        our_set_name: &str,
        target: &HostAndPort,
    ) -> (ReplSetHeartbeatArgs, Duration) {
        let (set_name, config_version) = self.heartbeat_identity(our_set_name);
        let args = ReplSetHeartbeatArgs {
            set_name,
            config_version,
            sender_host: self.self_host(),
            sender_id: self.self_member_id(),
            check_empty: false,
        };

        let timeout = self.heartbeat_timeout();
        self.ping_stats.entry(target.clone()).or_default().start(now);
        (args, timeout)
    }

    /// Build a protocol-version-1 heartbeat request for `target`.
    pub fn prepare_heartbeat_request_v1(
        &mut self,
        now: Date,
        our_set_name: &str,
        target: &HostAndPort,
    ) -> (ReplSetHeartbeatArgsV1, Duration) {
        let (set_name, config_version) = self.heartbeat_identity(our_set_name);
        let args = ReplSetHeartbeatArgsV1 {
            term: self.term,
            set_name,
            config_version,
            sender_host: self.self_host(),
            sender_id: self.self_member_id(),
            last_applied_op_time: self.my_last_applied_op_time(),
        };

        let timeout = self.heartbeat_timeout();
        self.ping_stats.entry(target.clone()).or_default().start(now);
        (args, timeout)
    }

    fn heartbeat_identity(&self, our_set_name: &str) -> (String, i64) {
        if self.rs_config.is_initialized() {
            (self.rs_config.set_name.clone(), self.rs_config.version)
        } else {
            (our_set_name.to_string(), -2)
        }
    }

    fn self_host(&self) -> Option<HostAndPort> {
        self.self_index.map(|i| self.rs_config.member(i).host.clone())
    }

    fn self_member_id(&self) -> Option<crate::node::MemberId> {
        self.self_index.map(|i| self.rs_config.member(i).id)
    }

    /// Ingest the outcome of a heartbeat to `target` that arrived at
    /// `now` after `rtt` on the network.
    ///
    /// Exactly one action is returned. On `StartElection` the
    /// coordinator has become a candidate and the executor must settle
    /// the election with `process_win_election` or
    /// `process_lose_election`.
    pub fn process_heartbeat_response(
        &mut self,
        now: Date,
        rtt: Duration,
        target: &HostAndPort,
        result: Result<ReplSetHeartbeatResponse, TopologyError>,
    ) -> HeartbeatResponseAction {
        let interval = self.heartbeat_interval();
        let timeout = self.heartbeat_timeout();
        let next_at = now + interval.saturating_sub(rtt);

        let stats = self.ping_stats.entry(target.clone()).or_default();
        let started = stats.last_started().unwrap_or(now);

        let resp = match result {
            Err(err) => {
                stats.miss();
                let failures = stats.failures_since_last_start();

                let retry = failures <= MAX_HEARTBEAT_RETRIES && now < started + timeout;
                tracing::debug!(
                    target = %target,
                    failures = failures,
                    retry = retry,
                    error = %err,
                    "heartbeat attempt failed"
                );
                if retry {
                    // Retry right away against the original deadline.
                    return HeartbeatResponseAction::no_action().with_next_heartbeat(now);
                }

                if let Some((index, _)) = self.rs_config.find_member_by_host(target) {
                    if Some(index) != self.self_index {
                        if matches!(err, TopologyError::Unauthorized { .. }) {
                            self.member_data[index].set_auth_issue(now);
                        } else {
                            self.member_data[index].set_down_values(now, err.to_string());
                        }
                    }
                }
                return self.update_primary_from_hb_data(now).with_next_heartbeat(next_at);
            }
            Ok(resp) => {
                stats.hit(rtt);
                resp
            }
        };

        // A newer term in the reply is folded in by the executor through
        // `update_term`; here it only decides whether we must yield.
        let term_advanced = resp.term > self.term;
        if term_advanced {
            tracing::info!(ours = self.term, theirs = resp.term, target = %target, "heartbeat reply carries newer term");
            self.election_timeout_started_at = now;
        }

        // A newer config propagates through heartbeats; installing it is
        // the executor's job after validation.
        if self.rs_config.is_initialized()
            && resp.config_version > self.rs_config.version
            && resp.config.is_some()
        {
            tracing::info!(
                ours = self.rs_config.version,
                theirs = resp.config_version,
                "heartbeat reply carries newer config"
            );
            return HeartbeatResponseAction::reconfig().with_next_heartbeat(next_at);
        }

        if let Some((index, _)) = self.rs_config.find_member_by_host(target) {
            if Some(index) != self.self_index {
                self.member_data[index].set_up_values(now, &resp);
            }
        }

        if self.role.is_leader() && term_advanced {
            // Our reign is over regardless of who the reply came from.
            return HeartbeatResponseAction::step_down_self(
                self.self_index.expect("a leader is always in its config"),
            )
            .with_next_heartbeat(next_at);
        }

        self.update_primary_from_hb_data(now).with_next_heartbeat(next_at)
    }

    /// Re-derive the primary from the member table and decide what, if
    /// anything, the executor must do about it.
    fn update_primary_from_hb_data(&mut self, now: Date) -> HeartbeatResponseAction {
        let remote_primary = self.best_remote_primary();

        if let Some(index) = remote_primary {
            self.election_timeout_started_at = now;

            if self.role.is_leader() {
                let remote_term = self.member_data[index].reported_term;
                let self_index = self.self_index.expect("a leader is always in its config");
                if remote_term >= self.term {
                    tracing::warn!(remote = %self.member_data[index].host, "remote primary contests our term");
                    return HeartbeatResponseAction::step_down_self(self_index);
                }
                tracing::warn!(remote = %self.member_data[index].host, "stale remote primary");
                return HeartbeatResponseAction::step_down_remote_primary(index);
            }

            self.primary_index = Some(index);

            if self.role.is_follower() {
                if let Some(action) = self.consider_takeovers(now, index) {
                    return action;
                }
            }
            return HeartbeatResponseAction::no_action();
        }

        if !self.role.is_leader() {
            self.primary_index = None;
        }

        if self.role.is_follower() {
            if self.rs_config.is_single_node_set()
                && self.unelectable_reason(now, true).is_none()
            {
                return HeartbeatResponseAction::step_up_self();
            }

            let waited = now.saturating_duration_since(self.election_timeout_started_at);
            if waited >= self.election_timeout() && self.unelectable_reason(now, true).is_none() {
                tracing::info!(term = self.term, waited = ?waited, "no primary in sight, standing for election");
                self.role = Role::Candidate;
                return HeartbeatResponseAction::start_election();
            }
        }

        HeartbeatResponseAction::no_action()
    }

    /// The config index of the live remote member claiming primacy, the
    /// freshest one if several do.
    fn best_remote_primary(&self) -> Option<usize> {
        self.member_data
            .iter()
            .filter(|m| !m.is_self && m.is_up() && m.state == MemberState::Primary)
            .max_by_key(|m| (m.last_applied.term, m.election_time))
            .and_then(|m| m.config_index)
    }

    /// Whether this follower should schedule an election against a live
    /// primary it outranks.
    fn consider_takeovers(&self, now: Date, primary_index: usize) -> Option<HeartbeatResponseAction> {
        let self_index = self.self_index?;
        if self.unelectable_reason(now, false).is_some() {
            return None;
        }

        let my_priority = self.rs_config.member(self_index).priority;
        let primary_priority = self.rs_config.member(primary_index).priority;
        let my_applied = self.my_last_applied_op_time();
        let primary_applied = self.member_data[primary_index].last_applied;

        if my_priority > primary_priority && self.fresh_enough_for_takeover(my_applied, primary_applied) {
            let at = now + self.priority_takeover_delay(self_index);
            tracing::info!(takeover_at = %at, "scheduling priority takeover");
            return Some(HeartbeatResponseAction::priority_takeover(at));
        }

        // A primary still catching up on a previous term's ops may be
        // overtaken by a peer that already has them.
        if my_applied > primary_applied && !primary_applied.is_null() {
            let at = now + self.options.catchup_takeover_delay();
            tracing::info!(takeover_at = %at, "scheduling catchup takeover");
            return Some(HeartbeatResponseAction::catchup_takeover(at));
        }

        None
    }

    fn fresh_enough_for_takeover(&self, my_applied: OpTime, primary_applied: OpTime) -> bool {
        let window = self.options.priority_takeover_freshness_window_secs as u32;
        my_applied.timestamp.secs.saturating_add(window) >= primary_applied.timestamp.secs
    }

    /// Takeover elections are staggered by priority rank so that the
    /// highest-ranked contender goes first.
    fn priority_takeover_delay(&self, self_index: usize) -> Duration {
        let my_priority = self.rs_config.member(self_index).priority;
        let rank = self
            .rs_config
            .members
            .iter()
            .filter(|m| m.priority > my_priority)
            .count() as u32;
        self.election_timeout() * (rank + 1)
    }

    /// Answer a protocol-version-0 heartbeat request.
    pub fn prepare_heartbeat_response(
        &mut self,
        now: Date,
        args: &ReplSetHeartbeatArgs,
        our_set_name: &str,
    ) -> Result<ReplSetHeartbeatResponse, TopologyError> {
        if self.rs_config.is_initialized() && self.rs_config.protocol_version != 0 {
            return Err(TopologyError::IncompatibleProtocolVersion {
                ours: self.rs_config.protocol_version,
                theirs: 0,
            });
        }
        self.prepare_heartbeat_response_common(now, &args.set_name, args.config_version, our_set_name, args.sender_host.as_ref())
    }

    /// Answer a protocol-version-1 heartbeat request.
    pub fn prepare_heartbeat_response_v1(
        &mut self,
        now: Date,
        args: &ReplSetHeartbeatArgsV1,
        our_set_name: &str,
    ) -> Result<ReplSetHeartbeatResponse, TopologyError> {
        if self.rs_config.is_initialized() && self.rs_config.protocol_version != 1 {
            return Err(TopologyError::IncompatibleProtocolVersion {
                ours: self.rs_config.protocol_version,
                theirs: 1,
            });
        }
        self.prepare_heartbeat_response_common(now, &args.set_name, args.config_version, our_set_name, args.sender_host.as_ref())
    }

    fn prepare_heartbeat_response_common(
        &mut self,
        now: Date,
        their_set_name: &str,
        their_config_version: i64,
        our_set_name: &str,
        sender: Option<&HostAndPort>,
    ) -> Result<ReplSetHeartbeatResponse, TopologyError> {
        if their_set_name != our_set_name {
            tracing::warn!(
                ours = our_set_name,
                theirs = their_set_name,
                "heartbeat from node with a different set name"
            );
            return Err(TopologyError::InconsistentReplicaSetNames {
                ours: our_set_name.to_string(),
                theirs: their_set_name.to_string(),
            });
        }

        // The request itself is liveness evidence about the sender.
        if let Some(sender) = sender {
            if let Some((index, _)) = self.rs_config.find_member_by_host(sender) {
                if Some(index) != self.self_index {
                    self.member_data[index].received_heartbeat_request(now);
                }
            }
        }

        let mut resp = ReplSetHeartbeatResponse {
            set_name: our_set_name.to_string(),
            term: self.term,
            state: self.member_state(),
            applied_op_time: Some(self.my_last_applied_op_time()),
            durable_op_time: Some(self.my_last_durable_op_time()),
            primary_index: self.primary_index,
            election_time: if self.role.is_leader() { self.election_time } else { None },
            heartbeat_message: self.my_member_data().heartbeat_message.clone(),
            ..Default::default()
        };

        if !self.rs_config.is_initialized() {
            resp.config_version = -2;
            return Ok(resp);
        }

        resp.config_version = self.rs_config.version;
        resp.sync_source = self.sync_source.clone();
        resp.sync_source_index = self
            .sync_source
            .as_ref()
            .and_then(|s| self.rs_config.find_member_by_host(s))
            .map(|(i, _)| i);

        if their_config_version < self.rs_config.version {
            resp.config = Some(self.rs_config.clone());
        }

        Ok(resp)
    }

    /// Mark members that have been silent past the election timeout as
    /// down.
    ///
    /// Returns `StepDownSelf` when this node is primary and the
    /// non-stale voting members no longer form a majority, `NoAction`
    /// otherwise.
    pub fn check_member_timeouts(&mut self, now: Date) -> HeartbeatResponseAction {
        let timeout = self.election_timeout();
        for m in &mut self.member_data {
            if m.is_self || m.last_update_stale {
                continue;
            }
            if m.last_update + timeout < now {
                tracing::info!(member = %m.host, last_update = %m.last_update, "member is stale");
                m.last_update_stale = true;
                m.health = MemberHealth::Down;
            }
        }

        if self.role.is_leader() && !self.see_majority_of_voters() {
            tracing::warn!("lost sight of a majority of voters");
            return HeartbeatResponseAction::step_down_self(
                self.self_index.expect("a leader is always in its config"),
            );
        }
        HeartbeatResponseAction::no_action()
    }

    /// Mark the member at `index` down.
    ///
    /// Returns true when this node can no longer see a majority of the
    /// voting members and should therefore consider stepping down.
    pub fn set_member_as_down(&mut self, now: Date, index: usize) -> bool {
        assert!(Some(index) != self.self_index, "cannot mark self down");
        self.member_data[index].set_down_values(now, "failed to receive heartbeat");
        !self.see_majority_of_voters()
    }

    /// The live member with the earliest last-update time, for
    /// diagnostics.
    pub fn get_stalest_live_member(&self) -> Option<(usize, Date)> {
        self.member_data
            .iter()
            .filter(|m| !m.is_self && m.is_up())
            .min_by_key(|m| m.last_update)
            .and_then(|m| m.config_index.map(|i| (i, m.last_update)))
    }

    /// Forget which members have answered since the last restart, so
    /// `latest_known_op_time_since_heartbeat_restart` starts over.
    pub fn restart_heartbeats(&mut self) {
        for m in &mut self.member_data {
            m.updated_since_restart = false;
        }
    }

    /// The freshest applied op-time among live peers, once every peer
    /// has answered (successfully or not) since the last heartbeat
    /// restart. The zero op-time when every peer is down.
    pub fn latest_known_op_time_since_heartbeat_restart(&self) -> Option<OpTime> {
        let mut latest = OpTime::default();
        for m in &self.member_data {
            if m.is_self {
                continue;
            }
            if !m.updated_since_restart {
                tracing::debug!(member = %m.host, "no heartbeat outcome since restart");
                return None;
            }
            if m.is_up() {
                latest = latest.max(m.last_applied);
            }
        }
        tracing::debug!(latest = %latest, "latest known op-time since heartbeat restart");
        Some(latest)
    }
}
