//! Shared fixtures for coordinator unit tests.

use std::time::Duration;

use crate::config::TopologyOptions;
use crate::coordinator::TopologyCoordinator;
use crate::member_data::MemberHealth;
use crate::member_state::MemberState;
use crate::membership::MemberConfig;
use crate::membership::ReplicaSetConfig;
use crate::node::ElectionId;
use crate::node::HostAndPort;
use crate::node::MemberId;
use crate::optime::OpTime;
use crate::optime::Timestamp;
use crate::role::Role;
use crate::time::Date;

pub(crate) const SET_NAME: &str = "rs0";

pub(crate) fn optime(secs: u32, term: u64) -> OpTime {
    OpTime::new(Timestamp::new(secs, 0), term)
}

pub(crate) fn date(millis: u64) -> Date {
    Date::from_millis(millis)
}

pub(crate) fn host(port: u16) -> HostAndPort {
    HostAndPort::new("node", port)
}

pub(crate) fn member(id: i64, port: u16) -> MemberConfig {
    MemberConfig::new(MemberId(id), host(port))
}

/// An n-member PV1 config with ids 0..n on ports 1..=n.
pub(crate) fn config(n: usize, version: i64) -> ReplicaSetConfig {
    let members = (0..n).map(|i| member(i as i64, i as u16 + 1)).collect();
    ReplicaSetConfig::new(SET_NAME, version, 1, members)
}

/// A coordinator with `config(n, 1)` installed at `now`, itself at
/// index 0 as an electable secondary with some applied data.
pub(crate) fn coordinator(n: usize, now: Date) -> TopologyCoordinator {
    let options = TopologyOptions::default().validate().unwrap();
    let mut coord = TopologyCoordinator::new(options);
    coord.update_config(config(n, 1), Some(0), now);
    coord.set_follower_mode(MemberState::Secondary);
    coord.set_my_last_applied_op_time(now, optime(10, 1));
    coord.set_my_last_durable_op_time(now, optime(10, 1));
    coord
}

/// Mark the peer at `index` up with the given state and op-time.
pub(crate) fn set_peer_up(
    coord: &mut TopologyCoordinator,
    index: usize,
    state: MemberState,
    applied: OpTime,
    now: Date,
) {
    let m = &mut coord.member_data[index];
    if m.health != MemberHealth::Up {
        m.up_since = Some(now);
    }
    m.health = MemberHealth::Up;
    m.state = state;
    m.last_heartbeat = Some(now);
    m.last_update = now;
    m.last_update_stale = false;
    m.last_applied = applied;
    m.last_durable = applied;
    m.updated_since_restart = true;
    m.reported_term = applied.term;
    if state.is_primary() {
        coord.primary_index = Some(index);
    }
}

/// Walk a follower through candidacy into an established master.
pub(crate) fn become_master(coord: &mut TopologyCoordinator, term: u64, first_op: OpTime, now: Date) {
    assert!(coord.role == Role::Follower);
    coord.term = term;
    coord.role = Role::Candidate;
    coord.vote_for_myself_v1();
    coord.process_win_election(ElectionId::from_term(term), first_op.timestamp);
    coord.complete_transition_to_primary(first_op);
    coord.set_my_last_applied_op_time(now, first_op);
    coord.set_my_last_durable_op_time(now, first_op);
}

/// A heartbeat reply as a healthy secondary would send it.
pub(crate) fn hb_secondary(term: u64, config_version: i64, applied: OpTime) -> crate::msg::ReplSetHeartbeatResponse {
    crate::msg::ReplSetHeartbeatResponse {
        set_name: SET_NAME.to_string(),
        term,
        state: MemberState::Secondary,
        config_version,
        applied_op_time: Some(applied),
        durable_op_time: Some(applied),
        ..Default::default()
    }
}

/// A heartbeat reply as an established primary would send it.
pub(crate) fn hb_primary(term: u64, config_version: i64, applied: OpTime) -> crate::msg::ReplSetHeartbeatResponse {
    crate::msg::ReplSetHeartbeatResponse {
        state: MemberState::Primary,
        election_time: Some(applied.timestamp),
        ..hb_secondary(term, config_version, applied)
    }
}

/// Default network round trip used by heartbeat tests.
pub(crate) fn rtt() -> Duration {
    Duration::from_millis(10)
}
