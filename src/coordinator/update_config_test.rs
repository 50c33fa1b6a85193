use pretty_assertions::assert_eq;

use crate::coordinator::testing::*;
use crate::coordinator::TopologyCoordinator;
use crate::config::TopologyOptions;
use crate::member_state::MemberState;
use crate::membership::ReplicaSetConfig;
use crate::role::Role;

#[test]
fn test_reinstall_keeps_surviving_member_data() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(20, 1), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(30, 1), t0);

    // Member 2 (host 3) is dropped; members 0 and 1 survive.
    let cfg = ReplicaSetConfig::new(SET_NAME, 2, 1, vec![member(0, 1), member(1, 2)]);
    c.update_config(cfg, Some(0), date(1_000));

    assert_eq!(2, c.member_data().len());
    assert_eq!(optime(20, 1), c.member_data()[1].last_applied());
    assert!(c.member_data()[1].is_up());
    // Self data survives reinstalls too.
    assert_eq!(optime(10, 1), c.my_last_applied_op_time());
}

#[test]
fn test_reordered_members_are_tracked_by_id() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(20, 1), t0);

    // The same members in a different order; self moves to index 2.
    let cfg = ReplicaSetConfig::new(SET_NAME, 2, 1, vec![member(2, 3), member(1, 2), member(0, 1)]);
    c.update_config(cfg, Some(2), date(1_000));

    assert_eq!(Some(2), c.self_index());
    assert_eq!(optime(10, 1), c.my_last_applied_op_time());
    // Member 1 kept its liveness record at its new index.
    assert_eq!(optime(20, 1), c.member_data()[1].last_applied());
}

#[test]
fn test_removal_from_config_resets_to_follower() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    become_master(&mut c, 2, optime(100, 2), t0);

    let cfg = ReplicaSetConfig::new(SET_NAME, 2, 1, vec![member(1, 2), member(2, 3)]);
    c.update_config(cfg, None, date(1_000));

    assert_eq!(Role::Follower, c.role());
    assert_eq!(None, c.self_index());
    assert_eq!(MemberState::Removed, c.member_state());
    assert_eq!(None, c.current_primary_index());
    // The trailing self record still carries our progress.
    assert_eq!(optime(100, 2), c.my_last_applied_op_time());
    assert_eq!(3, c.member_data().len());
}

#[test]
fn test_config_with_higher_term_dethrones_leader() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    become_master(&mut c, 2, optime(100, 2), t0);

    let mut cfg = config(3, 2);
    cfg.term = 5;
    c.update_config(cfg, Some(0), date(1_000));

    assert_eq!(Role::Follower, c.role());
    assert_eq!(5, c.term());
    assert_eq!(None, c.election_id());
}

#[test]
fn test_leader_survives_benign_reinstall() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    become_master(&mut c, 2, optime(100, 2), t0);

    let mut cfg = config(3, 2);
    cfg.term = 2;
    c.update_config(cfg, Some(0), date(1_000));

    assert!(c.role().is_leader());
    assert_eq!(Some(0), c.current_primary_index());
}

#[test]
fn test_sync_source_dropped_with_its_member() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    c.sync_source = Some(host(3));

    let cfg = ReplicaSetConfig::new(SET_NAME, 2, 1, vec![member(0, 1), member(1, 2)]);
    c.update_config(cfg, Some(0), date(1_000));
    assert_eq!(None, c.sync_source_address());
}

#[test]
fn test_fresh_node_starts_in_startup() {
    let c = TopologyCoordinator::new(TopologyOptions::default().validate().unwrap());
    assert_eq!(MemberState::Startup, c.member_state());
    assert_eq!(Role::Follower, c.role());
    assert_eq!(0, c.term());
    assert_eq!(None, c.self_index());
}
