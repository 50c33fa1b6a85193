use pretty_assertions::assert_eq;

use crate::coordinator::testing::*;
use crate::coordinator::TopologyCoordinator;
use crate::config::TopologyOptions;
use crate::member_state::MemberState;
use crate::membership::TagPattern;
use crate::node::HostAndPort;

#[test]
fn test_commit_point_gated_until_first_op_of_term_is_majority_applied() {
    // A freshly elected primary at term 4 must not declare anything
    // from term 3 committed.
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    c.set_my_last_applied_op_time(t0, optime(99, 3));
    become_master(&mut c, 4, optime(100, 4), t0);

    set_peer_up(&mut c, 1, MemberState::Secondary, optime(99, 3), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(99, 3), t0);

    assert_eq!(false, c.update_last_committed_op_time());
    assert_eq!(optime(0, 0), c.last_committed_op_time());

    // Once the peers apply the first op of our term, it commits.
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(100, 4), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(100, 4), t0);

    assert_eq!(true, c.update_last_committed_op_time());
    assert_eq!(optime(100, 4), c.last_committed_op_time());
}

#[test]
fn test_commit_point_is_the_majority_nth_op_time() {
    let t0 = date(0);
    let mut c = coordinator(5, t0);
    become_master(&mut c, 2, optime(10, 2), t0);
    c.set_my_last_applied_op_time(t0, optime(50, 2));

    set_peer_up(&mut c, 1, MemberState::Secondary, optime(40, 2), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(30, 2), t0);
    set_peer_up(&mut c, 3, MemberState::Secondary, optime(20, 2), t0);
    set_peer_up(&mut c, 4, MemberState::Secondary, optime(10, 2), t0);

    // Majority of 5 is 3: the third-largest op-time is (30, 2).
    assert_eq!(true, c.update_last_committed_op_time());
    assert_eq!(optime(30, 2), c.last_committed_op_time());
}

#[test]
fn test_commit_point_uses_durable_op_times_when_journaling() {
    let t0 = date(0);
    let mut cfg = config(3, 1);
    cfg.write_concern_majority_journal_default = true;
    let mut c = TopologyCoordinator::new(TopologyOptions::default().validate().unwrap());
    c.update_config(cfg, Some(0), t0);
    c.set_follower_mode(MemberState::Secondary);
    become_master(&mut c, 2, optime(10, 2), t0);
    c.set_my_last_applied_op_time(t0, optime(50, 2));
    c.set_my_last_durable_op_time(t0, optime(50, 2));

    set_peer_up(&mut c, 1, MemberState::Secondary, optime(40, 2), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(40, 2), t0);
    c.member_data[1].last_durable = optime(20, 2);
    c.member_data[2].last_durable = optime(20, 2);

    assert_eq!(true, c.update_last_committed_op_time());
    assert_eq!(optime(20, 2), c.last_committed_op_time());
}

#[test]
fn test_commit_point_is_monotonic() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);

    assert_eq!(true, c.advance_last_committed_op_time(optime(30, 1)));
    assert_eq!(false, c.advance_last_committed_op_time(optime(20, 1)));
    assert_eq!(false, c.advance_last_committed_op_time(optime(30, 1)));
    assert_eq!(optime(30, 1), c.last_committed_op_time());

    // A follower recomputation cannot move it backwards either.
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(25, 1), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(25, 1), t0);
    assert_eq!(false, c.update_last_committed_op_time());
    assert_eq!(optime(30, 1), c.last_committed_op_time());
}

#[test]
fn test_have_num_nodes_reached_op_time() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    c.set_my_last_applied_op_time(t0, optime(30, 1));
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(20, 1), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(10, 1), t0);

    assert_eq!(true, c.have_num_nodes_reached_op_time(optime(20, 1), 2, false));
    assert_eq!(false, c.have_num_nodes_reached_op_time(optime(20, 1), 3, false));
    assert_eq!(true, c.have_num_nodes_reached_op_time(optime(10, 1), 3, false));

    // Durable op-times lag the applied ones here.
    assert_eq!(false, c.have_num_nodes_reached_op_time(optime(30, 1), 1, true));
}

#[test]
fn test_have_tagged_nodes_reached_op_time() {
    let t0 = date(0);
    let mut cfg = config(3, 1);
    cfg.members[0].tags = maplit::btreemap! {"dc".to_string() => "east".to_string()};
    cfg.members[1].tags = maplit::btreemap! {"dc".to_string() => "west".to_string()};
    cfg.members[2].tags = maplit::btreemap! {"dc".to_string() => "east".to_string()};

    let mut c = TopologyCoordinator::new(TopologyOptions::default().validate().unwrap());
    c.update_config(cfg, Some(0), t0);
    c.set_follower_mode(MemberState::Secondary);
    c.set_my_last_applied_op_time(t0, optime(30, 1));

    let two_dcs = TagPattern::new([("dc", 2)]);

    // Only the east member (self) has the op.
    assert_eq!(false, c.have_tagged_nodes_reached_op_time(optime(30, 1), &two_dcs, false));

    // The west member catches up: two distinct dc values.
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(30, 1), t0);
    assert_eq!(true, c.have_tagged_nodes_reached_op_time(optime(30, 1), &two_dcs, false));
}

#[test]
fn test_get_hosts_written_to() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    c.set_my_last_applied_op_time(t0, optime(30, 1));
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(30, 1), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(10, 1), t0);

    let hosts = c.get_hosts_written_to(optime(30, 1), false, false);
    assert_eq!(vec![host(1), host(2)], hosts);

    let hosts = c.get_hosts_written_to(optime(30, 1), false, true);
    assert_eq!(vec![host(2)], hosts);

    let hosts: Vec<HostAndPort> = c.get_hosts_written_to(optime(31, 1), false, false);
    assert!(hosts.is_empty());
}
