use pretty_assertions::assert_eq;

use crate::coordinator::testing::*;
use crate::coordinator::ChainingPreference;
use crate::coordinator::TopologyCoordinator;
use crate::config::TopologyOptions;
use crate::error::TopologyError;
use crate::member_state::MemberState;
use crate::msg::OplogQueryMetadata;
use crate::msg::ReplSetMetadata;

fn five_node_coordinator() -> TopologyCoordinator {
    let t0 = date(0);
    let mut c = coordinator(5, t0);
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(50, 1), t0);
    set_peer_up(&mut c, 2, MemberState::Primary, optime(40, 1), t0);
    set_peer_up(&mut c, 3, MemberState::Secondary, optime(60, 1), t0);
    set_peer_up(&mut c, 4, MemberState::Secondary, optime(5, 1), t0);
    c
}

#[test]
fn test_choose_prefers_the_primary() {
    let mut c = five_node_coordinator();

    // The primary qualifies, so it outranks fresher secondaries.
    let chosen = c.choose_new_sync_source(date(100), optime(10, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(3)), chosen);
    assert_eq!(Some(&host(3)), c.sync_source_address());
}

#[test]
fn test_choose_falls_back_to_freshest_secondary() {
    let mut c = five_node_coordinator();

    // The primary is not ahead of what we already fetched.
    let chosen = c.choose_new_sync_source(date(100), optime(45, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(4)), chosen);
}

#[test]
fn test_choose_skips_ineligible_members() {
    let t0 = date(0);

    // Hidden members, arbiters, delayed members and non-index-builders
    // are never sync sources.
    let mut cfg = config(5, 1);
    cfg.members[1].hidden = true;
    cfg.members[2].arbiter_only = true;
    cfg.members[2].priority = 0.0;
    cfg.members[3].slave_delay = std::time::Duration::from_secs(3600);
    cfg.members[4].build_indexes = false;

    let mut c = TopologyCoordinator::new(TopologyOptions::default().validate().unwrap());
    c.update_config(cfg, Some(0), t0);
    c.set_follower_mode(MemberState::Secondary);
    c.set_my_last_applied_op_time(t0, optime(10, 1));
    for i in 1..5 {
        set_peer_up(&mut c, i, MemberState::Secondary, optime(50, 1), t0);
    }

    let chosen = c.choose_new_sync_source(date(100), optime(10, 1), ChainingPreference::AllowChaining);
    assert_eq!(None, chosen);
    assert_eq!(None, c.sync_source_address());
}

#[test]
fn test_choose_honours_blacklist() {
    let mut c = five_node_coordinator();

    // With the freshest secondary blacklisted, the next one is chosen.
    c.blacklist_sync_source(&host(4), date(1_000));
    let chosen = c.choose_new_sync_source(date(100), optime(45, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(2)), chosen);

    // The blacklist window expires on its own.
    let chosen = c.choose_new_sync_source(date(1_000), optime(45, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(4)), chosen);

    // Unblacklisting before the window ends does nothing.
    c.blacklist_sync_source(&host(4), date(5_000));
    c.unblacklist_sync_source(&host(4), date(2_000));
    let chosen = c.choose_new_sync_source(date(2_000), optime(45, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(2)), chosen);

    c.blacklist_sync_source(&host(4), date(5_000));
    c.clear_sync_source_blacklist();
    let chosen = c.choose_new_sync_source(date(2_000), optime(45, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(4)), chosen);
}

#[test]
fn test_choose_uses_forced_index_once() {
    let mut c = five_node_coordinator();

    c.set_force_sync_source_index(4);
    let chosen = c.choose_new_sync_source(date(100), optime(10, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(5)), chosen);

    // The override is consumed.
    let chosen = c.choose_new_sync_source(date(100), optime(10, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(3)), chosen);
}

#[test]
fn test_chaining_disabled_pins_to_primary() {
    let t0 = date(0);
    let mut cfg = config(3, 1);
    cfg.settings.chaining_allowed = false;
    let mut c = TopologyCoordinator::new(TopologyOptions::default().validate().unwrap());
    c.update_config(cfg, Some(0), t0);
    c.set_follower_mode(MemberState::Secondary);
    c.set_my_last_applied_op_time(t0, optime(10, 1));
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(60, 1), t0);
    set_peer_up(&mut c, 2, MemberState::Primary, optime(20, 1), t0);

    // Even though the primary has nothing we have not fetched yet, it
    // is the only legal source.
    let chosen = c.choose_new_sync_source(date(100), optime(30, 1), ChainingPreference::UseConfiguration);
    assert_eq!(Some(host(3)), chosen);

    // The caller may still opt into chaining explicitly, which frees
    // the fresher secondary.
    let chosen = c.choose_new_sync_source(date(100), optime(30, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(2)), chosen);
}

#[test]
fn test_should_change_sync_source_on_source_trouble() {
    let c = five_node_coordinator();
    let meta = ReplSetMetadata::default();

    // Unknown host.
    assert_eq!(
        true,
        c.should_change_sync_source(&crate::node::HostAndPort::new("elsewhere", 1), &meta, None, date(100))
    );

    let mut c = five_node_coordinator();
    c.member_data[1].health = crate::member_data::MemberHealth::Down;
    assert_eq!(true, c.should_change_sync_source(&host(2), &meta, None, date(100)));

    let mut c = five_node_coordinator();
    c.blacklist_sync_source(&host(2), date(1_000));
    assert_eq!(true, c.should_change_sync_source(&host(2), &meta, None, date(100)));
}

#[test]
fn test_should_change_sync_source_when_source_lags_far_behind() {
    let c = five_node_coordinator();

    // Peer 4 is at (5, 1); peer 3 at (60, 1) exceeds it by more than
    // the 30s allowance.
    let oq = OplogQueryMetadata {
        last_op_applied: optime(5, 1),
        primary_index: 2,
        sync_source_index: 2,
        ..Default::default()
    };
    assert_eq!(
        true,
        c.should_change_sync_source(&host(5), &ReplSetMetadata::default(), Some(&oq), date(100))
    );

    // Within the allowance nothing changes.
    let oq = OplogQueryMetadata {
        last_op_applied: optime(40, 1),
        primary_index: 2,
        sync_source_index: 2,
        ..Default::default()
    };
    assert_eq!(
        false,
        c.should_change_sync_source(&host(3), &ReplSetMetadata::default(), Some(&oq), date(100))
    );
}

#[test]
fn test_should_change_sync_source_without_own_source_and_not_ahead() {
    let mut c = five_node_coordinator();
    c.set_my_last_applied_op_time(date(50), optime(50, 1));

    // Source is a secondary with no sync source of its own, at exactly
    // our op-time.
    let oq = OplogQueryMetadata {
        last_op_applied: optime(50, 1),
        primary_index: 2,
        sync_source_index: -1,
        ..Default::default()
    };
    assert_eq!(
        true,
        c.should_change_sync_source(&host(2), &ReplSetMetadata::default(), Some(&oq), date(100))
    );

    // The same shape but ahead of us is fine.
    let oq = OplogQueryMetadata {
        last_op_applied: optime(60, 1),
        primary_index: 2,
        sync_source_index: -1,
        ..Default::default()
    };
    assert_eq!(
        false,
        c.should_change_sync_source(&host(2), &ReplSetMetadata::default(), Some(&oq), date(100))
    );

    // A primary without a sync source is normal.
    let oq = OplogQueryMetadata {
        last_op_applied: optime(40, 1),
        primary_index: 2,
        sync_source_index: -1,
        ..Default::default()
    };
    assert_eq!(
        false,
        c.should_change_sync_source(&host(3), &ReplSetMetadata::default(), Some(&oq), date(100))
    );
}

#[test]
fn test_prepare_sync_from_response() {
    let mut c = five_node_coordinator();
    c.sync_source = Some(host(3));

    let resp = c.prepare_sync_from_response(&host(2)).unwrap();
    assert_eq!(host(2), resp.sync_from_requested);
    assert_eq!(Some(host(3)), resp.prev_sync_target);
    assert_eq!(None, resp.warning);

    // The next selection uses the requested target.
    let chosen = c.choose_new_sync_source(date(100), optime(10, 1), ChainingPreference::AllowChaining);
    assert_eq!(Some(host(2)), chosen);
}

#[test]
fn test_prepare_sync_from_warns_about_stale_target() {
    let mut c = five_node_coordinator();
    c.set_my_last_applied_op_time(date(50), optime(50, 1));

    // Peer 4 is more than 10 seconds behind us.
    let resp = c.prepare_sync_from_response(&host(5)).unwrap();
    assert!(resp.warning.unwrap().contains("behind us"));
}

#[test]
fn test_prepare_sync_from_rejections() {
    let mut c = five_node_coordinator();

    let err = c.prepare_sync_from_response(&host(1)).unwrap_err();
    assert!(matches!(err, TopologyError::InvalidOptions { .. }), "cannot sync from self");

    let err = c.prepare_sync_from_response(&crate::node::HostAndPort::new("elsewhere", 1)).unwrap_err();
    assert!(matches!(err, TopologyError::NodeNotFound { .. }));

    // A down member is unreachable.
    c.member_data[1].health = crate::member_data::MemberHealth::Down;
    let err = c.prepare_sync_from_response(&host(2)).unwrap_err();
    assert_eq!(TopologyError::HostUnreachable { host: host(2) }, err);

    // Arbiters cannot serve as sync sources.
    let t0 = date(0);
    let mut cfg = config(3, 1);
    cfg.members[1].arbiter_only = true;
    cfg.members[1].priority = 0.0;
    let mut c = TopologyCoordinator::new(TopologyOptions::default().validate().unwrap());
    c.update_config(cfg, Some(0), t0);
    c.set_follower_mode(MemberState::Secondary);
    set_peer_up(&mut c, 1, MemberState::Arbiter, optime(0, 0), t0);
    let err = c.prepare_sync_from_response(&host(2)).unwrap_err();
    assert!(matches!(err, TopologyError::InvalidOptions { .. }));

    // Primaries don't sync.
    let mut c = five_node_coordinator();
    become_master(&mut c, 2, optime(100, 2), date(0));
    let err = c.prepare_sync_from_response(&host(2)).unwrap_err();
    assert!(matches!(err, TopologyError::NotSecondary { .. }));
}
