use anyhow::Result;
use pretty_assertions::assert_eq;

use crate::coordinator::testing::*;
use crate::coordinator::PrepareFreezeResponseResult;
use crate::coordinator::TopologyCoordinator;
use crate::config::TopologyOptions;
use crate::error::TopologyError;
use crate::member_state::MemberState;
use crate::role::LeaderMode;
use crate::role::Role;

/// A three-node set with self as master at term 2, peers up as
/// secondaries trailing at `peer_applied`.
fn master_with_peers(peer_applied: crate::optime::OpTime) -> TopologyCoordinator {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    become_master(&mut c, 2, optime(100, 2), t0);
    set_peer_up(&mut c, 1, MemberState::Secondary, peer_applied, t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, peer_applied, t0);
    c
}

#[test]
fn test_stepdown_waits_for_a_caught_up_secondary() -> Result<()> {
    // Peers trail the primary: the attempt must wait.
    let mut c = master_with_peers(optime(50, 1));
    let now = date(1_000);

    c.prepare_for_step_down_attempt()?;
    assert!(c.is_stepping_down());
    assert_eq!(false, c.can_accept_writes());

    let done = c.attempt_step_down(2, now, date(6_000), date(60_000), false)?;
    assert_eq!(false, done);
    assert!(c.role().is_leader());

    // A peer catches up: the same attempt now succeeds.
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(100, 2), date(2_000));
    let done = c.attempt_step_down(2, date(2_000), date(6_000), date(60_000), false)?;
    assert_eq!(true, done);
    assert_eq!(Role::Follower, c.role());
    assert_eq!(date(60_000), c.step_down_time());

    Ok(())
}

#[test]
fn test_forced_stepdown_succeeds_immediately_after_wait() -> Result<()> {
    let mut c = master_with_peers(optime(50, 1));

    c.prepare_for_step_down_attempt()?;
    let done = c.attempt_step_down(2, date(10_000), date(5_000), date(60_000), true)?;
    assert_eq!(true, done);
    assert_eq!(Role::Follower, c.role());
    assert_eq!(date(60_000), c.step_down_time());
    Ok(())
}

#[test]
fn test_stepdown_needs_an_electable_caught_up_peer() -> Result<()> {
    // Both peers are caught up but neither is electable.
    let t0 = date(0);
    let mut cfg = config(3, 1);
    cfg.members[1].priority = 0.0;
    cfg.members[2].priority = 0.0;
    let mut c = TopologyCoordinator::new(TopologyOptions::default().validate().unwrap());
    c.update_config(cfg, Some(0), t0);
    c.set_follower_mode(MemberState::Secondary);
    become_master(&mut c, 2, optime(100, 2), t0);
    set_peer_up(&mut c, 1, MemberState::Secondary, optime(100, 2), t0);
    set_peer_up(&mut c, 2, MemberState::Secondary, optime(100, 2), t0);

    assert_eq!(false, c.is_safe_to_step_down());
    c.prepare_for_step_down_attempt()?;
    let done = c.attempt_step_down(2, date(1_000), date(6_000), date(60_000), false)?;
    assert_eq!(false, done);
    Ok(())
}

#[test]
fn test_stepdown_attempt_times_out() -> Result<()> {
    let mut c = master_with_peers(optime(50, 1));

    c.prepare_for_step_down_attempt()?;
    let err = c.attempt_step_down(2, date(7_000), date(6_000), date(60_000), false).unwrap_err();
    assert!(matches!(err, TopologyError::ExceededTimeLimit { .. }));
    Ok(())
}

#[test]
fn test_stepdown_attempt_abandoned_on_stale_term() -> Result<()> {
    let mut c = master_with_peers(optime(50, 1));

    c.prepare_for_step_down_attempt()?;
    c.term = 3;
    let err = c.attempt_step_down(2, date(1_000), date(6_000), date(60_000), false).unwrap_err();
    assert_eq!(
        TopologyError::StaleTerm {
            observed: 2,
            current: 3
        },
        err
    );
    Ok(())
}

#[test]
fn test_only_one_stepdown_attempt_at_a_time() -> Result<()> {
    let mut c = master_with_peers(optime(100, 2));

    c.prepare_for_step_down_attempt()?;
    let err = c.prepare_for_step_down_attempt().unwrap_err();
    assert!(matches!(err, TopologyError::ConflictingOperationInProgress { .. }));

    c.abort_attempted_step_down_if_needed();
    assert_eq!(Role::Leader(LeaderMode::Master), c.role());
    c.prepare_for_step_down_attempt()?;
    Ok(())
}

#[test]
fn test_stepdown_attempt_rejected_while_not_master() {
    let t0 = date(0);
    let mut c = coordinator(3, t0);
    let err = c.prepare_for_step_down_attempt().unwrap_err();
    assert!(matches!(err, TopologyError::NotPrimary { .. }));

    // A leader-elect cannot step down conditionally either.
    c.role = Role::Candidate;
    c.process_win_election(crate::node::ElectionId::from_term(1), optime(1, 1).timestamp);
    let err = c.prepare_for_step_down_attempt().unwrap_err();
    assert!(matches!(err, TopologyError::NotPrimary { .. }));
}

#[test]
fn test_unconditional_stepdown_supersedes_attempt() -> Result<()> {
    let mut c = master_with_peers(optime(50, 1));

    c.prepare_for_step_down_attempt()?;
    assert_eq!(true, c.prepare_for_unconditional_step_down());
    assert_eq!(Role::Leader(LeaderMode::SteppingDown), c.role());

    // The attempt's caller now sees its attempt fail.
    let err = c.attempt_step_down(2, date(1_000), date(6_000), date(60_000), false).unwrap_err();
    assert!(matches!(err, TopologyError::NotPrimary { .. }));

    // A second unconditional request is a no-op.
    assert_eq!(false, c.prepare_for_unconditional_step_down());

    c.finish_unconditional_step_down();
    assert_eq!(Role::Follower, c.role());
    assert_eq!(None, c.current_primary_index());
    Ok(())
}

#[test]
fn test_freeze_and_unfreeze() -> Result<()> {
    let t0 = date(0);
    let mut c = coordinator(3, t0);

    let res = c.prepare_freeze_response(t0, std::time::Duration::from_secs(30))?;
    assert_eq!(PrepareFreezeResponseResult::NoAction, res);
    assert_eq!(date(30_000), c.step_down_time());

    // Unfreeze clears the window.
    let res = c.prepare_freeze_response(date(1_000), std::time::Duration::ZERO)?;
    assert_eq!(PrepareFreezeResponseResult::NoAction, res);
    assert_eq!(date(1_000), c.step_down_time());
    Ok(())
}

#[test]
fn test_freeze_rejected_for_primary_and_candidate() {
    let mut c = master_with_peers(optime(100, 2));
    let err = c.prepare_freeze_response(date(0), std::time::Duration::from_secs(30)).unwrap_err();
    assert!(matches!(err, TopologyError::NotSecondary { .. }));

    let mut c = coordinator(3, date(0));
    c.role = Role::Candidate;
    assert!(c.prepare_freeze_response(date(0), std::time::Duration::from_secs(30)).is_err());
}

#[test]
fn test_unfreezing_single_node_set_elects_self() -> Result<()> {
    let t0 = date(0);
    let mut c = TopologyCoordinator::new(TopologyOptions::default().validate().unwrap());
    c.update_config(config(1, 1), Some(0), t0);
    c.set_follower_mode(MemberState::Secondary);
    c.set_my_last_applied_op_time(t0, optime(10, 1));

    c.prepare_freeze_response(t0, std::time::Duration::from_secs(30))?;
    let res = c.prepare_freeze_response(date(5_000), std::time::Duration::ZERO)?;
    assert_eq!(PrepareFreezeResponseResult::ElectSelf, res);
    Ok(())
}
