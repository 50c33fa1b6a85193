//! The two stepdown paths: the command-driven attempt that may fail, and
//! the heartbeat-driven unconditional stepdown that must complete.

use std::time::Duration;

use crate::coordinator::TopologyCoordinator;
use crate::error::TopologyError;
use crate::role::LeaderMode;
use crate::role::Role;
use crate::time::Date;

/// Outcome of a freeze request that the caller may need to act on.
#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq)]
pub enum PrepareFreezeResponseResult {
    NoAction,
    /// Unfreezing a lone-voter set: stand for election immediately.
    ElectSelf,
}

impl TopologyCoordinator {
    /// Ready the coordinator for a stepdown attempt that may fail.
    ///
    /// Only one stepdown of any kind may run at a time.
    pub fn prepare_for_step_down_attempt(&mut self) -> Result<(), TopologyError> {
        match self.role {
            Role::Leader(LeaderMode::AttemptingStepDown) | Role::Leader(LeaderMode::SteppingDown) => {
                Err(TopologyError::ConflictingOperationInProgress {
                    reason: "a stepdown is already in progress".to_string(),
                })
            }
            Role::Leader(LeaderMode::Master) => {
                self.set_leader_mode(LeaderMode::AttemptingStepDown);
                Ok(())
            }
            Role::Leader(LeaderMode::LeaderElect) => Err(TopologyError::not_primary(
                "cannot step down before the transition to primary completes",
            )),
            _ => Err(TopologyError::not_primary("not currently primary")),
        }
    }

    /// Abort an in-flight stepdown attempt, if one is still ours to
    /// abort. Does nothing when the attempt already finished or an
    /// unconditional stepdown superseded it.
    pub fn abort_attempted_step_down_if_needed(&mut self) {
        if self.role == Role::Leader(LeaderMode::AttemptingStepDown) {
            self.set_leader_mode(LeaderMode::Master);
        }
    }

    /// Try to complete a stepdown attempt.
    ///
    /// Succeeds when `force` is set and `wait_until` has passed, or when
    /// a majority of voting members has caught up to our last applied
    /// op-time and at least one electable member is among them. Returns
    /// `Ok(false)` when waiting longer could still succeed; an error
    /// when the attempt must be abandoned.
    pub fn attempt_step_down(
        &mut self,
        term_at_start: u64,
        now: Date,
        wait_until: Date,
        step_down_until: Date,
        force: bool,
    ) -> Result<bool, TopologyError> {
        if self.role != Role::Leader(LeaderMode::AttemptingStepDown) {
            return Err(TopologyError::not_primary(
                "while waiting for secondaries to catch up, this node stepped down for other reasons",
            ));
        }
        if term_at_start != self.term {
            return Err(TopologyError::StaleTerm {
                observed: term_at_start,
                current: self.term,
            });
        }

        if force && now > wait_until {
            tracing::info!("forced stepdown");
            self.stepdown_until = self.stepdown_until.max(step_down_until);
            self.step_down_self();
            return Ok(true);
        }

        if self.is_safe_to_step_down() {
            tracing::info!("stepping down: a caught-up electable majority exists");
            self.stepdown_until = self.stepdown_until.max(step_down_until);
            self.step_down_self();
            return Ok(true);
        }

        if now >= wait_until {
            return Err(TopologyError::ExceededTimeLimit {
                reason: format!(
                    "no electable secondary caught up as of {}; use force:true to step down anyway",
                    now
                ),
            });
        }

        Ok(false)
    }

    /// Whether the catch-up conditions of a stepdown attempt hold,
    /// ignoring `force`: a caught-up voting majority containing at
    /// least one electable member other than us.
    pub fn is_safe_to_step_down(&self) -> bool {
        let my_applied = self.my_last_applied_op_time();

        let mut caught_up_voters = 0;
        let mut caught_up_electable_peer = false;

        for m in &self.member_data {
            let Some(i) = m.config_index else {
                continue;
            };
            let member = self.rs_config.member(i);

            let caught_up = if m.is_self {
                true
            } else {
                m.is_up() && m.last_applied >= my_applied
            };
            if !caught_up {
                continue;
            }

            if member.is_voter() {
                caught_up_voters += 1;
            }
            if !m.is_self && member.is_electable() {
                caught_up_electable_peer = true;
            }
        }

        caught_up_voters >= self.rs_config.majority_vote_count() && caught_up_electable_peer
    }

    /// Ready the coordinator for a stepdown that must complete.
    ///
    /// Returns false when an unconditional stepdown is already running.
    /// Supersedes an in-flight stepdown attempt, whose caller will then
    /// observe its attempt fail. Must be followed by
    /// `finish_unconditional_step_down` under the global exclusive lock.
    pub fn prepare_for_unconditional_step_down(&mut self) -> bool {
        match self.role {
            Role::Leader(LeaderMode::SteppingDown) => false,
            Role::Leader(_) => {
                self.set_leader_mode(LeaderMode::SteppingDown);
                true
            }
            _ => panic!("cannot step down while {}", self.role),
        }
    }

    /// Complete an unconditional stepdown begun with
    /// `prepare_for_unconditional_step_down`.
    pub fn finish_unconditional_step_down(&mut self) {
        assert!(
            self.role == Role::Leader(LeaderMode::SteppingDown),
            "no unconditional stepdown in progress"
        );
        self.step_down_self();
    }

    /// Relinquish primaryship: the single terminal transition out of
    /// every leader mode.
    fn step_down_self(&mut self) {
        assert!(self.role.is_leader());
        tracing::info!(term = self.term, "stepping down from primary");

        self.role = Role::Follower;
        if self.primary_index == self.self_index {
            self.primary_index = None;
        }
        self.election_id = None;
        self.election_time = None;
        self.first_op_time_of_term = None;
    }

    /// Answer a `replSetFreeze` command: refuse candidacy for
    /// `freeze_for`, or unfreeze when it is zero.
    pub fn prepare_freeze_response(
        &mut self,
        now: Date,
        freeze_for: Duration,
    ) -> Result<PrepareFreezeResponseResult, TopologyError> {
        if self.role.is_leader() || self.role.is_candidate() {
            return Err(TopologyError::not_secondary(
                "cannot freeze node when primary or running for election",
            ));
        }

        if freeze_for.is_zero() {
            tracing::info!("unfreezing");
            self.stepdown_until = now;
            if self.rs_config.is_single_node_set() && self.unelectable_reason(now, false).is_none() {
                return Ok(PrepareFreezeResponseResult::ElectSelf);
            }
            return Ok(PrepareFreezeResponseResult::NoAction);
        }

        if freeze_for == Duration::from_secs(1) {
            tracing::info!("you really want to freeze for only 1 second?");
        }

        self.stepdown_until = self.stepdown_until.max(now + freeze_for);
        tracing::info!(until = %self.stepdown_until, "frozen");
        Ok(PrepareFreezeResponseResult::NoAction)
    }
}
