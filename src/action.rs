use std::fmt;

use crate::time::Date;

/// What kind of follow-up the executor must perform after feeding an
/// event to the coordinator.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq)]
pub enum HeartbeatActionKind {
    #[default]
    NoAction,
    /// The event carried a newer config; validate it and call
    /// `update_config`.
    Reconfig,
    /// The coordinator became a candidate; run an election and report
    /// back with `process_win_election` or `process_lose_election`.
    StartElection,
    /// This node must relinquish primaryship; drive the unconditional
    /// stepdown pair under the global exclusive lock.
    StepDownSelf,
    /// Ask the remote primary identified by `target_index` to step down.
    StepDownRemotePrimary,
    /// This node outranks the current primary; schedule a takeover
    /// election at `takeover_at`.
    PriorityTakeover,
    /// The current primary is still catching up and this node is ahead;
    /// schedule a takeover election at `takeover_at`.
    CatchupTakeover,
    /// Lone-voter set with nothing in the way: stand for election now.
    StepUpSelf,
}

/// The single instruction the coordinator returns to the executor per
/// ingested heartbeat event.
///
/// Every action also carries the time the next heartbeat to the peer in
/// question should start.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
pub struct HeartbeatResponseAction {
    pub kind: HeartbeatActionKind,
    pub next_heartbeat_start: Date,
    /// Config index of the remote primary for `StepDownRemotePrimary`,
    /// or of this node for `StepDownSelf`.
    pub target_index: Option<usize>,
    /// When a scheduled takeover election should fire.
    pub takeover_at: Option<Date>,
}

impl HeartbeatResponseAction {
    pub fn no_action() -> Self {
        Self::default()
    }

    pub fn reconfig() -> Self {
        Self {
            kind: HeartbeatActionKind::Reconfig,
            ..Default::default()
        }
    }

    pub fn start_election() -> Self {
        Self {
            kind: HeartbeatActionKind::StartElection,
            ..Default::default()
        }
    }

    pub fn step_down_self(self_index: usize) -> Self {
        Self {
            kind: HeartbeatActionKind::StepDownSelf,
            target_index: Some(self_index),
            ..Default::default()
        }
    }

    pub fn step_down_remote_primary(primary_index: usize) -> Self {
        Self {
            kind: HeartbeatActionKind::StepDownRemotePrimary,
            target_index: Some(primary_index),
            ..Default::default()
        }
    }

    pub fn priority_takeover(takeover_at: Date) -> Self {
        Self {
            kind: HeartbeatActionKind::PriorityTakeover,
            takeover_at: Some(takeover_at),
            ..Default::default()
        }
    }

    pub fn catchup_takeover(takeover_at: Date) -> Self {
        Self {
            kind: HeartbeatActionKind::CatchupTakeover,
            takeover_at: Some(takeover_at),
            ..Default::default()
        }
    }

    pub fn step_up_self() -> Self {
        Self {
            kind: HeartbeatActionKind::StepUpSelf,
            ..Default::default()
        }
    }

    pub(crate) fn with_next_heartbeat(mut self, at: Date) -> Self {
        self.next_heartbeat_start = at;
        self
    }
}

impl fmt::Display for HeartbeatResponseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(t) = self.target_index {
            write!(f, "(target:{})", t)?;
        }
        if let Some(at) = self.takeover_at {
            write!(f, "(at:{})", at)?;
        }
        Ok(())
    }
}
