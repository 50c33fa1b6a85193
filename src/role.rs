use std::fmt;

/// The mode a node is in while its role is [`Role::Leader`].
///
/// Legal transitions:
///
/// ```text
/// (follower) --win election--> LeaderElect --drain complete--> Master
/// Master --stepdown cmd begins--> AttemptingStepDown
/// AttemptingStepDown --abort--> Master
/// AttemptingStepDown --hb stepdown supersedes--> SteppingDown
/// Master | LeaderElect --unconditional stepdown--> SteppingDown
/// SteppingDown | AttemptingStepDown --finish--> (follower)
/// ```
#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq)]
pub enum LeaderMode {
    /// Elected leader, but not yet able to accept writes.
    LeaderElect,
    /// Fully established leader that accepts writes.
    Master,
    /// In a stepdown attempt (command-driven) that may fail.
    AttemptingStepDown,
    /// In an unconditional stepdown that must complete.
    SteppingDown,
}

impl LeaderMode {
    /// Whether `next` is a legal successor mode while remaining leader.
    pub(crate) fn can_transition_to(&self, next: LeaderMode) -> bool {
        use LeaderMode::*;
        matches!(
            (self, next),
            (LeaderElect, Master)
                | (LeaderElect, SteppingDown)
                | (Master, AttemptingStepDown)
                | (Master, SteppingDown)
                | (AttemptingStepDown, Master)
                | (AttemptingStepDown, SteppingDown)
        )
    }
}

impl fmt::Display for LeaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeaderMode::LeaderElect => "leader-elect",
            LeaderMode::Master => "master",
            LeaderMode::AttemptingStepDown => "attempting-stepdown",
            LeaderMode::SteppingDown => "stepping-down",
        };
        write!(f, "{}", s)
    }
}

/// The role a node plays in the replication protocol.
///
/// The leader mode is folded into the leader variant so that a non-leader
/// with a leader mode is unrepresentable.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq)]
pub enum Role {
    #[default]
    Follower,
    Candidate,
    Leader(LeaderMode),
}

impl Role {
    pub fn is_leader(&self) -> bool {
        matches!(self, Role::Leader(_))
    }

    pub fn is_follower(&self) -> bool {
        *self == Role::Follower
    }

    pub fn is_candidate(&self) -> bool {
        *self == Role::Candidate
    }

    pub fn leader_mode(&self) -> Option<LeaderMode> {
        match self {
            Role::Leader(mode) => Some(*mode),
            _ => None,
        }
    }

    /// Only a fully established master accepts writes.
    pub fn can_accept_writes(&self) -> bool {
        *self == Role::Leader(LeaderMode::Master)
    }

    /// True while either flavour of stepdown is in progress.
    pub fn is_stepping_down(&self) -> bool {
        matches!(
            self,
            Role::Leader(LeaderMode::AttemptingStepDown) | Role::Leader(LeaderMode::SteppingDown)
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Follower => write!(f, "follower"),
            Role::Candidate => write!(f, "candidate"),
            Role::Leader(mode) => write!(f, "leader({})", mode),
        }
    }
}
