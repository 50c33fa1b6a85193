//! Error types surfaced to the executor.
//!
//! Every condition a caller can act on is returned as a value; the
//! executor translates these to wire errors. Internal invariant
//! violations (illegal leader-mode transition, negative maintenance
//! count, finishing an election that was never started) are programmer
//! errors and panic instead of corrupting state.

use crate::node::HostAndPort;

/// Error kinds returned across the executor boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// A remote message carried a different replica set name than ours.
    #[error("replica set names do not match, ours: {ours}; remote node's: {theirs}")]
    InconsistentReplicaSetNames { ours: String, theirs: String },

    /// A remote message used a different replication protocol version.
    #[error("replica set protocol versions do not match, ours: {ours}; remote node's: {theirs}")]
    IncompatibleProtocolVersion { ours: u8, theirs: u8 },

    /// The installed or offered replica set configuration is unusable.
    #[error("invalid replica set config: {reason}")]
    InvalidReplicaSetConfig { reason: String },

    /// The operation requires this node to be primary.
    #[error("not primary: {reason}")]
    NotPrimary { reason: String },

    /// The operation requires this node to be an electable secondary.
    #[error("not secondary: {reason}")]
    NotSecondary { reason: String },

    /// No replica set configuration has been installed yet.
    #[error("no replica set config has been received yet")]
    NotYetInitialized,

    /// A stepdown of some kind is already running.
    #[error("conflicting operation in progress: {reason}")]
    ConflictingOperationInProgress { reason: String },

    /// The caller's term has been superseded.
    #[error("term {observed} is stale, current term is {current}")]
    StaleTerm { observed: u64, current: u64 },

    /// A stepdown wait deadline passed without the conditions being met.
    #[error("{reason}")]
    ExceededTimeLimit { reason: String },

    /// The named member is not present in the configuration.
    #[error("could not find member {member} in replica set config")]
    NodeNotFound { member: String },

    /// This node may not stand for election.
    #[error("node is not electable: {reason}")]
    Unelectable { reason: String },

    /// A command argument is not acceptable in the current topology.
    #[error("{reason}")]
    InvalidOptions { reason: String },

    /// The requested peer is not reachable from this node's view.
    #[error("cannot reach {host}")]
    HostUnreachable { host: HostAndPort },

    /// A peer rejected our credentials.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },
}

impl TopologyError {
    pub(crate) fn invalid_config(reason: impl ToString) -> Self {
        TopologyError::InvalidReplicaSetConfig {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn not_primary(reason: impl ToString) -> Self {
        TopologyError::NotPrimary {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn not_secondary(reason: impl ToString) -> Self {
        TopologyError::NotSecondary {
            reason: reason.to_string(),
        }
    }
}
