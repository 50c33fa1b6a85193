/// Error variants related to the coordinator options.
#[derive(Debug, thiserror::Error)]
#[derive(PartialEq, Eq)]
pub enum OptionsError {
    /// Failed to parse options from command-line style arguments.
    #[error("ParseError: {reason} while parsing ({args:?})")]
    ParseError { reason: String, args: Vec<String> },

    /// The heartbeat interval must be positive.
    #[error("heartbeat_interval must be > 0")]
    HeartbeatIntervalIs0,

    /// The election timeout must exceed the heartbeat interval.
    #[error("election_timeout({election_timeout}) must be > heartbeat_interval({heartbeat_interval})")]
    ElectionTimeoutLTHeartbeat {
        election_timeout: u64,
        heartbeat_interval: u64,
    },

    /// The heartbeat timeout must be at least the heartbeat interval.
    #[error("heartbeat_timeout({heartbeat_timeout}) must be >= heartbeat_interval({heartbeat_interval})")]
    HeartbeatTimeoutLTInterval {
        heartbeat_timeout: u64,
        heartbeat_interval: u64,
    },
}
