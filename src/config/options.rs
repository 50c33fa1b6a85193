//! Process-wide coordinator tunables.

use std::time::Duration;

use clap::Parser;

use crate::config::error::OptionsError;

/// Immutable tunables for a [`TopologyCoordinator`], passed at
/// construction.
///
/// The per-set configuration installed through `update_config` may
/// override the timing values; these are the process defaults used until
/// then, and for everything the set configuration does not carry.
///
/// The default values are sensible for a local-network deployment; all
/// durations are in milliseconds unless the field name says otherwise.
#[derive(Clone, Debug, Parser)]
#[derive(PartialEq, Eq)]
pub struct TopologyOptions {
    /// The interval between heartbeats sent to each peer.
    #[clap(long, env = "TOPO_HEARTBEAT_INTERVAL", default_value = "2000")]
    pub heartbeat_interval: u64,

    /// How long to wait for a single heartbeat reply before treating the
    /// attempt as failed.
    #[clap(long, env = "TOPO_HEARTBEAT_TIMEOUT", default_value = "10000")]
    pub heartbeat_timeout: u64,

    /// How long a member may stay silent before it is considered down,
    /// and how long a follower waits without seeing a primary before
    /// standing for election.
    #[clap(long, env = "TOPO_ELECTION_TIMEOUT", default_value = "10000")]
    pub election_timeout: u64,

    /// The maximum number of seconds a sync source may trail the best
    /// candidate before we abandon it.
    #[clap(long, env = "TOPO_MAX_SYNC_SOURCE_LAG_SECS", default_value = "30")]
    pub max_sync_source_lag_secs: u64,

    /// How close (in seconds of oplog timestamp) a higher-priority node
    /// must be to the primary before it may schedule a priority takeover.
    #[clap(long, default_value = "2")]
    pub priority_takeover_freshness_window_secs: u64,

    /// How long a node that is ahead of a catching-up primary waits
    /// before attempting a catchup takeover.
    #[clap(long, default_value = "30000")]
    pub catchup_takeover_delay: u64,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        <Self as Parser>::parse_from(Vec::<&'static str>::new())
    }
}

impl TopologyOptions {
    /// Build a `TopologyOptions` instance from a series of command line
    /// arguments.
    pub fn build(args: &[&str]) -> Result<TopologyOptions, OptionsError> {
        let options = <Self as Parser>::try_parse_from(args).map_err(|e| OptionsError::ParseError {
            reason: e.to_string(),
            args: args.iter().map(|x| x.to_string()).collect(),
        })?;

        options.validate()
    }

    /// Validate the state of this config.
    pub fn validate(self) -> Result<TopologyOptions, OptionsError> {
        if self.heartbeat_interval == 0 {
            return Err(OptionsError::HeartbeatIntervalIs0);
        }

        if self.election_timeout <= self.heartbeat_interval {
            return Err(OptionsError::ElectionTimeoutLTHeartbeat {
                election_timeout: self.election_timeout,
                heartbeat_interval: self.heartbeat_interval,
            });
        }

        if self.heartbeat_timeout < self.heartbeat_interval {
            return Err(OptionsError::HeartbeatTimeoutLTInterval {
                heartbeat_timeout: self.heartbeat_timeout,
                heartbeat_interval: self.heartbeat_interval,
            });
        }

        Ok(self)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout)
    }

    pub fn election_timeout(&self) -> Duration {
        Duration::from_millis(self.election_timeout)
    }

    pub fn catchup_takeover_delay(&self) -> Duration {
        Duration::from_millis(self.catchup_takeover_delay)
    }
}
