use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::TopologyError;
use crate::membership::MemberConfig;
use crate::node::HostAndPort;
use crate::node::MemberId;

/// Per-set timing and chaining settings carried in the configuration.
///
/// Timing values are optional; when absent the coordinator falls back to
/// its process-wide [`TopologyOptions`](crate::TopologyOptions).
#[derive(Debug, Clone)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct SetSettings {
    /// Whether members may replicate from non-primary peers.
    pub chaining_allowed: bool,

    pub heartbeat_interval_millis: Option<u64>,
    pub heartbeat_timeout_millis: Option<u64>,
    pub election_timeout_millis: Option<u64>,
}

impl Default for SetSettings {
    fn default() -> Self {
        Self {
            chaining_allowed: true,
            heartbeat_interval_millis: None,
            heartbeat_timeout_millis: None,
            election_timeout_millis: None,
        }
    }
}

/// The installed view of the replica set configuration.
///
/// `version` orders reinstalls of the same set; `term` is the term of the
/// primary that committed the config (protocol version 1 only).
#[derive(Debug, Clone, Default)]
#[derive(PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ReplicaSetConfig {
    pub set_name: String,
    pub version: i64,
    pub term: u64,
    pub protocol_version: u8,
    pub members: Vec<MemberConfig>,
    pub write_concern_majority_journal_default: bool,
    pub settings: SetSettings,
}

impl ReplicaSetConfig {
    pub fn new(
        set_name: impl ToString,
        version: i64,
        protocol_version: u8,
        members: Vec<MemberConfig>,
    ) -> Self {
        Self {
            set_name: set_name.to_string(),
            version,
            term: 0,
            protocol_version,
            members,
            write_concern_majority_journal_default: false,
            settings: SetSettings::default(),
        }
    }

    /// An uninstalled default config is not initialized; a node without
    /// an initialized config answers most commands with
    /// `NotYetInitialized`.
    pub fn is_initialized(&self) -> bool {
        self.version >= 1 && !self.members.is_empty()
    }

    pub fn member(&self, index: usize) -> &MemberConfig {
        &self.members[index]
    }

    pub fn find_member_by_host(&self, host: &HostAndPort) -> Option<(usize, &MemberConfig)> {
        self.members.iter().enumerate().find(|(_, m)| &m.host == host)
    }

    pub fn find_member_by_id(&self, id: MemberId) -> Option<(usize, &MemberConfig)> {
        self.members.iter().enumerate().find(|(_, m)| m.id == id)
    }

    pub fn voting_member_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_voter()).count()
    }

    /// The number of votes required to win an election or to retain
    /// majority visibility: more than half of the voting members.
    pub fn majority_vote_count(&self) -> usize {
        self.voting_member_count() / 2 + 1
    }

    /// The number of voting, data-bearing members that must hold an
    /// operation for it to be majority-committed. Arbiters vote but can
    /// never hold data, so they are excluded here.
    pub fn write_majority_count(&self) -> usize {
        let data_bearing_voters = self
            .members
            .iter()
            .filter(|m| m.is_voter() && !m.arbiter_only)
            .count();
        data_bearing_voters / 2 + 1
    }

    /// True when this is a lone-voter set, which elects itself without
    /// waiting for an election timeout.
    pub fn is_single_node_set(&self) -> bool {
        self.voting_member_count() == 1
    }

    pub fn heartbeat_interval(&self, fallback: Duration) -> Duration {
        self.settings
            .heartbeat_interval_millis
            .map(Duration::from_millis)
            .unwrap_or(fallback)
    }

    pub fn heartbeat_timeout(&self, fallback: Duration) -> Duration {
        self.settings
            .heartbeat_timeout_millis
            .map(Duration::from_millis)
            .unwrap_or(fallback)
    }

    pub fn election_timeout(&self, fallback: Duration) -> Duration {
        self.settings
            .election_timeout_millis
            .map(Duration::from_millis)
            .unwrap_or(fallback)
    }

    /// Structural validation of a config offered through `update_config`.
    ///
    /// `self_index` of `None` means this node is not a member, which is
    /// legal (the node reports itself `REMOVED`).
    pub fn validate(&self, self_index: Option<usize>) -> Result<(), TopologyError> {
        if self.set_name.is_empty() {
            return Err(TopologyError::invalid_config("set name must not be empty"));
        }
        if self.version < 1 {
            return Err(TopologyError::invalid_config(format!(
                "config version {} must be >= 1",
                self.version
            )));
        }
        if self.protocol_version > 1 {
            return Err(TopologyError::invalid_config(format!(
                "unsupported protocol version {}",
                self.protocol_version
            )));
        }
        if self.members.is_empty() {
            return Err(TopologyError::invalid_config("config must have at least one member"));
        }
        if let Some(i) = self_index {
            if i >= self.members.len() {
                return Err(TopologyError::invalid_config(format!(
                    "self index {} out of range for {} members",
                    i,
                    self.members.len()
                )));
            }
        }

        let mut ids = BTreeSet::new();
        let mut hosts = BTreeSet::new();
        for m in &self.members {
            if !ids.insert(m.id) {
                return Err(TopologyError::invalid_config(format!("duplicate member id {}", m.id)));
            }
            if !hosts.insert(&m.host) {
                return Err(TopologyError::invalid_config(format!(
                    "duplicate member host {}",
                    m.host
                )));
            }
            if m.votes > 1 {
                return Err(TopologyError::invalid_config(format!(
                    "member {} votes must be 0 or 1",
                    m.id
                )));
            }
            if m.priority < 0.0 {
                return Err(TopologyError::invalid_config(format!(
                    "member {} priority must be >= 0",
                    m.id
                )));
            }
            if m.priority > 0.0 && !m.is_voter() {
                return Err(TopologyError::invalid_config(format!(
                    "member {} has priority but no vote",
                    m.id
                )));
            }
        }

        if self.voting_member_count() == 0 {
            return Err(TopologyError::invalid_config("config must have at least one voter"));
        }

        Ok(())
    }
}

impl fmt::Display for ReplicaSetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{}:{{", self.set_name, self.version)?;
        for (i, m) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", m)?;
        }
        write!(f, "}}")
    }
}
