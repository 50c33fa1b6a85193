use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// The `(host, port)` pair used as the peer key throughout the crate.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct HostAndPort {
    pub host: String,
    pub port: u16,
}

impl HostAndPort {
    pub fn new(host: impl ToString, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

impl fmt::Display for HostAndPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Error parsing a `host:port` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid host:port string: '{invalid}'")]
pub struct HostAndPortParseError {
    pub invalid: String,
}

impl FromStr for HostAndPort {
    type Err = HostAndPortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || HostAndPortParseError {
            invalid: s.to_string(),
        };

        let (host, port) = s.rsplit_once(':').ok_or_else(err)?;
        if host.is_empty() {
            return Err(err());
        }
        let port = port.parse::<u16>().map_err(|_| err())?;
        Ok(HostAndPort::new(host, port))
    }
}

/// The identifier a member carries in the replica set configuration.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct MemberId(pub i64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Legacy replication id keying member records that predate member ids.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct ReplicationId(pub u64);

impl fmt::Display for ReplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rid:{}", self.0)
    }
}

/// Identifier of a single election, unique per elected primary.
///
/// Derived from the term, so two nodes reporting themselves primary at the
/// same term report the same election id.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct ElectionId(pub u64);

impl ElectionId {
    pub fn from_term(term: u64) -> Self {
        ElectionId(term)
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "election:{}", self.0)
    }
}
