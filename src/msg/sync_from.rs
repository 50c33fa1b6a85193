use serde::Deserialize;
use serde::Serialize;

use crate::node::HostAndPort;

/// Reply to a `replSetSyncFrom` command.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct SyncFromResponse {
    /// The sync source in use before this command took effect.
    pub prev_sync_target: Option<HostAndPort>,
    pub sync_from_requested: HostAndPort,
    /// Advisory only; the target was accepted anyway.
    pub warning: Option<String>,
}
