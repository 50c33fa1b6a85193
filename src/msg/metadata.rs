use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::optime::OpTime;

/// Replication metadata attached to command replies between members:
/// the responder's term, commit point and topology coordinates.
///
/// Indexes are config indexes, `-1` when absent, as on the wire.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetMetadata {
    pub term: u64,
    pub last_op_committed: OpTime,
    pub last_op_visible: OpTime,
    pub config_version: i64,
    pub primary_index: i64,
    pub sync_source_index: i64,
    pub is_primary: bool,
}

impl fmt::Display for ReplSetMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "meta{{t{} committed:{} v{} primary:{}}}",
            self.term, self.last_op_committed, self.config_version, self.primary_index
        )
    }
}

/// Metadata attached to oplog query replies, used by sync-source
/// re-evaluation.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct OplogQueryMetadata {
    pub last_op_committed: OpTime,
    pub last_op_applied: OpTime,
    /// Rollback id of the responder.
    pub rbid: i32,
    pub primary_index: i64,
    pub sync_source_index: i64,
}

impl OplogQueryMetadata {
    pub fn has_sync_source(&self) -> bool {
        self.sync_source_index >= 0
    }
}
