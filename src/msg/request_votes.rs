use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::optime::OpTime;

/// Arguments of a protocol-version-1 vote request.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetRequestVotesArgs {
    pub set_name: String,
    /// A dry run probes whether the vote would be granted without
    /// binding the voter; no vote record is written.
    pub dry_run: bool,
    pub term: u64,
    pub candidate_index: i64,
    pub config_version: i64,
    pub last_committed_op: OpTime,
}

impl fmt::Display for ReplSetRequestVotesArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vote-req{{{} t{} cand:{} v{} op:{}{}}}",
            self.set_name,
            self.term,
            self.candidate_index,
            self.config_version,
            self.last_committed_op,
            if self.dry_run { " dry-run" } else { "" }
        )
    }
}

/// Reply to a vote request.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct ReplSetRequestVotesResponse {
    pub term: u64,
    pub vote_granted: bool,
    pub reason: String,
}

impl fmt::Display for ReplSetRequestVotesResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vote-resp{{t{} granted:{} {}}}",
            self.term, self.vote_granted, self.reason
        )
    }
}
