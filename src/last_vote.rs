use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// The durably persisted record of the most recent term and candidate
/// this node voted for.
///
/// The coordinator only mutates its in-memory copy; the executor must
/// write the record to stable storage before a granted vote is
/// acknowledged on the wire, and feed the stored value back through
/// `load_last_vote` at startup.
#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct LastVote {
    pub term: u64,
    /// Config index of the candidate voted for; `-1` when no vote has
    /// been cast yet.
    pub candidate_index: i64,
}

impl Default for LastVote {
    fn default() -> Self {
        Self {
            term: 0,
            candidate_index: -1,
        }
    }
}

impl LastVote {
    pub fn new(term: u64, candidate_index: i64) -> Self {
        Self {
            term,
            candidate_index,
        }
    }
}

impl fmt::Display for LastVote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vote:{}-{}", self.term, self.candidate_index)
    }
}
