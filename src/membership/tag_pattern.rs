use serde::Deserialize;
use serde::Serialize;

/// One constraint of a tag pattern: at least `min_count` distinct values
/// of the tag `key` must be carried by members that satisfy the check.
#[derive(Debug, Clone)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct TagConstraint {
    pub key: String,
    pub min_count: usize,
}

/// A write-concern tag pattern, e.g. `{"dc": 2, "rack": 3}`.
///
/// A pattern is satisfied by a set of members when every constraint is:
/// for each constraint, the members must between them cover at least
/// `min_count` distinct values of the constraint's tag key.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct TagPattern {
    pub constraints: Vec<TagConstraint>,
}

impl TagPattern {
    pub fn new(constraints: impl IntoIterator<Item = (impl ToString, usize)>) -> Self {
        Self {
            constraints: constraints
                .into_iter()
                .map(|(key, min_count)| TagConstraint {
                    key: key.to_string(),
                    min_count,
                })
                .collect(),
        }
    }
}
