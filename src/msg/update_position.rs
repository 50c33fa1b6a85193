use serde::Deserialize;
use serde::Serialize;

use crate::node::MemberId;
use crate::optime::OpTime;

/// Which shape of `replSetUpdatePosition` to build for the sync source.
#[derive(Debug, Clone, Copy, Default)]
#[derive(PartialEq, Eq)]
pub enum UpdatePositionStyle {
    /// Entries carry both applied and durable op-times.
    #[default]
    New,
    /// Pre-durable-tracking shape: a single op-time per member.
    Old,
}

/// One member's position in an update-position command.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct UpdatePositionEntry {
    pub member_id: MemberId,
    pub applied_op_time: OpTime,
    /// Absent in the old command style.
    pub durable_op_time: Option<OpTime>,
    pub config_version: i64,
}

/// The `replSetUpdatePosition` command a node sends to its sync source,
/// reporting progress for every member it knows about.
#[derive(Debug, Clone, Default)]
#[derive(PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct UpdatePositionCommand {
    pub entries: Vec<UpdatePositionEntry>,
}
