//! Wire-facing request and reply types exchanged between members.
//!
//! These are plain data carriers; the on-wire codec that frames them is
//! an external collaborator. Field sets match the replica-set protocol.

mod fresh_elect;
mod heartbeat_args;
mod heartbeat_response;
mod is_master;
mod metadata;
mod request_votes;
mod status;
mod sync_from;
mod update_position;

pub use fresh_elect::ReplSetElectArgs;
pub use fresh_elect::ReplSetElectResponse;
pub use fresh_elect::ReplSetFreshArgs;
pub use fresh_elect::ReplSetFreshResponse;
pub use heartbeat_args::ReplSetHeartbeatArgs;
pub use heartbeat_args::ReplSetHeartbeatArgsV1;
pub use heartbeat_response::ReplSetHeartbeatResponse;
pub use is_master::IsMasterResponse;
pub use is_master::LastWrite;
pub use metadata::OplogQueryMetadata;
pub use metadata::ReplSetMetadata;
pub use request_votes::ReplSetRequestVotesArgs;
pub use request_votes::ReplSetRequestVotesResponse;
pub use status::MemberStatus;
pub use status::ReplSetStatusArgs;
pub use status::ReplSetStatusResponse;
pub use status::StatusOpTimes;
pub use sync_from::SyncFromResponse;
pub use update_position::UpdatePositionCommand;
pub use update_position::UpdatePositionEntry;
pub use update_position::UpdatePositionStyle;
