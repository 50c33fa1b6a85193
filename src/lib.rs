//! Topology coordination core for replicated state-machine clusters.
//!
//! This crate is the pure-logic nucleus of a replica set node: it
//! decides what role the node plays (leader, follower, candidate), who
//! the current primary is, which peer to replicate from, when to stand
//! for election, when to step down, and which operations a majority has
//! committed.
//!
//! It is deliberately inert. The [`TopologyCoordinator`] performs no
//! I/O, spawns nothing, holds no locks and never reads a clock: the
//! replication executor that owns it feeds it timestamped events
//! (heartbeat replies, clock ticks, applied/durable progress,
//! administrative commands) and enacts the
//! [`HeartbeatResponseAction`]s and command replies it returns. The
//! only externally persisted datum is the [`LastVote`] record, which the
//! executor must write to stable storage before acknowledging a granted
//! vote on the wire.
//!
//! ```
//! use topocore::{TopologyCoordinator, TopologyOptions, Date};
//!
//! let options = TopologyOptions::default().validate().unwrap();
//! let mut coordinator = TopologyCoordinator::new(options);
//! assert!(coordinator.role().is_follower());
//! let _ = coordinator.check_member_timeouts(Date::from_millis(0));
//! ```

#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::uninlined_format_args)]
#![deny(unused_qualifications)]

mod action;
mod coordinator;
mod display_ext;
mod error;
mod last_vote;
mod member_data;
mod member_state;
mod node;
mod optime;
mod role;
mod time;

pub mod config;
pub mod membership;
pub mod msg;

pub use crate::action::HeartbeatActionKind;
pub use crate::action::HeartbeatResponseAction;
pub use crate::config::OptionsError;
pub use crate::config::TopologyOptions;
pub use crate::coordinator::ChainingPreference;
pub use crate::coordinator::PingStats;
pub use crate::coordinator::PrepareFreezeResponseResult;
pub use crate::coordinator::StartElectionReason;
pub use crate::coordinator::TopologyCoordinator;
pub use crate::coordinator::UpdateTermResult;
pub use crate::error::TopologyError;
pub use crate::last_vote::LastVote;
pub use crate::member_data::MemberData;
pub use crate::member_data::MemberHealth;
pub use crate::member_state::MemberState;
pub use crate::membership::MemberConfig;
pub use crate::membership::ReplicaSetConfig;
pub use crate::membership::SetSettings;
pub use crate::membership::TagPattern;
pub use crate::node::ElectionId;
pub use crate::node::HostAndPort;
pub use crate::node::HostAndPortParseError;
pub use crate::node::MemberId;
pub use crate::node::ReplicationId;
pub use crate::optime::OpTime;
pub use crate::optime::Timestamp;
pub use crate::role::LeaderMode;
pub use crate::role::Role;
pub use crate::time::Date;
