//! Synchronous command responses: `ismaster`, `replSetGetStatus`,
//! replication metadata, and the update-position report for the sync
//! source.

use crate::coordinator::TopologyCoordinator;
use crate::error::TopologyError;
use crate::member_data::MemberHealth;
use crate::msg::IsMasterResponse;
use crate::msg::LastWrite;
use crate::msg::MemberStatus;
use crate::msg::OplogQueryMetadata;
use crate::msg::ReplSetMetadata;
use crate::msg::ReplSetStatusArgs;
use crate::msg::ReplSetStatusResponse;
use crate::msg::StatusOpTimes;
use crate::msg::UpdatePositionCommand;
use crate::msg::UpdatePositionEntry;
use crate::msg::UpdatePositionStyle;
use crate::optime::OpTime;

fn index_or_neg1(index: Option<usize>) -> i64 {
    index.map(|i| i as i64).unwrap_or(-1)
}

impl TopologyCoordinator {
    /// Fill an `ismaster` reply from the current topology view.
    pub fn fill_is_master(&self) -> IsMasterResponse {
        let mut resp = IsMasterResponse::default();

        if !self.rs_config.is_initialized() {
            return resp;
        }

        resp.set_name = self.rs_config.set_name.clone();
        resp.set_version = self.rs_config.version;

        for member in &self.rs_config.members {
            if member.hidden {
                continue;
            }
            if member.arbiter_only {
                resp.arbiters.push(member.host.clone());
            } else if member.priority == 0.0 {
                resp.passives.push(member.host.clone());
            } else {
                resp.hosts.push(member.host.clone());
            }
        }

        resp.primary = self.primary_index.map(|i| self.rs_config.member(i).host.clone());
        resp.is_master = self.can_accept_writes();
        resp.secondary = self.member_state().is_secondary();

        if let Some(i) = self.self_index {
            let me = self.rs_config.member(i);
            resp.me = Some(me.host.clone());
            resp.arbiter_only = me.arbiter_only;
            resp.passive = me.priority == 0.0;
            resp.hidden = me.hidden;
            resp.build_indexes = me.build_indexes;
            resp.slave_delay = me.slave_delay;
            resp.tags = me.tags.clone();
        }

        if resp.is_master {
            resp.election_id = self.election_id;
        }

        let my_data = self.my_member_data();
        resp.last_write = Some(LastWrite {
            op_time: my_data.last_applied,
            last_write_date: my_data.last_applied_wall,
            majority_op_time: self.last_committed_op,
        });

        resp
    }

    /// Build a member-by-member `replSetGetStatus` reply.
    pub fn prepare_status_response(
        &self,
        args: &ReplSetStatusArgs,
    ) -> Result<ReplSetStatusResponse, TopologyError> {
        if !self.rs_config.is_initialized() || self.self_index.is_none() {
            return Err(TopologyError::invalid_config(
                "our replica set config is invalid or we are not a member of it",
            ));
        }

        let my_state = self.member_state();
        let mut members = Vec::with_capacity(self.member_data.len());

        for m in &self.member_data {
            let Some(index) = m.config_index else {
                continue;
            };
            let member = self.rs_config.member(index);

            if m.is_self {
                members.push(MemberStatus {
                    id: member.id.0,
                    name: member.host.clone(),
                    health: 1.0,
                    state: my_state.code(),
                    state_str: my_state.to_string(),
                    uptime: args.self_uptime,
                    op_time: Some(m.last_applied),
                    sync_source: self.sync_source.clone(),
                    last_heartbeat_message: m.heartbeat_message.clone(),
                    config_version: self.rs_config.version,
                    is_self: true,
                    election_time: if my_state.is_primary() { self.election_time } else { None },
                    maintenance_mode: (self.maintenance_mode_count > 0)
                        .then_some(self.maintenance_mode_count),
                    ..Default::default()
                });
                continue;
            }

            let health = match m.health {
                MemberHealth::Up => 1.0,
                MemberHealth::Down | MemberHealth::Unknown => 0.0,
            };
            let uptime = m
                .up_since
                .map(|since| args.now.saturating_duration_since(since))
                .unwrap_or_default();

            members.push(MemberStatus {
                id: member.id.0,
                name: member.host.clone(),
                health,
                state: m.state.code(),
                state_str: m.state.to_string(),
                uptime,
                op_time: Some(m.last_applied),
                sync_source: m.sync_source.clone(),
                last_heartbeat: m.last_heartbeat,
                last_heartbeat_recv: m.last_heartbeat_recv,
                last_heartbeat_message: m.heartbeat_message.clone(),
                auth_authenticated: !m.auth_issue,
                ping_ms: self
                    .ping_stats
                    .get(&m.host)
                    .and_then(|s| s.average())
                    .map(|d| d.as_millis() as u64),
                config_version: m.config_version,
                is_self: false,
                election_time: if m.state.is_primary() { m.election_time } else { None },
                maintenance_mode: None,
                ..Default::default()
            });
        }

        Ok(ReplSetStatusResponse {
            set_name: self.rs_config.set_name.clone(),
            date: args.now,
            my_state: my_state.code(),
            term: self.term,
            sync_source: self.sync_source.clone(),
            heartbeat_interval_millis: self.heartbeat_interval().as_millis() as u64,
            op_times: StatusOpTimes {
                last_committed_op_time: self.last_committed_op,
                read_concern_majority_op_time: args.read_concern_majority_op_time,
                applied_op_time: self.my_last_applied_op_time(),
                durable_op_time: self.my_last_durable_op_time(),
            },
            initial_sync_status: args.initial_sync_status.clone(),
            members,
        })
    }

    /// Describe our term, commit point and topology coordinates for
    /// attachment to a command reply.
    pub fn prepare_replset_metadata(&self, last_visible_op: OpTime) -> ReplSetMetadata {
        ReplSetMetadata {
            term: self.term,
            last_op_committed: self.last_committed_op,
            last_op_visible: last_visible_op,
            config_version: self.rs_config.version,
            primary_index: index_or_neg1(self.primary_index),
            sync_source_index: index_or_neg1(self.sync_source_config_index()),
            is_primary: self.role.is_leader(),
        }
    }

    /// Describe our applied/committed position for attachment to an
    /// oplog query reply.
    pub fn prepare_oplog_query_metadata(&self, rbid: i32) -> OplogQueryMetadata {
        OplogQueryMetadata {
            last_op_committed: self.last_committed_op,
            last_op_applied: self.my_last_applied_op_time(),
            rbid,
            primary_index: index_or_neg1(self.primary_index),
            sync_source_index: index_or_neg1(self.sync_source_config_index()),
        }
    }

    fn sync_source_config_index(&self) -> Option<usize> {
        self.sync_source
            .as_ref()
            .and_then(|s| self.rs_config.find_member_by_host(s))
            .map(|(i, _)| i)
    }

    /// Build the progress report this node sends to its sync source.
    pub fn prepare_replset_update_position_command(
        &self,
        style: UpdatePositionStyle,
    ) -> Result<UpdatePositionCommand, TopologyError> {
        if !self.rs_config.is_initialized() {
            return Err(TopologyError::NotYetInitialized);
        }

        let entries = self
            .member_data
            .iter()
            .filter(|m| m.config_index.is_some() && !m.last_applied.is_null())
            .map(|m| UpdatePositionEntry {
                member_id: m.member_id,
                applied_op_time: m.last_applied,
                durable_op_time: match style {
                    UpdatePositionStyle::New => Some(m.last_durable),
                    UpdatePositionStyle::Old => None,
                },
                config_version: self.rs_config.version,
            })
            .collect();

        Ok(UpdatePositionCommand { entries })
    }
}
