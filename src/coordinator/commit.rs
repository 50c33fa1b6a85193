//! Majority-commit arithmetic over the member table.

use crate::coordinator::TopologyCoordinator;
use crate::membership::TagPattern;
use crate::node::HostAndPort;
use crate::optime::OpTime;

impl TopologyCoordinator {
    pub fn last_committed_op_time(&self) -> OpTime {
        self.last_committed_op
    }

    /// Recompute the majority-committed op-time from the member table.
    ///
    /// The committed op-time is the ⌈majority⌉-th largest applied (or
    /// durable, when the set journals majority writes) op-time among
    /// voting data-bearing members. While primary, the commit point may
    /// only advance onto ops of the current term, so nothing from before
    /// our election counts as committed until our election itself is.
    ///
    /// Returns true when `last_committed_op_time` changed.
    pub fn update_last_committed_op_time(&mut self) -> bool {
        if !self.rs_config.is_initialized() {
            return false;
        }

        let durably_written = self.rs_config.write_concern_majority_journal_default;
        let mut op_times: Vec<OpTime> = self
            .member_data
            .iter()
            .filter(|m| {
                let Some(i) = m.config_index else {
                    return false;
                };
                let member = self.rs_config.member(i);
                member.is_voter() && !member.arbiter_only
            })
            .map(|m| if durably_written { m.last_durable } else { m.last_applied })
            .collect();

        let majority = self.rs_config.write_majority_count();
        if op_times.len() < majority {
            return false;
        }

        op_times.sort_unstable_by(|a, b| b.cmp(a));
        let committed = op_times[majority - 1];
        if committed.is_null() {
            return false;
        }

        if self.role.is_leader() && committed.term != self.term {
            tracing::debug!(
                candidate = %committed,
                term = self.term,
                "not advancing commit point onto an op from another term"
            );
            return false;
        }

        self.advance_last_committed_op_time(committed)
    }

    /// Monotonically advance the commit point to `committed_op_time` if
    /// it is newer. Returns true when it changed.
    pub fn advance_last_committed_op_time(&mut self, committed_op_time: OpTime) -> bool {
        if committed_op_time <= self.last_committed_op {
            return false;
        }
        tracing::debug!(from = %self.last_committed_op, to = %committed_op_time, "advancing commit point");
        self.last_committed_op = committed_op_time;
        true
    }

    /// Whether at least `num_nodes` members have reached `op`.
    pub fn have_num_nodes_reached_op_time(&self, op: OpTime, num_nodes: usize, durably_written: bool) -> bool {
        let mut count = 0;
        for m in &self.member_data {
            if m.config_index.is_none() {
                continue;
            }
            let reached = if durably_written { m.last_durable } else { m.last_applied };
            if reached >= op {
                count += 1;
                if count >= num_nodes {
                    return true;
                }
            }
        }
        false
    }

    /// Whether the members that have reached `op` satisfy every
    /// constraint of `pattern`: for each constraint, they must cover at
    /// least `min_count` distinct values of the constraint's tag key.
    pub fn have_tagged_nodes_reached_op_time(
        &self,
        op: OpTime,
        pattern: &TagPattern,
        durably_written: bool,
    ) -> bool {
        pattern.constraints.iter().all(|constraint| {
            let mut values_seen = std::collections::BTreeSet::new();
            for m in &self.member_data {
                let Some(i) = m.config_index else {
                    continue;
                };
                let reached = if durably_written { m.last_durable } else { m.last_applied };
                if reached < op {
                    continue;
                }
                if let Some(value) = self.rs_config.member(i).tags.get(&constraint.key) {
                    values_seen.insert(value);
                }
            }
            values_seen.len() >= constraint.min_count
        })
    }

    /// Hosts of every member that has reached `op`.
    pub fn get_hosts_written_to(&self, op: OpTime, durably_written: bool, skip_self: bool) -> Vec<HostAndPort> {
        self.member_data
            .iter()
            .filter(|m| {
                if m.config_index.is_none() || (skip_self && m.is_self) {
                    return false;
                }
                let reached = if durably_written { m.last_durable } else { m.last_applied };
                reached >= op
            })
            .map(|m| m.host.clone())
            .collect()
    }
}
