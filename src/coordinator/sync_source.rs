//! Sync-source selection: who this node replicates from, the transient
//! blacklist, and re-evaluation against replication metadata.

use crate::coordinator::TopologyCoordinator;
use crate::error::TopologyError;
use crate::msg::OplogQueryMetadata;
use crate::msg::ReplSetMetadata;
use crate::msg::SyncFromResponse;
use crate::node::HostAndPort;
use crate::optime::OpTime;
use crate::time::Date;

/// Whether `choose_new_sync_source` may chain from a non-primary even
/// when the set configuration forbids it.
#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq)]
pub enum ChainingPreference {
    AllowChaining,
    UseConfiguration,
}

impl TopologyCoordinator {
    /// Use the member at `index` as sync source on the next selection,
    /// overriding ranking once.
    pub fn set_force_sync_source_index(&mut self, index: usize) {
        self.force_sync_source_index = Some(index);
    }

    /// Suppress selecting `host` as sync source until `until`.
    pub fn blacklist_sync_source(&mut self, host: &HostAndPort, until: Date) {
        tracing::debug!(host = %host, until = %until, "blacklisting sync source");
        self.sync_source_blacklist.insert(host.clone(), until);
    }

    /// Drop `host` from the blacklist if its window has passed.
    pub fn unblacklist_sync_source(&mut self, host: &HostAndPort, now: Date) {
        if let Some(until) = self.sync_source_blacklist.get(host) {
            if *until <= now {
                tracing::debug!(host = %host, "unblacklisting sync source");
                self.sync_source_blacklist.remove(host);
            }
        }
    }

    pub fn clear_sync_source_blacklist(&mut self) {
        self.sync_source_blacklist.clear();
    }

    pub(crate) fn is_blacklisted(&self, host: &HostAndPort, now: Date) -> bool {
        self.sync_source_blacklist.get(host).map_or(false, |until| *until > now)
    }

    fn prune_blacklist(&mut self, now: Date) {
        self.sync_source_blacklist.retain(|_, until| *until > now);
    }

    /// Choose and record a new sync source based on the current view of
    /// the world, or `None` when no candidate qualifies.
    ///
    /// Candidates must be up, readable, data-bearing, undelayed,
    /// compatible on index builds, unblacklisted, and strictly ahead of
    /// `last_op_time_fetched`. The primary ranks first, then greater
    /// op-time lead, then lower ping.
    pub fn choose_new_sync_source(
        &mut self,
        now: Date,
        last_op_time_fetched: OpTime,
        chaining_preference: ChainingPreference,
    ) -> Option<HostAndPort> {
        if let Some(forced) = self.force_sync_source_index.take() {
            if forced < self.rs_config.members.len() {
                let host = self.rs_config.member(forced).host.clone();
                tracing::info!(host = %host, "choosing sync source by request");
                self.sync_source = Some(host.clone());
                return Some(host);
            }
        }

        if !self.rs_config.is_initialized() {
            return None;
        }
        let self_index = self.self_index?;
        if self.rs_config.member(self_index).arbiter_only {
            return None;
        }

        self.prune_blacklist(now);

        // With chaining disabled there is exactly one legal source.
        if chaining_preference == ChainingPreference::UseConfiguration
            && !self.rs_config.settings.chaining_allowed
        {
            let Some(primary_index) = self.primary_index.filter(|i| Some(*i) != self.self_index) else {
                self.sync_source = None;
                return None;
            };
            let host = self.rs_config.member(primary_index).host.clone();
            if !self.member_data[primary_index].is_up() || self.is_blacklisted(&host, now) {
                self.sync_source = None;
                return None;
            }
            tracing::info!(host = %host, "chaining disabled, syncing from primary");
            self.sync_source = Some(host.clone());
            return Some(host);
        }

        let i_build_indexes = self.rs_config.member(self_index).build_indexes;

        let best = self
            .member_data
            .iter()
            .filter(|m| {
                let Some(i) = m.config_index else {
                    return false;
                };
                if m.is_self {
                    return false;
                }
                let member = self.rs_config.member(i);

                m.is_up()
                    && m.state.is_readable()
                    && !member.arbiter_only
                    && !member.hidden
                    && member.slave_delay.is_zero()
                    && (member.build_indexes || !i_build_indexes)
                    && !self.is_blacklisted(&m.host, now)
                    && m.last_applied > last_op_time_fetched
            })
            .max_by_key(|m| {
                let ping = self
                    .ping_stats
                    .get(&m.host)
                    .and_then(|s| s.average())
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(u64::MAX);
                (m.state.is_primary(), m.last_applied, std::cmp::Reverse(ping))
            })
            .map(|m| (m.host.clone(), m.last_applied));

        match best {
            Some((host, applied)) => {
                tracing::info!(host = %host, applied = %applied, "chose new sync source");
                self.sync_source = Some(host.clone());
                Some(host)
            }
            None => {
                tracing::info!(fetched = %last_op_time_fetched, "could not find an eligible sync source");
                self.sync_source = None;
                None
            }
        }
    }

    /// Whether `current_source` should be abandoned for a better one.
    ///
    /// True when the source left the config, went down or got
    /// blacklisted; when it trails some candidate by more than the
    /// configured lag allowance; or when it is not primary, has no sync
    /// source of its own, and is not ahead of us.
    pub fn should_change_sync_source(
        &self,
        current_source: &HostAndPort,
        repl_metadata: &ReplSetMetadata,
        oq_metadata: Option<&OplogQueryMetadata>,
        now: Date,
    ) -> bool {
        if self.force_sync_source_index.is_some() {
            return true;
        }

        let Some((source_index, _)) = self.rs_config.find_member_by_host(current_source) else {
            tracing::info!(source = %current_source, "changing sync source: no longer in config");
            return true;
        };
        if self.is_blacklisted(current_source, now) {
            tracing::info!(source = %current_source, "changing sync source: blacklisted");
            return true;
        }
        if !self.member_data[source_index].is_up() {
            tracing::info!(source = %current_source, "changing sync source: source is down");
            return true;
        }

        let (source_applied, source_is_primary, source_has_sync_source) = match oq_metadata {
            Some(oq) => (
                oq.last_op_applied,
                oq.primary_index == source_index as i64,
                oq.has_sync_source(),
            ),
            None => (
                self.member_data[source_index].last_applied,
                repl_metadata.primary_index == source_index as i64,
                self.member_data[source_index].sync_source.is_some(),
            ),
        };

        if source_applied.is_null() {
            // Nothing to judge yet; wait for a heartbeat.
            return false;
        }

        if !source_is_primary
            && !source_has_sync_source
            && source_applied <= self.my_last_applied_op_time()
        {
            tracing::info!(
                source = %current_source,
                "changing sync source: it has no sync source and is not ahead of us"
            );
            return true;
        }

        let lag_allowance = self.options.max_sync_source_lag_secs as u32;
        for m in &self.member_data {
            let Some(i) = m.config_index else {
                continue;
            };
            if m.is_self || i == source_index {
                continue;
            }
            let member = self.rs_config.member(i);
            let eligible = m.is_up()
                && m.state.is_readable()
                && !member.arbiter_only
                && !member.hidden
                && member.slave_delay.is_zero()
                && !self.is_blacklisted(&m.host, now);
            if !eligible {
                continue;
            }
            if m.last_applied.timestamp.secs > source_applied.timestamp.secs.saturating_add(lag_allowance) {
                tracing::info!(
                    source = %current_source,
                    candidate = %m.host,
                    "changing sync source: source lags a candidate by more than {}s",
                    lag_allowance
                );
                return true;
            }
        }

        false
    }

    /// Answer a `replSetSyncFrom` command: validate the requested
    /// target, then force it as the next sync source.
    pub fn prepare_sync_from_response(
        &mut self,
        target: &HostAndPort,
    ) -> Result<SyncFromResponse, TopologyError> {
        if !self.rs_config.is_initialized() {
            return Err(TopologyError::NotYetInitialized);
        }
        if self.role.is_leader() {
            return Err(TopologyError::not_secondary("primaries don't sync"));
        }

        let self_index = self.self_index.ok_or(TopologyError::NotYetInitialized)?;
        let self_config = self.rs_config.member(self_index);
        if &self_config.host == target {
            return Err(TopologyError::InvalidOptions {
                reason: "I cannot sync from myself".to_string(),
            });
        }
        if self_config.arbiter_only {
            return Err(TopologyError::not_secondary("arbiters don't sync"));
        }

        let Some((target_index, target_config)) = self.rs_config.find_member_by_host(target) else {
            return Err(TopologyError::NodeNotFound {
                member: target.to_string(),
            });
        };
        if target_config.arbiter_only {
            return Err(TopologyError::InvalidOptions {
                reason: format!("cannot sync from {} because it is an arbiter", target),
            });
        }
        if !target_config.build_indexes && self_config.build_indexes {
            return Err(TopologyError::InvalidOptions {
                reason: format!("cannot sync from {} because it does not build indexes", target),
            });
        }
        if !self.member_data[target_index].is_up() {
            return Err(TopologyError::HostUnreachable {
                host: target.clone(),
            });
        }

        let target_applied = self.member_data[target_index].last_applied;
        let my_applied = self.my_last_applied_op_time();
        let lag_secs = my_applied.timestamp.secs.saturating_sub(target_applied.timestamp.secs);
        let warning = if lag_secs > 10 {
            Some(format!("requested member {} is more than 10 seconds behind us", target))
        } else {
            None
        };

        self.force_sync_source_index = Some(target_index);
        Ok(SyncFromResponse {
            prev_sync_target: self.sync_source.clone(),
            sync_from_requested: target.clone(),
            warning,
        })
    }
}
