//! In-memory provider for tests and `--provider memory` dev runs.
//!
//! Implements the full provider surface against process-local state. Two
//! behaviors matter beyond bookkeeping:
//!
//! - The zone commit enforces the atomic batch contract: every change is
//!   validated against a working copy in order, and the zone is only
//!   replaced when the whole batch validated — a stale DELETE or duplicate
//!   CREATE rejects everything staged alongside it.
//! - Instance lifecycle transitions are staged: a started instance stays
//!   `pending` for a configurable number of refreshes before it reports
//!   `running` (likewise stopping → stopped), so waits and backoff get
//!   exercised the way a real eventually-consistent API would.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::dns::{ChangeAction, ChangeBatch, RecordSet, ZoneSnapshot};
use crate::error::{Error, Result};
use crate::fleet::{Instance, InstanceState};

use super::{BalancerApi, ComputeApi, Reservation, RunRequest, VolumeSpec, ZoneApi};

#[derive(Debug, Clone)]
struct StagedInstance {
    instance: Instance,
    /// Target state and the number of refreshes left before it applies.
    transition: Option<(InstanceState, u32)>,
}

#[derive(Debug, Default)]
struct State {
    instances: BTreeMap<String, StagedInstance>,
    reservations: BTreeMap<String, Vec<String>>,
    zones: BTreeMap<String, Vec<RecordSet>>,
    balancers: BTreeMap<String, BTreeSet<String>>,
    volumes: BTreeMap<String, VolumeSpec>,
    attachments: BTreeMap<String, Vec<(String, String)>>,
    register_calls: Vec<Vec<String>>,
    deregister_calls: Vec<Vec<String>>,
    next_instance: u32,
    next_reservation: u32,
    next_volume: u32,
}

#[derive(Debug)]
pub struct MemoryProvider {
    state: Mutex<State>,
    /// Refreshes a staged transition takes to become visible.
    transition_refreshes: u32,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        MemoryProvider::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        MemoryProvider {
            state: Mutex::new(State::default()),
            transition_refreshes: 2,
        }
    }

    /// Override how many refreshes lifecycle transitions take (0 = states
    /// change on the very next listing).
    pub fn with_transition_refreshes(mut self, refreshes: u32) -> Self {
        self.transition_refreshes = refreshes;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("provider state mutex poisoned")
    }

    // --- Seeding ---

    pub fn seed_instance(&self, instance: Instance) {
        let mut state = self.state();
        state.instances.insert(
            instance.id.clone(),
            StagedInstance {
                instance,
                transition: None,
            },
        );
    }

    pub fn seed_zone(&self, zone: impl Into<String>, records: Vec<RecordSet>) {
        self.state().zones.insert(zone.into(), records);
    }

    pub fn seed_balancer(&self, balancer: impl Into<String>, members: &[&str]) {
        self.state().balancers.insert(
            balancer.into(),
            members.iter().map(|s| s.to_string()).collect(),
        );
    }

    // --- Test inspection ---

    pub fn register_calls(&self) -> Vec<Vec<String>> {
        self.state().register_calls.clone()
    }

    pub fn deregister_calls(&self) -> Vec<Vec<String>> {
        self.state().deregister_calls.clone()
    }

    pub fn attachments(&self, instance_id: &str) -> Vec<(String, String)> {
        self.state()
            .attachments
            .get(instance_id)
            .cloned()
            .unwrap_or_default()
    }

    fn tick_transitions(state: &mut State) {
        for staged in state.instances.values_mut() {
            if let Some((target, remaining)) = staged.transition {
                if remaining == 0 {
                    staged.instance.state = target;
                    if target == InstanceState::Running && staged.instance.public_dns.is_none() {
                        staged.instance.public_dns =
                            Some(format!("{}.cloud.example.net", staged.instance.id));
                    }
                    staged.transition = None;
                } else {
                    staged.transition = Some((target, remaining - 1));
                }
            }
        }
    }
}

impl ComputeApi for MemoryProvider {
    fn list_instances(&self) -> Result<Vec<Instance>> {
        let mut state = self.state();
        Self::tick_transitions(&mut state);
        Ok(state
            .instances
            .values()
            .map(|s| s.instance.clone())
            .collect())
    }

    fn start_instances(&self, ids: &[String]) -> Result<()> {
        let mut state = self.state();
        for id in ids {
            let staged = state
                .instances
                .get_mut(id)
                .ok_or_else(|| Error::not_found("instance", id))?;
            staged.instance.state = InstanceState::Pending;
            staged.transition = Some((InstanceState::Running, self.transition_refreshes));
        }
        Ok(())
    }

    fn stop_instances(&self, ids: &[String]) -> Result<()> {
        let mut state = self.state();
        for id in ids {
            let staged = state
                .instances
                .get_mut(id)
                .ok_or_else(|| Error::not_found("instance", id))?;
            staged.instance.state = InstanceState::Stopping;
            staged.instance.public_dns = None;
            staged.transition = Some((InstanceState::Stopped, self.transition_refreshes));
        }
        Ok(())
    }

    fn run_instances(&self, request: &RunRequest) -> Result<Reservation> {
        let mut state = self.state();
        let mut instance_ids = Vec::new();
        for _ in 0..request.count {
            state.next_instance += 1;
            let id = format!("i-{:04}", state.next_instance);
            state.instances.insert(
                id.clone(),
                StagedInstance {
                    instance: Instance {
                        id: id.clone(),
                        state: InstanceState::Pending,
                        tags: BTreeMap::new(),
                        public_dns: None,
                    },
                    transition: Some((InstanceState::Running, self.transition_refreshes)),
                },
            );
            instance_ids.push(id);
        }
        state.next_reservation += 1;
        let id = format!("r-{:04}", state.next_reservation);
        state.reservations.insert(id.clone(), instance_ids.clone());
        Ok(Reservation { id, instance_ids })
    }

    fn reservation_instances(&self, reservation_id: &str) -> Result<Vec<Instance>> {
        let mut state = self.state();
        Self::tick_transitions(&mut state);
        let ids = state
            .reservations
            .get(reservation_id)
            .cloned()
            .ok_or_else(|| Error::not_found("reservation", reservation_id))?;
        Ok(ids
            .iter()
            .filter_map(|id| state.instances.get(id))
            .map(|s| s.instance.clone())
            .collect())
    }

    fn tag_instance(&self, id: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.state();
        let staged = state
            .instances
            .get_mut(id)
            .ok_or_else(|| Error::not_found("instance", id))?;
        staged
            .instance
            .tags
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn create_volume(&self, spec: VolumeSpec) -> Result<String> {
        let mut state = self.state();
        state.next_volume += 1;
        let id = format!("v-{:04}", state.next_volume);
        state.volumes.insert(id.clone(), spec);
        Ok(id)
    }

    fn attach_volume(&self, volume_id: &str, instance_id: &str, device: &str) -> Result<()> {
        let mut state = self.state();
        if !state.volumes.contains_key(volume_id) {
            return Err(Error::not_found("volume", volume_id));
        }
        if !state.instances.contains_key(instance_id) {
            return Err(Error::not_found("instance", instance_id));
        }
        state
            .attachments
            .entry(instance_id.to_string())
            .or_default()
            .push((volume_id.to_string(), device.to_string()));
        Ok(())
    }
}

impl ZoneApi for MemoryProvider {
    fn fetch_zone(&self, zone: &str) -> Result<ZoneSnapshot> {
        let state = self.state();
        let records = state
            .zones
            .get(zone)
            .ok_or_else(|| Error::not_found("zone", zone))?;
        Ok(ZoneSnapshot::new(zone, records.clone()))
    }

    fn commit(&self, zone: &str, batch: &ChangeBatch) -> Result<()> {
        let mut state = self.state();
        let records = state
            .zones
            .get_mut(zone)
            .ok_or_else(|| Error::not_found("zone", zone))?;

        // Validate and apply against a working copy; swap in only when the
        // whole batch went through.
        let mut working = records.clone();
        for change in batch.changes() {
            match change.action {
                ChangeAction::Delete => {
                    let position = working.iter().position(|r| *r == change.record);
                    match position {
                        Some(at) => {
                            working.remove(at);
                        }
                        None => {
                            return Err(Error::rejected(format!(
                                "DELETE {} {} does not match current zone state",
                                change.record.name, change.record.rtype
                            )));
                        }
                    }
                }
                ChangeAction::Create => {
                    if working.iter().any(|r| r.key() == change.record.key()) {
                        return Err(Error::rejected(format!(
                            "CREATE {} {} already exists",
                            change.record.name, change.record.rtype
                        )));
                    }
                    working.push(change.record.clone());
                }
            }
        }
        *records = working;
        Ok(())
    }
}

impl BalancerApi for MemoryProvider {
    fn members(&self, balancer: &str) -> Result<Vec<String>> {
        let state = self.state();
        let members = state
            .balancers
            .get(balancer)
            .ok_or_else(|| Error::not_found("balancer", balancer))?;
        Ok(members.iter().cloned().collect())
    }

    fn register(&self, balancer: &str, ids: &[String]) -> Result<()> {
        let mut state = self.state();
        state.register_calls.push(ids.to_vec());
        let members = state
            .balancers
            .get_mut(balancer)
            .ok_or_else(|| Error::not_found("balancer", balancer))?;
        members.extend(ids.iter().cloned());
        Ok(())
    }

    fn deregister(&self, balancer: &str, ids: &[String]) -> Result<()> {
        let mut state = self.state();
        state.deregister_calls.push(ids.to_vec());
        let members = state
            .balancers
            .get_mut(balancer)
            .ok_or_else(|| Error::not_found("balancer", balancer))?;
        for id in ids {
            members.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::RecordType;

    #[test]
    fn unknown_zone_is_not_found() {
        let provider = MemoryProvider::new();
        let err = provider.fetch_zone("missing.example.org.").unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "zone", .. }));
    }

    #[test]
    fn started_instance_becomes_running_after_refreshes() {
        let provider = MemoryProvider::new().with_transition_refreshes(1);
        provider.seed_instance(Instance {
            id: "i-1".to_string(),
            state: InstanceState::Stopped,
            tags: BTreeMap::new(),
            public_dns: None,
        });

        provider.start_instances(&["i-1".to_string()]).unwrap();

        // First refresh: still transitioning.
        let view = provider.list_instances().unwrap();
        assert_eq!(view[0].state, InstanceState::Pending);

        // Second refresh: running, with a public hostname.
        let view = provider.list_instances().unwrap();
        assert_eq!(view[0].state, InstanceState::Running);
        assert!(view[0].public_dns.is_some());
    }

    #[test]
    fn stopped_instance_loses_public_dns() {
        let provider = MemoryProvider::new().with_transition_refreshes(0);
        provider.seed_instance(Instance {
            id: "i-1".to_string(),
            state: InstanceState::Running,
            tags: BTreeMap::new(),
            public_dns: Some("i-1.cloud.example.net".to_string()),
        });

        provider.stop_instances(&["i-1".to_string()]).unwrap();
        let view = provider.list_instances().unwrap();
        assert_eq!(view[0].state, InstanceState::Stopped);
        assert_eq!(view[0].public_dns, None);
    }

    #[test]
    fn rejected_batch_leaves_zone_untouched() {
        let provider = MemoryProvider::new();
        provider.seed_zone(
            "example.org.",
            vec![RecordSet::new(
                "web1.example.org.",
                RecordType::Cname,
                300,
                vec!["host-1.cloud.example.net.".to_string()],
            )],
        );

        let snap = provider.fetch_zone("example.org.").unwrap();

        // External mutation between snapshot and commit.
        provider.seed_zone(
            "example.org.",
            vec![RecordSet::new(
                "web1.example.org.",
                RecordType::Cname,
                300,
                vec!["moved.cloud.example.net.".to_string()],
            )],
        );

        let mut batch = ChangeBatch::new();
        // Valid create...
        batch.stage_create(
            "web2.example.org.",
            RecordType::Cname,
            vec!["host-2.cloud.example.net.".to_string()],
        );
        // ...alongside a delete staged from the now-stale snapshot.
        batch.stage_delete(&snap, "web1.example.org.", RecordType::Cname);

        let err = provider.commit("example.org.", &batch).unwrap_err();
        assert!(matches!(err, Error::CommitRejected { .. }));

        // Nothing applied — not even the valid create.
        let snap = provider.fetch_zone("example.org.").unwrap();
        assert_eq!(snap.records().len(), 1);
        assert_eq!(snap.lookup("web2.example.org.", None).count(), 0);
    }
}
