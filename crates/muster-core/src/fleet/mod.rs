//! Fleet View — the on-demand snapshot of all known compute instances.
//!
//! The view is an explicit value fetched by the caller and refreshed by an
//! explicit call; there is no hidden process-wide cache. Everything that
//! classifies or selects instances (role filters, state predicates, name
//! allocation) reads from a view the caller passes in.

pub mod instance;
pub mod names;
pub mod role;

pub use instance::{ensure_trailing_dot, hostname, Instance, InstanceState, NAME_TAG, ROLE_TAG};
pub use role::{MachineProfile, Role};

use crate::error::Result;
use crate::provider::ComputeApi;

/// Snapshot of every instance visible via the compute API at fetch time.
#[derive(Debug, Clone, Default)]
pub struct FleetView {
    instances: Vec<Instance>,
}

impl FleetView {
    /// Fetch the current fleet from the compute API.
    pub fn fetch(compute: &dyn ComputeApi) -> Result<Self> {
        Ok(FleetView {
            instances: compute.list_instances()?,
        })
    }

    /// Build a view from already-known instances (tests, reservations).
    pub fn from_instances(instances: Vec<Instance>) -> Self {
        FleetView { instances }
    }

    /// Replace this view with a fresh fetch.
    pub fn refresh(&mut self, compute: &dyn ComputeApi) -> Result<()> {
        self.instances = compute.list_instances()?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id == id)
    }

    /// Non-terminated instances carrying the given role tag.
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &Instance> {
        self.iter()
            .filter(move |i| !i.is_terminated() && i.has_role(role))
    }

    pub fn running_with_role(&self, role: Role) -> Vec<&Instance> {
        self.with_role(role).filter(|i| i.is_running()).collect()
    }

    pub fn stopped_with_role(&self, role: Role) -> Vec<&Instance> {
        self.with_role(role).filter(|i| i.is_stopped()).collect()
    }
}

/// Whether every listed instance currently reports `state`.
///
/// Re-fetches the fleet before testing, so this is usable directly as a
/// poller predicate. A listing failure or an id that has dropped out of the
/// listing counts as "not yet" rather than an error — the bounded wait caps
/// how long such a condition can stall an operation.
pub fn all_in_state(compute: &dyn ComputeApi, ids: &[String], state: InstanceState) -> bool {
    match FleetView::fetch(compute) {
        Ok(view) => ids
            .iter()
            .all(|id| view.get(id).is_some_and(|i| i.state == state)),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn inst(id: &str, state: InstanceState, role: Option<&str>) -> Instance {
        let mut tags = BTreeMap::new();
        if let Some(role) = role {
            tags.insert(ROLE_TAG.to_string(), role.to_string());
        }
        Instance {
            id: id.to_string(),
            state,
            tags,
            public_dns: None,
        }
    }

    #[test]
    fn role_filters_exclude_terminated() {
        let view = FleetView::from_instances(vec![
            inst("i-1", InstanceState::Running, Some("web")),
            inst("i-2", InstanceState::Terminated, Some("web")),
            inst("i-3", InstanceState::Stopped, Some("web")),
            inst("i-4", InstanceState::Running, Some("queue")),
            inst("i-5", InstanceState::Running, None),
        ]);

        let web: Vec<_> = view.with_role(Role::Web).map(|i| i.id.as_str()).collect();
        assert_eq!(web, vec!["i-1", "i-3"]);

        let running = view.running_with_role(Role::Web);
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, "i-1");

        let stopped = view.stopped_with_role(Role::Web);
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].id, "i-3");
    }

    #[test]
    fn get_finds_by_id() {
        let view = FleetView::from_instances(vec![inst("i-1", InstanceState::Running, None)]);
        assert!(view.get("i-1").is_some());
        assert!(view.get("i-2").is_none());
    }
}
