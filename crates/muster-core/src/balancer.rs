//! Load-balancer membership reconciliation.
//!
//! Converges a named balancer's registered member set to the instances
//! currently satisfying a predicate over the fleet. The diff is pure; the
//! sync issues at most one register and one deregister call and is
//! idempotent — re-running it against unchanged state issues zero calls.

use std::collections::BTreeSet;

use tracing::info;

use crate::error::{Error, Result};
use crate::fleet::{FleetView, Instance};
use crate::provider::BalancerApi;

/// The delta between desired and actual membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl MembershipDelta {
    /// `to_add = desired − actual`, `to_remove = actual − desired`, both in
    /// sorted order.
    pub fn diff(desired: &BTreeSet<String>, actual: &BTreeSet<String>) -> Self {
        MembershipDelta {
            to_add: desired.difference(actual).cloned().collect(),
            to_remove: actual.difference(desired).cloned().collect(),
        }
    }

    pub fn is_converged(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Instance ids from the fleet satisfying `predicate`.
pub fn desired_members<F>(fleet: &FleetView, predicate: F) -> BTreeSet<String>
where
    F: Fn(&Instance) -> bool,
{
    fleet
        .iter()
        .filter(|i| predicate(i))
        .map(|i| i.id.clone())
        .collect()
}

/// Converge the balancer's membership to `desired`.
///
/// Issues one register call with the full add set iff non-empty, then one
/// deregister call with the full remove set iff non-empty. The two calls are
/// independent: if deregister fails after register succeeded, the error is
/// [`Error::PartialMembership`] — re-running this sync completes the job.
pub fn sync_membership(
    api: &dyn BalancerApi,
    balancer: &str,
    desired: &BTreeSet<String>,
) -> Result<MembershipDelta> {
    let actual: BTreeSet<String> = api.members(balancer)?.into_iter().collect();
    let delta = MembershipDelta::diff(desired, &actual);

    if !delta.to_add.is_empty() {
        info!(balancer, adding = ?delta.to_add, "registering instances");
        api.register(balancer, &delta.to_add)?;
    }

    if !delta.to_remove.is_empty() {
        info!(balancer, removing = ?delta.to_remove, "deregistering instances");
        let registered = !delta.to_add.is_empty();
        api.deregister(balancer, &delta.to_remove).map_err(|e| {
            if registered {
                Error::PartialMembership {
                    balancer: balancer.to_string(),
                    source: Box::new(e),
                }
            } else {
                e
            }
        })?;
    }

    Ok(delta)
}
