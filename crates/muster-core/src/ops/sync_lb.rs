//! Sync load-balancer membership for a role.

use crate::balancer::{MembershipDelta, desired_members, sync_membership};
use crate::error::Result;
use crate::fleet::{FleetView, Role};

use super::OpsContext;

#[derive(Debug, Clone)]
pub struct SyncLbOptions {
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct SyncLbReport {
    pub delta: MembershipDelta,
}

/// Converge the configured balancer to the running instances of a role.
pub fn sync_balancer(ctx: &OpsContext<'_>, options: &SyncLbOptions) -> Result<SyncLbReport> {
    let fleet = FleetView::fetch(ctx.compute)?;
    let desired = desired_members(&fleet, |i| i.is_running() && i.has_role(options.role));
    let delta = sync_membership(ctx.balancer, &ctx.config.balancer, &desired)?;
    Ok(SyncLbReport { delta })
}
