//! Stop running instances of a role, preserving a minimum running count.
//!
//! After the stopped instances settle, the balancer membership is re-synced
//! from a fresh fleet view so traffic stops flowing to them.

use tracing::{info, warn};

use crate::balancer::{MembershipDelta, desired_members, sync_membership};
use crate::error::Result;
use crate::fleet::{self, FleetView, InstanceState, Role};

use super::OpsContext;

#[derive(Debug, Clone)]
pub struct StopOptions {
    pub role: Role,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StopReport {
    pub stopped: Vec<String>,
    /// True when stopping would have dropped below the minimum running
    /// count and nothing was done.
    pub refused: bool,
    pub balancer_delta: Option<MembershipDelta>,
}

pub fn stop_role(ctx: &OpsContext<'_>, options: &StopOptions) -> Result<StopReport> {
    let fleet = FleetView::fetch(ctx.compute)?;

    let running = fleet.running_with_role(options.role);
    let keep = running.len().saturating_sub(options.count);
    if keep < ctx.config.min_running {
        warn!(
            role = %options.role,
            running = running.len(),
            min_running = ctx.config.min_running,
            "refusing to stop below the minimum running count"
        );
        return Ok(StopReport {
            refused: true,
            ..StopReport::default()
        });
    }

    // Stop from the tail of the listing, keeping the longest-running head.
    let chosen: Vec<String> = running[keep..].iter().map(|i| i.id.clone()).collect();
    let labels: Vec<String> = running[keep..]
        .iter()
        .map(|i| i.name().unwrap_or(&i.id).to_string())
        .collect();
    info!(role = %options.role, stopping = ?labels, "stopping instances");

    ctx.compute.stop_instances(&chosen)?;

    info!("waiting for instances to report stopped");
    ctx.poller.wait_or_err("instances to report stopped", || {
        fleet::all_in_state(ctx.compute, &chosen, InstanceState::Stopped)
    })?;

    // Fresh view: the stopped instances must drop out of the desired set.
    info!("re-syncing balancer membership");
    let fleet = FleetView::fetch(ctx.compute)?;
    let desired = desired_members(&fleet, |i| i.is_running() && i.has_role(options.role));
    let delta = sync_membership(ctx.balancer, &ctx.config.balancer, &desired)?;

    Ok(StopReport {
        stopped: labels,
        refused: false,
        balancer_delta: Some(delta),
    })
}
