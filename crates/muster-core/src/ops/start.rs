//! Start spare (stopped) instances of a role.
//!
//! Starts up to `count` stopped instances, waits until every one reports
//! running, then syncs their DNS aliases in a single atomic batch.

use tracing::{info, warn};

use crate::dns::{ChangeBatch, RecordType};
use crate::error::{Error, Result};
use crate::fleet::{self, FleetView, InstanceState, Role, ensure_trailing_dot};

use super::OpsContext;

#[derive(Debug, Clone)]
pub struct StartOptions {
    pub role: Role,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StartReport {
    /// Names (or ids, for unnamed instances) of the instances started.
    pub started: Vec<String>,
    pub dns_synced: usize,
}

pub fn start_role(ctx: &OpsContext<'_>, options: &StartOptions) -> Result<StartReport> {
    let fleet = FleetView::fetch(ctx.compute)?;

    let spare = fleet.stopped_with_role(options.role);
    let chosen: Vec<String> = spare
        .iter()
        .take(options.count)
        .map(|i| i.id.clone())
        .collect();

    if chosen.is_empty() {
        warn!(role = %options.role, "no spare instances to start");
        return Ok(StartReport::default());
    }

    let labels: Vec<String> = spare
        .iter()
        .take(options.count)
        .map(|i| i.name().unwrap_or(&i.id).to_string())
        .collect();
    info!(role = %options.role, starting = ?labels, "starting instances");

    ctx.compute.start_instances(&chosen)?;

    info!("waiting for instances to report running");
    ctx.poller.wait_or_err("instances to report running", || {
        fleet::all_in_state(ctx.compute, &chosen, InstanceState::Running)
    })?;

    info!("updating dns");
    let fleet = FleetView::fetch(ctx.compute)?;
    let snapshot = ctx.zone.fetch_zone(&ctx.config.zone)?;
    let mut batch = ChangeBatch::new();
    let mut dns_synced = 0;

    for id in &chosen {
        let instance = fleet
            .get(id)
            .ok_or_else(|| Error::not_found("instance", id))?;
        let (Some(name), Some(public)) = (
            instance.canonical_hostname(&ctx.config.dns_suffix),
            instance.public_hostname(),
        ) else {
            warn!(%id, "started instance missing name or public hostname; alias not updated");
            continue;
        };
        batch.stage_replace(
            &snapshot,
            &name,
            RecordType::Cname,
            vec![ensure_trailing_dot(public)],
        );
        dns_synced += 1;
    }

    batch.commit(ctx.zone, &ctx.config.zone)?;

    Ok(StartReport {
        started: labels,
        dns_synced,
    })
}
