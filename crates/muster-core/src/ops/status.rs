//! Fleet status collection.

use serde::Serialize;

use crate::error::Result;
use crate::fleet::{FleetView, InstanceState, Role};

use super::OpsContext;

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Restrict to one role.
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceRow {
    pub id: String,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub state: InstanceState,
    pub public_dns: Option<String>,
    pub canonical: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetStatus {
    pub rows: Vec<InstanceRow>,
    pub running: usize,
    pub stopped: usize,
    pub total: usize,
}

/// Collect the current fleet view into display rows.
pub fn collect_status(ctx: &OpsContext<'_>, options: &StatusOptions) -> Result<FleetStatus> {
    let fleet = FleetView::fetch(ctx.compute)?;

    let rows: Vec<InstanceRow> = fleet
        .iter()
        .filter(|i| options.role.is_none_or(|role| i.has_role(role)))
        .map(|i| InstanceRow {
            id: i.id.clone(),
            name: i.name().map(str::to_string),
            role: i.role(),
            state: i.state,
            public_dns: i.public_hostname().map(str::to_string),
            canonical: i.canonical_hostname(&ctx.config.dns_suffix),
        })
        .collect();

    let running = rows
        .iter()
        .filter(|r| r.state == InstanceState::Running)
        .count();
    let stopped = rows
        .iter()
        .filter(|r| r.state == InstanceState::Stopped)
        .count();
    let total = rows.len();

    Ok(FleetStatus {
        rows,
        running,
        stopped,
        total,
    })
}
