//! Sync DNS aliases for a role's running instances.
//!
//! Every running instance gets a CNAME from its canonical name to its
//! public hostname. All replaces accumulate into one batch so the whole
//! pass commits as a single atomic write.

use tracing::{info, warn};

use crate::dns::{ChangeBatch, RecordType};
use crate::error::Result;
use crate::fleet::{FleetView, Role, ensure_trailing_dot};

use super::OpsContext;

#[derive(Debug, Clone)]
pub struct SyncDnsOptions {
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct DnsSync {
    pub name: String,
    pub target: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyncDnsReport {
    pub synced: Vec<DnsSync>,
}

pub fn sync_dns(ctx: &OpsContext<'_>, options: &SyncDnsOptions) -> Result<SyncDnsReport> {
    let fleet = FleetView::fetch(ctx.compute)?;
    let snapshot = ctx.zone.fetch_zone(&ctx.config.zone)?;

    let mut batch = ChangeBatch::new();
    let mut synced = Vec::new();

    for instance in fleet.running_with_role(options.role) {
        let Some(name) = instance.canonical_hostname(&ctx.config.dns_suffix) else {
            warn!(id = %instance.id, "skipping unnamed instance");
            continue;
        };
        let Some(public) = instance.public_hostname() else {
            warn!(id = %instance.id, "running instance has no public hostname yet");
            continue;
        };

        let target = ensure_trailing_dot(public);
        info!(%name, %target, "staging alias");
        batch.stage_replace(&snapshot, &name, RecordType::Cname, vec![target.clone()]);
        synced.push(DnsSync { name, target });
    }

    batch.commit(ctx.zone, &ctx.config.zone)?;

    Ok(SyncDnsReport { synced })
}
