//! Provision new instances of a role.
//!
//! Runs the role's machine profile, waits for the reservation's instances
//! to report running, then names, tags, and configures each one. Database
//! instances get their storage volumes created and attached before
//! configuration. DNS aliases for the whole reservation commit as one batch
//! at the end.

use tracing::info;

use crate::dns::{ChangeBatch, RecordType};
use crate::error::{Error, Result};
use crate::fleet::names;
use crate::fleet::{
    self, FleetView, InstanceState, NAME_TAG, ROLE_TAG, Role, ensure_trailing_dot, hostname,
};
use crate::provider::{RunRequest, VolumeSpec};

use super::OpsContext;

#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    pub role: Role,
    pub count: u32,
}

#[derive(Debug, Clone)]
pub struct ProvisionedInstance {
    pub id: String,
    pub name: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    pub provisioned: Vec<ProvisionedInstance>,
}

pub fn provision_role(ctx: &OpsContext<'_>, options: &ProvisionOptions) -> Result<ProvisionReport> {
    let profile = options.role.machine_profile();
    let request = RunRequest {
        image: profile.image.to_string(),
        size: profile.size.to_string(),
        count: options.count,
        placement: ctx.config.placement.clone(),
        key_name: ctx.config.key_name.clone(),
    };

    info!(
        role = %options.role,
        image = profile.image,
        size = profile.size,
        count = options.count,
        "requesting instances"
    );
    let reservation = ctx.compute.run_instances(&request)?;

    info!(reservation = %reservation.id, "waiting for instances to report running");
    ctx.poller
        .wait_or_err("provisioned instances to report running", || {
            fleet::all_in_state(ctx.compute, &reservation.instance_ids, InstanceState::Running)
        })?;

    let snapshot = ctx.zone.fetch_zone(&ctx.config.zone)?;
    let mut batch = ChangeBatch::new();
    let mut provisioned = Vec::new();

    for id in &reservation.instance_ids {
        // Refetch each round so the name just tagged onto the previous
        // instance participates in the next allocation.
        let view = FleetView::fetch(ctx.compute)?;
        let instance = view
            .get(id)
            .ok_or_else(|| Error::not_found("instance", id))?
            .clone();

        let name = names::next_name(&view, options.role.name_prefix());
        info!(%id, %name, "tagging instance");
        ctx.compute
            .tag_instance(id, ROLE_TAG, options.role.as_str())?;
        ctx.compute.tag_instance(id, NAME_TAG, &name)?;

        // Storage must be in place before configuration runs.
        for (index, size_gib) in options.role.storage_gib().iter().enumerate() {
            let volume = ctx.compute.create_volume(VolumeSpec {
                size_gib: *size_gib,
            })?;
            let device = format!("/dev/sd{}", (b'h' + index as u8) as char);
            info!(%id, %volume, %device, "attaching storage");
            ctx.compute.attach_volume(&volume, id, &device)?;
        }

        ctx.setup.forget_host_keys(&instance)?;
        ctx.setup.wait_ready(&ctx.poller, &instance)?;
        ctx.setup.configure(&instance, options.role, &name)?;
        if let Some(service) = options.role.service_bootstrap() {
            ctx.setup.bootstrap(&instance, service)?;
        }

        let canonical = hostname(&name, &ctx.config.dns_suffix);
        if let Some(public) = instance.public_hostname() {
            batch.stage_replace(
                &snapshot,
                &canonical,
                RecordType::Cname,
                vec![ensure_trailing_dot(public)],
            );
        }

        provisioned.push(ProvisionedInstance {
            id: id.clone(),
            name,
            hostname: canonical,
        });
    }

    batch.commit(ctx.zone, &ctx.config.zone)?;

    Ok(ProvisionReport { provisioned })
}
