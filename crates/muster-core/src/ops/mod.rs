//! Operator commands composing the fleet, DNS, and balancer layers.
//!
//! Each command takes an [`OpsContext`] bundling the collaborator interfaces
//! and fleet settings, an Options struct, and returns a Report. These are
//! designed to be called from the CLI; nothing here prints.

pub mod provision;
pub mod start;
pub mod status;
pub mod stop;
pub mod sync_dns;
pub mod sync_lb;

pub use provision::{ProvisionOptions, ProvisionReport, ProvisionedInstance, provision_role};
pub use start::{StartOptions, StartReport, start_role};
pub use status::{FleetStatus, InstanceRow, StatusOptions, collect_status};
pub use stop::{StopOptions, StopReport, stop_role};
pub use sync_dns::{DnsSync, SyncDnsOptions, SyncDnsReport, sync_dns};
pub use sync_lb::{SyncLbOptions, SyncLbReport, sync_balancer};

use crate::config::FleetConfig;
use crate::poll::Poller;
use crate::provider::{BalancerApi, ComputeApi, Provider, ZoneApi};
use crate::setup::HostSetup;

/// Collaborators and settings shared by every operator command.
pub struct OpsContext<'a> {
    pub compute: &'a dyn ComputeApi,
    pub zone: &'a dyn ZoneApi,
    pub balancer: &'a dyn BalancerApi,
    pub setup: &'a dyn HostSetup,
    pub config: &'a FleetConfig,
    pub poller: Poller,
}

impl<'a> OpsContext<'a> {
    /// Build a context from a single provider implementing all three
    /// collaborator interfaces.
    pub fn new<P: Provider>(
        provider: &'a P,
        setup: &'a dyn HostSetup,
        config: &'a FleetConfig,
    ) -> Self {
        OpsContext {
            compute: provider,
            zone: provider,
            balancer: provider,
            setup,
            config,
            poller: config.poller(),
        }
    }

    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }
}
