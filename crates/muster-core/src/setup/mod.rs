//! Host configuration collaborator.
//!
//! Remote host setup (SSH reachability, configuration scripts, service
//! bootstrap) is process-invocation glue, not core logic; the trait exists so
//! provisioning can run against a real SSH implementation or a no-op in
//! tests.

pub mod ssh;

pub use ssh::SshSetup;

use crate::error::Result;
use crate::fleet::{Instance, Role};
use crate::poll::Poller;

pub trait HostSetup {
    /// Drop any stale local host keys for the instance's address.
    fn forget_host_keys(&self, instance: &Instance) -> Result<()>;

    /// Block until the host accepts connections, within the poller's bounds.
    fn wait_ready(&self, poller: &Poller, instance: &Instance) -> Result<()>;

    /// Run the base configuration for `role` on the host.
    fn configure(&self, instance: &Instance, role: Role, name: &str) -> Result<()>;

    /// Start a role's service after base configuration.
    fn bootstrap(&self, instance: &Instance, service: &str) -> Result<()>;
}

/// Does nothing; used by tests and the in-memory provider path.
#[derive(Debug, Default)]
pub struct NoopSetup;

impl HostSetup for NoopSetup {
    fn forget_host_keys(&self, _instance: &Instance) -> Result<()> {
        Ok(())
    }

    fn wait_ready(&self, _poller: &Poller, _instance: &Instance) -> Result<()> {
        Ok(())
    }

    fn configure(&self, _instance: &Instance, _role: Role, _name: &str) -> Result<()> {
        Ok(())
    }

    fn bootstrap(&self, _instance: &Instance, _service: &str) -> Result<()> {
        Ok(())
    }
}
