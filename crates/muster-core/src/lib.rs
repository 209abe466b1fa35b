//! Muster Core Library
//!
//! Domain logic for converging a cloud compute fleet's derived resources
//! (DNS aliases, load-balancer membership) with the fleet's actual state.

pub mod balancer;
pub mod config;
pub mod dns;
pub mod error;
pub mod fleet;
pub mod ops;
pub mod poll;
pub mod provider;
pub mod setup;

pub use error::{Error, Result};

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{Error, Result};

    // Fleet
    pub use crate::fleet::{FleetView, Instance, InstanceState, Role};

    // Convergence
    pub use crate::poll::{Backoff, Poller, WaitOutcome};

    // DNS
    pub use crate::dns::{Change, ChangeAction, ChangeBatch, RecordSet, RecordType, ZoneSnapshot};

    // Load balancer
    pub use crate::balancer::MembershipDelta;

    // Providers
    pub use crate::provider::{BalancerApi, ComputeApi, Reservation, RunRequest, ZoneApi};

    // Configuration
    pub use crate::config::FleetConfig;
}
