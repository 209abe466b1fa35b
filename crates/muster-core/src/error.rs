//! Error kinds surfaced by fleet operations.
//!
//! External API failures propagate immediately to the invoking operation;
//! nothing here retries. The only retry in the system is the poller's retry
//! of "predicate not yet true" (see [`crate::poll`]).

use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A zone, reservation, or balancer lookup by name/id returned nothing.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The zone API rejected a change batch. The batch applies all-or-nothing,
    /// so a single stale DELETE or duplicate CREATE fails every change staged
    /// alongside it. Never auto-retried.
    #[error("change batch rejected: {reason}")]
    CommitRejected { reason: String },

    /// A bounded wait ran out of time before its predicate became true.
    #[error("gave up waiting for {what} after {waited:?} ({attempts} evaluations)")]
    StuckConvergence {
        what: String,
        waited: Duration,
        attempts: u32,
    },

    /// One of register/deregister failed after the other succeeded. The
    /// balancer is left partially converged; re-running the idempotent sync
    /// picks up where this left off.
    #[error("balancer '{balancer}' partially converged")]
    PartialMembership {
        balancer: String,
        #[source]
        source: Box<Error>,
    },

    /// Transport or provider-side failure outside the kinds above.
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Error::CommitRejected {
            reason: reason.into(),
        }
    }
}
