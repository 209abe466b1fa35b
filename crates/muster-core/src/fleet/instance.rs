//! Instance model: id, lifecycle state, tags, hostnames.
//!
//! State is only ever observed — it changes in the external system and
//! becomes visible to this process on refresh. The two recognized tags are
//! `Name` (human-facing name) and `instance_type` (role classification).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Tag key holding the human-facing instance name.
pub const NAME_TAG: &str = "Name";

/// Tag key holding the role classification.
pub const ROLE_TAG: &str = "instance_type";

/// Instance lifecycle state as reported by the compute API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
}

impl InstanceState {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A compute instance as observed at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub state: InstanceState,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Externally-routable hostname; populated only once the instance is
    /// running.
    #[serde(default)]
    pub public_dns: Option<String>,
}

impl Instance {
    /// The human-facing name from the `Name` tag, if tagged.
    pub fn name(&self) -> Option<&str> {
        self.tags.get(NAME_TAG).map(String::as_str)
    }

    /// The role parsed from the `instance_type` tag. A missing or
    /// unrecognized tag matches no role.
    pub fn role(&self) -> Option<Role> {
        self.tags.get(ROLE_TAG).and_then(|t| Role::parse(t))
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }

    pub fn is_running(&self) -> bool {
        self.state == InstanceState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.state == InstanceState::Stopped
    }

    pub fn is_terminated(&self) -> bool {
        self.state == InstanceState::Terminated
    }

    /// Externally-routable hostname, present only once running.
    pub fn public_hostname(&self) -> Option<&str> {
        if self.is_running() {
            self.public_dns.as_deref()
        } else {
            None
        }
    }

    /// Internal canonical hostname: `name + "." + suffix`, fully qualified.
    /// Returns `None` for untagged instances.
    pub fn canonical_hostname(&self, suffix: &str) -> Option<String> {
        self.name().map(|name| hostname(name, suffix))
    }
}

/// Join `name` to `suffix`, normalizing the suffix to end in exactly one
/// trailing dot regardless of how it was supplied.
pub fn hostname(name: &str, suffix: &str) -> String {
    format!("{}.{}.", name, suffix.trim_end_matches('.'))
}

/// Normalize any hostname to carry exactly one trailing dot.
pub fn ensure_trailing_dot(host: &str) -> String {
    format!("{}.", host.trim_end_matches('.'))
}
