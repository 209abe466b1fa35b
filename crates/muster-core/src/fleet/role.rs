//! Fleet roles and per-role provisioning dispatch.
//!
//! A role is the fleet classification carried by the `instance_type` tag.
//! The set is closed: provisioning behavior (machine profile, storage,
//! post-configure bootstrap) hangs off the variant, so there is no
//! string-keyed dispatch table to fall out of sync with the tags.

use serde::{Deserialize, Serialize};

/// Machine image and size to provision for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineProfile {
    pub image: &'static str,
    pub size: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Front-end web server; registered with the load balancer.
    Web,
    /// Primary database host; gets dedicated storage volumes.
    Database,
    /// Background queue worker.
    Queue,
    /// Staging environment host.
    Staging,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Web, Role::Database, Role::Queue, Role::Staging];

    /// Parse the `instance_type` tag value. Unrecognized values match no
    /// role.
    pub fn parse(tag: &str) -> Option<Role> {
        match tag {
            "web" => Some(Role::Web),
            "database" => Some(Role::Database),
            "queue" => Some(Role::Queue),
            "staging" => Some(Role::Staging),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Web => "web",
            Role::Database => "database",
            Role::Queue => "queue",
            Role::Staging => "staging",
        }
    }

    /// Prefix used for allocated instance names (`web1`, `web2`, ...).
    pub fn name_prefix(self) -> &'static str {
        self.as_str()
    }

    /// Image/size to request when provisioning this role.
    pub fn machine_profile(self) -> MachineProfile {
        match self {
            Role::Web => MachineProfile {
                image: "muster-web",
                size: "c1.medium",
            },
            Role::Database => MachineProfile {
                image: "muster-base",
                size: "m2.4xlarge",
            },
            Role::Queue => MachineProfile {
                image: "muster-base",
                size: "m1.small",
            },
            Role::Staging => MachineProfile {
                image: "muster-web",
                size: "m1.large",
            },
        }
    }

    /// Sizes (GiB) of the storage volumes to create and attach before
    /// configuration. Empty for roles that run off the root device.
    pub fn storage_gib(self) -> &'static [u32] {
        match self {
            Role::Database => &[50, 50, 50, 50],
            _ => &[],
        }
    }

    /// Service bootstrap argument to run on the host after base
    /// configuration, if the role needs one.
    pub fn service_bootstrap(self) -> Option<&'static str> {
        match self {
            Role::Web => Some("web"),
            Role::Staging => Some("web"),
            Role::Queue => Some("queue"),
            Role::Database => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| anyhow::anyhow!("unknown role: {s}"))
    }
}
