//! Settings for a fleet: muster.toml loading and defaults.
//!
//! Resolution order: an explicit `--config` path, `./muster.toml`, then
//! `<config dir>/muster/muster.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::poll::Poller;

pub const CONFIG_FILE: &str = "muster.toml";

/// Connection settings for the HTTP gateway provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub endpoint: Url,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Domain suffix for canonical instance hostnames. Accepted with or
    /// without a trailing dot.
    pub dns_suffix: String,

    /// Zone holding the fleet's records.
    pub zone: String,

    /// Named load balancer fronting the web role.
    pub balancer: String,

    /// Never stop below this many running instances of a role.
    #[serde(default = "default_min_running")]
    pub min_running: usize,

    /// Placement hint passed through to provisioning requests.
    #[serde(default)]
    pub placement: Option<String>,

    /// Key-pair name passed through to provisioning requests.
    #[serde(default)]
    pub key_name: Option<String>,

    /// Bound on every convergence wait.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    #[serde(default)]
    pub ssh_key_path: Option<PathBuf>,

    /// Local directory of host configuration scripts to copy on provision.
    #[serde(default)]
    pub setup_dir: Option<PathBuf>,

    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
}

fn default_min_running() -> usize {
    4
}

fn default_wait_timeout_secs() -> u64 {
    600
}

fn default_ssh_user() -> String {
    "ubuntu".to_string()
}

impl FleetConfig {
    /// Load from an explicit path, or fall back through the search order.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::find().context(
                "No muster.toml found; create one or pass --config",
            )?,
        };
        Self::load_file(&path)
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: FleetConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    fn find() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        let global = dirs::config_dir()?.join("muster").join(CONFIG_FILE);
        global.exists().then_some(global)
    }

    /// Poller configured with this fleet's wait bound.
    pub fn poller(&self) -> Poller {
        Poller::new(Duration::from_secs(self.wait_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: FleetConfig = toml::from_str(
            r#"
dns_suffix = "example.org"
zone = "example.org."
balancer = "cave"
"#,
        )
        .unwrap();

        assert_eq!(config.min_running, 4);
        assert_eq!(config.wait_timeout_secs, 600);
        assert_eq!(config.ssh_user, "ubuntu");
        assert!(config.gateway.is_none());
        assert_eq!(config.poller().timeout(), Duration::from_secs(600));
    }

    #[test]
    fn full_config_parses() {
        let config: FleetConfig = toml::from_str(
            r#"
dns_suffix = "example.org."
zone = "example.org."
balancer = "cave"
min_running = 2
placement = "zone-d"
key_name = "ops"
wait_timeout_secs = 120
ssh_user = "admin"
ssh_key_path = "/home/op/.ssh/ops.pem"
setup_dir = "./setup"

[gateway]
endpoint = "https://gateway.example.net/"
token = "secret"
"#,
        )
        .unwrap();

        assert_eq!(config.min_running, 2);
        assert_eq!(config.placement.as_deref(), Some("zone-d"));
        let gateway = config.gateway.unwrap();
        assert_eq!(gateway.endpoint.as_str(), "https://gateway.example.net/");
        assert_eq!(gateway.token.as_deref(), Some("secret"));
    }

    #[test]
    fn load_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "dns_suffix = \"example.org\"\nzone = \"example.org.\"\nbalancer = \"cave\"\n",
        )
        .unwrap();

        let config = FleetConfig::load_file(&path).unwrap();
        assert_eq!(config.dns_suffix, "example.org");
    }

    #[test]
    fn load_file_missing_is_an_error() {
        assert!(FleetConfig::load_file(Path::new("/nonexistent/muster.toml")).is_err());
    }
}
