//! SSH-backed host setup.
//!
//! Shells out to `ssh`/`ssh-keygen`/`rsync`. Reachability probes treat any
//! non-zero exit as "not ready yet"; configuration failures are hard errors.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::Context;
use tracing::info;

use crate::error::{Error, Result};
use crate::fleet::{Instance, Role};
use crate::poll::Poller;

use super::HostSetup;

const REMOTE_SETUP_DIR: &str = "muster-setup";

#[derive(Debug, Clone)]
pub struct SshSetup {
    key_path: PathBuf,
    user: String,
    /// Local directory of configuration scripts to copy to the host. When
    /// unset, configure only tags along the remote script invocation.
    setup_dir: Option<PathBuf>,
}

impl SshSetup {
    pub fn new(key_path: PathBuf, user: impl Into<String>, setup_dir: Option<PathBuf>) -> Self {
        SshSetup {
            key_path,
            user: user.into(),
            setup_dir,
        }
    }

    fn user_host(&self, instance: &Instance) -> Result<String> {
        let host = instance
            .public_dns
            .as_deref()
            .ok_or_else(|| Error::not_found("public hostname", &instance.id))?;
        Ok(format!("{}@{}", self.user, host))
    }

    fn ssh(&self, user_host: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-i").arg(&self.key_path).arg(user_host);
        cmd
    }

    /// One probe: `ssh <host> true`, success meaning reachable.
    fn probe(&self, user_host: &str) -> bool {
        self.ssh(user_host)
            .arg("true")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl HostSetup for SshSetup {
    fn forget_host_keys(&self, instance: &Instance) -> Result<()> {
        let Some(host) = instance.public_dns.as_deref() else {
            return Ok(());
        };
        info!(host, "removing stale ssh host keys");
        // Best-effort: a missing known_hosts entry exits non-zero.
        let _ = Command::new("ssh-keygen")
            .args(["-R", host])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        Ok(())
    }

    fn wait_ready(&self, poller: &Poller, instance: &Instance) -> Result<()> {
        let user_host = self.user_host(instance)?;
        info!(host = %user_host, "waiting for ssh to come up");
        poller.wait_or_err("ssh to become reachable", || self.probe(&user_host))
    }

    fn configure(&self, instance: &Instance, role: Role, name: &str) -> Result<()> {
        let user_host = self.user_host(instance)?;

        if let Some(ref setup_dir) = self.setup_dir {
            info!(host = %user_host, "copying configuration scripts");
            let status = Command::new("rsync")
                .arg("-a")
                .args(["--exclude", ".git/"])
                .arg("-e")
                .arg(format!("ssh -i {}", self.key_path.display()))
                .arg(format!("{}/", setup_dir.display()))
                .arg(format!("{user_host}:{REMOTE_SETUP_DIR}"))
                .status()
                .context("Failed to run rsync")?;
            if !status.success() {
                return Err(anyhow::anyhow!("rsync to {user_host} exited with {status}").into());
            }
        }

        info!(host = %user_host, role = %role, name, "configuring host");
        let status = self
            .ssh(&user_host)
            .arg("-t")
            .arg(format!(
                "cd {REMOTE_SETUP_DIR} && ./configure.sh {role} {name}"
            ))
            .status()
            .context("Failed to run ssh")?;
        if !status.success() {
            return Err(
                anyhow::anyhow!("configuration of {user_host} as {role} exited with {status}")
                    .into(),
            );
        }
        Ok(())
    }

    fn bootstrap(&self, instance: &Instance, service: &str) -> Result<()> {
        let user_host = self.user_host(instance)?;
        info!(host = %user_host, service, "starting service");
        let status = self
            .ssh(&user_host)
            .arg(format!("cd {REMOTE_SETUP_DIR} && ./service.sh {service}"))
            .status()
            .context("Failed to run ssh")?;
        if !status.success() {
            return Err(anyhow::anyhow!(
                "service bootstrap '{service}' on {user_host} exited with {status}"
            )
            .into());
        }
        Ok(())
    }
}
