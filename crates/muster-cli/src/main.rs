//! Muster - Cloud Fleet Convergence Tool
//!
//! Usage:
//!   muster status                # Show the fleet
//!   muster start web --count 2   # Start spare web servers
//!   muster sync-dns web          # Converge DNS aliases
//!   muster sync-lb web           # Converge balancer membership

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use muster_core::config::FleetConfig;
use muster_core::fleet::Role;
use muster_core::ops::{
    self, OpsContext, ProvisionOptions, StartOptions, StatusOptions, StopOptions, SyncDnsOptions,
    SyncLbOptions,
};
use muster_core::provider::Provider;
use muster_core::provider::http::HttpProvider;
use muster_core::provider::memory::MemoryProvider;
use muster_core::setup::{HostSetup, NoopSetup, SshSetup};

#[derive(Parser)]
#[command(name = "muster")]
#[command(about = "Cloud fleet convergence tool", long_about = None)]
struct Cli {
    /// Path to muster.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider backend
    #[arg(long, global = true, value_enum, default_value = "http")]
    provider: ProviderKind,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderKind {
    /// HTTP gateway from [gateway] in muster.toml
    Http,
    /// Ephemeral in-memory cloud (dev/testing)
    Memory,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the fleet
    Status {
        /// Filter by role (web, database, queue, staging)
        #[arg(long)]
        role: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Start spare (stopped) instances of a role
    Start {
        role: String,
        #[arg(long, default_value_t = 4)]
        count: usize,
    },

    /// Stop instances of a role, preserving the minimum running count
    Stop {
        role: String,
        #[arg(long, default_value_t = 4)]
        count: usize,
    },

    /// Provision and configure new instances of a role
    Provision {
        role: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// Converge DNS aliases for a role's running instances
    SyncDns { role: String },

    /// Converge load-balancer membership for a role
    SyncLb { role: String },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muster=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = FleetConfig::load(cli.config.as_deref())?;

    match cli.provider {
        ProviderKind::Http => {
            let gateway = config
                .gateway
                .as_ref()
                .context("No [gateway] section in muster.toml (or use --provider memory)")?;
            let provider = HttpProvider::new(&gateway.endpoint, gateway.token.clone())?;
            run_command(&provider, &config, cli.command)
        }
        ProviderKind::Memory => {
            let provider = MemoryProvider::new();
            provider.seed_zone(&config.zone, Vec::new());
            provider.seed_balancer(&config.balancer, &[]);
            run_command(&provider, &config, cli.command)
        }
    }
}

fn run_command<P: Provider>(provider: &P, config: &FleetConfig, command: Commands) -> Result<()> {
    let setup: Box<dyn HostSetup> = match &config.ssh_key_path {
        Some(key_path) => Box::new(SshSetup::new(
            key_path.clone(),
            config.ssh_user.clone(),
            config.setup_dir.clone(),
        )),
        None => Box::new(NoopSetup),
    };
    let ctx = OpsContext::new(provider, setup.as_ref(), config);

    match command {
        Commands::Status { role, format } => {
            let role = role.map(|r| r.parse::<Role>()).transpose()?;
            let status = ops::collect_status(&ctx, &StatusOptions { role })?;
            match format {
                OutputFormat::Table => print_status(&status),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
            }
        }
        Commands::Start { role, count } => {
            let role = role.parse::<Role>()?;
            let report = ops::start_role(&ctx, &StartOptions { role, count })?;
            if report.started.is_empty() {
                println!("No spare {role} instances to start.");
            } else {
                println!("Started: {}", report.started.join(", "));
                println!("Updated {} dns alias(es).", report.dns_synced);
                println!("Remember to deploy to the new instances.");
            }
        }
        Commands::Stop { role, count } => {
            let role = role.parse::<Role>()?;
            let report = ops::stop_role(&ctx, &StopOptions { role, count })?;
            if report.refused {
                println!(
                    "Refused: stopping {count} would leave fewer than {} running.",
                    config.min_running
                );
            } else {
                println!("Stopped: {}", report.stopped.join(", "));
                if let Some(delta) = report.balancer_delta {
                    print_delta(&delta);
                }
            }
        }
        Commands::Provision { role, count } => {
            let role = role.parse::<Role>()?;
            let report = ops::provision_role(&ctx, &ProvisionOptions { role, count })?;
            for instance in &report.provisioned {
                println!("{}  {}  {}", instance.id, instance.name, instance.hostname);
            }
        }
        Commands::SyncDns { role } => {
            let role = role.parse::<Role>()?;
            let report = ops::sync_dns(&ctx, &SyncDnsOptions { role })?;
            if report.synced.is_empty() {
                println!("Nothing to sync.");
            } else {
                for sync in &report.synced {
                    println!("{} -> {}", sync.name, sync.target);
                }
                println!("Committed {} alias(es).", report.synced.len());
            }
        }
        Commands::SyncLb { role } => {
            let role = role.parse::<Role>()?;
            let report = ops::sync_balancer(&ctx, &SyncLbOptions { role })?;
            print_delta(&report.delta);
        }
    }

    Ok(())
}

fn print_status(status: &ops::FleetStatus) {
    println!(
        "{:<14} {:<10} {:<14} {:<12} PUBLIC DNS",
        "NAME", "ROLE", "STATE", "ID"
    );
    for row in &status.rows {
        println!(
            "{:<14} {:<10} {:<14} {:<12} {}",
            row.name.as_deref().unwrap_or("-"),
            row.role.map(|r| r.as_str()).unwrap_or("-"),
            row.state,
            row.id,
            row.public_dns.as_deref().unwrap_or("-"),
        );
    }
    println!(
        "\n{} total, {} running, {} stopped",
        status.total, status.running, status.stopped
    );
}

fn print_delta(delta: &muster_core::balancer::MembershipDelta) {
    if delta.is_converged() {
        println!("Balancer membership already converged.");
        return;
    }
    if !delta.to_add.is_empty() {
        println!("Registered: {}", delta.to_add.join(", "));
    }
    if !delta.to_remove.is_empty() {
        println!("Deregistered: {}", delta.to_remove.join(", "));
    }
}
