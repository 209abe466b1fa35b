//! Fleet-wide DNS sync: one atomic batch per pass, idempotent re-runs.

use std::collections::BTreeMap;

use muster_core::config::FleetConfig;
use muster_core::dns::{RecordSet, RecordType};
use muster_core::fleet::{Instance, InstanceState, NAME_TAG, ROLE_TAG};
use muster_core::ops::{OpsContext, SyncDnsOptions, sync_dns};
use muster_core::provider::ZoneApi;
use muster_core::provider::memory::MemoryProvider;
use muster_core::setup::NoopSetup;

const ZONE: &str = "example.org.";

fn test_config() -> FleetConfig {
    FleetConfig {
        dns_suffix: "example.org".to_string(),
        zone: ZONE.to_string(),
        balancer: "cave".to_string(),
        min_running: 1,
        placement: None,
        key_name: None,
        wait_timeout_secs: 30,
        ssh_user: "ubuntu".to_string(),
        ssh_key_path: None,
        setup_dir: None,
        gateway: None,
    }
}

fn web_instance(id: &str, name: Option<&str>, state: InstanceState) -> Instance {
    let mut tags = BTreeMap::new();
    if let Some(name) = name {
        tags.insert(NAME_TAG.to_string(), name.to_string());
    }
    tags.insert(ROLE_TAG.to_string(), "web".to_string());
    let public_dns = (state == InstanceState::Running)
        .then(|| format!("{id}.cloud.example.net"));
    Instance {
        id: id.to_string(),
        state,
        tags,
        public_dns,
    }
}

#[test]
fn sync_replaces_stale_aliases_and_creates_missing_ones() {
    let provider = MemoryProvider::new();
    provider.seed_zone(
        ZONE,
        vec![RecordSet::new(
            "web1.example.org.",
            RecordType::Cname,
            300,
            vec!["stale.cloud.example.net.".to_string()],
        )],
    );
    provider.seed_instance(web_instance("i-1", Some("web1"), InstanceState::Running));
    provider.seed_instance(web_instance("i-2", Some("web2"), InstanceState::Running));
    // Stopped and unnamed instances are not synced.
    provider.seed_instance(web_instance("i-3", Some("web3"), InstanceState::Stopped));
    provider.seed_instance(web_instance("i-4", None, InstanceState::Running));

    let config = test_config();
    let setup = NoopSetup;
    let ctx = OpsContext::new(&provider, &setup, &config);

    let report = sync_dns(
        &ctx,
        &SyncDnsOptions {
            role: "web".parse().unwrap(),
        },
    )
    .unwrap();

    assert_eq!(report.synced.len(), 2);

    let zone = provider.fetch_zone(ZONE).unwrap();
    let web1: Vec<_> = zone
        .lookup("web1.example.org.", Some(RecordType::Cname))
        .collect();
    assert_eq!(web1.len(), 1);
    assert_eq!(web1[0].values, vec!["i-1.cloud.example.net."]);
    assert_eq!(zone.lookup("web2.example.org.", None).count(), 1);
    assert_eq!(zone.lookup("web3.example.org.", None).count(), 0);
}

#[test]
fn sync_is_idempotent() {
    let provider = MemoryProvider::new();
    provider.seed_zone(ZONE, Vec::new());
    provider.seed_instance(web_instance("i-1", Some("web1"), InstanceState::Running));

    let config = test_config();
    let setup = NoopSetup;
    let ctx = OpsContext::new(&provider, &setup, &config);
    let options = SyncDnsOptions {
        role: "web".parse().unwrap(),
    };

    sync_dns(&ctx, &options).unwrap();
    sync_dns(&ctx, &options).unwrap();

    let zone = provider.fetch_zone(ZONE).unwrap();
    assert_eq!(zone.records().len(), 1);
}

#[test]
fn sync_with_no_running_instances_commits_nothing() {
    let provider = MemoryProvider::new();
    provider.seed_zone(ZONE, Vec::new());
    provider.seed_instance(web_instance("i-1", Some("web1"), InstanceState::Stopped));

    let config = test_config();
    let setup = NoopSetup;
    let ctx = OpsContext::new(&provider, &setup, &config);

    let report = sync_dns(
        &ctx,
        &SyncDnsOptions {
            role: "web".parse().unwrap(),
        },
    )
    .unwrap();

    assert!(report.synced.is_empty());
    assert!(provider.fetch_zone(ZONE).unwrap().records().is_empty());
}
