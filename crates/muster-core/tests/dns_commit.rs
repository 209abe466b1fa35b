//! Atomicity and replace semantics of zone change batches.

use muster_core::Error;
use muster_core::dns::{ChangeBatch, RecordSet, RecordType};
use muster_core::provider::ZoneApi;
use muster_core::provider::memory::MemoryProvider;

const ZONE: &str = "example.org.";

fn provider_with_zone(records: Vec<RecordSet>) -> MemoryProvider {
    let provider = MemoryProvider::new();
    provider.seed_zone(ZONE, records);
    provider
}

fn cname(name: &str, target: &str) -> RecordSet {
    RecordSet::new(name, RecordType::Cname, 300, vec![target.to_string()])
}

#[test]
fn replace_commit_list_returns_exactly_the_new_values() {
    let provider = provider_with_zone(vec![cname(
        "web1.example.org.",
        "old-host.cloud.example.net.",
    )]);

    let snapshot = provider.fetch_zone(ZONE).unwrap();
    let mut batch = ChangeBatch::new();
    batch.stage_replace(
        &snapshot,
        "web1.example.org.",
        RecordType::Cname,
        vec!["new-host.cloud.example.net.".to_string()],
    );
    batch.commit(&provider, ZONE).unwrap();

    let after = provider.fetch_zone(ZONE).unwrap();
    let hits: Vec<_> = after
        .lookup("web1.example.org.", Some(RecordType::Cname))
        .collect();
    // Exactly the new value set: no remnants, no duplicate keys.
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].values, vec!["new-host.cloud.example.net."]);
}

#[test]
fn replace_is_idempotent_across_fresh_snapshots() {
    let provider = provider_with_zone(vec![cname(
        "web1.example.org.",
        "old-host.cloud.example.net.",
    )]);

    for _ in 0..2 {
        let snapshot = provider.fetch_zone(ZONE).unwrap();
        let mut batch = ChangeBatch::new();
        batch.stage_replace(
            &snapshot,
            "web1.example.org.",
            RecordType::Cname,
            vec!["new-host.cloud.example.net.".to_string()],
        );
        batch.commit(&provider, ZONE).unwrap();
    }

    let after = provider.fetch_zone(ZONE).unwrap();
    assert_eq!(after.records().len(), 1);
}

#[test]
fn stale_delete_fails_the_whole_batch() {
    let provider = provider_with_zone(vec![cname(
        "web1.example.org.",
        "old-host.cloud.example.net.",
    )]);

    let snapshot = provider.fetch_zone(ZONE).unwrap();

    // Concurrent external mutation between snapshot and commit.
    provider.seed_zone(
        ZONE,
        vec![cname("web1.example.org.", "moved.cloud.example.net.")],
    );

    let mut batch = ChangeBatch::new();
    batch.stage_create(
        "web2.example.org.",
        RecordType::Cname,
        vec!["host-2.cloud.example.net.".to_string()],
    );
    batch.stage_replace(
        &snapshot,
        "web1.example.org.",
        RecordType::Cname,
        vec!["new-host.cloud.example.net.".to_string()],
    );

    let err = batch.commit(&provider, ZONE).unwrap_err();
    assert!(matches!(err, Error::CommitRejected { .. }));

    // The CREATE staged alongside must not have been applied either.
    let after = provider.fetch_zone(ZONE).unwrap();
    assert_eq!(after.lookup("web2.example.org.", None).count(), 0);
    assert_eq!(
        after
            .lookup("web1.example.org.", Some(RecordType::Cname))
            .next()
            .unwrap()
            .values,
        vec!["moved.cloud.example.net."]
    );
}

#[test]
fn duplicate_create_is_rejected_by_commit() {
    let provider = provider_with_zone(vec![cname(
        "web1.example.org.",
        "host-1.cloud.example.net.",
    )]);

    let mut batch = ChangeBatch::new();
    batch.stage_create(
        "web1.example.org.",
        RecordType::Cname,
        vec!["other.cloud.example.net.".to_string()],
    );

    let err = batch.commit(&provider, ZONE).unwrap_err();
    assert!(matches!(err, Error::CommitRejected { .. }));
}

#[test]
fn empty_batch_commit_is_a_no_op() {
    let provider = provider_with_zone(vec![cname(
        "web1.example.org.",
        "host-1.cloud.example.net.",
    )]);

    let batch = ChangeBatch::new();
    batch.commit(&provider, ZONE).unwrap();

    let after = provider.fetch_zone(ZONE).unwrap();
    assert_eq!(after.records().len(), 1);
}
