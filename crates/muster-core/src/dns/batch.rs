//! Change batches: staged create/delete operations committed atomically.
//!
//! The zone API's contract is all-or-nothing batch application. Deferred
//! staging lets an entire fleet's worth of name syncs accumulate into one
//! atomic write: a replace stages its delete and create into the SAME batch,
//! so the committed zone never shows a name resolving to nothing or to stale
//! data in between.

use serde::{Deserialize, Serialize};

use super::{RecordSet, RecordType, ZoneSnapshot, DEFAULT_TTL};
use crate::error::Result;
use crate::provider::ZoneApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Create,
    Delete,
}

/// One staged change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub action: ChangeAction,
    pub record: RecordSet,
}

/// An ordered list of changes, submitted as a single atomic request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    changes: Vec<Change>,
}

impl ChangeBatch {
    pub fn new() -> Self {
        ChangeBatch::default()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Stage a CREATE with the default TTL.
    ///
    /// No duplicate-key check happens locally; a CREATE for a key that
    /// already exists is the external commit's rejection to make.
    pub fn stage_create(
        &mut self,
        name: impl Into<String>,
        rtype: RecordType,
        values: Vec<String>,
    ) {
        self.stage_create_ttl(name, rtype, values, DEFAULT_TTL);
    }

    pub fn stage_create_ttl(
        &mut self,
        name: impl Into<String>,
        rtype: RecordType,
        values: Vec<String>,
        ttl: u32,
    ) {
        self.changes.push(Change {
            action: ChangeAction::Create,
            record: RecordSet::new(name, rtype, ttl, values),
        });
    }

    /// Stage a DELETE for every record set in the snapshot matching
    /// (name, rtype).
    ///
    /// TTL and values are copied verbatim from the snapshot so the staged
    /// fields exactly match server state at commit time (assuming no
    /// intervening external mutation — if there was one, the commit rejects
    /// the whole batch).
    pub fn stage_delete(&mut self, snapshot: &ZoneSnapshot, name: &str, rtype: RecordType) {
        for existing in snapshot.lookup(name, Some(rtype)) {
            self.changes.push(Change {
                action: ChangeAction::Delete,
                record: existing.clone(),
            });
        }
    }

    /// Stage a replace with the default TTL: delete whatever the snapshot
    /// holds for (name, rtype), then create `values` — in this same batch.
    ///
    /// Because both halves commit together, there is no externally
    /// observable intermediate state where the name resolves to nothing or
    /// to the old values.
    pub fn stage_replace(
        &mut self,
        snapshot: &ZoneSnapshot,
        name: &str,
        rtype: RecordType,
        values: Vec<String>,
    ) {
        self.stage_replace_ttl(snapshot, name, rtype, values, DEFAULT_TTL);
    }

    pub fn stage_replace_ttl(
        &mut self,
        snapshot: &ZoneSnapshot,
        name: &str,
        rtype: RecordType,
        values: Vec<String>,
        ttl: u32,
    ) {
        self.stage_delete(snapshot, name, rtype);
        self.stage_create_ttl(name, rtype, values, ttl);
    }

    /// Submit the ordered change list as a single request.
    ///
    /// All changes apply together or none do; a single invalid change (a
    /// stale DELETE, a duplicate CREATE) fails the entire batch with one
    /// [`crate::Error::CommitRejected`]. Never retried here. An empty batch
    /// is a no-op and is not submitted.
    pub fn commit(&self, zone_api: &dyn ZoneApi, zone: &str) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        zone_api.commit(zone, self)
    }
}
