//! DNS zone model: typed record sets and point-in-time zone snapshots.
//!
//! A zone snapshot is fetched once per operation and trusted through to
//! commit time — there is no optimistic-concurrency token. External mutation
//! between snapshot and commit surfaces as a commit rejection (see
//! [`batch::ChangeBatch`]).

pub mod batch;

pub use batch::{Change, ChangeAction, ChangeBatch};

use serde::{Deserialize, Serialize};

/// Default TTL for newly created records, in seconds.
pub const DEFAULT_TTL: u32 = 300;

/// DNS record type. Only the types this tool manages are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed set of values sharing a TTL. Key = (name, rtype).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub name: String,
    pub rtype: RecordType,
    pub ttl: u32,
    pub values: Vec<String>,
}

impl RecordSet {
    pub fn new(
        name: impl Into<String>,
        rtype: RecordType,
        ttl: u32,
        values: Vec<String>,
    ) -> Self {
        RecordSet {
            name: name.into(),
            rtype,
            ttl,
            values,
        }
    }

    pub fn key(&self) -> (&str, RecordType) {
        (&self.name, self.rtype)
    }
}

/// All record sets of a zone, fetched at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub zone: String,
    records: Vec<RecordSet>,
}

impl ZoneSnapshot {
    pub fn new(zone: impl Into<String>, records: Vec<RecordSet>) -> Self {
        ZoneSnapshot {
            zone: zone.into(),
            records,
        }
    }

    pub fn records(&self) -> &[RecordSet] {
        &self.records
    }

    /// Record sets matching `name` and, when given, `rtype`.
    pub fn lookup<'a>(
        &'a self,
        name: &'a str,
        rtype: Option<RecordType>,
    ) -> impl Iterator<Item = &'a RecordSet> {
        self.records
            .iter()
            .filter(move |r| r.name == name && rtype.is_none_or(|t| r.rtype == t))
    }
}
