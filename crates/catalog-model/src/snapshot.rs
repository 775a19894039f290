//! Decoding full-collection snapshots pushed by the store.
//!
//! A snapshot is the store's complete `{ key -> record }` object. Decoding
//! never fails as a whole: records without a usable identifier are reported
//! in [`SnapshotReport::dropped`] and left out of the [`Collection`], and
//! unreadable optional fields fall back and are listed in
//! [`SnapshotReport::degraded`].

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{ModelError, Record, RecordId, RecordKey};

/// The store's raw view of one collection.
pub type RawSnapshot = Map<String, Value>;

/// A record that was left out of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRecord {
    /// Key the record was stored under.
    pub key: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: ModelError,
}

fn serialize_error<S: serde::Serializer>(
    error: &ModelError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// An optional field that could not be read and was replaced by its fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedField {
    /// Key the record is stored under.
    pub key: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: ModelError,
}

/// A record whose identifier field disagrees with its store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyMismatch {
    pub key: String,
    pub id: RecordId,
}

/// Outcome of decoding one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    /// Records that made it into the collection.
    pub accepted: usize,
    pub dropped: Vec<DroppedRecord>,
    /// Fields of accepted records that fell back to a default.
    pub degraded: Vec<DegradedField>,
    /// Identifiers that appeared under more than one key; the last key wins.
    pub duplicates: Vec<RecordId>,
    pub key_mismatches: Vec<KeyMismatch>,
}

impl SnapshotReport {
    /// True when every pushed record was accepted as-is.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
            && self.degraded.is_empty()
            && self.duplicates.is_empty()
            && self.key_mismatches.is_empty()
    }
}

/// All records of the most recent snapshot, ordered by identifier.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: BTreeMap<RecordId, Arc<Record>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw snapshot, keeping every record with a usable identifier.
    ///
    /// Each record remembers the key it was pushed under.
    pub fn from_snapshot(raw: &RawSnapshot) -> (Self, SnapshotReport) {
        let mut records = BTreeMap::new();
        let mut report = SnapshotReport::default();

        for (key, value) in raw {
            let record = match Record::decode(value) {
                Ok(decoded) => {
                    report
                        .degraded
                        .extend(decoded.invalid_fields.into_iter().map(|error| DegradedField {
                            key: key.clone(),
                            error,
                        }));
                    decoded.record.with_key(RecordKey::new(key.as_str()))
                }
                Err(error) => {
                    report.dropped.push(DroppedRecord {
                        key: key.clone(),
                        error,
                    });
                    continue;
                }
            };

            if record.id.as_str() != key.trim() {
                report.key_mismatches.push(KeyMismatch {
                    key: key.clone(),
                    id: record.id.clone(),
                });
            }

            match records.entry(record.id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(record));
                }
                Entry::Occupied(mut slot) => {
                    report.duplicates.push(record.id.clone());
                    slot.insert(Arc::new(record));
                }
            }
        }

        report.accepted = records.len();
        (Self { records }, report)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Arc<Record>> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    /// Records in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.values()
    }
}

impl FromIterator<Record> for Collection {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let records = iter
            .into_iter()
            .map(|record| (record.id.clone(), Arc::new(record)))
            .collect();
        Self { records }
    }
}
