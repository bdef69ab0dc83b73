//! In-memory record store with idempotent upsert-merge semantics.
//!
//! The store owns the authoritative set of records for one stage. Records
//! keep stable insertion order, which drives both `select_missing` and the
//! row order of persisted snapshots. Merging never regresses a populated
//! field and never silently overwrites observed data: a differing email
//! lands in `extra_emails`, any other differing field keeps the existing
//! value and is logged as a conflict.

use std::collections::HashMap;

use crate::models::{Field, RealtorRecord, RecordKey};
use crate::utils::{normalize_name, normalize_phone, normalize_website};

/// Result of merging one incoming record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// A new record was appended (as opposed to merged into an existing one)
    pub inserted: bool,
    /// Fields that transitioned from empty to filled
    pub filled: usize,
    /// Differing non-empty values resolved by keeping the existing one
    pub conflicts: usize,
}

/// Ordered collection of realtor records keyed by identity.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: Vec<RealtorRecord>,
    keys: Vec<RecordKey>,
    index: HashMap<RecordKey, usize>,
    singleton_seq: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in stable insertion order.
    pub fn records(&self) -> &[RealtorRecord] {
        &self.records
    }

    pub fn get(&self, key: &RecordKey) -> Option<&RealtorRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Identity key for an incoming record; records with neither phone nor
    /// website are unmergeable singletons and always insert fresh.
    fn key_for_insert(&mut self, record: &RealtorRecord) -> RecordKey {
        match record.derive_key() {
            Some(key) => key,
            None => {
                let key = RecordKey::Singleton(self.singleton_seq);
                self.singleton_seq += 1;
                key
            }
        }
    }

    /// Merge an incoming record into the store by identity key.
    pub fn upsert(&mut self, mut incoming: RealtorRecord) -> MergeOutcome {
        sanitize(&mut incoming);
        let key = self.key_for_insert(&incoming);
        if let Some(&i) = self.index.get(&key) {
            return merge_fields(&mut self.records[i], &incoming);
        }
        let filled = [Field::Name, Field::Phone, Field::Email, Field::Website]
            .iter()
            .filter(|f| !incoming.is_missing(**f))
            .count();
        self.index.insert(key.clone(), self.records.len());
        self.keys.push(key);
        self.records.push(incoming);
        MergeOutcome {
            inserted: true,
            filled,
            conflicts: 0,
        }
    }

    /// Merge candidate fields into the record with the given key.
    ///
    /// Returns `None` when no such record exists (the caller decides
    /// whether that is worth a warning).
    pub fn merge_into(
        &mut self,
        key: &RecordKey,
        incoming: &RealtorRecord,
    ) -> Option<MergeOutcome> {
        let mut incoming = incoming.clone();
        sanitize(&mut incoming);
        let &i = self.index.get(key)?;
        Some(merge_fields(&mut self.records[i], &incoming))
    }

    /// Records where `field` is still empty, in insertion order.
    pub fn select_missing(&self, field: Field) -> Vec<RealtorRecord> {
        self.records
            .iter()
            .filter(|r| r.is_missing(field))
            .cloned()
            .collect()
    }

    /// Like [`select_missing`](Self::select_missing), paired with each
    /// record's store key so fetch results can be merged back by identity
    /// (singleton records included).
    pub fn select_missing_keyed(&self, field: Field) -> Vec<(RecordKey, RealtorRecord)> {
        self.keys
            .iter()
            .zip(&self.records)
            .filter(|(_, r)| r.is_missing(field))
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }
}

/// Enforce record invariants before merging: `extra_emails` never contains
/// the primary email, and confidence entries only exist for populated
/// fields, clamped to [0,1].
fn sanitize(record: &mut RealtorRecord) {
    let email = record.email.clone();
    record.extra_emails.remove(&email);
    let populated: Vec<Field> = [Field::Name, Field::Phone, Field::Email, Field::Website]
        .into_iter()
        .filter(|f| !record.is_missing(*f))
        .collect();
    record.confidence.retain(|f, _| populated.contains(f));
    for score in record.confidence.values_mut() {
        *score = score.clamp(0.0, 1.0);
    }
}

/// Whether two non-empty values for `field` denote the same observation.
fn same_value(field: Field, a: &str, b: &str) -> bool {
    match field {
        Field::Name => normalize_name(a) == normalize_name(b),
        Field::Phone => normalize_phone(a) == normalize_phone(b),
        Field::Email => a.trim().eq_ignore_ascii_case(b.trim()),
        Field::Website => normalize_website(a) == normalize_website(b),
    }
}

fn merge_fields(existing: &mut RealtorRecord, incoming: &RealtorRecord) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for field in [Field::Name, Field::Phone, Field::Email, Field::Website] {
        let value = incoming.field(field).trim();
        if value.is_empty() {
            continue;
        }
        if existing.is_missing(field) {
            existing.set_field(field, value);
            if let Some(&score) = incoming.confidence.get(&field) {
                existing.confidence.insert(field, score.clamp(0.0, 1.0));
            }
            outcome.filled += 1;
            continue;
        }
        if same_value(field, existing.field(field), value) {
            continue;
        }
        // Differing non-empty values: keep the first-observed one.
        outcome.conflicts += 1;
        if field == Field::Email {
            existing.extra_emails.insert(value.to_string());
        } else {
            log::warn!(
                "conflict on {} for '{}': keeping '{}', ignoring '{}'",
                field,
                existing.name,
                existing.field(field),
                value,
            );
        }
    }

    for extra in &incoming.extra_emails {
        if !same_value(Field::Email, &existing.email, extra) {
            existing.extra_emails.insert(extra.clone());
        }
    }
    let email = existing.email.clone();
    existing.extra_emails.remove(&email);

    outcome
}
