//! Realtor contact record, field names, and identity keys.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::utils::{normalize_name, normalize_phone, normalize_website};

/// An enrichable contact field. `Name` is only ever set by the listing
/// stage; the later stages target the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Phone,
    Email,
    Website,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Website => "website",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Field::Name),
            "phone" => Some(Field::Phone),
            "email" => Some(Field::Email),
            "website" => Some(Field::Website),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity key used to match and merge records across stages.
///
/// Derived from (name, phone), falling back to (name, website) when the
/// phone is absent. Records with neither phone nor website are unmergeable
/// singletons keyed by insertion order, because de-duplicating on name
/// alone would silently merge distinct people.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    NamePhone(String, String),
    NameSite(String, String),
    Singleton(u64),
}

impl RecordKey {
    /// Derive a content-based key, or `None` when the record must be
    /// treated as a singleton.
    pub fn derive(name: &str, phone: &str, website: &str) -> Option<Self> {
        let name = normalize_name(name);
        let phone = normalize_phone(phone);
        if !phone.is_empty() {
            return Some(RecordKey::NamePhone(name, phone));
        }
        let site = normalize_website(website);
        if !site.is_empty() {
            return Some(RecordKey::NameSite(name, site));
        }
        None
    }
}

/// Identity hint emitted by an extractor alongside its field values.
///
/// Empty strings mean "not present in the artifact". A hint with only a
/// name is still useful for matching search results back to the batch of
/// records a request covered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IdentityHint {
    pub name: String,
    pub phone: String,
    pub website: String,
}

impl IdentityHint {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A realtor contact record as it flows through the pipeline.
///
/// Empty string fields mean "unknown". Fields only ever transition from
/// empty to filled (monotonic enrichment); `extra_emails` collects email
/// candidates that lost a merge conflict, and `confidence` holds scores
/// for values produced by the search-completion stage only. A field with
/// no confidence entry was directly observed (implicit 1.0).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealtorRecord {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub extra_emails: BTreeSet<String>,
    pub confidence: BTreeMap<Field, f64>,
}

impl RealtorRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Content-based identity key, if the record has one.
    pub fn derive_key(&self) -> Option<RecordKey> {
        RecordKey::derive(&self.name, &self.phone, &self.website)
    }

    /// Read a field value ("" when unset).
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Phone => &self.phone,
            Field::Email => &self.email,
            Field::Website => &self.website,
        }
    }

    /// Whether the given field is still missing.
    pub fn is_missing(&self, field: Field) -> bool {
        self.field(field).trim().is_empty()
    }

    /// Set a field value directly. Does not apply merge rules; callers
    /// building a fresh record use this before `RecordStore::upsert`.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.name = value,
            Field::Phone => self.phone = value,
            Field::Email => self.email = value,
            Field::Website => self.website = value,
        }
    }

    /// Serialize `extra_emails` for tabular output.
    pub fn extra_emails_column(&self) -> String {
        self.extra_emails
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Parse the `extra_emails` column back into the set.
    pub fn set_extra_emails_column(&mut self, column: &str) {
        self.extra_emails = column
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Serialize the confidence map as `field:score;field:score` with
    /// two-decimal scores in stable field order.
    pub fn confidence_column(&self) -> String {
        self.confidence
            .iter()
            .map(|(field, score)| format!("{}:{:.2}", field, score))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Parse the confidence column. Unknown field names are ignored.
    pub fn set_confidence_column(&mut self, column: &str) {
        self.confidence = column
            .split(';')
            .filter_map(|pair| {
                let (field, score) = pair.split_once(':')?;
                let field = Field::parse(field.trim())?;
                let score: f64 = score.trim().parse().ok()?;
                Some((field, score.clamp(0.0, 1.0)))
            })
            .collect();
    }
}
