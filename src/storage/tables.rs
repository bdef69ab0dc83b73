//! Stage snapshot tables.
//!
//! Each stage hands its output to the next as a CSV table with a fixed
//! header row. Serialization is deterministic: stable insertion order,
//! stable column order, empty fields written as empty strings, so reruns
//! over an unchanged cache produce byte-identical files.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::RealtorRecord;
use crate::storage::RecordStore;

/// Column set for a stage output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Stage 1: `name,phone,email,website`
    Listing,
    /// Stage 2: adds `extra_emails`
    Enriched,
    /// Stage 3: adds `confidence`
    Final,
}

impl Schema {
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Schema::Listing => &["name", "phone", "email", "website"],
            Schema::Enriched => &["name", "phone", "email", "website", "extra_emails"],
            Schema::Final => &[
                "name",
                "phone",
                "email",
                "website",
                "extra_emails",
                "confidence",
            ],
        }
    }

    fn row(&self, record: &RealtorRecord) -> Vec<String> {
        let mut row = vec![
            record.name.clone(),
            record.phone.clone(),
            record.email.clone(),
            record.website.clone(),
        ];
        if matches!(self, Schema::Enriched | Schema::Final) {
            row.push(record.extra_emails_column());
        }
        if matches!(self, Schema::Final) {
            row.push(record.confidence_column());
        }
        row
    }
}

/// Serialize a store to CSV bytes with the schema's exact header row.
pub fn to_csv(store: &RecordStore, schema: Schema) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(schema.headers())?;
    for record in store.records() {
        writer.write_record(schema.row(record))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::snapshot("<memory>", e))
}

/// Persist a store snapshot atomically (write to temp, then rename).
///
/// Failure here is fatal for the run: the next stage must never start from
/// an unpersisted store.
pub fn write_table(path: impl AsRef<Path>, store: &RecordStore, schema: Schema) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_csv(store, schema)?;

    let display = path.display().to_string();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AppError::snapshot(&display, e))?;
    }
    let tmp = path.with_extension("csv.tmp");
    std::fs::write(&tmp, &bytes).map_err(|e| AppError::snapshot(&display, e))?;
    std::fs::rename(&tmp, path).map_err(|e| AppError::snapshot(&display, e))?;
    Ok(())
}

/// Load a stage snapshot back into a fresh store.
pub fn read_table(path: impl AsRef<Path>, schema: Schema) -> Result<RecordStore> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;

    let headers: Vec<&str> = reader.headers()?.iter().collect();
    if headers != schema.headers() {
        return Err(AppError::malformed(
            path.as_ref().display().to_string(),
            format!(
                "unexpected header row {:?}, expected {:?}",
                headers,
                schema.headers()
            ),
        ));
    }

    let mut store = RecordStore::new();
    for row in reader.records() {
        let row = row?;
        let get = |i: usize| row.get(i).unwrap_or("").to_string();
        let mut record = RealtorRecord {
            name: get(0),
            phone: get(1),
            email: get(2),
            website: get(3),
            ..RealtorRecord::default()
        };
        if matches!(schema, Schema::Enriched | Schema::Final) {
            record.set_extra_emails_column(&get(4));
        }
        if matches!(schema, Schema::Final) {
            record.set_confidence_column(&get(5));
        }
        store.upsert(record);
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;
    use tempfile::TempDir;

    fn sample_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.upsert(RealtorRecord {
            name: "John Smith".into(),
            phone: "306-555-0000".into(),
            website: "http://johnsmith.ca".into(),
            ..RealtorRecord::default()
        });
        let mut second = RealtorRecord {
            name: "Jane Doe".into(),
            phone: "306-555-1111".into(),
            email: "jane@x.com".into(),
            ..RealtorRecord::default()
        };
        second.extra_emails.insert("j.doe@y.com".into());
        second.confidence.insert(Field::Email, 0.8);
        store.upsert(second);
        store
    }

    #[test]
    fn listing_schema_writes_exact_header() {
        let bytes = to_csv(&sample_store(), Schema::Listing).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("name,phone,email,website\n"));
        assert!(text.contains("John Smith,306-555-0000,,http://johnsmith.ca\n"));
    }

    #[test]
    fn empty_fields_are_empty_strings_not_omitted() {
        let bytes = to_csv(&sample_store(), Schema::Final).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        // John Smith has no email, extra emails, or confidence.
        assert!(text.contains("John Smith,306-555-0000,,http://johnsmith.ca,,\n"));
        assert!(text.contains("Jane Doe,306-555-1111,jane@x.com,,j.doe@y.com,email:0.80\n"));
    }

    #[test]
    fn round_trip_preserves_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("final-output.csv");
        let store = sample_store();

        write_table(&path, &store, Schema::Final).unwrap();
        let loaded = read_table(&path, Schema::Final).unwrap();

        assert_eq!(loaded.records(), store.records());
    }

    #[test]
    fn serialization_is_deterministic() {
        let store = sample_store();
        let a = to_csv(&store, Schema::Final).unwrap();
        let b = to_csv(&store, Schema::Final).unwrap();
        assert_eq!(a, b);

        let reloaded = {
            let tmp = TempDir::new().unwrap();
            let path = tmp.path().join("t.csv");
            write_table(&path, &store, Schema::Final).unwrap();
            read_table(&path, Schema::Final).unwrap()
        };
        assert_eq!(to_csv(&reloaded, Schema::Final).unwrap(), a);
    }

    #[test]
    fn read_rejects_wrong_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.csv");
        std::fs::write(&path, "name,phone\nA,1\n").unwrap();
        assert!(read_table(&path, Schema::Listing).is_err());
    }
}
