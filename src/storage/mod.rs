//! Persistence layer: the shared response cache, the per-stage record
//! store, and CSV snapshot tables.
//!
//! The response cache is process-wide and reusable across runs. Record
//! stores are owned per stage; a stage reads the previous stage's persisted
//! table and produces a new store, never mutating the input in place.

pub mod cache;
pub mod store;
pub mod tables;

pub use cache::{CacheLookup, FetchRecord, ResponseCache};
pub use store::{MergeOutcome, RecordStore};
pub use tables::{Schema, read_table, write_table};
