// src/models/mod.rs

//! Domain models for the enrichment pipeline.

mod config;
mod record;
mod stats;

// Re-export all public types
pub use config::{
    Config, HttpConfig, LimiterConfig, ListingConfig, ListingSelectors, LoggingConfig,
    PathsConfig, RetryConfig, SearchConfig,
};
pub use record::{Field, IdentityHint, RealtorRecord, RecordKey};
pub use stats::StageStats;
