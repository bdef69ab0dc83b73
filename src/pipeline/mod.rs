// src/pipeline/mod.rs

//! Three-stage enrichment pipeline: the generic stage driver, the three
//! concrete stages, and the runner that sequences them.

pub mod runner;
pub mod stage;
pub mod stages;

pub use runner::PipelineRunner;
pub use stage::{EnrichmentStage, FetchRequest, StageSource};
pub use stages::{ListingStage, SearchStage, WebsiteStage};
