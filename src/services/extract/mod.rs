//! Field extraction from fetched artifacts.
//!
//! One extractor per stage, all behind the same capability interface so
//! the stage driver never branches on stage identity. Extractors never
//! invent values: a field absent from the artifact is simply not emitted.

mod listing;
mod search;
mod website;

pub use listing::ListingExtractor;
pub use search::SearchExtractor;
pub use website::WebsiteExtractor;

use crate::error::Result;
use crate::models::{Field, IdentityHint};
use crate::storage::FetchRecord;

/// One candidate field value mined from an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Which record this value belongs to. `None` means "the record the
    /// request was issued for" and is only valid for single-record
    /// requests.
    pub hint: Option<IdentityHint>,
    pub field: Field,
    pub value: String,
    /// Correctness likelihood in [0,1]. The search-completion extractor
    /// always sets this; the earlier stages leave it `None` (directly
    /// observed, implicit 1.0).
    pub confidence: Option<f64>,
}

/// Turns a raw fetched artifact into zero or more candidate field values.
pub trait Extractor: Send + Sync {
    fn extract(&self, artifact: &FetchRecord) -> Result<Vec<Extraction>>;
}
