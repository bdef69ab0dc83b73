// src/services/mod.rs

//! Capabilities the pipeline composes: the HTTP fetcher, the shared rate
//! limiter with retry, and the per-stage extractors.

pub mod extract;
pub mod http;
pub mod limiter;

pub use extract::{Extraction, Extractor, ListingExtractor, SearchExtractor, WebsiteExtractor};
pub use http::{FetchBody, Fetcher, HttpFetcher};
pub use limiter::{Clock, RateLimiter, RetryPolicy, TokioClock, fetch_with_retry};
