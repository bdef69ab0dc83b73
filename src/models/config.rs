//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Global request spacing
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Retry/backoff behavior for transient fetch failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Listing scrape (stage 1) settings
    #[serde(default)]
    pub listing: ListingConfig,

    /// Web search completion (stage 3) settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Cache and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.listing.endpoint.trim().is_empty() {
            return Err(AppError::validation("listing.endpoint is empty"));
        }
        if self.listing.segments.is_empty() {
            return Err(AppError::validation("listing.segments is empty"));
        }
        if self.listing.max_pages == 0 {
            return Err(AppError::validation("listing.max_pages must be > 0"));
        }
        if self.search.endpoint.trim().is_empty() {
            return Err(AppError::validation("search.endpoint is empty"));
        }
        if !self.search.endpoint.contains("{query}") {
            return Err(AppError::validation(
                "search.endpoint must contain a {query} placeholder",
            ));
        }
        if self.search.batch_size == 0 {
            return Err(AppError::validation("search.batch_size must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Minimum spacing between consecutive fetches, shared across the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Minimum interval between request starts in milliseconds
    #[serde(default = "defaults::min_interval")]
    pub min_interval_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: defaults::min_interval(),
        }
    }
}

/// Exponential backoff settings for transient fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total tries per fetch (first attempt included)
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles each retry
    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay(),
        }
    }
}

/// Stage 1: paginated listing scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Batch endpoint template with `{segment}` and `{page}` placeholders
    #[serde(default = "defaults::listing_endpoint")]
    pub endpoint: String,

    /// Name segments to paginate over (the source indexes by first name)
    #[serde(default = "defaults::segments")]
    pub segments: Vec<String>,

    /// Per-segment page cap
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// CSS selectors for the listing card markup
    #[serde(default)]
    pub selectors: ListingSelectors,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::listing_endpoint(),
            segments: defaults::segments(),
            max_pages: defaults::max_pages(),
            selectors: ListingSelectors::default(),
        }
    }
}

/// CSS selectors for extracting realtor cards from a listing artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for one realtor card container
    #[serde(default = "defaults::card_selector")]
    pub card: String,

    /// Selector for the realtor name inside a card
    #[serde(default = "defaults::name_selector")]
    pub name: String,

    /// Selector for the phone number inside a card
    #[serde(default = "defaults::phone_selector")]
    pub phone: String,

    /// Selector for the personal website link inside a card
    #[serde(default = "defaults::website_selector")]
    pub website: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            card: defaults::card_selector(),
            name: defaults::name_selector(),
            phone: defaults::phone_selector(),
            website: defaults::website_selector(),
        }
    }
}

/// Stage 3: batched web search completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint template with a `{query}` placeholder.
    /// Point this at whatever search proxy serves structured hits.
    #[serde(default = "defaults::search_endpoint")]
    pub endpoint: String,

    /// Records per batched search request
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Suffix appended to each name when building queries
    #[serde(default = "defaults::query_suffix")]
    pub query_suffix: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::search_endpoint(),
            batch_size: defaults::batch_size(),
            query_suffix: defaults::query_suffix(),
        }
    }
}

/// Cache and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding one artifact per unique fetch key
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: String,

    /// Directory for stage output tables
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,

    /// Stage 1 output table
    #[serde(default = "defaults::listing_file")]
    pub listing_file: String,

    /// Stage 2 output table
    #[serde(default = "defaults::enriched_file")]
    pub enriched_file: String,

    /// Stage 3 output table
    #[serde(default = "defaults::final_file")]
    pub final_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: defaults::cache_dir(),
            output_dir: defaults::output_dir(),
            listing_file: defaults::listing_file(),
            enriched_file: defaults::enriched_file(),
            final_file: defaults::final_file(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter level
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; realtor-enrich/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Limiter defaults
    pub fn min_interval() -> u64 {
        1000
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        4
    }
    pub fn base_delay() -> u64 {
        10_000
    }

    // Listing defaults
    pub fn listing_endpoint() -> String {
        "https://www.realtor.ca/Services/ControlFetcher.asmx/GetRealtorResults?firstname={segment}&province=7&page={page}".into()
    }
    pub fn segments() -> Vec<String> {
        ('a'..='z').map(|c| c.to_string()).collect()
    }
    pub fn max_pages() -> u32 {
        20
    }
    pub fn card_selector() -> String {
        "div.realtorCard".into()
    }
    pub fn name_selector() -> String {
        "span.realtorCardName".into()
    }
    pub fn phone_selector() -> String {
        "span.TelephoneNumber".into()
    }
    pub fn website_selector() -> String {
        "a.realtorCardWebsite".into()
    }

    // Search defaults
    pub fn search_endpoint() -> String {
        "http://127.0.0.1:8080/search?q={query}".into()
    }
    pub fn batch_size() -> usize {
        20
    }
    pub fn query_suffix() -> String {
        "Saskatchewan realtor email".into()
    }

    // Path defaults
    pub fn cache_dir() -> String {
        "data/cache".into()
    }
    pub fn output_dir() -> String {
        "data/output".into()
    }
    pub fn listing_file() -> String {
        "scrape-output.csv".into()
    }
    pub fn enriched_file() -> String {
        "personal-output.csv".into()
    }
    pub fn final_file() -> String {
        "final-output.csv".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
