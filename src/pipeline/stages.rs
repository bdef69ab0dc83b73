//! The three concrete stages.
//!
//! ```text
//! listing  -> seeds records from the paginated realtor index
//! website  -> visits each record's own site for a missing email
//! search   -> batched web search for whatever is still missing
//! ```

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{Field, ListingConfig, RealtorRecord, RecordKey, SearchConfig};
use crate::pipeline::stage::{FetchRequest, StageSource};
use crate::services::{Extractor, ListingExtractor, SearchExtractor, WebsiteExtractor};
use crate::utils::{normalize_name, normalize_website};

/// Stage 1: paginate the listing index over configured name segments.
///
/// Each segment starts at page 1 and continues while pages keep yielding
/// cards, capped at `max_pages`.
pub struct ListingStage {
    config: ListingConfig,
    extractor: ListingExtractor,
}

impl ListingStage {
    pub fn new(config: &ListingConfig) -> Result<Self> {
        Ok(Self {
            extractor: ListingExtractor::new(&config.selectors)?,
            config: config.clone(),
        })
    }

    fn request(&self, segment: &str, page: u32) -> FetchRequest {
        FetchRequest {
            key: format!("listing_{segment}_p{page:03}"),
            url: self
                .config
                .endpoint
                .replace("{segment}", segment)
                .replace("{page}", &page.to_string()),
            targets: Vec::new(),
            page,
        }
    }
}

impl StageSource for ListingStage {
    fn name(&self) -> &'static str {
        "listing"
    }

    fn target(&self) -> Option<Field> {
        None
    }

    fn requests(&self, _pending: &[(RecordKey, RealtorRecord)]) -> Vec<FetchRequest> {
        self.config
            .segments
            .iter()
            .map(|segment| self.request(segment, 1))
            .collect()
    }

    fn next_page(&self, done: &FetchRequest, extracted: usize) -> Option<FetchRequest> {
        if extracted == 0 || done.page >= self.config.max_pages {
            return None;
        }
        let (prefix, _) = done.key.rsplit_once("_p")?;
        let segment = prefix.strip_prefix("listing_")?;
        Some(self.request(segment, done.page + 1))
    }

    fn extractor(&self) -> &dyn Extractor {
        &self.extractor
    }
}

/// Stage 2: fetch each pending record's own website.
///
/// Records without a website are left for the search stage.
pub struct WebsiteStage {
    extractor: WebsiteExtractor,
}

impl WebsiteStage {
    pub fn new() -> Self {
        Self {
            extractor: WebsiteExtractor::new(),
        }
    }
}

impl Default for WebsiteStage {
    fn default() -> Self {
        Self::new()
    }
}

impl StageSource for WebsiteStage {
    fn name(&self) -> &'static str {
        "website"
    }

    fn target(&self) -> Option<Field> {
        Some(Field::Email)
    }

    fn requests(&self, pending: &[(RecordKey, RealtorRecord)]) -> Vec<FetchRequest> {
        pending
            .iter()
            .filter(|(_, record)| !record.website.trim().is_empty())
            .map(|(key, record)| FetchRequest {
                key: format!("site_{}", normalize_website(&record.website)),
                url: absolute_url(&record.website),
                targets: vec![key.clone()],
                page: 1,
            })
            .collect()
    }

    fn extractor(&self) -> &dyn Extractor {
        &self.extractor
    }
}

/// Stage 3: batched web search for records still missing an email.
///
/// Pending records are chunked, one request per chunk; the cache key is
/// derived from the chunk's normalized names so a changed batch is a new
/// request, not a stale hit.
pub struct SearchStage {
    config: SearchConfig,
    extractor: SearchExtractor,
}

impl SearchStage {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            config: config.clone(),
            extractor: SearchExtractor::new(),
        }
    }
}

impl StageSource for SearchStage {
    fn name(&self) -> &'static str {
        "search"
    }

    fn target(&self) -> Option<Field> {
        Some(Field::Email)
    }

    fn requests(&self, pending: &[(RecordKey, RealtorRecord)]) -> Vec<FetchRequest> {
        pending
            .chunks(self.config.batch_size)
            .enumerate()
            .map(|(idx, chunk)| {
                let names: Vec<String> = chunk
                    .iter()
                    .map(|(_, record)| normalize_name(&record.name))
                    .collect();
                let digest = Sha256::digest(names.join("\n").as_bytes());
                let query = chunk
                    .iter()
                    .map(|(_, record)| {
                        format!("{} {}", record.name.trim(), self.config.query_suffix)
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                FetchRequest {
                    key: format!("search_{idx:03}_{}", &hex::encode(digest)[..8]),
                    url: self.config.endpoint.replace("{query}", &urlencode(&query)),
                    targets: chunk.iter().map(|(key, _)| key.clone()).collect(),
                    page: 1,
                }
            })
            .collect()
    }

    fn extractor(&self) -> &dyn Extractor {
        &self.extractor
    }
}

fn absolute_url(website: &str) -> String {
    let website = website.trim();
    if website.starts_with("http://") || website.starts_with("https://") {
        website.to_string()
    } else {
        format!("http://{website}")
    }
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
