//! Generic stage driver.
//!
//! One driver runs all three stages; everything stage-specific lives
//! behind [`StageSource`]: the fetch plan, the pagination rule, and the
//! extractor. The driver itself only knows the shared loop:
//!
//! ```text
//! plan requests -> (cache | fetch with retry) -> extract -> merge
//! ```
//!
//! A failed or unparseable request is counted and skipped; the records it
//! targeted stay in the output untouched, so one bad fetch never drops a
//! contact from the run.

use std::collections::{HashMap, VecDeque};

use crate::models::{Field, IdentityHint, RealtorRecord, RecordKey, StageStats};
use crate::services::{Clock, Extraction, Fetcher, RateLimiter, RetryPolicy, fetch_with_retry};
use crate::storage::{RecordStore, ResponseCache};
use crate::utils::normalize_name;

/// One planned fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Deterministic cache key for the request
    pub key: String,
    /// URL to fetch on a cache miss
    pub url: String,
    /// Store keys of the records this request may fill. Empty for the
    /// seeding stage, which creates records instead of filling them.
    pub targets: Vec<RecordKey>,
    /// Page number within a paginated sequence (1-based)
    pub page: u32,
}

/// Stage-specific behavior plugged into the driver.
pub trait StageSource: Send + Sync {
    /// Stage name, used for cache attribution and log lines.
    fn name(&self) -> &'static str;

    /// Field this stage fills, or `None` for the seeding stage.
    fn target(&self) -> Option<Field>;

    /// Build the initial fetch plan. `pending` holds the records whose
    /// target field is still missing (empty for the seeding stage).
    fn requests(&self, pending: &[(RecordKey, RealtorRecord)]) -> Vec<FetchRequest>;

    /// Follow-up request after `done` yielded `extracted` values, if any.
    fn next_page(&self, done: &FetchRequest, extracted: usize) -> Option<FetchRequest> {
        let _ = (done, extracted);
        None
    }

    fn extractor(&self) -> &dyn crate::services::Extractor;
}

/// Runs one stage against an input store and produces the output store.
///
/// The collaborators are shared across stages: one cache, one limiter,
/// one retry policy for the whole run.
pub struct EnrichmentStage<'a> {
    pub cache: &'a ResponseCache,
    pub fetcher: &'a dyn Fetcher,
    pub limiter: &'a RateLimiter,
    pub clock: &'a dyn Clock,
    pub policy: &'a RetryPolicy,
}

impl EnrichmentStage<'_> {
    /// Run `source` over `input`. The input store is never mutated; the
    /// returned store carries every input record forward, enriched where
    /// the stage succeeded.
    pub async fn run(
        &self,
        source: &dyn StageSource,
        input: &RecordStore,
    ) -> (RecordStore, StageStats) {
        let mut output = input.clone();
        let mut stats = StageStats::default();

        let pending = match source.target() {
            Some(field) => input.select_missing_keyed(field),
            None => Vec::new(),
        };
        let mut queue: VecDeque<FetchRequest> = source.requests(&pending).into();
        log::info!(
            "{}: planned {} request(s) for {} pending record(s)",
            source.name(),
            queue.len(),
            pending.len()
        );

        while let Some(req) = queue.pop_front() {
            stats.attempted += 1;

            let lookup = self
                .cache
                .get_or_fetch(&req.key, source.name(), || {
                    fetch_with_retry(self.limiter, self.clock, self.policy, &req.key, || {
                        self.fetcher.fetch(&req.url)
                    })
                })
                .await;
            let lookup = match lookup {
                Ok(lookup) => lookup,
                Err(e) => {
                    stats.failed += 1;
                    log::warn!("{}: giving up on '{}': {e}", source.name(), req.key);
                    continue;
                }
            };
            if lookup.hit {
                stats.cache_hits += 1;
            } else {
                stats.fetched_fresh += 1;
            }

            let extractions = match source.extractor().extract(&lookup.record) {
                Ok(extractions) => extractions,
                Err(e) => {
                    stats.malformed += 1;
                    log::warn!("{}: discarding artifact '{}': {e}", source.name(), req.key);
                    continue;
                }
            };
            let extracted = extractions.len();

            match source.target() {
                None => apply_seed(&mut output, &mut stats, source.name(), extractions),
                Some(_) => apply_targeted(&mut output, &mut stats, source.name(), &req, extractions),
            }

            if let Some(next) = source.next_page(&req, extracted) {
                queue.push_back(next);
            }
        }

        (output, stats)
    }
}

/// Seeding stage: group extractions by identity hint into fresh records
/// and upsert them, preserving the order cards appeared in.
fn apply_seed(
    output: &mut RecordStore,
    stats: &mut StageStats,
    stage: &str,
    extractions: Vec<Extraction>,
) {
    let mut order: Vec<IdentityHint> = Vec::new();
    let mut drafts: HashMap<IdentityHint, RealtorRecord> = HashMap::new();

    for extraction in extractions {
        let Some(hint) = extraction.hint else {
            log::warn!("{stage}: dropping unattributed {} value", extraction.field);
            continue;
        };
        let draft = drafts.entry(hint.clone()).or_insert_with(|| {
            order.push(hint);
            RealtorRecord::default()
        });
        fold_candidate(draft, extraction.field, &extraction.value, extraction.confidence);
    }

    for hint in order {
        if let Some(draft) = drafts.remove(&hint) {
            let outcome = output.upsert(draft);
            stats.merged += 1;
            stats.conflicts += outcome.conflicts;
        }
    }
}

/// Targeted stage: attribute each extraction to one of the request's
/// target records, then merge per record. A hint naming an unknown or
/// ambiguous record is skipped; an unhinted value is only accepted when
/// the request covered exactly one record.
fn apply_targeted(
    output: &mut RecordStore,
    stats: &mut StageStats,
    stage: &str,
    req: &FetchRequest,
    extractions: Vec<Extraction>,
) {
    // Normalized name -> target key; `None` marks an ambiguous name.
    let mut by_name: HashMap<String, Option<RecordKey>> = HashMap::new();
    for key in &req.targets {
        if let Some(record) = output.get(key) {
            by_name
                .entry(normalize_name(&record.name))
                .and_modify(|slot| *slot = None)
                .or_insert_with(|| Some(key.clone()));
        }
    }

    let mut order: Vec<RecordKey> = Vec::new();
    let mut drafts: HashMap<RecordKey, RealtorRecord> = HashMap::new();

    for extraction in extractions {
        let key = match &extraction.hint {
            Some(hint) if !hint.name.trim().is_empty() => {
                match by_name.get(&normalize_name(&hint.name)) {
                    Some(Some(key)) => key.clone(),
                    Some(None) => {
                        log::warn!(
                            "{stage}: ambiguous name '{}' in '{}', skipping",
                            hint.name,
                            req.key
                        );
                        continue;
                    }
                    None => {
                        log::debug!(
                            "{stage}: '{}' matches no pending record in '{}'",
                            hint.name,
                            req.key
                        );
                        continue;
                    }
                }
            }
            _ if req.targets.len() == 1 => req.targets[0].clone(),
            _ => {
                log::warn!(
                    "{stage}: unattributed value in multi-record request '{}', skipping",
                    req.key
                );
                continue;
            }
        };

        let draft = drafts.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            RealtorRecord::default()
        });
        fold_candidate(draft, extraction.field, &extraction.value, extraction.confidence);
    }

    for key in order {
        if let Some(draft) = drafts.remove(&key) {
            match output.merge_into(&key, &draft) {
                Some(outcome) => {
                    stats.merged += 1;
                    stats.conflicts += outcome.conflicts;
                }
                None => log::warn!("{stage}: stale target key for '{}'", req.key),
            }
        }
    }
}

/// Fold one candidate value into a draft record. The first candidate per
/// field wins; further email candidates land in `extra_emails` instead of
/// being dropped.
fn fold_candidate(draft: &mut RealtorRecord, field: Field, value: &str, confidence: Option<f64>) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    if !draft.is_missing(field) {
        if field == Field::Email && !value.eq_ignore_ascii_case(draft.email.trim()) {
            draft.extra_emails.insert(value.to_string());
        }
        return;
    }
    draft.set_field(field, value);
    if let Some(score) = confidence {
        draft.confidence.insert(field, score.clamp(0.0, 1.0));
    }
}
