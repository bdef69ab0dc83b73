//! Pipeline orchestration.
//!
//! Each stage reads the previous stage's persisted table, runs against
//! the shared cache and limiter, and persists its own table before the
//! next stage starts. Stages never share a live store; the snapshot on
//! disk is the only hand-off, which is what makes a rerun over an
//! unchanged cache reproduce the tables byte for byte.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{Config, StageStats};
use crate::pipeline::stage::EnrichmentStage;
use crate::pipeline::stages::{ListingStage, SearchStage, WebsiteStage};
use crate::services::{Fetcher, HttpFetcher, RateLimiter, RetryPolicy, TokioClock};
use crate::storage::{RecordStore, ResponseCache, Schema, read_table, write_table};

/// Owns the collaborators shared by every stage of one run.
pub struct PipelineRunner {
    config: Config,
    cache: ResponseCache,
    fetcher: Box<dyn Fetcher>,
    limiter: RateLimiter,
    clock: TokioClock,
    policy: RetryPolicy,
}

impl PipelineRunner {
    /// Build a runner with the standard HTTP fetcher.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Box::new(HttpFetcher::new(&config.http)?);
        Self::with_fetcher(config, fetcher)
    }

    /// Build a runner around a custom fetch transport.
    pub fn with_fetcher(config: Config, fetcher: Box<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        let cache = ResponseCache::open(&config.paths.cache_dir)?;
        let limiter = RateLimiter::new(&config.limiter);
        let policy = RetryPolicy::new(&config.retry);
        Ok(Self {
            config,
            cache,
            fetcher,
            limiter,
            clock: TokioClock,
            policy,
        })
    }

    pub fn listing_path(&self) -> PathBuf {
        self.output_path(&self.config.paths.listing_file)
    }

    pub fn enriched_path(&self) -> PathBuf {
        self.output_path(&self.config.paths.enriched_file)
    }

    pub fn final_path(&self) -> PathBuf {
        self.output_path(&self.config.paths.final_file)
    }

    fn output_path(&self, file: &str) -> PathBuf {
        Path::new(&self.config.paths.output_dir).join(file)
    }

    fn driver(&self) -> EnrichmentStage<'_> {
        EnrichmentStage {
            cache: &self.cache,
            fetcher: self.fetcher.as_ref(),
            limiter: &self.limiter,
            clock: &self.clock,
            policy: &self.policy,
        }
    }

    /// Stage 1: scrape the listing index into the base contact table.
    pub async fn run_scrape(&self, output: &Path) -> Result<StageStats> {
        let source = ListingStage::new(&self.config.listing)?;
        let (store, stats) = self.driver().run(&source, &RecordStore::new()).await;
        stats.report("listing");
        write_table(output, &store, Schema::Listing)?;
        Ok(stats)
    }

    /// Stage 2: visit personal websites to fill missing emails.
    pub async fn run_enrich(&self, input: &Path, output: &Path) -> Result<StageStats> {
        let store = read_table(input, Schema::Listing)?;
        let (store, stats) = self.driver().run(&WebsiteStage::new(), &store).await;
        stats.report("website");
        write_table(output, &store, Schema::Enriched)?;
        Ok(stats)
    }

    /// Stage 3: batched web search for records still missing an email.
    pub async fn run_complete(&self, input: &Path, output: &Path) -> Result<StageStats> {
        let store = read_table(input, Schema::Enriched)?;
        let source = SearchStage::new(&self.config.search);
        let (store, stats) = self.driver().run(&source, &store).await;
        stats.report("search");
        write_table(output, &store, Schema::Final)?;
        Ok(stats)
    }

    /// All three stages in sequence, each one reloading the previous
    /// snapshot from disk.
    pub async fn run_pipeline(&self) -> Result<()> {
        self.run_scrape(&self.listing_path()).await?;
        self.run_enrich(&self.listing_path(), &self.enriched_path())
            .await?;
        self.run_complete(&self.enriched_path(), &self.final_path())
            .await?;
        Ok(())
    }
}
