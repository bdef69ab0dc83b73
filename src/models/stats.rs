//! Per-stage completion counters.

/// Counters reported when a stage finishes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StageStats {
    /// Fetch requests issued (after batching)
    pub attempted: usize,
    /// Requests answered from the response cache
    pub cache_hits: usize,
    /// Requests that went to the network
    pub fetched_fresh: usize,
    /// Requests that exhausted retries or failed terminally
    pub failed: usize,
    /// Artifacts that could not be parsed
    pub malformed: usize,
    /// Records merged into the output store
    pub merged: usize,
    /// Field conflicts resolved by keeping the existing value
    pub conflicts: usize,
}

impl StageStats {
    /// Emit the completion report for a stage.
    pub fn report(&self, stage: &str) {
        log::info!(
            "{stage}: attempted={} cache_hits={} fetched_fresh={} failed={} malformed={} merged={} conflicts={}",
            self.attempted,
            self.cache_hits,
            self.fetched_fresh,
            self.failed,
            self.malformed,
            self.merged,
            self.conflicts,
        );
    }
}
