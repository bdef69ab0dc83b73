//! Content-addressable response cache.
//!
//! One artifact per unique fetch key, persisted as a body file plus a JSON
//! metadata sidecar so the key, content type, and fetch timestamp survive
//! across runs. The cache is append-only: entries are written once on a
//! successful fetch and never mutated or deleted.
//!
//! ## Directory layout
//!
//! ```text
//! {cache_dir}/
//! ├── listing_a_p001-3f9c2a1b.json
//! ├── listing_a_p001-3f9c2a1b.meta.json
//! ├── site_johnsmith.ca-9e07c44d.html
//! └── site_johnsmith.ca-9e07c44d.meta.json
//! ```

use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::services::FetchBody;

/// A raw fetch result, created once per unique request and read-only
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    /// Deterministic cache key (endpoint + normalized parameters)
    pub key: String,
    /// Raw payload text
    pub body: String,
    /// Content type reported by the source
    pub content_type: String,
    /// When the payload was fetched
    pub fetched_at: DateTime<Utc>,
    /// Stage that produced the fetch
    pub stage: String,
}

/// Sidecar metadata persisted next to the body artifact.
#[derive(Debug, Serialize, Deserialize)]
struct CacheMeta {
    key: String,
    content_type: String,
    fetched_at: DateTime<Utc>,
    stage: String,
}

/// Result of a cache lookup-or-fetch.
#[derive(Debug)]
pub struct CacheLookup {
    pub record: FetchRecord,
    /// Whether the record came from the persisted cache
    pub hit: bool,
}

/// Disk-backed cache of raw fetch results, shared across stages and runs.
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Open (creating if needed) a cache rooted at the given directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Return the cached record for `key`, or call `fetch` exactly once,
    /// persist the result, and return it. Nothing is cached when `fetch`
    /// fails; the error propagates to the caller for retry handling.
    ///
    /// A persistence failure is fatal for the cache entry only: it is
    /// logged, the in-memory record is still returned, and the key will be
    /// re-fetched on the next run.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        stage: &str,
        fetch: F,
    ) -> Result<CacheLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FetchBody>>,
    {
        if let Some(record) = self.load(key).await {
            return Ok(CacheLookup { record, hit: true });
        }

        let fetched = fetch().await?;
        let record = FetchRecord {
            key: key.to_string(),
            body: fetched.body,
            content_type: fetched.content_type,
            fetched_at: Utc::now(),
            stage: stage.to_string(),
        };

        if let Err(e) = self.persist(&record).await {
            log::warn!("cache write failed for '{key}': {e} (result kept in memory)");
        }

        Ok(CacheLookup { record, hit: false })
    }

    /// Load a cached record, if present. Corrupt entries are treated as
    /// misses so a damaged file never wedges the pipeline.
    pub async fn load(&self, key: &str) -> Option<FetchRecord> {
        let meta_path = self.meta_path(key);
        let meta_bytes = match tokio::fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("cache meta read failed for '{key}': {e}");
                return None;
            }
        };
        let meta: CacheMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!("cache meta corrupt for '{key}': {e}");
                return None;
            }
        };
        let body_path = self.body_path(key, &meta.content_type);
        match tokio::fs::read_to_string(&body_path).await {
            Ok(body) => Some(FetchRecord {
                key: meta.key,
                body,
                content_type: meta.content_type,
                fetched_at: meta.fetched_at,
                stage: meta.stage,
            }),
            Err(e) => {
                log::warn!("cache body read failed for '{key}': {e}");
                None
            }
        }
    }

    /// Whether an entry for `key` exists on disk.
    pub async fn contains(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.meta_path(key))
            .await
            .unwrap_or(false)
    }

    async fn persist(&self, record: &FetchRecord) -> Result<()> {
        let meta = CacheMeta {
            key: record.key.clone(),
            content_type: record.content_type.clone(),
            fetched_at: record.fetched_at,
            stage: record.stage.clone(),
        };
        let body_path = self.body_path(&record.key, &record.content_type);
        write_atomic(&body_path, record.body.as_bytes()).await?;
        let meta_bytes = serde_json::to_vec_pretty(&meta)?;
        write_atomic(&self.meta_path(&record.key), &meta_bytes).await?;
        Ok(())
    }

    fn body_path(&self, key: &str, content_type: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_stem(key), extension_for(content_type)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.meta.json", file_stem(key)))
    }
}

/// Write bytes atomically (write to temp, then rename).
async fn write_atomic(path: &PathBuf, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await.map_err(AppError::Io)?;
    Ok(())
}

/// Filesystem-safe stem for a cache key: the sanitized key (so the key is
/// readable from the filename) plus an 8-hex digest guarding against
/// sanitization collisions.
fn file_stem(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();
    let digest = Sha256::digest(key.as_bytes());
    format!("{}-{}", sanitized, &hex::encode(digest)[..8])
}

fn extension_for(content_type: &str) -> &'static str {
    let ct = content_type.to_lowercase();
    if ct.contains("json") {
        "json"
    } else if ct.contains("html") {
        "html"
    } else {
        "txt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn body(text: &str, content_type: &str) -> FetchBody {
        FetchBody {
            body: text.to_string(),
            content_type: content_type.to_string(),
        }
    }

    #[tokio::test]
    async fn miss_fetches_and_persists() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::open(tmp.path()).unwrap();

        let lookup = cache
            .get_or_fetch("listing_a_p001", "listing", || async {
                Ok(body("{\"d\": \"<html></html>\"}", "application/json"))
            })
            .await
            .unwrap();

        assert!(!lookup.hit);
        assert!(cache.contains("listing_a_p001").await);
    }

    #[tokio::test]
    async fn hit_suppresses_fetch() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::open(tmp.path()).unwrap();

        cache
            .get_or_fetch("k1", "listing", || async { Ok(body("payload", "text/html")) })
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let lookup = cache
            .get_or_fetch("k1", "listing", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(body("different", "text/html"))
            })
            .await
            .unwrap();

        assert!(lookup.hit);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(lookup.record.body, "payload");
    }

    #[tokio::test]
    async fn failed_fetch_caches_nothing() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::open(tmp.path()).unwrap();

        let result = cache
            .get_or_fetch("k2", "website", || async {
                Err(AppError::transient("k2", "rate limited"))
            })
            .await;

        assert!(result.is_err());
        assert!(!cache.contains("k2").await);
    }

    #[tokio::test]
    async fn cached_record_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let cache = ResponseCache::open(tmp.path()).unwrap();
            cache
                .get_or_fetch("site_x", "website", || async {
                    Ok(body("<html>hi</html>", "text/html"))
                })
                .await
                .unwrap();
        }

        let cache = ResponseCache::open(tmp.path()).unwrap();
        let record = cache.load("site_x").await.unwrap();
        assert_eq!(record.body, "<html>hi</html>");
        assert_eq!(record.stage, "website");
        assert_eq!(record.content_type, "text/html");
    }

    #[test]
    fn file_stem_is_readable_and_collision_guarded() {
        let stem = file_stem("listing_a_p001");
        assert!(stem.starts_with("listing_a_p001-"));
        assert_ne!(file_stem("a/b"), file_stem("a?b"));
    }
}
