//! Per-file analysis cache: Moka in-memory with time-based expiry.
//! Keyed by `(path, SHA-256(content))` — a content change is an implicit
//! invalidation because the key no longer matches.
//!
//! Only per-file artefacts are cached (module model + file-scoped
//! violations). Cross-file artefacts — the call graph, scores — depend on
//! the scan's file set and are never stored here.

use std::time::Duration;

use blastshield_core::types::ast::ModuleAST;
use blastshield_core::types::violation::RuleViolation;
use moka::sync::Cache;

type CacheKey = (String, String);

/// What the cache holds for one `(path, content-hash)` pair.
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub ast: ModuleAST,
    /// Violations from file-scoped rules plus the file's synthetic markers.
    pub violations: Vec<RuleViolation>,
}

/// In-memory analysis cache with TTL expiry.
pub struct AnalysisCache {
    inner: Cache<CacheKey, CachedFile>,
}

impl AnalysisCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .support_invalidation_closures()
                .build(),
        }
    }

    pub fn get(&self, path: &str, content_hash: &str) -> Option<CachedFile> {
        self.inner
            .get(&(path.to_string(), content_hash.to_string()))
    }

    pub fn put(&self, path: &str, content_hash: &str, entry: CachedFile) {
        self.inner
            .insert((path.to_string(), content_hash.to_string()), entry);
    }

    /// Drop every entry for `path`, regardless of content hash.
    pub fn invalidate(&self, path: &str) {
        let path = path.to_string();
        // Closure-based invalidation walks entries lazily; writes per key
        // stay atomic.
        let _ = self
            .inner
            .invalidate_entries_if(move |key, _| key.0 == path);
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}
