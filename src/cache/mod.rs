//! Persistent fingerprint cache: the single source of truth for "already
//! delivered". A fingerprint present here must never be re-pushed.
//!
//! Backed by a JSON file mapping fingerprint -> first-seen timestamp. A
//! corrupt or unreadable file loads as empty (occasional duplicate delivery
//! beats halting the pipeline); writes go through a temp file and rename so
//! a crash never truncates the cache.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::app::Result;

pub struct FingerprintCache {
    path: PathBuf,
    entries: HashMap<String, DateTime<Utc>>,
}

impl FingerprintCache {
    /// Load the cache from `path`, treating a missing, corrupt, or
    /// unreadable file as empty.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cache file is corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache file is unreadable, starting empty");
                HashMap::new()
            }
        };

        Self { path, entries }
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn first_seen(&self, fingerprint: &str) -> Option<DateTime<Utc>> {
        self.entries.get(fingerprint).copied()
    }

    /// Record a fingerprint. Idempotent: re-inserting an existing fingerprint
    /// is a no-op and never refreshes the stored timestamp, so eviction age
    /// is always measured from the true first sighting. Returns whether a new
    /// entry was created.
    pub fn insert(&mut self, fingerprint: &str, first_seen: DateTime<Utc>) -> bool {
        if self.entries.contains_key(fingerprint) {
            return false;
        }
        self.entries.insert(fingerprint.to_string(), first_seen);
        true
    }

    /// Remove every entry whose age at `now` has reached `window`. Returns
    /// the number of evicted entries. The clock is injected so the sweep is
    /// testable; callers run it once per invocation, not on a timer.
    pub fn evict_older_than(&mut self, window: Duration, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, first_seen| now - *first_seen < window);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist atomically: write to a sibling temp file, then rename over the
    /// real path.
    pub fn save(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_cache() -> (tempfile::TempDir, FingerprintCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::load(dir.path().join("cache.json"));
        (dir, cache)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let (_dir, cache) = temp_cache();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not valid json").unwrap();

        let cache = FingerprintCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let (_dir, mut cache) = temp_cache();

        assert!(cache.insert("fp-1", at(1000)));
        assert!(!cache.insert("fp-1", at(2000)));

        assert_eq!(cache.len(), 1);
        // The second insert must not refresh the first-seen timestamp.
        assert_eq!(cache.first_seen("fp-1"), Some(at(1000)));
    }

    #[test]
    fn test_eviction_boundary() {
        let (_dir, mut cache) = temp_cache();
        let window = Duration::days(30);
        let now = at(10_000_000);

        // Exactly at the window: evicted.
        cache.insert("at-window", now - window);
        // One millisecond short of the window: retained.
        cache.insert("just-inside", now - window + Duration::milliseconds(1));

        let evicted = cache.evict_older_than(window, now);
        assert_eq!(evicted, 1);
        assert!(!cache.contains("at-window"));
        assert!(cache.contains("just-inside"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = FingerprintCache::load(&path);
        cache.insert("fp-1", at(1000));
        cache.insert("fp-2", at(2000));
        cache.save().unwrap();

        let reloaded = FingerprintCache::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.first_seen("fp-1"), Some(at(1000)));

        // No temp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }
}
