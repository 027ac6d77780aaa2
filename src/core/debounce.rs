//! Per-caller debounce of repeated requests
//!
//! A caller's first request only arms the cache. Requests that keep arriving
//! within the window re-arm it and are suppressed as well; the first request
//! after a quiet window goes through and clears the entry.
//!
//! Separate CLI invocations share the cache through a JSON file. Use
//! [`DebounceCache::check_persisted`] so that the load, decide and save cycle
//! runs under an exclusive lock on a sidecar `.lock` file.

use crate::domain::{MdError, Result};
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Default quiet window
pub const DEBOUNCE_WINDOW_SECS: i64 = 5;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Seen {
    callers: HashMap<String, DateTime<Utc>>,
}

#[derive(Debug)]
pub struct DebounceCache {
    window: Duration,
    seen: Mutex<Seen>,
}

impl Default for DebounceCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEBOUNCE_WINDOW_SECS))
    }
}

impl DebounceCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(Seen::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether a request from `caller` at `now` should be served
    pub fn should_process(&self, caller: &str, now: DateTime<Utc>) -> bool {
        let mut seen = self.lock();
        match seen.callers.get(caller).copied() {
            None => {
                seen.callers.insert(caller.to_string(), now);
                false
            }
            Some(last) if now - last < self.window => {
                seen.callers.insert(caller.to_string(), now);
                false
            }
            Some(_) => {
                seen.callers.remove(caller);
                true
            }
        }
    }

    /// Loads a cache saved with [`save`](Self::save); a missing file is empty
    ///
    /// # Errors
    ///
    /// Returns `MdError::Io` or `MdError::Serialization` when the file exists
    /// but cannot be read
    pub fn load(path: &Path, window: Duration) -> Result<Self> {
        let cache = Self::new(window);
        if !path.exists() {
            return Ok(cache);
        }
        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(cache);
        }
        let seen: Seen = serde_json::from_str(&raw).map_err(|e| {
            MdError::Serialization(format!("invalid debounce state {}: {e}", path.display()))
        })?;
        *cache.lock() = seen;
        Ok(cache)
    }

    /// # Errors
    ///
    /// Returns `MdError::Io` when the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&*self.lock())?;
        ensure_parent(path)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Decides one request against the cache stored at `path`
    ///
    /// Blocks until no other process holds the lock.
    ///
    /// # Errors
    ///
    /// Returns `MdError::Io` when the lock or state file cannot be used and
    /// `MdError::Serialization` when the state file is corrupt
    pub fn check_persisted(
        path: &Path,
        window: Duration,
        caller: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        ensure_parent(path)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path.with_extension("lock"))?;
        lock_file.lock_exclusive()?;

        // released when lock_file is dropped
        let cache = Self::load(path, window)?;
        let proceed = cache.should_process(caller, now);
        cache.save(path)?;
        Ok(proceed)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_first_request_only_arms() {
        let cache = DebounceCache::default();
        assert!(!cache.should_process("10.0.0.5", at(0)));
        assert!(cache.should_process("10.0.0.5", at(6)));
        assert!(!cache.should_process("10.0.0.5", at(7)));
    }

    #[test]
    fn test_repeats_within_window_keep_suppressing() {
        let cache = DebounceCache::default();
        assert!(!cache.should_process("hr-client", at(0)));
        assert!(!cache.should_process("hr-client", at(4)));
        assert!(!cache.should_process("hr-client", at(8)));
        assert!(cache.should_process("hr-client", at(14)));
    }

    #[test]
    fn test_callers_are_independent() {
        let cache = DebounceCache::default();
        assert!(!cache.should_process("a", at(0)));
        assert!(!cache.should_process("b", at(10)));
        assert!(cache.should_process("a", at(10)));
    }

    #[test]
    fn test_state_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("debounce.json");

        let cache = DebounceCache::default();
        assert!(!cache.should_process("hr-client", at(0)));
        cache.save(&path).unwrap();

        let reloaded = DebounceCache::load(&path, Duration::seconds(5)).unwrap();
        assert!(reloaded.should_process("hr-client", at(30)));
    }

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = DebounceCache::load(&dir.path().join("none.json"), Duration::seconds(5)).unwrap();
        assert!(!cache.should_process("x", at(0)));
    }

    #[test]
    fn test_concurrent_invocations_keep_every_caller() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debounce.json");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    DebounceCache::check_persisted(
                        &path,
                        Duration::seconds(5),
                        &format!("caller-{i}"),
                        at(0),
                    )
                    .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(!handle.join().unwrap());
        }

        let cache = DebounceCache::load(&path, Duration::seconds(5)).unwrap();
        for i in 0..8 {
            assert!(cache.should_process(&format!("caller-{i}"), at(30)));
        }
    }
}
