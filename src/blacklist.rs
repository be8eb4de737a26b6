//! # Blacklist (C4)
//!
//! An in-memory set of banned principal ids, mirrored to a JSON file. Writes
//! are append-mostly; the file is flushed every 100 dirty insertions and on
//! shutdown, using the write-to-`.tmp`-then-rename pattern used throughout
//! this crate for crash-safe persistence.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Number of dirty insertions after which the blacklist auto-flushes.
pub const FLUSH_THRESHOLD: u32 = 100;

#[derive(Serialize, Deserialize, Clone)]
struct BannedEntry {
    user: String,
    added_at: i64,
}

struct Inner {
    entries: HashMap<String, BannedEntry>,
    dirty: u32,
}

/// Crash-safe, mutex-guarded set of banned principal ids.
pub struct Blacklist {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl Blacklist {
    /// Load the blacklist from `path`. A missing or malformed file starts
    /// an empty blacklist rather than erroring.
    pub fn load(path: &Path) -> Self {
        let entries = fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<HashMap<String, BannedEntry>>(&raw).ok())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { entries, dirty: 0 }),
        }
    }

    /// Whether `id` is currently banned.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().entries.contains_key(id)
    }

    /// Ban `id`, flushing to disk once [`FLUSH_THRESHOLD`] insertions have
    /// accumulated since the last flush.
    pub fn add(&self, id: &str, added_at: i64) {
        let mut guard = self.inner.lock();
        if guard.entries.contains_key(id) {
            return;
        }
        guard.entries.insert(
            id.to_string(),
            BannedEntry {
                user: id.to_string(),
                added_at,
            },
        );
        guard.dirty += 1;
        if guard.dirty >= FLUSH_THRESHOLD {
            self.flush_locked(&guard);
            guard.dirty = 0;
        }
    }

    /// Force a flush regardless of the dirty counter. Called on normal
    /// shutdown and from termination signal handlers (main thread only).
    pub fn flush(&self) {
        let mut guard = self.inner.lock();
        self.flush_locked(&guard);
        guard.dirty = 0;
    }

    fn flush_locked(&self, guard: &Inner) {
        let Ok(body) = serde_json::to_string_pretty(&guard.entries) else {
            log::error!("blacklist serialization failed, skipping flush");
            return;
        };
        let tmp = self.path.with_extension("tmp");
        if let Err(e) = fs::write(&tmp, &body).and_then(|_| fs::rename(&tmp, &self.path)) {
            log::error!("blacklist flush to {:?} failed: {e}", self.path);
        }
    }

    /// Number of banned principals currently held in memory.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the blacklist is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let bl = Blacklist::load(&dir.path().join("blacklist.json"));
        assert!(bl.is_empty());
        assert!(!bl.contains("anyone"));
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blacklist.json");
        fs::write(&path, "not json").unwrap();
        let bl = Blacklist::load(&path);
        assert!(bl.is_empty());
    }

    #[test]
    fn add_and_persist_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blacklist.json");
        let bl = Blacklist::load(&path);
        bl.add("user:evil", 1_700_000_000);
        assert!(bl.contains("user:evil"));
        bl.flush();

        let reloaded = Blacklist::load(&path);
        assert!(reloaded.contains("user:evil"));
    }

    #[test]
    fn auto_flushes_at_threshold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blacklist.json");
        let bl = Blacklist::load(&path);
        for i in 0..FLUSH_THRESHOLD {
            bl.add(&format!("user:{i}"), 0);
        }
        // File should now exist on disk without an explicit flush() call.
        assert!(path.exists());
        let reloaded = Blacklist::load(&path);
        assert_eq!(reloaded.len(), FLUSH_THRESHOLD as usize);
    }
}
