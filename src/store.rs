//! Content-addressed image store with TTL expiry
//!
//! Captured images are published under their content hash as
//! `<dir>/<hash>.png`. Writes go to a staging file first and are renamed into
//! place, so a concurrent HTTP read never observes a partial file. Storing
//! identical bytes again refreshes the entry's expiry instead of rewriting.
//!
//! Expiry is absolute: reads never extend a lifetime. A periodic [`sweep`]
//! (driven by the file server) removes entries whose deadline has passed.
//! Dropping the last store handle removes all published files.
//!
//! [`sweep`]: ImageStore::sweep

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// One published image
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// Content hash, also the store key and file stem
    pub hash:       String,
    /// Absolute path of the published file
    pub file_path:  PathBuf,
    /// When the entry was first published
    pub created_at: DateTime<Utc>,
    /// Absolute deadline after which the sweeper removes the entry
    pub expires_at: DateTime<Utc>,
}

/// Content-addressed store mapping hashes to published image files
#[derive(Clone)]
pub struct ImageStore {
    dir:     PathBuf,
    entries: Arc<Mutex<HashMap<String, StoreEntry>>>,
}

impl ImageStore {
    /// Opens a store rooted at `dir`, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            entries: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Directory holding the published files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Publishes image bytes under their content hash
    ///
    /// The file lands at `<dir>/<hash>.png` via a staging rename. Publishing
    /// a hash that already exists refreshes its expiry deadline and skips the
    /// write.
    pub async fn put(&self, hash: &str, bytes: &[u8], ttl: Duration) -> StoreResult<StoreEntry> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        if let Ok(mut entries) = self.entries.lock() {
            if let Some(entry) = entries.get_mut(hash) {
                debug!("Refreshing expiry for existing entry {}", hash);
                entry.expires_at = expires_at;
                return Ok(entry.clone());
            }
        }

        let final_path = self.dir.join(format!("{}.png", hash));
        let staging_path = self
            .dir
            .join(format!(".staging-{}", uuid::Uuid::new_v4()));

        let write_result = async {
            tokio::fs::write(&staging_path, bytes).await?;
            tokio::fs::rename(&staging_path, &final_path).await
        }
        .await;

        if let Err(source) = write_result {
            let _ = tokio::fs::remove_file(&staging_path).await;
            return Err(StoreError::WriteFailed {
                hash: hash.to_string(),
                source,
            });
        }

        let entry = StoreEntry {
            hash:       hash.to_string(),
            file_path:  final_path,
            created_at: now,
            expires_at,
        };

        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(hash.to_string(), entry.clone());
        }

        debug!("Published {} ({} bytes)", hash, bytes.len());
        Ok(entry)
    }

    /// Looks up an entry by hash
    ///
    /// Entries past their deadline remain visible until the next sweep;
    /// expiry is enforced by the sweeper, not by reads.
    pub fn get(&self, hash: &str) -> StoreResult<StoreEntry> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(hash).cloned())
            .ok_or_else(|| StoreError::NotFound {
                hash: hash.to_string(),
            })
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// True when the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes entries whose deadline is at or before `now`
    ///
    /// Returns the number of entries removed. Metadata removal and file
    /// unlink happen inside one critical section, so a concurrent `put` of
    /// the same hash either runs before the sweep (and refreshes the entry
    /// out of the expired set) or after it (and republishes a fresh file);
    /// the sweep can never delete a file belonging to a live entry. The
    /// unlinks are blocking but the store holds at most a handful of files.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;

        if let Ok(mut entries) = self.entries.lock() {
            let expired: Vec<String> = entries
                .values()
                .filter(|e| e.expires_at <= now)
                .map(|e| e.hash.clone())
                .collect();

            for hash in expired {
                if let Some(entry) = entries.remove(&hash) {
                    if let Err(e) = std::fs::remove_file(&entry.file_path) {
                        warn!("Failed to remove expired file {:?}: {}", entry.file_path, e);
                    }
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!("Swept {} expired entries", removed);
        }
        removed
    }

    /// Removes every entry and its file, regardless of expiry
    pub async fn cleanup_all(&self) {
        let drained: Vec<StoreEntry> = match self.entries.lock() {
            Ok(mut entries) => entries.drain().map(|(_, v)| v).collect(),
            Err(_) => return,
        };

        for entry in &drained {
            if let Err(e) = tokio::fs::remove_file(&entry.file_path).await {
                warn!("Failed to remove stored file {:?}: {}", entry.file_path, e);
            }
        }

        if !drained.is_empty() {
            debug!("Removed {} stored images", drained.len());
        }
    }
}

impl Drop for ImageStore {
    fn drop(&mut self) {
        // Only the last handle cleans up; clones share the entry map.
        if Arc::strong_count(&self.entries) != 1 {
            return;
        }

        if let Ok(mut entries) = self.entries.lock() {
            for (_, entry) in entries.drain() {
                let _ = std::fs::remove_file(&entry.file_path);
            }
        }
    }
}
