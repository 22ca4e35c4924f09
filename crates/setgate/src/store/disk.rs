//! File-per-session disk cache.
//!
//! The store must never take a request down with it: a broken cache degrades
//! to warming up on every request. Reads absorb every failure into a cache
//! miss and writes are best-effort, logged at `warn` and forgotten.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::store::record::{RECORD_SCHEMA_VERSION, SessionRecord};

/// Summary of what the store currently holds, for diagnostics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreStats {
    pub entry_count: usize,
    pub total_bytes: u64,
}

/// Disk-backed session cache, one JSON file per site/profile key.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `dir`, defaulting to `~/.setgate/sessions`.
    ///
    /// No I/O happens here; the directory is created lazily on first write.
    pub fn new(dir: Option<PathBuf>) -> Result<Self, SessionError> {
        let dir = match dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .map(|home| home.join(".setgate").join("sessions"))
                .ok_or_else(|| {
                    SessionError::configuration(
                        "no home directory found; set an explicit session store directory",
                    )
                })?,
        };
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Look up a usable record for a site/profile pair.
    ///
    /// Missing, unreadable, corrupt, outdated-schema, expired, and empty
    /// records are all cache misses. Anything unusable that is still on disk
    /// gets deleted on the way out.
    pub async fn get(&self, site: &str, profile: &str) -> Option<SessionRecord> {
        let key = SessionRecord::cache_key(site, profile);
        let path = self.path_for(&key);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(key, "session cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "failed to read session record (non-fatal)");
                return None;
            }
        };

        let record: SessionRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(key, error = %e, "discarding corrupt session record");
                self.remove_quietly(&key).await;
                return None;
            }
        };

        if record.schema != RECORD_SCHEMA_VERSION {
            debug!(key, schema = record.schema, "discarding session record with outdated schema");
            self.remove_quietly(&key).await;
            return None;
        }

        if !record.is_usable() {
            debug!(
                key,
                expired = record.is_expired(),
                "discarding unusable session record"
            );
            self.remove_quietly(&key).await;
            return None;
        }

        debug!(key, remaining_secs = record.remaining_secs(), "session cache hit");
        Some(record)
    }

    /// Persist a record, best-effort. Failures are logged and swallowed; the
    /// caller keeps the in-memory record either way.
    pub async fn put(&self, record: &SessionRecord) {
        let key = record.key();
        if let Err(e) = self.write_record(&key, record).await {
            warn!(key, error = %e, "failed to persist session record (non-fatal)");
        }
    }

    async fn write_record(&self, key: &str, record: &SessionRecord) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Write-then-rename so a crash mid-write never leaves a torn file.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(key, path = %path.display(), "session record persisted");
        Ok(())
    }

    /// Drop the cached record for a site/profile pair. Returns whether a
    /// record was actually removed.
    pub async fn invalidate(&self, site: &str, profile: &str) -> bool {
        let key = SessionRecord::cache_key(site, profile);
        match tokio::fs::remove_file(self.path_for(&key)).await {
            Ok(()) => {
                debug!(key, "session record invalidated");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(key, error = %e, "failed to invalidate session record (non-fatal)");
                false
            }
        }
    }

    /// Remove every cached session. Returns how many records were deleted.
    pub async fn clear(&self) -> usize {
        let mut removed = 0;
        for path in self.record_paths().await {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove session record"),
            }
        }
        removed
    }

    /// Count and size of stored records.
    pub async fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for path in self.record_paths().await {
            if let Ok(meta) = tokio::fs::metadata(&path).await {
                stats.entry_count += 1;
                stats.total_bytes += meta.len();
            }
        }
        stats
    }

    /// Every parseable record on disk, including expired ones. Listing is a
    /// diagnostic view; freshness filtering belongs to [`Self::get`].
    pub async fn entries(&self) -> Vec<SessionRecord> {
        let mut records = Vec::new();
        for path in self.record_paths().await {
            let Ok(raw) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            match serde_json::from_str::<SessionRecord>(&raw) {
                Ok(record) => records.push(record),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unparseable record"),
            }
        }
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        records
    }

    async fn record_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return paths,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to list session store");
                return paths;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths
    }

    async fn remove_quietly(&self, key: &str) {
        if let Err(e) = tokio::fs::remove_file(self.path_for(key)).await {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(key, error = %e, "failed to remove session record");
            }
        }
    }
}
