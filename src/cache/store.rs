//! Cache storage
//!
//! One JSON file per key under a cache directory. Entries never expire;
//! `clear` is the only way they are removed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::key::{CacheKey, FINGERPRINT_SCHEME};
use crate::models::ExecutionResult;

/// Durable key/value store for successful results
///
/// `get` never fails: anything unreadable is a miss. `put` is best-effort.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<ExecutionResult>;

    fn put(&self, key: &CacheKey, result: &ExecutionResult);

    /// Remove every entry, returning how many were deleted
    fn clear(&self) -> Result<usize>;
}

#[derive(Error, Debug)]
enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed entry: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Entry written with scheme {found}, expected {expected}")]
    Scheme { found: String, expected: &'static str },

    #[error("Entry stored under key {0}")]
    KeyMismatch(String),
}

/// On-disk envelope around a cached result
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    scheme: String,
    key: CacheKey,
    stored_at: DateTime<Utc>,
    result: ExecutionResult,
}

/// Entry count and on-disk size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Cache store backed by a directory of `<key>.json` files
#[derive(Clone, Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read(&self, key: &CacheKey) -> Result<Option<ExecutionResult>, CacheError> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_str(&content)?;
        if entry.scheme != FINGERPRINT_SCHEME {
            return Err(CacheError::Scheme {
                found: entry.scheme,
                expected: FINGERPRINT_SCHEME,
            });
        }
        if &entry.key != key {
            return Err(CacheError::KeyMismatch(entry.key.to_string()));
        }

        Ok(Some(entry.result))
    }

    fn write(&self, key: &CacheKey, result: &ExecutionResult) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;

        let entry = CacheEntry {
            scheme: FINGERPRINT_SCHEME.to_string(),
            key: key.clone(),
            stored_at: Utc::now(),
            result: result.clone(),
        };
        let content = serde_json::to_string(&entry)?;

        // Rename over the final path so readers never observe a partial file
        let tmp = self
            .dir
            .join(format!("{key}.json.{:08x}.tmp", rand::random::<u32>()));
        fs::write(&tmp, content)?;
        if let Err(e) = fs::rename(&tmp, self.entry_path(key)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        Ok(())
    }

    /// Count entries and their total size
    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        if !self.dir.exists() {
            return Ok(stats);
        }

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read cache directory: {}", self.dir.display()))?
        {
            let entry = entry?;
            if is_entry_file(&entry.path()) {
                stats.entries += 1;
                stats.bytes += entry.metadata()?.len();
            }
        }

        Ok(stats)
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &CacheKey) -> Option<ExecutionResult> {
        match self.read(key) {
            Ok(found) => found,
            Err(e) => {
                debug!("Treating cache entry {} as a miss: {}", key, e);
                None
            }
        }
    }

    fn put(&self, key: &CacheKey, result: &ExecutionResult) {
        if let Err(e) = self.write(key, result) {
            warn!("Failed to write cache entry {}: {}", key, e);
        }
    }

    fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read cache directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            let is_tmp = path.extension().map(|e| e == "tmp").unwrap_or(false);
            if is_entry_file(&path) || is_tmp {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                if !is_tmp {
                    removed += 1;
                }
            }
        }

        info!("Cleared {} cache entries from {}", removed, self.dir.display());
        Ok(removed)
    }
}

fn is_entry_file(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(CacheKey::parse)
            .is_some()
}
