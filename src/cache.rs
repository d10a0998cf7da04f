//! Single-file JSON result cache.
//!
//! Entries are keyed by a string built from everything that determines a
//! result (repository, resolved commits, filters). Each entry keeps the
//! time it was last read; entries idle for longer than the TTL are evicted
//! on the next access. Cache failures never fail an analysis: they are
//! logged and the cache is bypassed.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheData {
    entries: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    value: serde_json::Value,
    /// Unix seconds
    last_access: i64,
}

#[derive(Debug, Clone)]
pub struct Cache {
    path: PathBuf,
    ttl_secs: u64,
}

impl Cache {
    pub fn new(path: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self {
            path: path.into(),
            ttl_secs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached value for `key`, refreshing its access time.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut data = self.load()?;
        let now = Utc::now().timestamp();
        let evicted = self.evict(&mut data, now);
        let hit = match data.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = now;
                Some(serde_json::from_value(entry.value.clone())?)
            }
            None => None,
        };
        if hit.is_some() || evicted > 0 {
            self.store(&data)?;
        }
        debug!(key, hit = hit.is_some(), evicted, "cache lookup");
        Ok(hit)
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut data = self.load()?;
        let now = Utc::now().timestamp();
        self.evict(&mut data, now);
        data.entries.insert(
            key.to_string(),
            CacheEntry {
                value: serde_json::to_value(value)?,
                last_access: now,
            },
        );
        self.store(&data)
    }

    fn evict(&self, data: &mut CacheData, now: i64) -> usize {
        let before = data.entries.len();
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        data.entries
            .retain(|_, entry| now.saturating_sub(entry.last_access) <= ttl);
        before - data.entries.len()
    }

    fn load(&self) -> Result<CacheData> {
        if !self.path.exists() {
            return Ok(CacheData::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(CacheData::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Write through a temporary sibling file and rename it into place.
    fn store(&self, data: &CacheData) -> Result<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(serde_json::to_string(data)?.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Compose a cache key from named parts.
pub fn key(parts: &[(&str, &str)]) -> String {
    parts
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("|")
}

/// Return the cached value for `key`, or compute and store it.
/// Any cache failure is logged and the value is computed afresh.
pub fn cached<T, F>(cache: Option<&Cache>, key: &str, compute: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
{
    let Some(cache) = cache else {
        return compute();
    };
    match cache.get(key) {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => {}
        Err(err) => warn!(path = %cache.path().display(), error = %err, "cache unavailable"),
    }
    let value = compute()?;
    if let Err(err) = cache.put(key, &value) {
        warn!(path = %cache.path().display(), error = %err, "cannot write cache");
    }
    Ok(value)
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
