use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::ResourceKey;
use crate::utils::format_age;

/// Snapshots older than this are still shown, but flagged as stale.
const SNAPSHOT_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > SNAPSHOT_STALE_MINUTES
    }
}

/// Last-known-good data on disk, one JSON file per resource key.
///
/// Snapshots let the dashboard show yesterday's readings while the first
/// fetch of a session is still running.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &ResourceKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.cache_name()))
    }

    pub fn load<T: DeserializeOwned>(&self, key: &ResourceKey) -> Result<Option<CachedData<T>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot: {}", key.cache_name()))?;
        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse snapshot: {}", key.cache_name()))?;

        debug!(key = %key, age = %cached.age_display(), "Loaded snapshot");
        Ok(Some(cached))
    }

    /// Persist `data` as fetched at `fetched_at`.
    pub fn save<T: Serialize>(
        &self,
        key: &ResourceKey,
        data: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let cached = CachedData {
            data,
            cached_at: fetched_at,
        };
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.path_for(key), contents)
            .with_context(|| format!("Failed to write snapshot: {}", key.cache_name()))?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
