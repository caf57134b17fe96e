// src/cache/disk.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use glob::glob;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, warn};

use super::{is_fresh, CacheKey, PayloadCache};
use crate::normalize::BlsResponse;

/// On-disk record at `<dir>/<CacheKey::file_name>`; `key` holds the full
/// fingerprint so a digest collision reads as a miss.
#[derive(Debug, Serialize, Deserialize)]
struct CachedPayload {
    key: String,
    fetched_at: DateTime<Utc>,
    payload: BlsResponse,
}

/// Cache that survives restarts: one JSON file per key.
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    /// Create `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("could not create `{}`", dir.display()))?;
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn read(path: &Path) -> Result<CachedPayload> {
        let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parsing {}", path.display()))
    }

    /// Delete every expired or unreadable entry; returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let pattern = format!("{}/*.json", self.dir.display());
        let now = Utc::now();
        let mut removed = 0;

        for entry in glob(&pattern).context("invalid glob pattern for DiskCache::purge_expired")? {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "cannot read cache entry");
                    continue;
                }
            };
            let stale = match Self::read(&path) {
                Ok(cached) => !is_fresh(cached.fetched_at, now, self.ttl),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt cache entry");
                    true
                }
            };
            if stale {
                fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
                removed += 1;
            }
        }

        debug!(removed, dir = %self.dir.display(), "purged cache");
        Ok(removed)
    }
}

impl PayloadCache for DiskCache {
    fn get(&self, key: &CacheKey) -> Result<Option<BlsResponse>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let cached = match Self::read(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                return Ok(None);
            }
        };
        if cached.key != key.fingerprint() || !is_fresh(cached.fetched_at, Utc::now(), self.ttl)
        {
            return Ok(None);
        }
        Ok(Some(cached.payload))
    }

    fn put(&self, key: &CacheKey, payload: &BlsResponse) -> Result<()> {
        let record = CachedPayload {
            key: key.fingerprint(),
            fetched_at: Utc::now(),
            payload: payload.clone(),
        };

        // Write atomically: to tmp file, then rename over original
        let final_path = self.path_for(key);
        let tmp_path = final_path.with_extension("json.tmp");
        {
            let f = File::create(&tmp_path)
                .with_context(|| format!("creating {}", tmp_path.display()))?;
            let mut w = BufWriter::new(f);
            serde_json::to_writer(&mut w, &record).context("serializing cache entry")?;
            w.flush()?;
        }
        fs::rename(&tmp_path, &final_path).with_context(|| {
            format!(
                "renaming {} -> {}",
                tmp_path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{RawObservation, RawSeries};
    use tempfile::tempdir;

    fn key(start: i32) -> CacheKey {
        CacheKey::new(&["LNS14000000".to_string()], start, 2024)
    }

    fn payload() -> BlsResponse {
        BlsResponse::from_series(vec![RawSeries {
            series_id: Some("LNS14000000".into()),
            catalog: None,
            data: vec![RawObservation {
                year: "2024".into(),
                period: "M01".into(),
                period_name: Some("January".into()),
                latest: Some("true".into()),
                value: "3.7".into(),
                footnotes: vec![],
                calculations: None,
                aspects: None,
            }],
        }])
    }

    #[test]
    fn round_trips_through_disk() -> Result<()> {
        let tmp = tempdir()?;
        let cache = DiskCache::new(tmp.path().join("cache"), Duration::from_secs(3600))?;
        assert!(cache.get(&key(2022))?.is_none());

        cache.put(&key(2022), &payload())?;
        assert_eq!(cache.get(&key(2022))?, Some(payload()));
        assert!(cache.get(&key(2023))?.is_none());

        // a second instance over the same dir sees the entry
        let reopened = DiskCache::new(cache.dir(), Duration::from_secs(3600))?;
        assert_eq!(reopened.get(&key(2022))?, Some(payload()));
        Ok(())
    }

    #[test]
    fn stores_requests_with_many_series() -> Result<()> {
        let tmp = tempdir()?;
        let cache = DiskCache::new(tmp.path(), Duration::from_secs(3600))?;
        let many: Vec<String> = (0..25).map(|i| format!("CES{:010}", i)).collect();
        let big = CacheKey::new(&many, 2019, 2024);

        cache.put(&big, &payload())?;
        assert_eq!(cache.get(&big)?, Some(payload()));
        assert!(cache.get(&CacheKey::new(&many[..24], 2019, 2024))?.is_none());
        Ok(())
    }

    #[test]
    fn expired_entries_are_ignored_and_purged() -> Result<()> {
        let tmp = tempdir()?;
        let cache = DiskCache::new(tmp.path(), Duration::ZERO)?;
        cache.put(&key(2022), &payload())?;
        cache.put(&key(2023), &payload())?;
        assert!(cache.get(&key(2022))?.is_none());

        assert_eq!(cache.purge_expired()?, 2);
        let left: Vec<_> = glob(&format!("{}/*.json", tmp.path().display()))?
            .filter_map(Result::ok)
            .collect();
        assert!(left.is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_entry_is_a_miss() -> Result<()> {
        let tmp = tempdir()?;
        let cache = DiskCache::new(tmp.path(), Duration::from_secs(3600))?;
        fs::write(tmp.path().join(key(2022).file_name()), b"{not json")?;
        assert!(cache.get(&key(2022))?.is_none());
        assert_eq!(cache.purge_expired()?, 1);
        Ok(())
    }
}
