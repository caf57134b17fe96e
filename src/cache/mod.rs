// src/cache/mod.rs

//! Expiring store of raw payloads, keyed by series set and year range.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::fetch::SeriesRequest;
use crate::normalize::BlsResponse;

pub mod disk;
pub mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

/// Identifies one fetch: the sorted, de-duplicated series ids, the years and
/// the optional payload sections asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    series_ids: Vec<String>,
    start_year: i32,
    end_year: i32,
    catalog: bool,
    calculations: bool,
    aspects: bool,
}

/// Longest readable prefix kept in a cache file name.
const FILE_PREFIX_LEN: usize = 48;

impl CacheKey {
    pub fn new(series_ids: &[String], start_year: i32, end_year: i32) -> Self {
        let mut series_ids: Vec<String> = series_ids.iter().map(|s| s.trim().to_string()).collect();
        series_ids.sort();
        series_ids.dedup();
        Self {
            series_ids,
            start_year,
            end_year,
            catalog: false,
            calculations: false,
            aspects: false,
        }
    }

    pub fn from_request(request: &SeriesRequest) -> Self {
        Self {
            catalog: request.catalog,
            calculations: request.calculations,
            aspects: request.aspects,
            ..Self::new(&request.series_ids, request.start_year, request.end_year)
        }
    }

    /// Canonical string form of the key, e.g.
    /// `CES0000000001,LNS14000000|2022-2024|catalog`.
    pub fn fingerprint(&self) -> String {
        let flags: Vec<&str> = [
            (self.catalog, "catalog"),
            (self.calculations, "calculations"),
            (self.aspects, "aspects"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
        format!(
            "{}|{}-{}|{}",
            self.series_ids.join(","),
            self.start_year,
            self.end_year,
            flags.join("+")
        )
    }

    /// Bounded, filesystem-safe file name: a readable prefix of the
    /// fingerprint plus a digest of the whole of it.
    pub fn file_name(&self) -> String {
        let fingerprint = self.fingerprint();
        let prefix: String = fingerprint
            .chars()
            .take(FILE_PREFIX_LEN)
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{}-{}.json", prefix, short_digest(&fingerprint))
    }
}

/// First 16 hex digits of the SHA-256 of `input`.
pub(crate) fn short_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..16].to_string()
}

/// Cache seam owned by the fetch layer.
pub trait PayloadCache: Send + Sync {
    /// A fresh payload for `key`, or `None` if absent or expired.
    fn get(&self, key: &CacheKey) -> Result<Option<BlsResponse>>;
    fn put(&self, key: &CacheKey, payload: &BlsResponse) -> Result<()>;
}

/// An entry is fresh while its age is strictly below `ttl`. Entries stamped
/// in the future count as expired.
pub(crate) fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - fetched_at).to_std() {
        Ok(age) => age < ttl,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn key_ignores_order_and_duplicates() {
        let a = CacheKey::new(&ids(&["LNS14000000", "CES0000000001"]), 2022, 2024);
        let b = CacheKey::new(
            &ids(&["CES0000000001", "LNS14000000", "LNS14000000"]),
            2022,
            2024,
        );
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), "CES0000000001,LNS14000000|2022-2024|");
        assert_ne!(a, CacheKey::new(&ids(&["LNS14000000"]), 2022, 2024));
        assert_ne!(a, CacheKey::new(&ids(&["LNS14000000", "CES0000000001"]), 2021, 2024));
    }

    #[test]
    fn key_depends_on_requested_sections() {
        let plain = SeriesRequest::new(ids(&["LNS14000000"]), 2022, 2024);
        let rich = plain.clone().with_catalog(true).with_calculations(true);
        let with_aspects = plain.clone().with_aspects(true);

        let plain_key = CacheKey::from_request(&plain);
        let rich_key = CacheKey::from_request(&rich);
        assert_ne!(plain_key, rich_key);
        assert_ne!(plain_key, CacheKey::from_request(&with_aspects));
        assert_ne!(plain_key.file_name(), rich_key.file_name());
        assert_eq!(
            rich_key.fingerprint(),
            "LNS14000000|2022-2024|catalog+calculations"
        );
        assert_eq!(
            plain_key,
            CacheKey::new(&ids(&["LNS14000000"]), 2022, 2024)
        );
    }

    #[test]
    fn file_name_is_bounded_and_filesystem_safe() {
        let many: Vec<String> = (0..25).map(|i| format!("LNS1{:07}", i)).collect();
        let k = CacheKey::new(&many, 2019, 2024);
        assert!(k.fingerprint().len() > 250);
        let name = k.file_name();
        assert!(name.len() <= FILE_PREFIX_LEN + 1 + 16 + ".json".len(), "{}", name);
        assert!(name
            .trim_end_matches(".json")
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        // sanitizing must not merge distinct ids
        let slash = CacheKey::new(&ids(&["a/b"]), 2020, 2021);
        let under = CacheKey::new(&ids(&["a_b"]), 2020, 2021);
        assert_ne!(slash.file_name(), under.file_name());
    }

    #[test]
    fn freshness_window() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let hour = Duration::from_secs(3600);
        assert!(is_fresh(t0, t0, hour));
        assert!(is_fresh(t0, t0 + chrono::Duration::minutes(59), hour));
        assert!(!is_fresh(t0, t0 + chrono::Duration::minutes(60), hour));
        assert!(!is_fresh(t0, t0, Duration::ZERO));
        assert!(!is_fresh(t0 + chrono::Duration::minutes(5), t0, hour));
    }
}
