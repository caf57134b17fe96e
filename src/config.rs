// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};
use url::Url;

use crate::fetch::SeriesRequest;
use crate::normalize::NormalizeOptions;

pub const DEFAULT_ENDPOINT: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";
pub const DEFAULT_CONFIG_PATH: &str = "blscraper.yaml";

/// Civilian employment, civilian unemployment, unemployment rate, nonfarm payrolls.
pub const DEFAULT_SERIES: &[&str] = &["LNS12000000", "LNS13000000", "LNS14000000", "CES0000000001"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub series: Vec<String>,
    pub start_year: i32,
    pub end_year: i32,
    pub percent_change: bool,
    pub output_dir: PathBuf,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Passed through as `registrationkey` when set.
    pub registration_key: Option<String>,
    /// Ask the API for series catalog metadata (title, survey name).
    pub catalog: bool,
    /// Ask the API for net/percent change calculations.
    pub calculations: bool,
    /// Ask the API for per-observation aspect data.
    pub aspects: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for cached payloads; `None` keeps them in memory only.
    pub dir: Option<PathBuf>,
    pub ttl_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            series: DEFAULT_SERIES.iter().map(|s| s.to_string()).collect(),
            start_year: 2022,
            end_year: 2024,
            percent_change: true,
            output_dir: PathBuf::from("output"),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
            registration_key: None,
            catalog: false,
            calculations: false,
            aspects: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from("cache")),
            ttl_hours: 24,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }
}

impl Config {
    /// Load from `$BLS_CONFIG` (or `blscraper.yaml`), then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = env::var("BLS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_path(&path)?;
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML config file. A missing file yields the defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Override fields from environment-style variables supplied by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BLS_SERIES") {
            self.series = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            debug!(series = ?self.series, "BLS_SERIES override");
        }
        if let Some(v) = lookup("BLS_START_YEAR") {
            self.start_year = v
                .trim()
                .parse()
                .with_context(|| format!("BLS_START_YEAR={:?} is not a year", v))?;
        }
        if let Some(v) = lookup("BLS_END_YEAR") {
            self.end_year = v
                .trim()
                .parse()
                .with_context(|| format!("BLS_END_YEAR={:?} is not a year", v))?;
        }
        if let Some(v) = lookup("BLS_REGISTRATION_KEY") {
            self.fetch.registration_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Some(v) = lookup("BLS_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.series.is_empty() {
            bail!("no series configured");
        }
        if self.start_year > self.end_year {
            bail!(
                "start_year {} is after end_year {}",
                self.start_year,
                self.end_year
            );
        }
        Url::parse(&self.fetch.endpoint)
            .with_context(|| format!("invalid endpoint {:?}", self.fetch.endpoint))?;
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn request(&self) -> SeriesRequest {
        SeriesRequest::new(self.series.clone(), self.start_year, self.end_year)
            .with_catalog(self.fetch.catalog)
            .with_calculations(self.fetch.calculations)
            .with_aspects(self.fetch.aspects)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            percent_change: self.percent_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_dashboard_series() -> Result<()> {
        let c = Config::default();
        assert_eq!(c.series.len(), 4);
        assert_eq!((c.start_year, c.end_year), (2022, 2024));
        assert_eq!(c.cache.ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(c.fetch.timeout(), Duration::from_secs(30));
        c.validate()?;
        Ok(())
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() -> Result<()> {
        let c = Config::from_yaml_str(
            "series: [LNS14000000]\nstart_year: 2019\nfetch:\n  catalog: true\ncache:\n  dir: null\n",
        )?;
        assert_eq!(c.series, vec!["LNS14000000".to_string()]);
        assert_eq!(c.start_year, 2019);
        assert_eq!(c.end_year, 2024);
        assert!(c.fetch.catalog);
        assert!(!c.fetch.aspects);
        assert!(c.request().catalog);
        assert_eq!(c.fetch.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.cache.dir, None);
        assert_eq!(c.cache.ttl_hours, 24);
        Ok(())
    }

    #[test]
    fn missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let c = Config::from_path(dir.path().join("absent.yaml"))?;
        assert_eq!(c, Config::default());
        Ok(())
    }

    #[test]
    fn reads_file_from_disk() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "end_year: 2023\npercent_change: false")?;
        let c = Config::from_path(f.path())?;
        assert_eq!(c.end_year, 2023);
        assert!(!c.percent_change);
        assert!(!c.normalize_options().percent_change);
        Ok(())
    }

    #[test]
    fn env_overrides_apply() -> Result<()> {
        let vars: HashMap<&str, &str> = [
            ("BLS_SERIES", " LNS14000000, CES0000000001 ,"),
            ("BLS_START_YEAR", "2020"),
            ("BLS_END_YEAR", "2021"),
            ("BLS_REGISTRATION_KEY", "abc"),
            ("BLS_OUTPUT_DIR", "/tmp/bls"),
        ]
        .into_iter()
        .collect();
        let mut c = Config::default();
        c.apply_env(|k| vars.get(k).map(|v| v.to_string()))?;
        assert_eq!(c.series, vec!["LNS14000000", "CES0000000001"]);
        assert_eq!((c.start_year, c.end_year), (2020, 2021));
        assert_eq!(c.fetch.registration_key.as_deref(), Some("abc"));
        assert_eq!(c.output_dir, PathBuf::from("/tmp/bls"));

        let req = c.request();
        assert_eq!(req.series_ids, c.series);
        assert_eq!((req.start_year, req.end_year), (2020, 2021));
        Ok(())
    }

    #[test]
    fn bad_env_year_is_an_error() {
        let mut c = Config::default();
        assert!(c
            .apply_env(|k| (k == "BLS_START_YEAR").then(|| "twenty".to_string()))
            .is_err());
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let mut c = Config::default();
        c.start_year = 2025;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.series.clear();
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.fetch.endpoint = "not a url".into();
        assert!(c.validate().is_err());
    }
}
