use anyhow::Result;
use blscraper::{
    cache::{DiskCache, MemoryCache, PayloadCache},
    config::Config,
    export::{self, chart_by_year},
    fetch::BlsClient,
    normalize::{normalize_requested, Normalized},
};
use std::{path::Path, time::Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::load()?;
    info!(
        series = ?config.series,
        start = config.start_year,
        end = config.end_year,
        "configured"
    );

    // ─── 3) fetch through the payload cache ──────────────────────────
    let cache: Box<dyn PayloadCache> = match &config.cache.dir {
        Some(dir) => {
            let disk = DiskCache::new(dir.clone(), config.cache.ttl())?;
            match disk.purge_expired() {
                Ok(n) if n > 0 => info!(removed = n, "purged expired cache entries"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "cache purge failed"),
            }
            Box::new(disk)
        }
        None => Box::new(MemoryCache::new(config.cache.ttl())),
    };
    let client = BlsClient::new(&config.fetch)?;
    let request = config.request();

    let start = Instant::now();
    let response = client.fetch_cached(cache.as_ref(), &request).await?;
    info!(elapsed = ?start.elapsed(), "payload ready");

    // ─── 4) normalize + export on the blocking pool ──────────────────
    let options = config.normalize_options();
    let requested = config.series.clone();
    let out_dir = config.output_dir.clone();
    let failures = tokio::task::spawn_blocking(move || {
        let normalized = normalize_requested(&response, &requested, options);
        export_all(&normalized, &out_dir)
    })
    .await??;

    if failures > 0 {
        warn!(failures, "some series could not be normalized");
    }
    info!("all done");
    Ok(())
}

/// Write every table and log a per-series summary. Returns the number of
/// series that failed to normalize.
fn export_all(normalized: &Normalized, out_dir: &Path) -> Result<usize> {
    for table in normalized.tables() {
        if table.is_empty() {
            info!(series = %table.series_id(), "no observations; nothing to write");
            continue;
        }
        export::write_parquet(table, out_dir)?;
        export::write_json(table, out_dir)?;

        for (year, points) in chart_by_year(table) {
            let (lo, hi) = points
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, v)| {
                    (lo.min(v), hi.max(v))
                });
            info!(
                series = %table.series_id(),
                year,
                months = points.len(),
                min = lo,
                max = hi,
                "summary"
            );
        }
    }

    let mut failures = 0;
    for (series, err) in normalized.errors() {
        error!(series = %series, "{}", err);
        failures += 1;
    }
    Ok(failures)
}
