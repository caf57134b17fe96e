//! Normalize a saved timeseries response without touching the network.
//!
//! Usage: normalize_file <RESPONSE_JSON> [OUT_DIR]

use anyhow::{Context, Result};
use blscraper::{
    export,
    fetch::check_status,
    normalize::{normalize, BlsResponse, NormalizeOptions},
};
use std::{env, fs::File, io::BufReader, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <RESPONSE_JSON> [OUT_DIR]", args[0]);
        exit(1);
    }
    let input = PathBuf::from(&args[1]);
    let out_dir = args.get(2).map(PathBuf::from);

    let f = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
    let response: BlsResponse = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("decoding {}", input.display()))?;
    let response = check_status(response)?;

    let normalized = normalize(&response, NormalizeOptions::default());
    for table in normalized.tables() {
        let columns: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        println!("{:<16} {:>5} rows  [{}]", table.series_id(), table.len(), columns.join(", "));
        if let (Some(dir), false) = (&out_dir, table.is_empty()) {
            let path = export::write_parquet(table, dir)?;
            info!(path = %path.display(), "written");
        }
    }
    for (series, err) in normalized.errors() {
        error!(series = %series, "{}", err);
    }
    Ok(())
}
