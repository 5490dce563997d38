//! Route Catch-Probability Scorer - Main Entry Point
//!
//! Reads observations as JSON lines on stdin and writes one catch-probability
//! prediction per line to stdout.

use anyhow::{Context, Result};
use route_catch_pipeline::{
    config::AppConfig, metrics::ScoringMetrics, ArtifactStore, Observation, RoutePipeline,
};
use std::io::{self, BufRead, BufWriter, Write};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("route_catch_pipeline={}", config.logging.level))
    })?;

    // Predictions go to stdout, logs to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::load()?,
    };
    init_logging(&config)?;

    info!("Starting route catch-probability scorer");

    let store = ArtifactStore::new(config.artifacts.paths());
    store.preload().context("Failed to load route artifacts")?;
    let feature_count = store.get_feature_order()?.len();
    info!(
        model = %store.paths().model.display(),
        features = feature_count,
        "Artifacts loaded"
    );

    let pipeline = RoutePipeline::new(&store);
    let metrics = ScoringMetrics::new();

    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let observation: Observation = match serde_json::from_str(&line) {
            Ok(obs) => obs,
            Err(e) => {
                metrics.record_parse_error();
                warn!(line = line_no + 1, error = %e, "Failed to parse observation");
                continue;
            }
        };

        let start_time = Instant::now();
        match pipeline.score(&observation) {
            Ok(prediction) => {
                metrics.record_prediction(start_time.elapsed(), prediction.catch_probability);
                serde_json::to_writer(&mut out, &prediction)?;
                out.write_all(b"\n")?;
            }
            Err(e) => {
                metrics.record_failure(&e);
                error!(
                    line = line_no + 1,
                    play_id = ?observation.play_id(),
                    error = %e,
                    "Scoring failed"
                );
            }
        }
    }

    out.flush()?;
    metrics.print_summary();
    Ok(())
}
