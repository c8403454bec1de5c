// =============================================================================
// main.rs — TICKER SWEEP
// =============================================================================
//
// Point it at a screener, get back a file of tickers.
//
//   TICKER_SWEEP_QUERY=...          one ad-hoc query, recorded as CUSTOM
//   TICKER_SWEEP_PRESETS_FILE=...   a JSON batch of named queries
//   (neither)                       the built-in trend-following presets
//
// Results land in TICKER_SWEEP_OUTPUT (tickers.json by default). An empty
// result is still a result: the file gets written either way. Set
// TICKER_SWEEP_LOG_JSON=true for JSON log lines.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use ticker_sweep::config::ScraperConfig;
use ticker_sweep::metrics::ScrapeMetrics;
use ticker_sweep::models::Query;
use ticker_sweep::orchestrator::BatchRunner;
use ticker_sweep::presets::{builtin_presets, load_presets, Preset};
use ticker_sweep::records::{self, OutputRecord};
use ticker_sweep::transport::HttpTransport;

/// What this run was asked to do.
enum Mode {
    Adhoc(Query),
    Batch(Vec<Preset>),
}

fn select_mode(config: &ScraperConfig) -> anyhow::Result<Mode> {
    if let Some(raw) = config.adhoc_query.as_deref() {
        let query = if raw.starts_with("http://") || raw.starts_with("https://") {
            Query::url(raw, &config.screener_url)
        } else {
            Query::params(raw)
        }
        .context("TICKER_SWEEP_QUERY is not a usable query")?;
        return Ok(Mode::Adhoc(query));
    }

    let presets = match &config.presets_file {
        Some(path) => load_presets(path, &config.screener_url)?,
        None => {
            info!("No preset file configured, using built-in presets");
            builtin_presets()
        }
    };
    Ok(Mode::Batch(presets))
}

async fn run(runner: &BatchRunner, mode: Mode) -> Vec<OutputRecord> {
    let as_of = records::today_utc();
    match mode {
        Mode::Adhoc(query) => {
            let report = runner.run_query(&query).await;
            if report.more_available {
                warn!(
                    pages = report.pages_scraped,
                    "Page limit reached, more results are available"
                );
            }
            records::records_for_adhoc(&report, as_of)
        }
        Mode::Batch(presets) => {
            let batch = runner.run_batch(&presets).await;
            records::records_for_batch(&batch, as_of)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ScraperConfig::from_env().context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }

    info!(
        screener = %config.screener_url,
        page_size = config.page_size,
        max_pages = config.max_pages,
        output = %config.output_path.display(),
        "Configuration loaded"
    );

    let mode = select_mode(&config)?;

    let transport = Arc::new(
        HttpTransport::new(config.request_timeout, &config.user_agent)
            .context("failed to build HTTP client")?,
    );
    let metrics = Arc::new(ScrapeMetrics::new());
    let runner = BatchRunner::from_config(&config, transport, metrics.clone());

    let rows = tokio::select! {
        rows = run(&runner, mode) => rows,
        res = signal::ctrl_c() => {
            match res {
                Ok(()) => warn!("Interrupted, nothing written"),
                Err(err) => error!(error = %err, "Signal listener error"),
            }
            return Ok(());
        }
    };

    let written = records::write_json(&config.output_path, &rows)?;
    info!(
        rows = written,
        path = %config.output_path.display(),
        "Records written"
    );
    println!("Wrote {} tickers to {}", written, config.output_path.display());

    let snapshot = metrics.snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => info!(metrics = %json, "Scrape metrics"),
        Err(e) => warn!(error = %e, "Could not serialize metrics"),
    }

    Ok(())
}
