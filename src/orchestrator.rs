// =============================================================================
// orchestrator.rs — THE BATCH RUNNER
// =============================================================================
//
// Runs a list of named presets through the paginator, one after another,
// with a breather between them. One preset coming back empty (dead page,
// server tantrum, layout change) doesn't stop the others: it just gets an
// empty result and we move on.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::fetcher::Fetcher;
use crate::metrics::ScrapeMetrics;
use crate::models::{PresetBatch, Query, ScrapeReport};
use crate::paginator::Paginator;
use crate::presets::Preset;
use crate::transport::Transport;

pub struct BatchRunner {
    paginator: Paginator,
    query_delay: Duration,
}

impl BatchRunner {
    pub fn new(paginator: Paginator, query_delay: Duration) -> Self {
        Self {
            paginator,
            query_delay,
        }
    }

    /// Wire a fetcher, paginator and runner together from configuration.
    pub fn from_config(
        config: &ScraperConfig,
        transport: Arc<dyn Transport>,
        metrics: Arc<ScrapeMetrics>,
    ) -> Self {
        let fetcher = Fetcher::new(transport, config.retry_policy(), metrics);
        let paginator = Paginator::new(fetcher, config.pagination());
        Self::new(paginator, config.query_delay())
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Scrape a single ad-hoc query.
    pub async fn run_query(&self, query: &Query) -> ScrapeReport {
        self.paginator.scrape(query).await
    }

    /// Scrape every preset in order. Names are expected to be unique; if two
    /// collide, the later one's result is the one kept.
    pub async fn run_batch(&self, presets: &[Preset]) -> PresetBatch {
        let mut batch = PresetBatch::new();

        for (index, preset) in presets.iter().enumerate() {
            if index > 0 && !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }

            info!(preset = %preset.name, query = %preset.query, "Scraping preset");
            let report = self.paginator.scrape(&preset.query).await;

            if report.is_empty() {
                warn!(preset = %preset.name, "Preset produced no tickers");
            } else {
                info!(preset = %preset.name, tickers = report.len(), "Preset complete");
            }

            if batch.insert(preset.name.clone(), report).is_some() {
                warn!(preset = %preset.name, "Duplicate preset name, keeping the later result");
            }
        }

        info!(
            presets = batch.len(),
            tickers = batch.values().map(ScrapeReport::len).sum::<usize>(),
            "Batch complete"
        );
        batch
    }
}
