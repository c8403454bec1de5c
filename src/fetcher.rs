// =============================================================================
// fetcher.rs — ONE PAGE, NO MATTER WHAT
// =============================================================================
//
// Gets one page. Tries a few times if the network or the server hiccups.
// Backs off exponentially between tries. Then it gives the caller one of
// three answers and never an error:
//
//   Body             a 2xx, here is the HTML
//   DefinitiveEmpty  a 404, the page doesn't exist, don't bother retrying
//   Exhausted        anything else, or we ran out of patience
//
// What counts as worth retrying: timeouts, connection failures, a body that
// died halfway, and 5xx. A 403 or a 429 is the server telling us something
// on purpose; asking again immediately won't change its mind.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::metrics::ScrapeMetrics;
use crate::models::PageResult;
use crate::transport::{Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (zero-based): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Exponential schedule without jitter. The cap is the longest delay the
    /// policy can ever ask for, so it never clips the doubling.
    pub fn builder(&self) -> ExponentialBuilder {
        let retries = self.max_attempts.max(1) - 1;
        ExponentialBuilder::default()
            .with_min_delay(self.backoff_base)
            .with_factor(2.0)
            .with_max_delay(self.backoff(retries))
            .with_max_times(retries as usize)
    }
}

/// Why an attempt didn't produce a usable page.
#[derive(Debug, Error)]
enum FetchFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("server returned HTTP {0}")]
    Status(u16),
}

impl FetchFailure {
    /// Timeouts, dropped connections, truncated bodies and 5xx.
    fn is_retryable(&self) -> bool {
        match self {
            FetchFailure::Transport(e) => e.is_transient(),
            FetchFailure::Status(status) => (500..=599).contains(status),
        }
    }
}

pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    metrics: Arc<ScrapeMetrics>,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        metrics: Arc<ScrapeMetrics>,
    ) -> Self {
        Self {
            transport,
            policy,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<ScrapeMetrics> {
        &self.metrics
    }

    /// Fetch `url`, retrying transient failures per the policy.
    pub async fn fetch(&self, url: &Url) -> PageResult {
        let fetcher = self;
        let attempt = move || async move {
            fetcher.metrics.increment_requests();
            fetcher.attempt(url).await
        };

        let outcome = attempt
            .retry(self.policy.builder())
            .sleep(sleep)
            .when(FetchFailure::is_retryable)
            .notify(|err: &FetchFailure, delay: Duration| {
                self.metrics.increment_retries();
                warn!(
                    url = %url,
                    delay_ms = delay.as_millis() as u64,
                    reason = %err,
                    "Transient failure fetching page, backing off"
                );
            })
            .await;

        match outcome {
            Ok(page) => page,
            Err(err) => {
                if err.is_retryable() {
                    warn!(
                        url = %url,
                        attempts = self.policy.max_attempts.max(1),
                        reason = %err,
                        "Giving up on page after exhausting retries"
                    );
                } else {
                    warn!(url = %url, reason = %err, "Page request failed, not retrying");
                }
                self.metrics.increment_exhausted();
                PageResult::Exhausted
            }
        }
    }

    async fn attempt(&self, url: &Url) -> Result<PageResult, FetchFailure> {
        let response = self.transport.get(url).await?;

        match response.status {
            200..=299 => {
                debug!(url = %url, status = response.status, "Page fetched");
                self.metrics.increment_pages_fetched();
                Ok(PageResult::Body(response.body))
            }
            404 => {
                debug!(url = %url, "Page not found, treating as end of results");
                self.metrics.increment_not_found();
                Ok(PageResult::DefinitiveEmpty)
            }
            status => Err(FetchFailure::Status(status)),
        }
    }
}
