// =============================================================================
// config.rs — THE KNOBS
// =============================================================================
//
// Every tunable the sweep has: where the screener lives, how we introduce
// ourselves, how patient we are with a slow server, and how politely we pace
// our requests.
//
// All values can be overridden via TICKER_SWEEP_* environment variables (a
// `.env` file is honored). Defaults match what the site has tolerated so far:
// 10 second timeout, 3 attempts, 1 second between pages, 20 rows per page.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::fetcher::RetryPolicy;
use crate::paginator::PaginationSettings;

pub const DEFAULT_SCREENER_URL: &str = "https://finviz.com/screener.ashx";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TICKER_SWEEP_SCREENER_URL `{url}` is not a valid URL: {reason}")]
    InvalidScreenerUrl { url: String, reason: String },
    #[error("TICKER_SWEEP_PAGE_SIZE must be at least 1")]
    ZeroPageSize,
    #[error("TICKER_SWEEP_MAX_RETRIES must be at least 1")]
    ZeroAttempts,
}

/// Everything the fetcher, paginator and batch runner need, in one place.
/// Nothing in the pipeline reads globals; it all flows from here.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Screener endpoint that bare query fragments are appended to.
    pub screener_url: Url,

    /// Sent on every request. Screeners are friendlier to browsers.
    pub user_agent: String,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Total attempts per page, first try included.
    pub max_retries: u32,

    /// Backoff before retry n (zero-based) is `backoff_base * 2^n`.
    pub backoff_base: Duration,

    /// Rows on a full result page. A shorter page is the last one.
    pub page_size: usize,

    /// Stop after this many pages. 0 means keep going until the site runs dry.
    pub max_pages: usize,

    /// Pause between consecutive pages of one query. Queries in a batch are
    /// separated by twice this.
    pub page_delay: Duration,

    /// JSON preset batch to run. Unset means the built-in presets.
    pub presets_file: Option<PathBuf>,

    /// Where output records get written.
    pub output_path: PathBuf,

    /// A single ad-hoc query (fragment or full URL). Takes precedence over
    /// any preset file.
    pub adhoc_query: Option<String>,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub log_json: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            screener_url: Url::parse(DEFAULT_SCREENER_URL)
                .unwrap_or_else(|_| unreachable!("default screener URL is valid")),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff_base: Duration::from_millis(1000),
            page_size: 20,
            max_pages: 10,
            page_delay: Duration::from_millis(1000),
            presets_file: None,
            output_path: PathBuf::from("tickers.json"),
            adhoc_query: None,
            log_json: false,
        }
    }
}

impl ScraperConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Not having a .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from any lookup
    /// function, so tests don't have to touch the process environment.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let screener_url = match get("TICKER_SWEEP_SCREENER_URL") {
            Some(raw) => parse_screener_url(&raw)?,
            None => defaults.screener_url,
        };

        let config = Self {
            screener_url,
            user_agent: get("TICKER_SWEEP_USER_AGENT").unwrap_or(defaults.user_agent),
            request_timeout: Duration::from_secs(
                parse_or(get("TICKER_SWEEP_TIMEOUT_SECS"), 10),
            ),
            max_retries: parse_or(get("TICKER_SWEEP_MAX_RETRIES"), defaults.max_retries),
            backoff_base: Duration::from_millis(parse_or(get("TICKER_SWEEP_BACKOFF_MS"), 1000)),
            page_size: parse_or(get("TICKER_SWEEP_PAGE_SIZE"), defaults.page_size),
            max_pages: parse_or(get("TICKER_SWEEP_MAX_PAGES"), defaults.max_pages),
            page_delay: Duration::from_millis(parse_or(get("TICKER_SWEEP_PAGE_DELAY_MS"), 1000)),
            presets_file: get("TICKER_SWEEP_PRESETS_FILE").map(PathBuf::from),
            output_path: get("TICKER_SWEEP_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            adhoc_query: get("TICKER_SWEEP_QUERY"),
            log_json: parse_or(get("TICKER_SWEEP_LOG_JSON"), defaults.log_json),
        };

        if config.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if config.max_retries == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            backoff_base: self.backoff_base,
        }
    }

    pub fn pagination(&self) -> PaginationSettings {
        PaginationSettings {
            screener_url: self.screener_url.clone(),
            page_size: self.page_size,
            max_pages: self.max_pages,
            page_delay: self.page_delay,
        }
    }

    /// Gap between two queries of a batch.
    pub fn query_delay(&self) -> Duration {
        self.page_delay * 2
    }
}

/// The screener endpoint has to be something we can actually GET.
fn parse_screener_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidScreenerUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("scheme `{}` is not http or https", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.user_agent.contains("Mozilla"));
        assert_eq!(config.screener_url.as_str(), DEFAULT_SCREENER_URL);
        assert_eq!(config.query_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_empty_source_gives_defaults() {
        let config = ScraperConfig::from_source(lookup(&[])).unwrap();
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.output_path, PathBuf::from("tickers.json"));
        assert!(config.presets_file.is_none());
        assert!(config.adhoc_query.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = ScraperConfig::from_source(lookup(&[
            ("TICKER_SWEEP_MAX_PAGES", "3"),
            ("TICKER_SWEEP_PAGE_DELAY_MS", "250"),
            ("TICKER_SWEEP_BACKOFF_MS", "10"),
            ("TICKER_SWEEP_QUERY", "v=211&s=ta_newhigh"),
            ("TICKER_SWEEP_OUTPUT", "/tmp/out.json"),
        ]))
        .unwrap();
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.page_delay, Duration::from_millis(250));
        assert_eq!(config.query_delay(), Duration::from_millis(500));
        assert_eq!(config.retry_policy().backoff_base, Duration::from_millis(10));
        assert_eq!(config.adhoc_query.as_deref(), Some("v=211&s=ta_newhigh"));
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.json"));
        assert!(!config.log_json);
    }

    #[test]
    fn test_screener_url_override_and_log_format() {
        let config = ScraperConfig::from_source(lookup(&[
            ("TICKER_SWEEP_SCREENER_URL", " https://elite.finviz.com/screener.ashx "),
            ("TICKER_SWEEP_LOG_JSON", "true"),
        ]))
        .unwrap();
        assert_eq!(config.screener_url.host_str(), Some("elite.finviz.com"));
        assert!(config.log_json);
    }

    #[test]
    fn test_garbage_numbers_fall_back() {
        let config = ScraperConfig::from_source(lookup(&[
            ("TICKER_SWEEP_MAX_PAGES", "lots"),
            ("TICKER_SWEEP_TIMEOUT_SECS", ""),
        ]))
        .unwrap();
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            ScraperConfig::from_source(lookup(&[("TICKER_SWEEP_SCREENER_URL", "not a url")])),
            Err(ConfigError::InvalidScreenerUrl { .. })
        ));
        assert!(matches!(
            ScraperConfig::from_source(lookup(&[("TICKER_SWEEP_SCREENER_URL", "mailto:x")])),
            Err(ConfigError::InvalidScreenerUrl { .. })
        ));
        assert!(matches!(
            ScraperConfig::from_source(lookup(&[("TICKER_SWEEP_SCREENER_URL", "ftp://finviz.com/x")])),
            Err(ConfigError::InvalidScreenerUrl { .. })
        ));
        assert!(matches!(
            ScraperConfig::from_source(lookup(&[("TICKER_SWEEP_SCREENER_URL", "file:///tmp/page.html")])),
            Err(ConfigError::InvalidScreenerUrl { .. })
        ));
        assert!(matches!(
            ScraperConfig::from_source(lookup(&[("TICKER_SWEEP_PAGE_SIZE", "0")])),
            Err(ConfigError::ZeroPageSize)
        ));
        assert!(matches!(
            ScraperConfig::from_source(lookup(&[("TICKER_SWEEP_MAX_RETRIES", "0")])),
            Err(ConfigError::ZeroAttempts)
        ));
    }
}
