// =============================================================================
// ticker_sweep — screener pages in, clean ticker sets out
// =============================================================================
//
// Fetch (with retries) → extract (three strategies) → paginate (until the
// results run out) → normalize (canonical, sorted, deduplicated). The batch
// runner strings several named queries together.
// =============================================================================

pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod paginator;
pub mod presets;
pub mod records;
pub mod transport;

pub use config::{ConfigError, ScraperConfig};
pub use fetcher::{Fetcher, RetryPolicy};
pub use metrics::{MetricsSnapshot, ScrapeMetrics};
pub use models::{
    PageResult, PresetBatch, Query, QueryError, RawTicker, ScrapeReport, ScrapeResult, Ticker,
    TickerError,
};
pub use normalizer::{normalize, normalize_one};
pub use orchestrator::BatchRunner;
pub use paginator::{PaginationSettings, Paginator};
pub use presets::{builtin_presets, load_presets, parse_presets, Preset, PresetError};
pub use records::{OutputRecord, RecordError};
pub use transport::{HttpTransport, RawResponse, ScriptedTransport, Transport, TransportError};
