// =============================================================================
// paginator.rs — PAGE AFTER PAGE UNTIL THE WELL RUNS DRY
// =============================================================================
//
// Walks the result pages of one query. The screener shows a fixed number of
// rows per page and addresses later pages by a 1-based row offset (`r=21`,
// `r=41`, ...), so page n lives at offset (n-1) * page_size.
//
// The walk stops when any of these happen:
//   - a page comes back with no tickers (404, gave up, or unreadable HTML)
//   - a page comes back short, which means it was the last one
//   - we hit the configured page limit
//
// Whatever was collected is normalized once at the end. Between pages we
// wait a fixed delay so the site doesn't decide we're a problem.
// =============================================================================

use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::extractor;
use crate::fetcher::Fetcher;
use crate::models::{PageResult, Query, RawTicker, ScrapeReport};
use crate::normalizer;

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub screener_url: Url,
    pub page_size: usize,
    /// 0 means no limit.
    pub max_pages: usize,
    pub page_delay: Duration,
}

/// Where the walk is. `Accumulating` holds the page just fetched until we've
/// decided what it means.
#[derive(Debug)]
enum PageState {
    Start,
    FetchingPage(usize),
    Accumulating { page: usize, found: Vec<RawTicker> },
    Done(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    ShortPage,
    PageLimit,
}

/// Zero-based offset of the first row on `page` (1-based).
pub fn page_offset(page: usize, page_size: usize) -> usize {
    page.saturating_sub(1) * page_size
}

/// Build the URL for `page` of `query`.
///
/// Page 1 carries no `r` parameter. Later pages get `r=<offset+1>`. A URL
/// override keeps its own parameters verbatim, minus any `r` it came with.
pub fn page_url(
    screener: &Url,
    query: &Query,
    page: usize,
    page_size: usize,
) -> Result<Url, url::ParseError> {
    let row = (page > 1).then(|| page_offset(page, page_size) + 1);

    match query {
        Query::Params(params) => {
            let mut endpoint = screener.clone();
            endpoint.set_query(None);
            endpoint.set_fragment(None);
            let raw = match row {
                Some(r) => format!("{endpoint}?{params}&r={r}"),
                None => format!("{endpoint}?{params}"),
            };
            Url::parse(&raw)
        }
        Query::Url(base) => {
            let mut url = base.clone();
            let mut segments: Vec<String> = base
                .query()
                .unwrap_or("")
                .split('&')
                .filter(|seg| !seg.is_empty())
                .filter(|seg| seg.split('=').next() != Some("r"))
                .map(str::to_string)
                .collect();
            if let Some(r) = row {
                segments.push(format!("r={r}"));
            }
            if segments.is_empty() {
                url.set_query(None);
            } else {
                url.set_query(Some(&segments.join("&")));
            }
            Ok(url)
        }
    }
}

pub struct Paginator {
    fetcher: Fetcher,
    settings: PaginationSettings,
}

impl Paginator {
    pub fn new(fetcher: Fetcher, settings: PaginationSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn settings(&self) -> &PaginationSettings {
        &self.settings
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Scrape every page of `query` and return the normalized tickers.
    pub async fn scrape(&self, query: &Query) -> ScrapeReport {
        let page_size = self.settings.page_size;
        let max_pages = self.settings.max_pages;

        let mut accumulated: Vec<RawTicker> = Vec::new();
        let mut pages_scraped = 0;
        let mut state = PageState::Start;

        let reason = loop {
            state = match state {
                PageState::Start => PageState::FetchingPage(1),

                PageState::FetchingPage(page) => {
                    pages_scraped = page;
                    let found = self.fetch_page(query, page).await;
                    PageState::Accumulating { page, found }
                }

                PageState::Accumulating { page, found } => {
                    if found.is_empty() {
                        PageState::Done(StopReason::EmptyPage)
                    } else {
                        let full = found.len() >= page_size;
                        accumulated.extend(found);

                        if !full {
                            PageState::Done(StopReason::ShortPage)
                        } else if max_pages != 0 && page >= max_pages {
                            PageState::Done(StopReason::PageLimit)
                        } else {
                            if !self.settings.page_delay.is_zero() {
                                tokio::time::sleep(self.settings.page_delay).await;
                            }
                            PageState::FetchingPage(page + 1)
                        }
                    }
                }

                PageState::Done(reason) => break reason,
            };
        };

        let tickers = normalizer::normalize(&accumulated);
        self.fetcher.metrics().increment_queries_completed();

        info!(
            query = %query,
            pages = pages_scraped,
            raw = accumulated.len(),
            tickers = tickers.len(),
            stop = ?reason,
            "Query scrape finished"
        );

        ScrapeReport {
            tickers,
            pages_scraped,
            more_available: reason == StopReason::PageLimit,
        }
    }

    /// Look at page 1 only and report how many results the query has.
    ///
    /// Prefers the page's own "Total: N" counter; without one, falls back to
    /// how many tickers page 1 shows. `None` if the page can't be fetched or
    /// has nothing on it.
    pub async fn count(&self, query: &Query) -> Option<usize> {
        let url = match page_url(&self.settings.screener_url, query, 1, self.settings.page_size) {
            Ok(u) => u,
            Err(e) => {
                warn!(query = %query, error = %e, "Could not build page URL for count");
                return None;
            }
        };

        let page = self.fetcher.fetch(&url).await;
        let body = page.body()?;

        extractor::total_count(body).or_else(|| {
            let on_page = extractor::extract(body).len();
            (on_page > 0).then_some(on_page)
        })
    }

    async fn fetch_page(&self, query: &Query, page: usize) -> Vec<RawTicker> {
        let url = match page_url(&self.settings.screener_url, query, page, self.settings.page_size) {
            Ok(u) => u,
            Err(e) => {
                warn!(query = %query, page = page, error = %e, "Could not build page URL");
                return Vec::new();
            }
        };

        debug!(url = %url, page = page, "Fetching result page");

        match self.fetcher.fetch(&url).await {
            PageResult::Body(body) => {
                let found = extractor::extract(&body);
                if found.is_empty() {
                    self.fetcher.metrics().increment_parse_misses();
                    warn!(url = %url, page = page, "Page fetched but no tickers recognised");
                } else {
                    self.fetcher.metrics().add_raw_tickers(found.len());
                }
                found
            }
            PageResult::DefinitiveEmpty => {
                debug!(url = %url, page = page, "No such page");
                Vec::new()
            }
            PageResult::Exhausted => {
                warn!(url = %url, page = page, "Page unavailable, ending pagination");
                Vec::new()
            }
        }
    }
}
