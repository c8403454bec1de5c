// =============================================================================
// extractor.rs — READING TEA LEAVES OUT OF SCREENER HTML
// =============================================================================
//
// The screener doesn't publish an API. It publishes HTML, and it rearranges
// that HTML whenever it feels like it. So we keep three ways of reading a
// results page and use the first one that finds anything:
//
//   1. <a class="screener-link-primary">AAPL</a>, the ticker links the
//      current layout marks explicitly.
//   2. Any <a> pointing at a quote page (quote.ashx?t=...).
//   3. Brute force. The second cell of every table row, with everything
//      but A-Z and '-' scrubbed out.
//
// Candidates longer than five characters are dropped here as a sanity bound.
// Real validation happens in the normalizer.
// =============================================================================

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::{RawTicker, MAX_TICKER_LEN};

/// Class the screener puts on its ticker links.
pub const PRIMARY_LINK_CLASS: &str = "screener-link-primary";

static PRIMARY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!("a.{PRIMARY_LINK_CLASS}"))
        .expect("primary ticker selector is valid CSS")
});

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid CSS"));

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector is valid CSS"));

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("row selector is valid CSS"));

static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("cell selector is valid CSS"));

static QUOTE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"quote\.ashx\?t=").expect("quote href pattern is valid"));

static TOTAL_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total:\s*(\d+)").expect("total counter pattern is valid"));

/// Which strategy produced a page's candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PrimaryClass,
    QuoteLinks,
    TableCells,
}

/// Raw ticker candidates from one page, in page order. Empty when none of
/// the strategies recognise anything.
pub fn extract(body: &str) -> Vec<RawTicker> {
    extract_with_strategy(body)
        .map(|(_, tickers)| tickers)
        .unwrap_or_default()
}

/// Like [`extract`], but also says which strategy won. `None` is a
/// structural miss: the page parsed, nothing in it looked like a ticker.
pub fn extract_with_strategy(body: &str) -> Option<(Strategy, Vec<RawTicker>)> {
    let document = Html::parse_document(body);

    let primary = from_primary_links(&document);
    if !primary.is_empty() {
        debug!(count = primary.len(), "Extracted tickers via primary link class");
        return Some((Strategy::PrimaryClass, primary));
    }

    let quote = from_quote_links(&document);
    if !quote.is_empty() {
        debug!(count = quote.len(), "Primary links missing, extracted via quote links");
        return Some((Strategy::QuoteLinks, quote));
    }

    let cells = from_table_cells(&document);
    if !cells.is_empty() {
        debug!(count = cells.len(), "Link strategies missed, extracted via table cells");
        return Some((Strategy::TableCells, cells));
    }

    debug!("No extraction strategy matched the page");
    None
}

/// The "Total: N" counter, if the page shows one.
pub fn total_count(body: &str) -> Option<usize> {
    let document = Html::parse_document(body);
    document.root_element().text().find_map(|chunk| {
        TOTAL_COUNTER
            .captures(chunk)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn keep(candidate: &str) -> Option<RawTicker> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_TICKER_LEN {
        return None;
    }
    Some(trimmed.to_string())
}

fn from_primary_links(document: &Html) -> Vec<RawTicker> {
    document
        .select(&PRIMARY_SELECTOR)
        .filter_map(|a| keep(&text_of(&a)))
        .collect()
}

fn from_quote_links(document: &Html) -> Vec<RawTicker> {
    document
        .select(&ANCHOR_SELECTOR)
        .filter(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| QUOTE_HREF.is_match(href))
        })
        .filter_map(|a| keep(&text_of(&a)))
        .collect()
}

fn from_table_cells(document: &Html) -> Vec<RawTicker> {
    let mut seen = HashSet::new();
    let mut tickers = Vec::new();

    for table in document.select(&TABLE_SELECTOR) {
        // First row is the header
        for row in table.select(&ROW_SELECTOR).skip(1) {
            let Some(cell) = row.select(&CELL_SELECTOR).nth(1) else {
                continue;
            };

            let scrubbed: String = text_of(&cell)
                .trim()
                .to_uppercase()
                .chars()
                .filter(|c| c.is_ascii_uppercase() || *c == '-')
                .collect();

            if let Some(candidate) = keep(&scrubbed) {
                if seen.insert(candidate.clone()) {
                    tickers.push(candidate);
                }
            }
        }
    }

    tickers
}
