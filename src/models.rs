// =============================================================================
// models.rs — THE NOUNS OF THE SWEEP
// =============================================================================
//
// Everything the pipeline passes around lives here: the query we were asked
// to run, the canonical ticker symbol we promise to hand back, and the result
// shapes for one query and for a whole preset batch.
//
// Raw tickers are plain `String`s. They are whatever the HTML gave us and
// nobody should trust them until the normalizer has had its say.
// =============================================================================

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Longest symbol we accept, hyphenated share classes included (`BRK-B`).
pub const MAX_TICKER_LEN: usize = 5;

/// An unvalidated candidate pulled out of a page.
pub type RawTicker = String;

/// The deduplicated, lexicographically ordered tickers for one query.
pub type ScrapeResult = BTreeSet<Ticker>;

/// Preset name to that preset's report. Iterates in name order.
pub type PresetBatch = BTreeMap<String, ScrapeReport>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    #[error("ticker is empty")]
    Empty,
    #[error("ticker `{0}` is longer than {MAX_TICKER_LEN} characters")]
    TooLong(String),
    #[error("ticker `{0}` contains characters outside A-Z, 0-9 and '-'")]
    InvalidCharacters(String),
    #[error("ticker `{0}` has no letters")]
    NoLetters(String),
}

/// A canonical exchange symbol: uppercase ASCII letters, digits and hyphens,
/// one to five characters long, at least one letter.
///
/// The only ways to get one are [`Ticker::parse`] (strict) and the
/// normalizer (forgiving), so holding a `Ticker` means the invariant holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Accept a symbol that is already canonical. No case folding, no
    /// punctuation cleanup; use `normalizer::normalize_one` for that.
    pub fn parse(symbol: &str) -> Result<Self, TickerError> {
        if symbol.is_empty() {
            return Err(TickerError::Empty);
        }
        if !symbol
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(TickerError::InvalidCharacters(symbol.to_string()));
        }
        if symbol.len() > MAX_TICKER_LEN {
            return Err(TickerError::TooLong(symbol.to_string()));
        }
        if !symbol.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(TickerError::NoLetters(symbol.to_string()));
        }
        Ok(Self(symbol.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ticker {
    type Err = TickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ticker::parse(s)
    }
}

impl<'de> Deserialize<'de> for Ticker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ticker::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query string is empty")]
    EmptyParams,
    #[error("screener URL is empty")]
    EmptyUrl,
    #[error("invalid screener URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("screener URL `{0}` must use http or https")]
    UnsupportedScheme(String),
    #[error("screener URL `{0}` is missing a host")]
    MissingHost(String),
    #[error("screener URL host `{host}` is not part of `{expected}`")]
    ForeignHost { host: String, expected: String },
}

/// One screener result set, as the caller asked for it.
///
/// Either a bare filter fragment that gets glued onto the configured
/// endpoint, or a complete URL somebody copied out of their browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Params(String),
    Url(Url),
}

impl Query {
    /// A filter fragment such as `v=211&f=ta_highlow52w_nh&ft=4`.
    /// A leading `?` is tolerated and dropped.
    pub fn params(fragment: &str) -> Result<Self, QueryError> {
        let trimmed = fragment.trim().trim_start_matches('?').trim();
        if trimmed.is_empty() {
            return Err(QueryError::EmptyParams);
        }
        Ok(Query::Params(trimmed.to_string()))
    }

    /// A fully-qualified override. It has to point at the same site as the
    /// configured screener endpoint; `www.` is ignored and subdomains pass.
    pub fn url(raw: &str, screener: &Url) -> Result<Self, QueryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QueryError::EmptyUrl);
        }

        let parsed = Url::parse(trimmed).map_err(|e| QueryError::InvalidUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(QueryError::UnsupportedScheme(trimmed.to_string()));
        }

        let host = match parsed.host_str() {
            Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
            _ => return Err(QueryError::MissingHost(trimmed.to_string())),
        };

        let expected = screener
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .unwrap_or_default();
        let expected = expected.trim_start_matches("www.");
        let bare = host.trim_start_matches("www.");

        if bare != expected && !bare.ends_with(&format!(".{expected}")) {
            return Err(QueryError::ForeignHost {
                host,
                expected: expected.to_string(),
            });
        }

        Ok(Query::Url(parsed))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Params(p) => write!(f, "?{p}"),
            Query::Url(u) => write!(f, "{u}"),
        }
    }
}

/// What one page fetch came back with, after retries have been spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResult {
    /// A 2xx response. The body still has to get through the extractor.
    Body(String),
    /// The site said 404: there is no such page, stop asking.
    DefinitiveEmpty,
    /// Retries ran out or the site answered with something we can't use.
    Exhausted,
}

impl PageResult {
    pub fn body(&self) -> Option<&str> {
        match self {
            PageResult::Body(b) => Some(b),
            _ => None,
        }
    }
}

/// The outcome of paginating one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeReport {
    pub tickers: ScrapeResult,
    /// Pages that were requested, including the one that ended the run.
    pub pages_scraped: usize,
    /// True when the page limit cut us off while pages were still full.
    pub more_available: bool,
}

impl ScrapeReport {
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screener() -> Url {
        Url::parse("https://finviz.com/screener.ashx").unwrap()
    }

    #[test]
    fn test_ticker_parse_accepts_canonical_symbols() {
        assert_eq!(Ticker::parse("AAPL").unwrap().as_str(), "AAPL");
        assert_eq!(Ticker::parse("BRK-B").unwrap().as_str(), "BRK-B");
        assert_eq!(Ticker::parse("A1").unwrap().as_str(), "A1");
    }

    #[test]
    fn test_ticker_parse_rejects_noise() {
        assert_eq!(Ticker::parse(""), Err(TickerError::Empty));
        assert!(matches!(Ticker::parse("aapl"), Err(TickerError::InvalidCharacters(_))));
        assert!(matches!(Ticker::parse("BRK.B"), Err(TickerError::InvalidCharacters(_))));
        assert!(matches!(Ticker::parse("TOOLONG"), Err(TickerError::TooLong(_))));
        assert!(matches!(Ticker::parse("123"), Err(TickerError::NoLetters(_))));
        assert!(matches!(Ticker::parse("--"), Err(TickerError::NoLetters(_))));
    }

    #[test]
    fn test_ticker_deserialize_validates() {
        let ok: Ticker = serde_json::from_str("\"MSFT\"").unwrap();
        assert_eq!(ok.as_str(), "MSFT");
        assert!(serde_json::from_str::<Ticker>("\"msft\"").is_err());
    }

    #[test]
    fn test_query_params_strips_question_mark() {
        let q = Query::params("  ?v=211&f=ta_gap_u5 ").unwrap();
        assert_eq!(q, Query::Params("v=211&f=ta_gap_u5".to_string()));
        assert_eq!(Query::params("   "), Err(QueryError::EmptyParams));
        assert_eq!(Query::params("?"), Err(QueryError::EmptyParams));
    }

    #[test]
    fn test_query_url_accepts_screener_domain() {
        assert!(Query::url("https://finviz.com/screener.ashx?v=111&f=ta_sma20_pa", &screener()).is_ok());
        assert!(Query::url("http://finviz.com/screener.ashx?v=111", &screener()).is_ok());
        assert!(Query::url("https://www.finviz.com/screener.ashx?v=111", &screener()).is_ok());
        assert!(Query::url("https://elite.finviz.com/screener.ashx?v=111", &screener()).is_ok());
    }

    #[test]
    fn test_query_url_rejects_bad_input() {
        assert_eq!(Query::url("", &screener()), Err(QueryError::EmptyUrl));
        assert!(matches!(
            Query::url("finviz.com/screener.ashx", &screener()),
            Err(QueryError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Query::url("ftp://finviz.com/screener.ashx", &screener()),
            Err(QueryError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            Query::url("https://google.com/search", &screener()),
            Err(QueryError::ForeignHost { .. })
        ));
        assert!(matches!(
            Query::url("https://notfinviz.com/screener.ashx", &screener()),
            Err(QueryError::ForeignHost { .. })
        ));
    }

    #[test]
    fn test_page_result_body_accessor() {
        assert_eq!(PageResult::Body("x".into()).body(), Some("x"));
        assert_eq!(PageResult::DefinitiveEmpty.body(), None);
        assert_eq!(PageResult::Exhausted.body(), None);
    }
}
