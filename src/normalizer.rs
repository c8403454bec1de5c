// =============================================================================
// normalizer.rs — THE TICKER LAUNDROMAT
// =============================================================================
//
// Raw candidates go in wearing lowercase, dots, stray asterisks and trailing
// whitespace. Canonical tickers come out. Anything that can't be cleaned into
// a valid symbol is quietly dropped; this is filtering, not error handling.
//
// Running the output back through gives the same output. Tests hold us to it.
// =============================================================================

use crate::models::{ScrapeResult, Ticker, MAX_TICKER_LEN};

/// Clean a single raw candidate.
///
/// Blank input is skipped. Otherwise: trim, uppercase, `.` becomes `-`
/// (share classes like `BRK.B`), everything outside `A-Z`, `0-9` and `-` is
/// stripped, and what's left must be 1 to 5 characters with a letter in it.
pub fn normalize_one(raw: &str) -> Option<Ticker> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = trimmed
        .to_uppercase()
        .chars()
        .map(|c| if c == '.' { '-' } else { c })
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    if cleaned.is_empty() || cleaned.len() > MAX_TICKER_LEN {
        return None;
    }
    if !cleaned.bytes().any(|b| b.is_ascii_uppercase()) {
        return None;
    }

    Ticker::parse(&cleaned).ok()
}

/// Clean, validate and deduplicate a whole list. The result is sorted.
pub fn normalize<I, S>(raw: I) -> ScrapeResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|r| normalize_one(r.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(result: &ScrapeResult) -> Vec<&str> {
        result.iter().map(Ticker::as_str).collect()
    }

    #[test]
    fn test_case_is_folded() {
        assert_eq!(symbols(&normalize(["aapl"])), vec!["AAPL"]);
        assert_eq!(normalize(["aapl"]), normalize(["AAPL"]));
        assert_eq!(symbols(&normalize(["AaPl"])), vec!["AAPL"]);
    }

    #[test]
    fn test_period_becomes_hyphen() {
        assert_eq!(symbols(&normalize(["brk.b"])), vec!["BRK-B"]);
        assert_eq!(symbols(&normalize(["BRK.B", "BRK-B", "brk.b"])), vec!["BRK-B"]);
    }

    #[test]
    fn test_length_and_letter_rules() {
        assert!(normalize(["123", "toolongticker", ""]).is_empty());
        assert!(normalize(["   ", "\t\n"]).is_empty());
        assert!(normalize(["-", "..."]).is_empty());
    }

    #[test]
    fn test_dedup_and_sort() {
        assert_eq!(
            symbols(&normalize(["MSFT", "AAPL", "msft"])),
            vec!["AAPL", "MSFT"]
        );
        assert_eq!(
            symbols(&normalize(["NVDA", "", "  MSFT  ", "AAPL", "nvda"])),
            vec!["AAPL", "MSFT", "NVDA"]
        );
    }

    #[test]
    fn test_stray_punctuation_is_stripped() {
        assert_eq!(symbols(&normalize(["$tsla*", "(GE)"])), vec!["GE", "TSLA"]);
        // Digits survive as long as a letter is present
        assert_eq!(symbols(&normalize(["1a"])), vec!["1A"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs: Vec<Vec<&str>> = vec![
            vec!["aapl", "brk.b", "msft", "AAPL", " t.s.l.a ", "123", ""],
            vec!["$x", "y.", ".z", "A-B-C", "abcdef", "q1.2"],
            vec![],
        ];
        for list in inputs {
            let once = normalize(&list);
            let twice = normalize(once.iter().map(Ticker::as_str));
            assert_eq!(once, twice, "normalize not idempotent for {:?}", list);
        }
    }

    #[test]
    fn test_normalize_one_matches_bulk() {
        assert_eq!(normalize_one(" msft ").unwrap().as_str(), "MSFT");
        assert_eq!(normalize_one("T.S.L.A"), None); // becomes T-S-L-A, 7 chars
        assert_eq!(normalize_one(""), None);
    }
}
