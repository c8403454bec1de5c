// =============================================================================
// records.rs — ONE ROW PER TICKER
// =============================================================================
//
// Flattens scrape results into the rows downstream tools import: the ticker,
// which preset found it, and the UTC date of the run.
// =============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{PresetBatch, ScrapeReport, Ticker};

/// Preset label for single-query runs that weren't given a name.
pub const ADHOC_PRESET: &str = "CUSTOM";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to write records to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "Ticker")]
    pub ticker: Ticker,
    #[serde(rename = "Preset")]
    pub preset: String,
    /// Serialized as `YYYY-MM-DD`.
    #[serde(rename = "AsOf")]
    pub as_of: NaiveDate,
}

/// Today's date in UTC, the stamp every record of a run shares.
pub fn today_utc() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Every ticker of every preset, ordered by preset name then ticker.
pub fn records_for_batch(batch: &PresetBatch, as_of: NaiveDate) -> Vec<OutputRecord> {
    batch
        .iter()
        .flat_map(|(preset, report)| records_for(report, preset, as_of))
        .collect()
}

/// Records for a single un-named query.
pub fn records_for_adhoc(report: &ScrapeReport, as_of: NaiveDate) -> Vec<OutputRecord> {
    records_for(report, ADHOC_PRESET, as_of).collect()
}

fn records_for<'a>(
    report: &'a ScrapeReport,
    preset: &'a str,
    as_of: NaiveDate,
) -> impl Iterator<Item = OutputRecord> + 'a {
    report.tickers.iter().map(move |ticker| OutputRecord {
        ticker: ticker.clone(),
        preset: preset.to_string(),
        as_of,
    })
}

/// Write `records` as a pretty-printed JSON array. Returns how many rows
/// were written. An empty slice writes `[]`.
pub fn write_json(path: &Path, records: &[OutputRecord]) -> Result<usize, RecordError> {
    let io_err = |source| RecordError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn report(symbols: &[&str]) -> ScrapeReport {
        ScrapeReport {
            tickers: normalize(symbols),
            pages_scraped: 1,
            more_available: false,
        }
    }

    #[test]
    fn test_batch_records_are_sorted_by_preset_then_ticker() {
        let mut batch = PresetBatch::new();
        batch.insert("MOMENTUM".into(), report(&["TSLA", "NVDA"]));
        batch.insert("BREAKOUT".into(), report(&["MSFT", "AAPL"]));
        batch.insert("EMPTY".into(), ScrapeReport::default());

        let rows: Vec<(String, String)> = records_for_batch(&batch, date())
            .into_iter()
            .map(|r| (r.preset, r.ticker.to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("BREAKOUT".into(), "AAPL".into()),
                ("BREAKOUT".into(), "MSFT".into()),
                ("MOMENTUM".into(), "NVDA".into()),
                ("MOMENTUM".into(), "TSLA".into()),
            ]
        );
    }

    #[test]
    fn test_adhoc_records_use_literal_preset() {
        let rows = records_for_adhoc(&report(&["GE"]), date());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].preset, ADHOC_PRESET);
    }

    #[test]
    fn test_record_json_shape() {
        let rows = records_for_adhoc(&report(&["brk.b"]), date());
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["Ticker"], "BRK-B");
        assert_eq!(json["Preset"], "CUSTOM");
        assert_eq!(json["AsOf"], "2024-03-15");
    }

    #[test]
    fn test_write_json_reports_rows_written() {
        let path = std::env::temp_dir().join(format!("ticker_sweep_records_{}.json", std::process::id()));
        let rows = records_for_adhoc(&report(&["AAPL", "MSFT"]), date());

        assert_eq!(write_json(&path, &rows).unwrap(), 2);
        let back: Vec<OutputRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, rows);

        assert_eq!(write_json(&path, &[]).unwrap(), 0);
        let _ = std::fs::remove_file(&path);
    }
}
