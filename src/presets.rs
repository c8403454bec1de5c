// =============================================================================
// presets.rs — NAMED QUERIES
// =============================================================================
//
// A preset is a query somebody cared enough about to give a name. Batches
// come in as a JSON array:
//
//   [
//     { "name": "TF_BREAKOUT_LONG", "query": "v=211&f=ta_highlow52w_nh&ft=4" },
//     { "name": "MY_SCREEN",        "url":   "https://finviz.com/screener.ashx?v=111&f=..." }
//   ]
//
// Each record carries exactly one of `query` or `url`, and names are unique
// within a batch.
// =============================================================================

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::models::{Query, QueryError};

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to read preset file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("preset file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("preset #{index} has an empty name")]
    EmptyName { index: usize },
    #[error("preset `{0}` appears more than once")]
    DuplicateName(String),
    #[error("preset `{0}` needs either `query` or `url`")]
    MissingSource(String),
    #[error("preset `{0}` has both `query` and `url`; pick one")]
    AmbiguousSource(String),
    #[error("preset `{name}`: {source}")]
    InvalidQuery {
        name: String,
        #[source]
        source: QueryError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub query: Query,
}

/// One record of the batch file, before validation.
#[derive(Debug, Deserialize)]
struct PresetRecord {
    name: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Parse and validate a batch from JSON text. URL overrides must point at
/// the same site as `screener`.
pub fn parse_presets(json: &str, screener: &Url) -> Result<Vec<Preset>, PresetError> {
    let records: Vec<PresetRecord> = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    let mut presets = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let name = record.name.trim().to_string();
        if name.is_empty() {
            return Err(PresetError::EmptyName { index });
        }
        if !seen.insert(name.clone()) {
            return Err(PresetError::DuplicateName(name));
        }

        let query = match (record.query.as_deref(), record.url.as_deref()) {
            (Some(q), None) => Query::params(q),
            (None, Some(u)) => Query::url(u, screener),
            (Some(_), Some(_)) => return Err(PresetError::AmbiguousSource(name)),
            (None, None) => return Err(PresetError::MissingSource(name)),
        }
        .map_err(|source| PresetError::InvalidQuery {
            name: name.clone(),
            source,
        })?;

        presets.push(Preset { name, query });
    }

    Ok(presets)
}

/// Read and validate a batch file.
pub fn load_presets(path: &Path, screener: &Url) -> Result<Vec<Preset>, PresetError> {
    let json = fs::read_to_string(path).map_err(|source| PresetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_presets(&json, screener)
}

/// The trend-following screens the standalone scanner has always shipped
/// with. Used when no batch file is configured.
pub fn builtin_presets() -> Vec<Preset> {
    [
        ("TF_BREAKOUT_LONG", "v=211&f=ta_highlow52w_nh&ft=4"),
        ("TF_MOMENTUM_UPTREND", "v=211&f=ta_sma200_pa,ta_sma50_pa&ft=4"),
        ("TF_UNUSUAL_VOLUME", "v=211&f=sh_relvol_o2&ft=4"),
        ("TF_GAP_UP", "v=211&f=ta_gap_u5&ft=4"),
        ("TF_STRONG_TREND", "v=211&f=ta_changeopen_u5&ft=4"),
    ]
    .into_iter()
    .map(|(name, params)| Preset {
        name: name.to_string(),
        query: Query::Params(params.to_string()),
    })
    .collect()
}
