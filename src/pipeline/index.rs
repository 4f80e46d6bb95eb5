//! Registry index: CIK ↔ ticker ↔ company title.
//!
//! SEC publishes `company_tickers.json` as a JSON object keyed by row number:
//!
//! ```json
//! {"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, "1": …}
//! ```
//!
//! Rows are validated here, at the ingestion boundary, into typed
//! [`IndexEntry`] values. A row without a usable CIK or title is dropped
//! rather than carried downstream as optional fields. Row order follows the
//! numeric row key, which is the order the resolver breaks ties by.

use crate::client::EdgarClient;
use crate::error::EdgarError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info};

/// A registry-issued entity identifier, always 10 zero-padded digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cik(String);

impl Cik {
    /// Parse 1–10 ASCII digits, zero-padding to 10.
    pub fn new(raw: &str) -> Result<Self, EdgarError> {
        let digits = raw.trim();
        if digits.is_empty() || digits.len() > 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EdgarError::InvalidCik(raw.to_string()));
        }
        Ok(Cik(format!("{digits:0>10}")))
    }

    pub fn from_u64(n: u64) -> Result<Self, EdgarError> {
        Self::new(&n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cik {
    type Err = EdgarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cik::new(s)
    }
}

impl TryFrom<String> for Cik {
    type Error = EdgarError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Cik::new(&s)
    }
}

impl From<Cik> for String {
    fn from(c: Cik) -> Self {
        c.0
    }
}

/// One company in the registry index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub cik: Cik,
    pub ticker: String,
    /// Display name, trimmed.
    pub title: String,
}

/// Immutable snapshot of the registry index for one run.
#[derive(Debug, Clone, Default)]
pub struct CompanyIndex {
    entries: Vec<IndexEntry>,
}

impl CompanyIndex {
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in index order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// First entry with this CIK. Duplicate rows share a CIK; the first wins.
    pub fn get(&self, cik: &Cik) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| &e.cik == cik)
    }
}

#[derive(Debug, Deserialize)]
struct RawIndexRow {
    #[serde(alias = "cik")]
    cik_str: Option<serde_json::Value>,
    ticker: Option<String>,
    title: Option<String>,
}

impl RawIndexRow {
    fn into_entry(self) -> Option<IndexEntry> {
        let cik = match self.cik_str? {
            serde_json::Value::Number(n) => Cik::from_u64(n.as_u64()?).ok()?,
            serde_json::Value::String(s) => Cik::new(&s).ok()?,
            _ => return None,
        };
        let title = self.title?.trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(IndexEntry {
            cik,
            ticker: self.ticker.unwrap_or_default().trim().to_string(),
            title,
        })
    }
}

/// Parse a `company_tickers.json` body.
///
/// The top level must be an object; anything else is a malformed payload.
/// Individual malformed rows are dropped.
pub fn parse_company_index(source: &str, body: &[u8]) -> Result<CompanyIndex, EdgarError> {
    let rows: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(body).map_err(|e| EdgarError::MalformedPayload {
            url: source.to_string(),
            detail: e.to_string(),
        })?;

    let mut keyed: Vec<(String, serde_json::Value)> = rows.into_iter().collect();
    keyed.sort_by(|(a, _), (b, _)| {
        match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        }
    });

    let total = keyed.len();
    let entries: Vec<IndexEntry> = keyed
        .into_iter()
        .filter_map(|(key, value)| {
            let entry = serde_json::from_value::<RawIndexRow>(value)
                .ok()
                .and_then(RawIndexRow::into_entry);
            if entry.is_none() {
                debug!("Dropping malformed index row '{}'", key);
            }
            entry
        })
        .collect();

    if entries.len() < total {
        debug!("Index: kept {}/{} rows", entries.len(), total);
    }
    Ok(CompanyIndex::new(entries))
}

/// Fetch and parse the registry index.
pub async fn try_load_company_index(client: &EdgarClient) -> Result<CompanyIndex, EdgarError> {
    let url = client.endpoints().index_url.as_str();
    let response = client.get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(EdgarError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| EdgarError::RequestFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    parse_company_index(url, &body)
}

/// Fetch the registry index, degrading to an empty index on any failure.
///
/// An empty index makes every company resolve to not-found, so the run still
/// completes and reports instead of aborting.
pub async fn load_company_index(client: &EdgarClient) -> CompanyIndex {
    match try_load_company_index(client).await {
        Ok(index) => {
            info!("Loaded company index: {} entries", index.len());
            index
        }
        Err(e) => {
            error!("Error loading company index: {}", e);
            CompanyIndex::default()
        }
    }
}
