//! Filing retrieval: CIK → recent filings of one form type.
//!
//! ## Protocol
//!
//! One GET to `{submissions_base}/CIK{cik}.json`. On HTTP 429 the same request
//! is repeated after a backoff from [`RateLimitPolicy`]. Any other
//! non-success status is returned as an error without retrying. After a
//! successful fetch the retriever pauses for `request_delay` so that a caller
//! looping over companies stays under the registry's request quota.
//!
//! ## Payload shape
//!
//! `filings.recent` is columnar: parallel arrays `form`, `accessionNumber`,
//! `primaryDocument`, `filingDate`, `reportDate`. The three required columns
//! must have equal length; a mismatch is rejected as malformed rather than
//! zipped into misaligned rows.

use crate::client::EdgarClient;
use crate::config::{PipelineConfig, RateLimitPolicy};
use crate::error::EdgarError;
use crate::pipeline::index::Cik;
use crate::pipeline::url::submissions_url;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One filing of the requested form type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    pub cik: Cik,
    pub form: String,
    /// As published, e.g. `0000320193-24-000123`.
    pub accession_number: String,
    /// Relative document path inside the filing folder.
    pub primary_document: String,
    pub filing_date: Option<String>,
    pub report_date: Option<String>,
}

impl Filing {
    /// Accession number with every separator removed.
    pub fn accession_compact(&self) -> String {
        self.accession_number
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }
}

/// Async sleep, injectable so retry timing can be observed in tests.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Delay`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Fetches submission histories from the registry.
#[derive(Clone)]
pub struct FilingRetriever {
    client: EdgarClient,
    policy: RateLimitPolicy,
    request_delay: Duration,
    delay: Arc<dyn Delay>,
}

impl FilingRetriever {
    pub fn new(client: EdgarClient, policy: RateLimitPolicy, request_delay: Duration) -> Self {
        Self {
            client,
            policy,
            request_delay,
            delay: Arc::new(TokioDelay),
        }
    }

    pub fn from_config(client: EdgarClient, config: &PipelineConfig) -> Self {
        Self::new(client, config.rate_limit, config.request_delay())
    }

    /// Replace the sleep implementation.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// Recent filings for `cik` whose form equals `form_type` exactly.
    ///
    /// # Errors
    /// - [`EdgarError::HttpStatus`] for any non-success status other than 429
    /// - [`EdgarError::RateLimitExhausted`] when the policy's retries run out
    /// - [`EdgarError::MalformedPayload`] for bodies that do not parse
    /// - transport errors from [`EdgarClient::get`]
    pub async fn fetch_filings(
        &self,
        cik: &Cik,
        form_type: &str,
    ) -> Result<Vec<Filing>, EdgarError> {
        let url = submissions_url(&self.client.endpoints().submissions_base, cik);

        let mut retry = 0u32;
        let response = loop {
            let response = self.client.get(&url).await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                break response;
            }
            retry += 1;
            if !self.policy.allows(retry) {
                return Err(EdgarError::RateLimitExhausted { url, attempts: retry });
            }
            let wait = self.policy.backoff_for(retry);
            warn!("Rate limited on {} (retry {}), waiting {:?}", url, retry, wait);
            self.delay.sleep(wait).await;
        };

        let status = response.status();
        if !status.is_success() {
            return Err(EdgarError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| EdgarError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        let filings = parse_submissions(&url, cik, &body, form_type)?;
        info!("{}: {} {} filing(s)", cik, filings.len(), form_type);

        self.delay.sleep(self.request_delay).await;
        Ok(filings)
    }
}

#[derive(Debug, Deserialize)]
struct Submissions {
    #[serde(default)]
    filings: Option<FilingsSection>,
}

#[derive(Debug, Deserialize)]
struct FilingsSection {
    #[serde(default)]
    recent: Option<RecentFilings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentFilings {
    #[serde(default)]
    form: Vec<String>,
    #[serde(default)]
    accession_number: Vec<String>,
    #[serde(default)]
    primary_document: Vec<String>,
    #[serde(default)]
    filing_date: Vec<String>,
    #[serde(default)]
    report_date: Vec<String>,
}

/// Parse a submissions body and keep rows whose form equals `form_type`.
pub fn parse_submissions(
    source: &str,
    cik: &Cik,
    body: &[u8],
    form_type: &str,
) -> Result<Vec<Filing>, EdgarError> {
    let malformed = |detail: String| EdgarError::MalformedPayload {
        url: source.to_string(),
        detail,
    };

    let submissions: Submissions =
        serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;
    let recent = submissions
        .filings
        .and_then(|f| f.recent)
        .unwrap_or_default();

    let rows = recent.form.len();
    if recent.accession_number.len() != rows || recent.primary_document.len() != rows {
        return Err(malformed(format!(
            "column lengths differ: form={}, accessionNumber={}, primaryDocument={}",
            rows,
            recent.accession_number.len(),
            recent.primary_document.len()
        )));
    }

    let optional_column = |name: &str, col: Vec<String>| -> Option<Vec<String>> {
        if col.len() == rows {
            Some(col)
        } else {
            if !col.is_empty() {
                debug!("{}: ignoring {} column ({} of {} rows)", source, name, col.len(), rows);
            }
            None
        }
    };
    let filing_dates = optional_column("filingDate", recent.filing_date);
    let report_dates = optional_column("reportDate", recent.report_date);
    let non_empty = |s: &String| (!s.trim().is_empty()).then(|| s.clone());

    let mut filings = Vec::new();
    for (i, form) in recent.form.iter().enumerate() {
        if form != form_type {
            continue;
        }
        let accession = recent.accession_number[i].trim();
        let document = recent.primary_document[i].trim();
        if accession.is_empty() || document.is_empty() {
            warn!("{}: dropping {} row {} with no accession or document", source, form, i);
            continue;
        }
        filings.push(Filing {
            cik: cik.clone(),
            form: form.clone(),
            accession_number: accession.to_string(),
            primary_document: document.to_string(),
            filing_date: filing_dates.as_ref().and_then(|d| non_empty(&d[i])),
            report_date: report_dates.as_ref().and_then(|d| non_empty(&d[i])),
        });
    }

    Ok(filings)
}
