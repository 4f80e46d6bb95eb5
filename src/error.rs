//! Error types for the edgequake-edgar2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`EdgarError`]: the run (or one company's retrieval) cannot proceed, e.g.
//!   missing User-Agent, browser failed to launch, registry answered with a
//!   non-retryable status. Returned as `Err(EdgarError)`.
//!
//! * [`RenderError`]: **non-fatal**, one document could not be rendered.
//!   Stored inside [`crate::output::RenderOutcome`] so a batch always
//!   finishes and reports partial success instead of aborting on the first
//!   bad filing.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal and per-company errors returned by the edgequake-edgar2pdf library.
///
/// Per-document failures use [`RenderError`] and are stored in
/// [`crate::output::RenderOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum EdgarError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// SEC rejects anonymous traffic; a contact string is mandatory.
    #[error(
        "No User-Agent configured.\n\
SEC EDGAR requires a descriptive User-Agent with a contact address, e.g.\n\
  SEC_USER_AGENT=\"Example Research jane@example.com\""
    )]
    MissingUserAgent,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A CIK was not 1–10 ASCII digits.
    #[error("Invalid CIK '{0}': expected up to 10 digits")]
    InvalidCik(String),

    // ── Registry errors ───────────────────────────────────────────────────
    /// The HTTP client could not be constructed (bad header value, TLS init).
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// Connection-level failure talking to the registry.
    #[error("Request to '{url}' failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The registry did not answer within the client timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    RequestTimeout { url: String, secs: u64 },

    /// Non-success, non-429 status. Not retried.
    #[error("'{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The body parsed, but not into the shape we ingest.
    #[error("Malformed payload from '{url}': {detail}")]
    MalformedPayload { url: String, detail: String },

    /// HTTP 429 persisted through every allowed retry.
    #[error("Still rate limited by '{url}' after {attempts} attempts")]
    RateLimitExhausted { url: String, attempts: u32 },

    // ── Browser errors ────────────────────────────────────────────────────
    /// No Chrome/Chromium executable could be found.
    #[cfg(feature = "browser")]
    #[error("{0}")]
    BrowserNotFound(#[from] chrome_locate::ChromeLocateError),

    /// Chrome was found but did not start or the CDP connection failed.
    #[error("Failed to launch headless browser: {0}")]
    BrowserLaunch(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EdgarError {
    /// Map a reqwest transport error for `url`, keeping timeouts distinct.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            EdgarError::RequestTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            EdgarError::RequestFailed {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// A non-fatal error for a single document.
///
/// Stored in [`crate::output::RenderStatus`]; siblings keep running.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderError {
    /// Reachability probe saw a non-200 status or a network error.
    #[error("'{url}' is not reachable: {detail}")]
    Unreachable {
        url: String,
        status: Option<u16>,
        detail: String,
    },

    /// The engine could not open a new page/tab.
    #[error("Could not open a rendering surface: {detail}")]
    SurfaceUnavailable { detail: String },

    /// Navigation failed before the page settled.
    #[error("Navigation to '{url}' failed: {detail}")]
    Navigation { url: String, detail: String },

    /// Navigation did not settle within the configured timeout.
    #[error("Navigation to '{url}' timed out after {secs}s")]
    NavigationTimeout { url: String, secs: u64 },

    /// PDF export or the final write to disk failed.
    #[error("PDF export to '{path}' failed: {detail}")]
    Export { path: String, detail: String },

    /// The admission gate was closed before this unit was admitted.
    #[error("Render unit was not admitted: {detail}")]
    Admission { detail: String },
}
