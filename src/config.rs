//! Configuration types for a filing-to-PDF run.
//!
//! All run behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Every knob lives in one struct so the same
//! config drives the CLI, library callers and tests, and so a run can be
//! logged in full before any request is made.

use crate::error::EdgarError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// SEC company ticker/title index.
pub const DEFAULT_INDEX_URL: &str = "https://www.sec.gov/files/company_tickers.json";
/// Base for `CIK##########.json` submission histories.
pub const DEFAULT_SUBMISSIONS_BASE: &str = "https://data.sec.gov/submissions";
/// Base for filing documents.
pub const DEFAULT_ARCHIVES_BASE: &str = "https://www.sec.gov/Archives/edgar/data";

/// Configuration for one run of the pipeline.
///
/// Built via [`PipelineConfig::builder()`].
///
/// # Example
/// ```rust
/// use edgequake_edgar2pdf::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .user_agent("Example Research jane@example.com")
///     .companies(["Apple", "Netflix"])
///     .concurrency(3)
///     .build()
///     .unwrap();
/// assert_eq!(config.form_type, "10-K");
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Identifying User-Agent with a contact reference. Mandatory.
    ///
    /// SEC's fair-access policy blocks requests without one, so `build()`
    /// refuses to produce a config when it is missing or blank.
    pub user_agent: Option<String>,

    /// Directory receiving `{company}_{form}_{accession}.pdf`. Default: `10k_pdfs`.
    pub output_dir: PathBuf,

    /// Free-text company names to resolve, in processing order.
    pub companies: Vec<String>,

    /// Exact (case-sensitive) form type to keep. Default: `10-K`.
    pub form_type: String,

    /// Maximum concurrently admitted render units. Default: 3.
    ///
    /// Each admitted unit holds an open Chrome tab; more than a handful
    /// of simultaneous navigations tends to stall a single browser process.
    pub concurrency: usize,

    /// Minimum fuzzy similarity for a name match, in (0, 1]. Default: 0.6.
    pub match_threshold: f64,

    /// Registry endpoints. Overridable for mirrors and tests.
    pub endpoints: Endpoints,

    /// Timeout for index and submissions requests in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Pause after each successful submissions fetch in ms. Default: 200.
    ///
    /// Keeps sequential retrieval under SEC's 10 requests/second limit.
    pub request_delay_ms: u64,

    /// Retry behaviour on HTTP 429.
    pub rate_limit: RateLimitPolicy,

    /// Reachability probe (HEAD) timeout in seconds. Default: 10.
    pub probe_timeout_secs: u64,

    /// Browser navigation timeout in seconds. Default: 60.
    pub navigation_timeout_secs: u64,

    /// PDF export options.
    pub pdf: PdfOptions,

    /// Browser launch options.
    pub browser: BrowserOptions,

    /// Optional progress callback for render events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            output_dir: PathBuf::from("10k_pdfs"),
            companies: Vec::new(),
            form_type: "10-K".to_string(),
            concurrency: 3,
            match_threshold: 0.6,
            endpoints: Endpoints::default(),
            request_timeout_secs: 30,
            request_delay_ms: 200,
            rate_limit: RateLimitPolicy::default(),
            probe_timeout_secs: 10,
            navigation_timeout_secs: 60,
            pdf: PdfOptions::default(),
            browser: BrowserOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("user_agent", &self.user_agent)
            .field("output_dir", &self.output_dir)
            .field("companies", &self.companies)
            .field("form_type", &self.form_type)
            .field("concurrency", &self.concurrency)
            .field("match_threshold", &self.match_threshold)
            .field("endpoints", &self.endpoints)
            .field("request_delay_ms", &self.request_delay_ms)
            .field("rate_limit", &self.rate_limit)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("navigation_timeout_secs", &self.navigation_timeout_secs)
            .field("pdf", &self.pdf)
            .field("browser", &self.browser)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RenderProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The validated User-Agent. Fails if absent or blank.
    pub fn require_user_agent(&self) -> Result<&str, EdgarError> {
        match self.user_agent.as_deref().map(str::trim) {
            Some(ua) if !ua.is_empty() => Ok(ua),
            _ => Err(EdgarError::MissingUserAgent),
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn companies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.companies = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn form_type(mut self, form: impl Into<String>) -> Self {
        self.config.form_type = form.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn match_threshold(mut self, t: f64) -> Self {
        self.config.match_threshold = t;
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn request_delay_ms(mut self, ms: u64) -> Self {
        self.config.request_delay_ms = ms;
        self
    }

    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.config.rate_limit = policy;
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs.max(1);
        self
    }

    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.navigation_timeout_secs = secs.max(1);
        self
    }

    pub fn pdf(mut self, pdf: PdfOptions) -> Self {
        self.config.pdf = pdf;
        self
    }

    pub fn browser(mut self, browser: BrowserOptions) -> Self {
        self.config.browser = browser;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, EdgarError> {
        let c = &self.config;
        c.require_user_agent()?;
        if c.concurrency == 0 {
            return Err(EdgarError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if !(c.match_threshold > 0.0 && c.match_threshold <= 1.0) {
            return Err(EdgarError::InvalidConfig(format!(
                "Match threshold must be in (0, 1], got {}",
                c.match_threshold
            )));
        }
        if c.form_type.trim().is_empty() {
            return Err(EdgarError::InvalidConfig("Form type must not be empty".into()));
        }
        if c.rate_limit.initial_backoff_ms > c.rate_limit.max_backoff_ms {
            return Err(EdgarError::InvalidConfig(format!(
                "Rate-limit initial backoff ({}ms) exceeds max backoff ({}ms)",
                c.rate_limit.initial_backoff_ms, c.rate_limit.max_backoff_ms
            )));
        }
        Ok(self.config)
    }
}

// ── Sub-configs ──────────────────────────────────────────────────────────

/// Registry endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Full URL of the ticker/title index JSON.
    pub index_url: String,
    /// Base URL; `/CIK{cik}.json` is appended.
    pub submissions_base: String,
    /// Base URL; `/{cik}/{accession}/{document}` is appended.
    pub archives_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            submissions_base: DEFAULT_SUBMISSIONS_BASE.to_string(),
            archives_base: DEFAULT_ARCHIVES_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Point all three endpoints at one host (mirrors, local test servers).
    pub fn with_host(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            index_url: format!("{base}/files/company_tickers.json"),
            submissions_base: format!("{base}/submissions"),
            archives_base: format!("{base}/Archives/edgar/data"),
        }
    }
}

/// How the retriever backs off on HTTP 429.
///
/// The wait before retry `k` (1-based) is `initial * 2^(k-1)`, capped at
/// `max_backoff_ms`. Setting both to the same value gives a fixed delay.
/// `max_retries = None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_retries: Option<u32>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            max_retries: Some(10),
        }
    }
}

impl RateLimitPolicy {
    /// Same delay before every retry, retrying forever.
    pub fn fixed(delay_ms: u64) -> Self {
        Self {
            initial_backoff_ms: delay_ms,
            max_backoff_ms: delay_ms,
            max_retries: None,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(32);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Whether retry number `retry` (1-based) is still allowed.
    pub fn allows(&self, retry: u32) -> bool {
        self.max_retries.is_none_or(|max| retry <= max)
    }
}

/// Paper size for PDF export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperFormat {
    /// 210 × 297 mm (default).
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
    /// 8.5 × 14 in.
    Legal,
}

impl PaperFormat {
    /// `(width, height)` in inches, portrait.
    pub fn dimensions_inches(self) -> (f64, f64) {
        match self {
            PaperFormat::A4 => (8.27, 11.69),
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
        }
    }
}

/// PDF export options passed to the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfOptions {
    pub format: PaperFormat,
    /// Include CSS backgrounds. Default: true.
    pub print_background: bool,
    pub landscape: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: PaperFormat::A4,
            print_background: true,
            landscape: false,
        }
    }
}

/// Headless browser launch options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserOptions {
    /// Explicit executable. `None` → `CHROME_PATH`, then chromiumoxide's
    /// install detection.
    pub chrome_path: Option<PathBuf>,
    /// Default: true.
    pub headless: bool,
    /// Pass `--no-sandbox` (needed in most containers). Default: true.
    pub no_sandbox: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            no_sandbox: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PipelineConfigBuilder {
        PipelineConfig::builder().user_agent("Test Suite test@example.com")
    }

    #[test]
    fn build_requires_user_agent() {
        let err = PipelineConfig::builder().build().unwrap_err();
        assert!(matches!(err, EdgarError::MissingUserAgent));

        let err = PipelineConfig::builder().user_agent("   ").build().unwrap_err();
        assert!(matches!(err, EdgarError::MissingUserAgent));
    }

    #[test]
    fn defaults_match_registry_conventions() {
        let c = base().build().unwrap();
        assert_eq!(c.concurrency, 3);
        assert_eq!(c.form_type, "10-K");
        assert_eq!(c.match_threshold, 0.6);
        assert_eq!(c.request_delay(), Duration::from_millis(200));
        assert_eq!(c.endpoints.archives_base, DEFAULT_ARCHIVES_BASE);
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        assert!(base().match_threshold(0.0).build().is_err());
        assert!(base().match_threshold(1.5).build().is_err());
        assert!(base().match_threshold(1.0).build().is_ok());
    }

    #[test]
    fn concurrency_is_clamped_to_one() {
        let c = base().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RateLimitPolicy {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 5_000,
            max_retries: Some(4),
        };
        assert_eq!(p.backoff_for(1), Duration::from_millis(1_000));
        assert_eq!(p.backoff_for(2), Duration::from_millis(2_000));
        assert_eq!(p.backoff_for(3), Duration::from_millis(4_000));
        assert_eq!(p.backoff_for(4), Duration::from_millis(5_000));
        assert!(p.allows(4));
        assert!(!p.allows(5));
    }

    #[test]
    fn fixed_policy_never_grows_or_stops() {
        let p = RateLimitPolicy::fixed(1_000);
        assert_eq!(p.backoff_for(1), p.backoff_for(50));
        assert!(p.allows(u32::MAX));
    }

    #[test]
    fn endpoints_with_host_strips_trailing_slash() {
        let e = Endpoints::with_host("http://127.0.0.1:9000/");
        assert_eq!(e.submissions_base, "http://127.0.0.1:9000/submissions");
        assert_eq!(e.index_url, "http://127.0.0.1:9000/files/company_tickers.json");
    }

    #[test]
    fn inverted_backoff_is_rejected() {
        let err = base()
            .rate_limit(RateLimitPolicy {
                initial_backoff_ms: 10,
                max_backoff_ms: 5,
                max_retries: None,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, EdgarError::InvalidConfig(_)));
    }
}
