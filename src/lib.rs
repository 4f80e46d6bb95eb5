//! # edgequake-edgar2pdf
//!
//! Turn a list of company names into PDFs of their SEC EDGAR annual reports.
//!
//! ## Pipeline Overview
//!
//! ```text
//! company names
//!  │
//!  ├─ 1. Index    fetch company_tickers.json (CIK ↔ ticker ↔ title)
//!  ├─ 2. Resolve  exact → whole-word → fuzzy name match → CIK
//!  ├─ 3. Filings  submissions/CIK##########.json, 429 backoff, form filter
//!  ├─ 4. URL      Archives/edgar/data/{cik}/{accession}/{document}
//!  ├─ 5. Render   HEAD probe, then headless Chrome → PDF, N tabs at a time
//!  └─ 6. Report   per-company status, per-document outcome, run stats
//! ```
//!
//! Per-company and per-document failures never abort the run; they are
//! logged and recorded in the [`RunReport`]. Only setup problems (no
//! User-Agent, unusable output directory, browser will not start) are errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_edgar2pdf::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .user_agent("Example Research jane@example.com")
//!         .companies(["Apple", "Netflix"])
//!         .output_dir("10k_pdfs")
//!         .build()?;
//!     let report = run(&config).await?;
//!     eprintln!("{} saved, {} skipped, {} failed",
//!         report.stats.succeeded, report.stats.skipped, report.stats.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `browser` | via cli | Built-in [`ChromeEngine`] (chromiumoxide) and [`run`] |
//! | `cli`     | on      | Enables the `edgar2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Without `browser`, supply your own [`RenderEngine`] to [`run_with_engine`]:
//! ```toml
//! edgequake-edgar2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Registry etiquette
//!
//! SEC EDGAR rejects anonymous clients and allows about 10 requests per
//! second. A descriptive User-Agent with a contact address is mandatory, and
//! retrieval pauses after every submissions fetch and backs off on HTTP 429.

// ── Modules ──────────────────────────────────────────────────────────────

#[cfg(feature = "browser")]
pub mod browser;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

#[cfg(feature = "browser")]
pub use browser::ChromeEngine;
pub use client::EdgarClient;
pub use config::{
    BrowserOptions, Endpoints, PaperFormat, PdfOptions, PipelineConfig, PipelineConfigBuilder,
    RateLimitPolicy,
};
pub use error::{EdgarError, RenderError};
pub use output::{
    CompanyReport, CompanyStatus, RenderOutcome, RenderStatus, RenderTask, RunReport, RunStats,
};
pub use pipeline::batch::RenderPipeline;
pub use pipeline::filings::{Filing, FilingRetriever};
pub use pipeline::index::{Cik, CompanyIndex, IndexEntry};
pub use pipeline::render::{RenderEngine, RenderSurface};
pub use pipeline::resolve::{resolve, NameResolver};
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
#[cfg(feature = "browser")]
pub use run::{run, run_sync};
pub use run::{plan, run_with_engine, Plan};
