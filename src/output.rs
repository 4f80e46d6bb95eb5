//! Result types: render tasks, per-unit outcomes and the run report.
//!
//! Everything here is `Serialize` so the CLI can emit a whole run as JSON
//! with `--json`.

use crate::error::RenderError;
use crate::pipeline::filings::Filing;
use crate::pipeline::index::Cik;
use crate::pipeline::url::document_url;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One document to render: where to fetch it and where to write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTask {
    /// Company name as requested (used in the file name).
    pub company: String,
    pub form_type: String,
    /// Accession number with separators stripped.
    pub accession: String,
    pub source_url: String,
    pub destination: PathBuf,
}

impl RenderTask {
    /// Build the task for `filing`, requested under the name `company`.
    pub fn for_filing(
        company: &str,
        filing: &Filing,
        archives_base: &str,
        output_dir: &Path,
    ) -> Self {
        let accession = filing.accession_compact();
        let file_name = artifact_file_name(company, &filing.form, &accession);
        Self {
            company: company.to_string(),
            form_type: filing.form.clone(),
            accession,
            source_url: document_url(archives_base, filing),
            destination: output_dir.join(file_name),
        }
    }
}

static RE_UNSAFE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap());

/// `{company}_{form}_{accession}.pdf`.
///
/// Characters that are not valid in file names on common platforms become
/// `_`. The form label keeps only alphanumerics, so `10-K` becomes `10K`.
pub fn artifact_file_name(company: &str, form_type: &str, accession: &str) -> String {
    let company = RE_UNSAFE_FILENAME.replace_all(company.trim(), "_");
    let form: String = form_type.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    format!("{company}_{form}_{accession}.pdf")
}

/// Terminal state of one render unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderStatus {
    /// PDF written to `task.destination`.
    Succeeded { bytes: u64 },
    /// Reachability check failed; nothing rendered.
    Skipped { reason: RenderError },
    /// Rendering started and failed; no artifact left behind.
    Failed { error: RenderError },
}

impl RenderStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RenderStatus::Succeeded { .. })
    }
}

/// The result of one render unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutcome {
    pub task: RenderTask,
    #[serde(flatten)]
    pub status: RenderStatus,
    /// Time from admission to terminal state.
    pub duration_ms: u64,
}

/// What happened to one requested company before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompanyStatus {
    /// Resolved and retrieved; `filings` matched the form type.
    Resolved { cik: Cik, title: String, filings: usize },
    /// No index entry matched the name.
    NotFound,
    /// The submissions fetch failed for this company only.
    RetrievalFailed { cik: Cik, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyReport {
    pub company: String,
    #[serde(flatten)]
    pub status: CompanyStatus,
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub companies_requested: usize,
    pub companies_resolved: usize,
    pub filings_found: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub retrieval_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl RunStats {
    /// Fill the render counters from `outcomes`.
    pub fn tally(&mut self, outcomes: &[RenderOutcome]) {
        self.succeeded = 0;
        self.skipped = 0;
        self.failed = 0;
        for o in outcomes {
            match o.status {
                RenderStatus::Succeeded { .. } => self.succeeded += 1,
                RenderStatus::Skipped { .. } => self.skipped += 1,
                RenderStatus::Failed { .. } => self.failed += 1,
            }
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub companies: Vec<CompanyReport>,
    /// In completion order, not submission order.
    pub outcomes: Vec<RenderOutcome>,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filing() -> Filing {
        Filing {
            cik: Cik::new("320193").unwrap(),
            form: "10-K".into(),
            accession_number: "0000320193-24-000123".into(),
            primary_document: "aapl-20240928.htm".into(),
            filing_date: None,
            report_date: None,
        }
    }

    #[test]
    fn file_name_matches_historical_layout() {
        assert_eq!(
            artifact_file_name("Apple", "10-K", "000032019324000123"),
            "Apple_10K_000032019324000123.pdf"
        );
    }

    #[test]
    fn file_name_replaces_path_separators() {
        let name = artifact_file_name("AT&T / Old: Co", "10-K/A", "1");
        assert_eq!(name, "AT&T _ Old_ Co_10KA_1.pdf");
        assert!(!name.contains('/'));
    }

    #[test]
    fn task_for_filing_wires_url_and_destination() {
        let task = RenderTask::for_filing(
            "Goldman Sachs",
            &filing(),
            "https://www.sec.gov/Archives/edgar/data",
            Path::new("out"),
        );
        assert_eq!(
            task.source_url,
            "https://www.sec.gov/Archives/edgar/data/0000320193/000032019324000123/aapl-20240928.htm"
        );
        assert_eq!(
            task.destination,
            PathBuf::from("out/Goldman Sachs_10K_000032019324000123.pdf")
        );
        assert_eq!(task.accession, "000032019324000123");
    }

    #[test]
    fn tally_counts_each_terminal_state() {
        let task = RenderTask::for_filing("A", &filing(), "http://x", Path::new("o"));
        let err = RenderError::SurfaceUnavailable { detail: "x".into() };
        let outcomes = vec![
            RenderOutcome {
                task: task.clone(),
                status: RenderStatus::Succeeded { bytes: 1 },
                duration_ms: 0,
            },
            RenderOutcome {
                task: task.clone(),
                status: RenderStatus::Skipped { reason: err.clone() },
                duration_ms: 0,
            },
            RenderOutcome {
                task,
                status: RenderStatus::Failed { error: err },
                duration_ms: 0,
            },
        ];
        let mut stats = RunStats::default();
        stats.tally(&outcomes);
        assert_eq!((stats.succeeded, stats.skipped, stats.failed), (1, 1, 1));
    }
}
