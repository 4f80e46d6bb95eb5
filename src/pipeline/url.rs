//! Registry URL construction.

use crate::pipeline::filings::Filing;
use crate::pipeline::index::Cik;

/// `{archives_base}/{cik}/{accession without dashes}/{primary document}`.
///
/// The CIK keeps its zero padding; the archive resolves both forms. The
/// primary document is appended verbatim.
pub fn document_url(archives_base: &str, filing: &Filing) -> String {
    format!(
        "{}/{}/{}/{}",
        archives_base.trim_end_matches('/'),
        filing.cik,
        filing.accession_compact(),
        filing.primary_document
    )
}

/// `{submissions_base}/CIK{cik}.json`.
pub fn submissions_url(submissions_base: &str, cik: &Cik) -> String {
    format!("{}/CIK{}.json", submissions_base.trim_end_matches('/'), cik)
}
