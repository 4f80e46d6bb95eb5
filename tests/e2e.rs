//! End-to-end tests for edgequake-edgar2pdf.
//!
//! These talk to the live SEC EDGAR endpoints and, for the render tests,
//! launch a real Chrome. They are gated behind `E2E_ENABLED` and need
//! `SEC_USER_AGENT` so they never run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 SEC_USER_AGENT="Your Name you@example.com" \
//!     cargo test --test e2e -- --nocapture --test-threads=1
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_plan_apple -- --nocapture

use edgequake_edgar2pdf::pipeline::index::try_load_company_index;
use edgequake_edgar2pdf::{plan, resolve, CompanyStatus, EdgarClient, PipelineConfig};
#[cfg(feature = "browser")]
use edgequake_edgar2pdf::{RenderStatus, RunReport};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED and SEC_USER_AGENT are both set.
/// Evaluates to the User-Agent.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match std::env::var("SEC_USER_AGENT") {
            Ok(ua) if !ua.trim().is_empty() => ua,
            _ => {
                println!("SKIP: SEC_USER_AGENT is not set");
                return;
            }
        }
    }};
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

fn config(ua: &str, companies: &[&str], output_dir: PathBuf) -> PipelineConfig {
    PipelineConfig::builder()
        .user_agent(ua)
        .companies(companies.iter().copied())
        .output_dir(output_dir)
        .build()
        .expect("valid config")
}

/// Assert every succeeded outcome left a real PDF behind.
#[cfg(feature = "browser")]
fn assert_pdfs_written(report: &RunReport) {
    for outcome in &report.outcomes {
        if let RenderStatus::Succeeded { bytes } = outcome.status {
            let path = &outcome.task.destination;
            let data = std::fs::read(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
            assert_eq!(data.len() as u64, bytes, "{}", path.display());
            assert!(data.starts_with(b"%PDF"), "{} is not a PDF", path.display());
        }
    }
}

// ── Index and resolution (network only) ─────────────────────────────────────

#[tokio::test]
async fn test_index_resolves_well_known_names() {
    let ua = e2e_skip_unless_ready!();
    init_tracing();
    let client = EdgarClient::from_config(&config(&ua, &[], PathBuf::from("unused"))).unwrap();

    let index = try_load_company_index(&client).await.expect("index loads");
    assert!(index.len() > 5_000, "index suspiciously small: {}", index.len());

    let apple = resolve(&index, "Apple", 0.6).expect("Apple resolves");
    assert_eq!(apple.as_str(), "0000320193");
    let netflix = resolve(&index, "Netflix", 0.6).expect("Netflix resolves");
    assert_eq!(netflix.as_str(), "0001065280");
}

#[tokio::test]
async fn test_plan_apple() {
    let ua = e2e_skip_unless_ready!();
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&ua, &["Apple", "Definitely Not A Registrant Xyzzy"], dir.path().into());
    let client = EdgarClient::from_config(&cfg).unwrap();

    let plan = plan(&cfg, &client).await;

    assert!(matches!(plan.companies[0].status, CompanyStatus::Resolved { .. }));
    assert!(matches!(plan.companies[1].status, CompanyStatus::NotFound));
    assert!(!plan.tasks.is_empty(), "Apple should have recent 10-K filings");
    for task in &plan.tasks {
        assert!(task
            .source_url
            .starts_with("https://www.sec.gov/Archives/edgar/data/0000320193/"));
        assert!(task.destination.to_string_lossy().contains("Apple_10K_"));
    }
}

// ── Full run (network + Chrome) ──────────────────────────────────────────────

#[cfg(feature = "browser")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_netflix_renders_pdfs() {
    let ua = e2e_skip_unless_ready!();
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&ua, &["Netflix"], dir.path().join("10k_pdfs"));

    let report = edgequake_edgar2pdf::run(&cfg).await.expect("run completes");

    println!("{}", serde_json::to_string_pretty(&report.stats).unwrap_or_default());
    assert_eq!(report.stats.companies_resolved, 1);
    assert!(report.stats.succeeded >= 1, "no PDF rendered: {:?}", report.outcomes);
    assert_pdfs_written(&report);
}
