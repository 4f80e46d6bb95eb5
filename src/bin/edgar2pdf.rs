//! CLI binary for edgequake-edgar2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_edgar2pdf::{
    plan, run, BrowserOptions, CompanyStatus, EdgarClient, PaperFormat, PdfOptions,
    PipelineConfig, ProgressCallback, RateLimitPolicy, RenderOutcome, RenderProgressCallback,
    RenderStatus, RenderTask, RunReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Companies processed when none are given on the command line.
const DEFAULT_COMPANIES: &[&str] = &[
    "Apple",
    "Meta",
    "Alphabet",
    "Amazon",
    "Netflix",
    "Goldman Sachs",
];

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
/// Documents complete out of order, so every line names its file.
struct CliProgressCallback {
    bar: ProgressBar,
    problems: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us how many documents there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving companies and fetching filings…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            problems: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} filings  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.set_message("");
        self.bar.reset_eta();
    }
}

fn file_label(task: &RenderTask) -> String {
    task.destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| task.destination.display().to_string())
}

fn truncate(msg: String) -> String {
    if msg.chars().count() > 80 {
        let cut: String = msg.chars().take(79).collect();
        format!("{cut}\u{2026}")
    } else {
        msg
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_units: usize) {
        self.activate_bar(total_units);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_units} filing(s)…"))
        ));
    }

    fn on_unit_start(&self, task: &RenderTask) {
        self.bar.set_message(format!("{} {}", task.company, task.accession));
    }

    fn on_unit_complete(&self, outcome: &RenderOutcome) {
        let secs = dim(&format!("{:.1}s", outcome.duration_ms as f64 / 1000.0));
        let label = file_label(&outcome.task);
        let line = match &outcome.status {
            RenderStatus::Succeeded { bytes } => format!(
                "  {} {}  {}  {}",
                green("✓"),
                label,
                dim(&format!("{:>6} KiB", bytes / 1024)),
                secs
            ),
            RenderStatus::Skipped { reason } => {
                self.problems.fetch_add(1, Ordering::SeqCst);
                format!(
                    "  {} {}  {}  {}",
                    yellow("↷"),
                    label,
                    yellow(&truncate(reason.to_string())),
                    secs
                )
            }
            RenderStatus::Failed { error } => {
                self.problems.fetch_add(1, Ordering::SeqCst);
                format!(
                    "  {} {}  {}  {}",
                    red("✗"),
                    label,
                    red(&truncate(error.to_string())),
                    secs
                )
            }
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, succeeded: usize, skipped: usize, failed: usize) {
        self.bar.finish_and_clear();
        let total = succeeded + skipped + failed;
        if self.problems.load(Ordering::SeqCst) == 0 {
            eprintln!("{} {} filing(s) saved", green("✔"), bold(&succeeded.to_string()));
        } else {
            eprintln!(
                "{} {}/{} filing(s) saved  ({} skipped, {} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                yellow(&skipped.to_string()),
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default company list into ./10k_pdfs
  edgar2pdf

  # Specific companies, fuzzy names allowed
  edgar2pdf "Apple" "Berkshire Hathaway" "Nvidia"

  # Quarterly reports, five tabs at a time
  edgar2pdf --form-type 10-Q -c 5 Microsoft

  # See what would be rendered without launching a browser
  edgar2pdf --dry-run --json Netflix

  # Machine-readable report of a full run
  edgar2pdf --json Meta > report.json

ENVIRONMENT VARIABLES:
  SEC_USER_AGENT          Required. Name and contact, e.g. "Example Research jane@example.com"
  CHROME_PATH             Chrome/Chromium executable (skips auto-detection)
  EDGAR2PDF_OUTPUT_DIR    Output directory (default: 10k_pdfs)
  EDGAR2PDF_CONCURRENCY   Browser tabs rendering at once (default: 3)
  RUST_LOG                Overrides the log filter

  A .env file in the working directory is loaded before flags are parsed.

SETUP:
  1. Identify yourself:  export SEC_USER_AGENT="Example Research jane@example.com"
  2. Install Chrome or Chromium (or set CHROME_PATH)
  3. Run:                edgar2pdf Apple
"#;

/// Download SEC EDGAR filings as PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "edgar2pdf",
    version,
    about = "Resolve company names to SEC CIKs and save their 10-K filings as PDFs",
    long_about = "Resolve free-text company names against the SEC EDGAR company index, fetch \
each company's recent filings of one form type, and render every filing document to PDF with \
headless Chrome, a few tabs at a time.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Company names. Defaults to a sample of large US issuers.
    companies: Vec<String>,

    /// Identifying User-Agent with contact address (required by SEC).
    #[arg(long, env = "SEC_USER_AGENT", hide_env_values = true)]
    user_agent: Option<String>,

    /// Directory to write PDFs into.
    #[arg(short, long, env = "EDGAR2PDF_OUTPUT_DIR", default_value = "10k_pdfs")]
    output_dir: PathBuf,

    /// Maximum documents rendering at once.
    #[arg(short, long, env = "EDGAR2PDF_CONCURRENCY", default_value_t = 3,
          value_parser = clap::value_parser!(u16).range(1..=32))]
    concurrency: u16,

    /// Form type to keep (exact, case-sensitive).
    #[arg(long, env = "EDGAR2PDF_FORM_TYPE", default_value = "10-K")]
    form_type: String,

    /// Minimum fuzzy name-match score (0–1].
    #[arg(long, env = "EDGAR2PDF_THRESHOLD", default_value_t = 0.6)]
    threshold: f64,

    /// Chrome/Chromium executable. Auto-detected when unset.
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Show the browser window instead of running headless.
    #[arg(long)]
    headed: bool,

    /// Keep Chrome's sandbox enabled (fails in most containers).
    #[arg(long)]
    sandbox: bool,

    /// Paper size for the PDFs.
    #[arg(long, value_enum, default_value = "a4")]
    paper: PaperArg,

    /// Landscape orientation.
    #[arg(long)]
    landscape: bool,

    /// Reachability probe timeout in seconds.
    #[arg(long, default_value_t = 10)]
    probe_timeout: u64,

    /// Page navigation timeout in seconds.
    #[arg(long, default_value_t = 60)]
    nav_timeout: u64,

    /// Registry request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,

    /// Pause after each submissions fetch, in milliseconds.
    #[arg(long, default_value_t = 200)]
    request_delay_ms: u64,

    /// First backoff after HTTP 429, in milliseconds (doubles per retry).
    #[arg(long, default_value_t = 1_000)]
    backoff_ms: u64,

    /// Backoff ceiling after HTTP 429, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    max_backoff_ms: u64,

    /// Retries after HTTP 429 before giving up on a company.
    #[arg(long, default_value_t = 10, conflicts_with = "retry_forever")]
    max_retries: u32,

    /// Retry HTTP 429 indefinitely.
    #[arg(long)]
    retry_forever: bool,

    /// Resolve and list filings without launching a browser.
    #[arg(long)]
    dry_run: bool,

    /// Print the run report (or plan, with --dry-run) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "EDGAR2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EDGAR2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EDGAR2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PaperArg {
    A4,
    Letter,
    Legal,
}

impl From<PaperArg> for PaperFormat {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::A4 => PaperFormat::A4,
            PaperArg::Letter => PaperFormat::Letter,
            PaperArg::Legal => PaperFormat::Legal,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.dry_run;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RenderProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        let client = EdgarClient::from_config(&config).context("Invalid configuration")?;
        let plan = plan(&config, &client).await;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Failed to serialise plan")?
            );
        } else {
            print_companies(&plan.companies);
            for task in &plan.tasks {
                println!("{}  →  {}", task.source_url, task.destination.display());
            }
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run(&config).await.context("Run failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let companies: Vec<String> = if cli.companies.is_empty() {
        DEFAULT_COMPANIES.iter().map(|s| s.to_string()).collect()
    } else {
        cli.companies.clone()
    };

    let mut builder = PipelineConfig::builder()
        .companies(companies)
        .output_dir(&cli.output_dir)
        .concurrency(cli.concurrency as usize)
        .form_type(&cli.form_type)
        .match_threshold(cli.threshold)
        .request_timeout_secs(cli.request_timeout)
        .request_delay_ms(cli.request_delay_ms)
        .probe_timeout_secs(cli.probe_timeout)
        .navigation_timeout_secs(cli.nav_timeout)
        .rate_limit(RateLimitPolicy {
            initial_backoff_ms: cli.backoff_ms,
            max_backoff_ms: cli.max_backoff_ms,
            max_retries: (!cli.retry_forever).then_some(cli.max_retries),
        })
        .pdf(PdfOptions {
            format: cli.paper.into(),
            print_background: true,
            landscape: cli.landscape,
        })
        .browser(BrowserOptions {
            chrome_path: cli.chrome_path.clone(),
            headless: !cli.headed,
            no_sandbox: !cli.sandbox,
        });

    if let Some(ua) = &cli.user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_companies(companies: &[edgequake_edgar2pdf::CompanyReport]) {
    for c in companies {
        match &c.status {
            CompanyStatus::Resolved { cik, title, filings } => eprintln!(
                "  {} {}  {}  {}",
                green("●"),
                bold(&c.company),
                dim(&format!("{cik} {title}")),
                dim(&format!("{filings} filing(s)")),
            ),
            CompanyStatus::NotFound => {
                eprintln!("  {} {}  {}", yellow("○"), bold(&c.company), yellow("not found"))
            }
            CompanyStatus::RetrievalFailed { cik, error } => eprintln!(
                "  {} {}  {}  {}",
                red("●"),
                bold(&c.company),
                dim(&cik.to_string()),
                red(&truncate(error.clone())),
            ),
        }
    }
}

fn print_summary(report: &RunReport, progress_shown: bool) {
    print_companies(&report.companies);

    let s = &report.stats;
    if !progress_shown {
        eprintln!(
            "Saved {}/{} filing(s) ({} skipped, {} failed)",
            s.succeeded, s.filings_found, s.skipped, s.failed
        );
    }
    eprintln!(
        "   {}/{} companies resolved  ·  {}ms total",
        s.companies_resolved, s.companies_requested, s.total_duration_ms,
    );
}
