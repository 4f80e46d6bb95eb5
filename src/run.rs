//! Run entry points: name list in, PDFs and a [`RunReport`] out.
//!
//! A run has two phases. **Planning** loads the index, resolves each name and
//! fetches its filings one company at a time (the registry is rate limited,
//! so retrieval is deliberately sequential). **Rendering** pushes the
//! resulting tasks through a [`RenderPipeline`].
//!
//! Only setup failures are errors here: a missing User-Agent, an output
//! directory that cannot be created, or a browser that will not start.
//! Everything per-company and per-document ends up in the report.

use crate::client::EdgarClient;
use crate::config::PipelineConfig;
use crate::error::EdgarError;
use crate::output::{CompanyReport, CompanyStatus, RenderTask, RunReport, RunStats};
use crate::pipeline::batch::RenderPipeline;
use crate::pipeline::filings::FilingRetriever;
use crate::pipeline::index::{load_company_index, CompanyIndex};
use crate::pipeline::probe::HttpProbe;
use crate::pipeline::render::{RenderEngine, RenderSettings};
use crate::pipeline::resolve::NameResolver;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Planning output: what each company resolved to and the documents to render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub companies: Vec<CompanyReport>,
    pub tasks: Vec<RenderTask>,
    pub retrieval_duration_ms: u64,
}

/// Run the full pipeline with a headless Chrome launched for this run.
///
/// # Errors
/// Setup failures only (see module docs). The browser is launched after the
/// index is loaded and before any filing is fetched.
#[cfg(feature = "browser")]
pub async fn run(config: &PipelineConfig) -> Result<RunReport, EdgarError> {
    use crate::browser::ChromeEngine;

    let total_start = Instant::now();
    let client = EdgarClient::from_config(config)?;
    prepare_output_dir(&config.output_dir).await?;

    let index = load_company_index(&client).await;
    let engine = Arc::new(ChromeEngine::launch(&config.browser).await?);

    let report = execute(config, &client, &index, engine.clone(), total_start).await;
    engine.shutdown().await;
    Ok(report)
}

/// Run the full pipeline against a caller-supplied engine.
pub async fn run_with_engine(
    config: &PipelineConfig,
    engine: Arc<dyn RenderEngine>,
) -> Result<RunReport, EdgarError> {
    let total_start = Instant::now();
    let client = EdgarClient::from_config(config)?;
    prepare_output_dir(&config.output_dir).await?;

    let index = load_company_index(&client).await;
    Ok(execute(config, &client, &index, engine, total_start).await)
}

/// Blocking wrapper around [`run`]. Creates its own tokio runtime.
#[cfg(feature = "browser")]
pub fn run_sync(config: &PipelineConfig) -> Result<RunReport, EdgarError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| EdgarError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

/// Load the index, resolve every company and fetch its filings, without
/// rendering or touching the output directory.
pub async fn plan(config: &PipelineConfig, client: &EdgarClient) -> Plan {
    let index = load_company_index(client).await;
    plan_with_index(config, client, &index).await
}

/// [`plan`] against an already-loaded index.
pub async fn plan_with_index(
    config: &PipelineConfig,
    client: &EdgarClient,
    index: &CompanyIndex,
) -> Plan {
    let start = Instant::now();
    let resolver = NameResolver::new(config.match_threshold);
    let retriever = FilingRetriever::from_config(client.clone(), config);
    let archives_base = client.endpoints().archives_base.as_str();

    let mut companies = Vec::with_capacity(config.companies.len());
    let mut tasks = Vec::new();

    for company in &config.companies {
        let Some(found) = resolver.find(index, company) else {
            warn!("CIK not found for {}", company);
            companies.push(CompanyReport {
                company: company.clone(),
                status: CompanyStatus::NotFound,
            });
            continue;
        };
        let cik = found.entry.cik.clone();
        info!(
            "Resolved {} → {} ({}, {:?})",
            company, cik, found.entry.title, found.tier
        );

        let status = match retriever.fetch_filings(&cik, &config.form_type).await {
            Ok(filings) => {
                if filings.is_empty() {
                    info!("No {} filings found for {}", config.form_type, company);
                }
                for filing in &filings {
                    let task =
                        RenderTask::for_filing(company, filing, archives_base, &config.output_dir);
                    debug!("Planned {} → {}", task.source_url, task.destination.display());
                    tasks.push(task);
                }
                CompanyStatus::Resolved {
                    cik,
                    title: found.entry.title.clone(),
                    filings: filings.len(),
                }
            }
            Err(e) => {
                error!("Error fetching filings for {}: {}", company, e);
                CompanyStatus::RetrievalFailed {
                    cik,
                    error: e.to_string(),
                }
            }
        };
        companies.push(CompanyReport {
            company: company.clone(),
            status,
        });
    }

    Plan {
        companies,
        tasks: dedup_destinations(tasks),
        retrieval_duration_ms: start.elapsed().as_millis() as u64,
    }
}

async fn execute(
    config: &PipelineConfig,
    client: &EdgarClient,
    index: &CompanyIndex,
    engine: Arc<dyn RenderEngine>,
    total_start: Instant,
) -> RunReport {
    let plan = plan_with_index(config, client, index).await;

    let probe = Arc::new(HttpProbe::new(client.clone(), config.probe_timeout()));
    let mut pipeline = RenderPipeline::new(
        engine,
        probe,
        config.concurrency,
        RenderSettings::from_config(client.user_agent(), config),
    );
    if let Some(cb) = &config.progress_callback {
        pipeline = pipeline.with_progress(Arc::clone(cb));
    }

    let render_start = Instant::now();
    let outcomes = pipeline.render_all(plan.tasks.clone()).await;

    let mut stats = summarize(&plan);
    stats.tally(&outcomes);
    stats.render_duration_ms = render_start.elapsed().as_millis() as u64;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Run complete: {}/{} companies resolved, {} saved, {} skipped, {} failed in {}ms",
        stats.companies_resolved,
        stats.companies_requested,
        stats.succeeded,
        stats.skipped,
        stats.failed,
        stats.total_duration_ms
    );

    RunReport {
        companies: plan.companies,
        outcomes,
        stats,
    }
}

/// Company and retrieval counters for a plan.
pub fn summarize(plan: &Plan) -> RunStats {
    RunStats {
        companies_requested: plan.companies.len(),
        companies_resolved: plan
            .companies
            .iter()
            .filter(|c| !matches!(c.status, CompanyStatus::NotFound))
            .count(),
        filings_found: plan.tasks.len(),
        retrieval_duration_ms: plan.retrieval_duration_ms,
        ..RunStats::default()
    }
}

async fn prepare_output_dir(dir: &Path) -> Result<(), EdgarError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| EdgarError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// Drop later tasks that would write the same file as an earlier one.
fn dedup_destinations(tasks: Vec<RenderTask>) -> Vec<RenderTask> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|t| {
            let fresh = seen.insert(t.destination.clone());
            if !fresh {
                debug!("Duplicate task for {}, ignoring", t.destination.display());
            }
            fresh
        })
        .collect()
}
