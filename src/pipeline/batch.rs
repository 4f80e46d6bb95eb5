//! Bounded-concurrency batch rendering.
//!
//! Each unit goes `queued → admitted → checking → (skipped | rendering →
//! (succeeded | failed))`. A counting gate admits at most `concurrency`
//! units into the probe + render section. The permit is an RAII guard held
//! from before the probe until the unit is terminal, so it is released on
//! every path including an early skip.
//!
//! Units never fail the batch: every error is folded into the unit's
//! [`RenderOutcome`], and [`RenderPipeline::render_all`] returns only after
//! every submitted unit is terminal.

use crate::error::RenderError;
use crate::output::{RenderOutcome, RenderStatus, RenderTask, RunStats};
use crate::pipeline::probe::Reachability;
use crate::pipeline::render::{render_document, RenderEngine, RenderSettings};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use futures::stream::{FuturesUnordered, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_stream::Stream;
use tracing::{error, info, warn};

/// A boxed stream of outcomes in completion order.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = RenderOutcome> + Send>>;

/// Renders batches of [`RenderTask`]s against one shared engine.
///
/// Cheap to clone; clones share the engine, probe and admission gate.
#[derive(Clone)]
pub struct RenderPipeline {
    engine: Arc<dyn RenderEngine>,
    probe: Arc<dyn Reachability>,
    gate: Arc<Semaphore>,
    concurrency: usize,
    settings: Arc<RenderSettings>,
    progress: ProgressCallback,
}

impl RenderPipeline {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        probe: Arc<dyn Reachability>,
        concurrency: usize,
        settings: RenderSettings,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            engine,
            probe,
            gate: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            settings: Arc::new(settings),
            progress: Arc::new(NoopProgressCallback),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Render every task and wait for all of them.
    ///
    /// Outcomes are in completion order.
    pub async fn render_all(&self, tasks: Vec<RenderTask>) -> Vec<RenderOutcome> {
        let total = tasks.len();
        info!("Rendering {} document(s), {} at a time", total, self.concurrency);
        self.progress.on_batch_start(total);

        let outcomes: Vec<RenderOutcome> = self.render_stream(tasks).collect().await;

        let mut stats = RunStats::default();
        stats.tally(&outcomes);
        self.progress
            .on_batch_complete(stats.succeeded, stats.skipped, stats.failed);
        info!(
            "Batch complete: {} succeeded, {} skipped, {} failed",
            stats.succeeded, stats.skipped, stats.failed
        );
        outcomes
    }

    /// Render every task, yielding each outcome as it completes.
    ///
    /// Units only make progress while the stream is polled. Batch-level
    /// progress events are not emitted; see [`render_all`](Self::render_all).
    pub fn render_stream(&self, tasks: Vec<RenderTask>) -> OutcomeStream {
        let units: FuturesUnordered<_> = tasks
            .into_iter()
            .map(|task| {
                let pipeline = self.clone();
                async move { pipeline.render_unit(task).await }
            })
            .collect();
        Box::pin(units)
    }

    /// Run one unit to a terminal state.
    pub async fn render_unit(&self, task: RenderTask) -> RenderOutcome {
        let _permit = match Arc::clone(&self.gate).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                let error = RenderError::Admission {
                    detail: e.to_string(),
                };
                error!("{}: {}", task.destination.display(), error);
                return self.finish(task, RenderStatus::Failed { error }, Instant::now());
            }
        };

        let start = Instant::now();
        self.progress.on_unit_start(&task);

        let status = match self.probe.check(&task.source_url).await {
            Err(reason) => {
                warn!("Skipping {}: {}", task.source_url, reason);
                RenderStatus::Skipped { reason }
            }
            Ok(()) => match render_document(self.engine.as_ref(), &task, &self.settings).await {
                Ok(bytes) => {
                    info!("Saved PDF: {} ({} bytes)", task.destination.display(), bytes);
                    RenderStatus::Succeeded { bytes }
                }
                Err(error) => {
                    error!("Error rendering {}: {}", task.source_url, error);
                    RenderStatus::Failed { error }
                }
            },
        };

        self.finish(task, status, start)
    }

    fn finish(&self, task: RenderTask, status: RenderStatus, start: Instant) -> RenderOutcome {
        let outcome = RenderOutcome {
            task,
            status,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        self.progress.on_unit_complete(&outcome);
        outcome
    }

    /// Close the gate; units not yet admitted fail with
    /// [`RenderError::Admission`]. Units already admitted run to completion.
    pub fn close(&self) {
        self.gate.close();
    }
}
