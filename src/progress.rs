//! Progress-callback trait for per-document render events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the batch. Callers can forward them
//! to a terminal progress bar, a channel or a log sink; the library does not
//! care which.
//!
//! # Example
//!
//! ```rust
//! use edgequake_edgar2pdf::{PipelineConfig, RenderOutcome, RenderProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     finished: AtomicUsize,
//! }
//!
//! impl RenderProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, outcome: &RenderOutcome) {
//!         let done = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}: {}", outcome.task.destination.display());
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { finished: AtomicUsize::new(0) });
//! let config = PipelineConfig::builder()
//!     .user_agent("Example Research jane@example.com")
//!     .progress_callback(cb as Arc<dyn RenderProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{RenderOutcome, RenderTask};
use std::sync::Arc;

/// Called by the rendering pipeline as it processes each unit.
///
/// Units run concurrently, so `on_unit_start` and `on_unit_complete` may be
/// called from different tasks at the same time. Protect shared mutable
/// state accordingly. Every method defaults to a no-op.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once before any unit is admitted.
    fn on_batch_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called when a unit passes the admission gate.
    fn on_unit_start(&self, task: &RenderTask) {
        let _ = task;
    }

    /// Called when a unit reaches a terminal state.
    fn on_unit_complete(&self, outcome: &RenderOutcome) {
        let _ = outcome;
    }

    /// Called once after every unit has reached a terminal state.
    fn on_batch_complete(&self, succeeded: usize, skipped: usize, failed: usize) {
        let _ = (succeeded, skipped, failed);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RenderStatus;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        batch_total: AtomicUsize,
    }

    impl RenderProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_units: usize) {
            self.batch_total.store(total_units, Ordering::SeqCst);
        }

        fn on_unit_start(&self, _task: &RenderTask) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_complete(&self, _outcome: &RenderOutcome) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn task() -> RenderTask {
        RenderTask {
            company: "Apple".into(),
            form_type: "10-K".into(),
            accession: "000032019324000123".into(),
            source_url: "https://www.sec.gov/a.htm".into(),
            destination: PathBuf::from("out/Apple_10K_000032019324000123.pdf"),
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_unit_start(&task());
        cb.on_unit_complete(&RenderOutcome {
            task: task(),
            status: RenderStatus::Succeeded { bytes: 10 },
            duration_ms: 1,
        });
        cb.on_batch_complete(1, 0, 0);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(2);
        tracker.on_unit_start(&task());
        tracker.on_unit_complete(&RenderOutcome {
            task: task(),
            status: RenderStatus::Succeeded { bytes: 10 },
            duration_ms: 1,
        });

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
    }
}
