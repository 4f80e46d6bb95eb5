//! Rendering one document to PDF through a headless engine.
//!
//! [`RenderEngine`] is the single shared browser instance; [`RenderSurface`]
//! is one isolated page/tab opened per unit. The engine is behind a trait so
//! the batch logic runs unchanged against Chrome or a test double.
//!
//! ## Writing the artifact
//!
//! The surface exports to `<destination>.tmp`, which is renamed into place
//! only after a non-empty export. Any failure removes the partial file, so a
//! failed unit never leaves a truncated PDF under the final name.

use crate::config::{PdfOptions, PipelineConfig};
use crate::error::RenderError;
use crate::output::RenderTask;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// A long-lived rendering engine shared by every unit of a batch.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Open a fresh, isolated surface (a browser tab).
    async fn open_surface(&self) -> Result<Box<dyn RenderSurface>, RenderError>;
}

/// One page/tab. Owned by exactly one unit and closed by it.
#[async_trait]
pub trait RenderSurface: Send {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError>;

    /// Load `url` and wait until the network is idle. The caller bounds the
    /// call with the navigation timeout.
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Print the loaded page to a PDF at `path`.
    async fn export_pdf(&mut self, path: &Path, options: &PdfOptions) -> Result<(), RenderError>;

    /// Release the surface. Must not fail; problems are logged.
    async fn close(&mut self);
}

/// Per-unit settings shared by a batch.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub user_agent: String,
    pub navigation_timeout: Duration,
    pub pdf: PdfOptions,
}

impl RenderSettings {
    pub fn from_config(user_agent: &str, config: &PipelineConfig) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            navigation_timeout: config.navigation_timeout(),
            pdf: config.pdf,
        }
    }
}

/// Open a surface, render `task`, and close the surface on every path.
///
/// Returns the size of the written PDF in bytes.
pub async fn render_document(
    engine: &dyn RenderEngine,
    task: &RenderTask,
    settings: &RenderSettings,
) -> Result<u64, RenderError> {
    let mut surface = engine.open_surface().await?;
    let result = drive_surface(surface.as_mut(), task, settings).await;
    surface.close().await;
    result
}

async fn drive_surface(
    surface: &mut dyn RenderSurface,
    task: &RenderTask,
    settings: &RenderSettings,
) -> Result<u64, RenderError> {
    surface.set_user_agent(&settings.user_agent).await?;

    debug!("Navigating to {}", task.source_url);
    let navigation = surface.navigate(&task.source_url);
    match tokio::time::timeout(settings.navigation_timeout, navigation).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(RenderError::NavigationTimeout {
                url: task.source_url.clone(),
                secs: settings.navigation_timeout.as_secs(),
            });
        }
    }

    let partial = partial_path(&task.destination);
    let written = match surface.export_pdf(&partial, &settings.pdf).await {
        Ok(()) => commit(&partial, &task.destination).await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        discard(&partial).await;
    }
    written
}

/// `<destination>.tmp`.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

async fn commit(partial: &Path, destination: &Path) -> Result<u64, RenderError> {
    let export_error = |detail: String| RenderError::Export {
        path: destination.display().to_string(),
        detail,
    };

    let bytes = tokio::fs::metadata(partial)
        .await
        .map_err(|e| export_error(format!("no output written: {e}")))?
        .len();
    if bytes == 0 {
        return Err(export_error("empty PDF".into()));
    }
    tokio::fs::rename(partial, destination)
        .await
        .map_err(|e| export_error(e.to_string()))?;
    Ok(bytes)
}

async fn discard(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => debug!("Removed partial export {}", partial.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial export {}: {}", partial.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy, PartialEq)]
    enum Behaviour {
        Ok,
        Hang,
        NavigationError,
        ExportError,
        EmptyExport,
    }

    struct TestEngine {
        behaviour: Behaviour,
        closed: Arc<AtomicUsize>,
        user_agents: Arc<Mutex<Vec<String>>>,
    }

    impl TestEngine {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                closed: Arc::default(),
                user_agents: Arc::default(),
            }
        }
    }

    struct TestSurface {
        behaviour: Behaviour,
        closed: Arc<AtomicUsize>,
        user_agents: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RenderEngine for TestEngine {
        async fn open_surface(&self) -> Result<Box<dyn RenderSurface>, RenderError> {
            Ok(Box::new(TestSurface {
                behaviour: self.behaviour,
                closed: Arc::clone(&self.closed),
                user_agents: Arc::clone(&self.user_agents),
            }))
        }
    }

    #[async_trait]
    impl RenderSurface for TestSurface {
        async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
            self.user_agents.lock().unwrap().push(user_agent.to_string());
            Ok(())
        }

        async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
            match self.behaviour {
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                }
                Behaviour::NavigationError => Err(RenderError::Navigation {
                    url: url.to_string(),
                    detail: "net::ERR_NAME_NOT_RESOLVED".into(),
                }),
                _ => Ok(()),
            }
        }

        async fn export_pdf(
            &mut self,
            path: &Path,
            _options: &PdfOptions,
        ) -> Result<(), RenderError> {
            match self.behaviour {
                Behaviour::ExportError => {
                    tokio::fs::write(path, b"%PDF-1.7 trunc").await.unwrap();
                    Err(RenderError::Export {
                        path: path.display().to_string(),
                        detail: "printToPDF failed".into(),
                    })
                }
                Behaviour::EmptyExport => {
                    tokio::fs::write(path, b"").await.unwrap();
                    Ok(())
                }
                _ => {
                    tokio::fs::write(path, b"%PDF-1.7 test").await.unwrap();
                    Ok(())
                }
            }
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn settings(timeout: Duration) -> RenderSettings {
        RenderSettings {
            user_agent: "Test Suite test@example.com".into(),
            navigation_timeout: timeout,
            pdf: PdfOptions::default(),
        }
    }

    fn task(dir: &Path) -> RenderTask {
        RenderTask {
            company: "Apple".into(),
            form_type: "10-K".into(),
            accession: "000032019324000123".into(),
            source_url: "https://www.sec.gov/a.htm".into(),
            destination: dir.join("Apple_10K_000032019324000123.pdf"),
        }
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("out/Apple_10K_1.pdf")),
            PathBuf::from("out/Apple_10K_1.pdf.tmp")
        );
    }

    #[tokio::test]
    async fn success_writes_final_file_and_closes_surface() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TestEngine::new(Behaviour::Ok);
        let t = task(dir.path());

        let bytes = render_document(&engine, &t, &settings(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(bytes, b"%PDF-1.7 test".len() as u64);
        assert!(t.destination.exists());
        assert!(!partial_path(&t.destination).exists());
        assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            engine.user_agents.lock().unwrap().as_slice(),
            ["Test Suite test@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn navigation_timeout_fails_and_closes_surface() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TestEngine::new(Behaviour::Hang);
        let t = task(dir.path());

        let err = render_document(&engine, &t, &settings(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::NavigationTimeout { .. }), "got {err:?}");
        assert!(!t.destination.exists());
        assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn navigation_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TestEngine::new(Behaviour::NavigationError);
        let err = render_document(&engine, &task(dir.path()), &settings(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Navigation { .. }));
        assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_export_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let t = task(dir.path());

        for behaviour in [Behaviour::ExportError, Behaviour::EmptyExport] {
            let engine = TestEngine::new(behaviour);
            let err = render_document(&engine, &t, &settings(Duration::from_secs(5)))
                .await
                .unwrap_err();
            assert!(matches!(err, RenderError::Export { .. }));
            assert!(!t.destination.exists());
            assert!(!partial_path(&t.destination).exists());
            assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
        }
    }
}
