//! Headless Chrome rendering engine (feature `browser`).
//!
//! One Chrome process is launched per run and shared by every unit; each
//! unit gets its own tab. chromiumoxide drives Chrome over the DevTools
//! protocol and needs its `Handler` stream polled for the whole lifetime of
//! the browser, so [`ChromeEngine::launch`] spawns that loop onto the
//! runtime and [`ChromeEngine::shutdown`] winds it down.

use crate::config::{BrowserOptions, PdfOptions};
use crate::error::{EdgarError, RenderError};
use crate::pipeline::render::{RenderEngine, RenderSurface};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, PrintToPdfParams};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle event Chrome fires once no more than two network connections
/// have been open for 500 ms.
const NETWORK_ALMOST_IDLE: &str = "networkAlmostIdle";

/// A running Chrome instance.
pub struct ChromeEngine {
    browser: Mutex<Browser>,
    handler: Mutex<Option<JoinHandle<()>>>,
    executable: PathBuf,
}

impl ChromeEngine {
    /// Launch Chrome. Uses `options.chrome_path` when set, otherwise
    /// [`chrome_locate::locate_chrome`]. An explicit path that is not a file
    /// fails before anything is spawned.
    ///
    /// # Errors
    /// [`EdgarError::BrowserNotFound`] or [`EdgarError::BrowserLaunch`]; both
    /// are fatal to the run.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, EdgarError> {
        let executable = match &options.chrome_path {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                return Err(EdgarError::BrowserLaunch(format!(
                    "no executable at '{}'",
                    path.display()
                )));
            }
            None => chrome_locate::locate_chrome()?,
        };
        info!("Launching Chrome: {}", executable.display());

        let mut builder = BrowserConfig::builder().chrome_executable(&executable);
        if !options.headless {
            builder = builder.with_head();
        }
        if options.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(EdgarError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| EdgarError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler: {}", e);
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler: Mutex::new(Some(handler)),
            executable,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Close the browser and stop the handler loop. Idempotent.
    pub async fn shutdown(&self) {
        let Some(mut handler) = self.handler.lock().await.take() else {
            return;
        };

        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("Error closing browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Error waiting for browser exit: {}", e);
        }

        if tokio::time::timeout(Duration::from_secs(5), &mut handler)
            .await
            .is_err()
        {
            handler.abort();
        }
        info!("Browser closed");
    }
}

#[async_trait]
impl RenderEngine for ChromeEngine {
    async fn open_surface(&self) -> Result<Box<dyn RenderSurface>, RenderError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::SurfaceUnavailable {
                detail: e.to_string(),
            })?;
        Ok(Box::new(ChromePage { page: Some(page) }))
    }
}

/// Tracks main-frame lifecycle events for one navigation. Only an idle
/// event that follows the navigation's `init` counts; the blank page the tab
/// opened on can report idle too.
#[derive(Debug)]
struct IdleWatch {
    main_frame: Option<String>,
    started: bool,
}

impl IdleWatch {
    fn new(main_frame: Option<&str>) -> Self {
        Self {
            main_frame: main_frame.map(str::to_string),
            started: false,
        }
    }

    /// Feed one event; `true` once the main frame is network-idle.
    fn observe(&mut self, frame_id: &str, name: &str) -> bool {
        if self.main_frame.as_deref().is_some_and(|main| main != frame_id) {
            return false;
        }
        match name {
            "init" => {
                self.started = true;
                false
            }
            NETWORK_ALMOST_IDLE => self.started,
            _ => false,
        }
    }
}

/// One Chrome tab.
struct ChromePage {
    page: Option<Page>,
}

impl ChromePage {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page.as_ref().ok_or_else(|| RenderError::SurfaceUnavailable {
            detail: "page already closed".into(),
        })
    }
}

#[async_trait]
impl RenderSurface for ChromePage {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
        self.page()?
            .set_user_agent(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| RenderError::SurfaceUnavailable {
                detail: format!("set user agent: {e}"),
            })?;
        Ok(())
    }

    /// Navigate and wait for the main frame to go network-idle. The caller
    /// bounds the wait.
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let navigation = |e: chromiumoxide::error::CdpError| RenderError::Navigation {
            url: url.to_string(),
            detail: e.to_string(),
        };
        let page = self.page()?;

        // Subscribe first so events fired while `goto` is pending are kept.
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(navigation)?;
        page.goto(url).await.map_err(navigation)?;
        let main_frame = page.mainframe().await.map_err(navigation)?;

        let mut watch = IdleWatch::new(main_frame.as_ref().map(|id| id.inner().as_str()));
        while let Some(event) = lifecycle.next().await {
            if watch.observe(event.frame_id.inner(), &event.name) {
                debug!("Network idle: {}", url);
                return Ok(());
            }
        }
        Err(RenderError::Navigation {
            url: url.to_string(),
            detail: "page closed before the network went idle".into(),
        })
    }

    async fn export_pdf(&mut self, path: &Path, options: &PdfOptions) -> Result<(), RenderError> {
        let (width, height) = options.format.dimensions_inches();
        let params = PrintToPdfParams {
            print_background: Some(options.print_background),
            landscape: Some(options.landscape),
            paper_width: Some(width),
            paper_height: Some(height),
            ..Default::default()
        };
        self.page()?
            .save_pdf(params, path)
            .await
            .map_err(|e| RenderError::Export {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!("Error closing page: {}", e);
            }
        }
    }
}
