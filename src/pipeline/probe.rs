//! Reachability probe run before a document is rendered.

use crate::client::EdgarClient;
use crate::error::RenderError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Lightweight existence check for a document URL.
///
/// `Err` means the unit is skipped; no rendering surface is opened.
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn check(&self, url: &str) -> Result<(), RenderError>;
}

/// HEAD request through the shared [`EdgarClient`], so the probe carries the
/// same User-Agent as every other registry call. Redirects are followed and
/// only a final `200 OK` counts as reachable.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: EdgarClient,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(client: EdgarClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Reachability for HttpProbe {
    async fn check(&self, url: &str) -> Result<(), RenderError> {
        match self.client.head(url, self.timeout).await {
            Ok(StatusCode::OK) => {
                debug!("Reachable: {}", url);
                Ok(())
            }
            Ok(status) => Err(RenderError::Unreachable {
                url: url.to_string(),
                status: Some(status.as_u16()),
                detail: format!("HTTP {status}"),
            }),
            Err(e) => Err(RenderError::Unreachable {
                url: url.to_string(),
                status: None,
                detail: if e.is_timeout() {
                    format!("timed out after {}s", self.timeout.as_secs())
                } else {
                    e.to_string()
                },
            }),
        }
    }
}
