//! The registry HTTP client.
//!
//! SEC EDGAR identifies callers by User-Agent and blocks anonymous traffic,
//! so the header is set once on the client and every request site (index
//! fetch, submissions fetch, reachability probe) receives this value
//! explicitly. Nothing reads headers from process-global state.

use crate::config::{Endpoints, PipelineConfig};
use crate::error::EdgarError;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// HTTP client preconfigured with the identifying User-Agent and endpoints.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct EdgarClient {
    http: reqwest::Client,
    user_agent: String,
    endpoints: Endpoints,
    request_timeout_secs: u64,
}

impl EdgarClient {
    /// Build a client. Fails on a blank or non-header-safe `user_agent`.
    pub fn new(
        user_agent: &str,
        endpoints: Endpoints,
        request_timeout_secs: u64,
    ) -> Result<Self, EdgarError> {
        let user_agent = user_agent.trim();
        if user_agent.is_empty() {
            return Err(EdgarError::MissingUserAgent);
        }

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| EdgarError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            user_agent: user_agent.to_string(),
            endpoints,
            request_timeout_secs,
        })
    }

    /// Build from a validated [`PipelineConfig`].
    pub fn from_config(config: &PipelineConfig) -> Result<Self, EdgarError> {
        Self::new(
            config.require_user_agent()?,
            config.endpoints.clone(),
            config.request_timeout_secs,
        )
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// GET `url` with the registry request timeout. Any status is returned;
    /// only transport failures are errors.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, EdgarError> {
        debug!("GET {}", url);
        self.http
            .get(url)
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .send()
            .await
            .map_err(|e| EdgarError::from_reqwest(url, e, self.request_timeout_secs))
    }

    /// HEAD `url`, following redirects, with its own timeout.
    pub async fn head(&self, url: &str, timeout: Duration) -> Result<StatusCode, reqwest::Error> {
        debug!("HEAD {}", url);
        let response = self.http.head(url).timeout(timeout).send().await?;
        Ok(response.status())
    }
}
