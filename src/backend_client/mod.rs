//! BackendClient - Inspection Backend HTTP Adapter
//!
//! ## Responsibilities
//!
//! - NOK history list fetch
//! - Resource URL derivation (NOK images, MJPEG camera stream)
//! - PLC status probe
//! - Conveyor run/stop command
//!
//! The `PanelBackend` trait is the seam the history cache and the dashboard
//! depend on, so they can run against a stub without a live network.

use crate::error::{Error, Result};
use crate::models::{ConveyorCommand, NokItem, PlcSnapshot};
use std::future::Future;
use std::time::Duration;

/// Backend operations the panel core consumes
pub trait PanelBackend: Send + Sync + 'static {
    /// Most recent NOK records, newest first
    fn nok_list(&self, limit: usize) -> impl Future<Output = Result<Vec<NokItem>>> + Send;

    /// Run or stop the conveyor; `Ok(())` only on a success status
    fn set_conveyor_state(&self, on: bool) -> impl Future<Output = Result<()>> + Send;

    /// Locator of a NOK image (no network call)
    fn nok_image_url(&self, name: &str) -> String;

    /// Locator of the live MJPEG feed (no network call)
    fn camera_stream_url(&self) -> String;
}

/// HTTP client for the inspection backend
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create new client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current controller state via `GET /api/plc/status`
    pub async fn plc_status(&self) -> Result<PlcSnapshot> {
        let endpoint = "/api/plc/status";
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, endpoint))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Status {
                endpoint: endpoint.to_string(),
                status: resp.status(),
            });
        }

        Ok(resp.json().await?)
    }
}

impl PanelBackend for BackendClient {
    async fn nok_list(&self, limit: usize) -> Result<Vec<NokItem>> {
        let endpoint = "/api/nok/list";
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, endpoint))
            .query(&[("limit", limit)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Status {
                endpoint: endpoint.to_string(),
                status: resp.status(),
            });
        }

        let items: Vec<NokItem> = resp.json().await?;
        tracing::debug!(limit = limit, count = items.len(), "Fetched NOK list");
        Ok(items)
    }

    async fn set_conveyor_state(&self, on: bool) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/api/plc/conv/run", self.base_url))
            .json(&ConveyorCommand { on })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::CommandRejected(format!(
                "conveyor on={} answered {}",
                on, status
            )));
        }

        tracing::info!(on = on, "Conveyor command accepted");
        Ok(())
    }

    fn nok_image_url(&self, name: &str) -> String {
        format!("{}/api/nok/{}", self.base_url, urlencoding::encode(name))
    }

    fn camera_stream_url(&self) -> String {
        format!("{}/api/stream.mjpg", self.base_url)
    }
}
