//! Typed client for the probe and central server JSON endpoints

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{DashboardError, Result};
use crate::io::HttpClient;
use crate::model::{ErrorPayload, GlobalStatistics, Host, Probe, ProbeLogs, Report, SiteStatus};

/// Resource paths served by the probe and central servers
pub mod endpoints {
    pub const STATUS: &str = "/api/status";
    pub const REPORT: &str = "/api/report";
    pub const HOSTS: &str = "/api/hosts";
    pub const PROBES: &str = "/api/probes";
    pub const STATISTICS: &str = "/api/statistics";

    pub fn probe_logs(franchise_id: &str) -> String {
        format!("/api/probe/{}/logs", segment(franchise_id))
    }

    pub fn probe_report(franchise_id: &str) -> String {
        format!("/api/probe/{}/report", segment(franchise_id))
    }

    /// Percent-encode an identifier so it stays a single path segment
    fn segment(raw: &str) -> String {
        url::form_urlencoded::byte_serialize(raw.as_bytes())
            .map(|chunk| if chunk == "+" { "%20" } else { chunk })
            .collect()
    }
}

/// GET-only client bound to one server, with a hard per-request deadline
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<SiteStatus> {
        self.get_json(endpoints::STATUS).await
    }

    /// Latest local report; `None` while the probe has not scanned yet
    pub async fn report(&self) -> Result<Option<Report>> {
        match self.get_json(endpoints::REPORT).await {
            Ok(report) => Ok(Some(report)),
            Err(DashboardError::Status { status: 404, .. }) => {
                tracing::debug!("No report available yet at {}", self.base_url);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn hosts(&self) -> Result<Vec<Host>> {
        self.get_json(endpoints::HOSTS).await
    }

    pub async fn probes(&self) -> Result<Vec<Probe>> {
        self.get_json(endpoints::PROBES).await
    }

    pub async fn statistics(&self) -> Result<GlobalStatistics> {
        self.get_json(endpoints::STATISTICS).await
    }

    /// Log tail of one probe; a server-side "no logs" answer is `Unavailable`
    pub async fn probe_logs(&self, franchise_id: &str) -> Result<ProbeLogs> {
        self.get_json(&endpoints::probe_logs(franchise_id))
            .await
            .map_err(unavailable_on_404)
    }

    pub async fn probe_report(&self, franchise_id: &str) -> Result<Report> {
        self.get_json(&endpoints::probe_report(franchise_id))
            .await
            .map_err(unavailable_on_404)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = tokio::time::timeout(self.timeout, self.http.get(&url))
            .await
            .map_err(|_| {
                DashboardError::Network(format!("GET {} timed out after {:?}", url, self.timeout))
            })??;

        if !response.is_success() {
            let message = serde_json::from_str::<ErrorPayload>(&response.body)
                .ok()
                .map(|p| p.error);
            tracing::debug!(
                "GET {} -> HTTP {} ({})",
                url,
                response.status,
                message.as_deref().unwrap_or("no error message")
            );
            return Err(DashboardError::Status {
                path: path.to_string(),
                status: response.status,
                message,
            });
        }

        serde_json::from_str(&response.body).map_err(|e| DashboardError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

fn unavailable_on_404(err: DashboardError) -> DashboardError {
    match err {
        DashboardError::Status {
            status: 404,
            message,
            path,
        } => DashboardError::Unavailable(message.unwrap_or_else(|| format!("{} not found", path))),
        other => other,
    }
}
