//! Configuration types for the dashboard synchronization layer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub mode: SiteMode,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub detail_ttl_seconds: Option<u64>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            mode: SiteMode::default(),
            poll_interval_seconds: default_poll_interval(),
            request_timeout_seconds: default_request_timeout(),
            detail_ttl_seconds: None,
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn detail_ttl(&self) -> Option<Duration> {
        self.detail_ttl_seconds.map(Duration::from_secs)
    }

    /// Reject settings the poller cannot honor
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(crate::DashboardError::Config(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.poll_interval_seconds == 0 {
            return Err(crate::DashboardError::Config(
                "poll_interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(crate::DashboardError::Config(
                "request_timeout_seconds must be at least 1".to_string(),
            ));
        }
        // A cycle must always settle before the next tick is due
        if self.request_timeout_seconds >= self.poll_interval_seconds {
            return Err(crate::DashboardError::Config(format!(
                "request_timeout_seconds ({}) must be shorter than poll_interval_seconds ({})",
                self.request_timeout_seconds, self.poll_interval_seconds
            )));
        }
        Ok(())
    }
}

/// Which backend the dashboard is pointed at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteMode {
    /// A single local probe: `/api/status`, `/api/report`, `/api/hosts`
    SingleSite,
    /// The central server aggregating many probes: `/api/probes`, `/api/statistics`
    #[default]
    MultiSite,
}

impl fmt::Display for SiteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteMode::SingleSite => write!(f, "single_site"),
            SiteMode::MultiSite => write!(f, "multi_site"),
        }
    }
}

impl FromStr for SiteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_site" | "single" => Ok(SiteMode::SingleSite),
            "multi_site" | "multi" => Ok(SiteMode::MultiSite),
            other => Err(format!("unknown site mode: {other}")),
        }
    }
}

/// Local dashboard server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::DashboardError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
