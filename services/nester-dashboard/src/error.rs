//! Error types for the dashboard synchronization layer

use std::fmt;

/// One endpoint that failed inside a poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub message: String,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.message)
    }
}

/// Errors that can occur while synchronizing dashboard data
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("GET {path} returned HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        path: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Malformed response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("{} of {total} endpoints failed: {}", .failures.len(), join_failures(.failures))]
    PartialCycle {
        failures: Vec<EndpointFailure>,
        total: usize,
    },

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DashboardError {
    /// True for transport failures, timeouts and non-success HTTP statuses
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            DashboardError::Network(_) | DashboardError::Status { .. }
        )
    }
}

fn join_failures(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_includes_server_message() {
        let err = DashboardError::Status {
            path: "/api/report".to_string(),
            status: 404,
            message: Some("No report available".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "GET /api/report returned HTTP 404: No report available"
        );
    }

    #[test]
    fn status_display_without_message() {
        let err = DashboardError::Status {
            path: "/api/hosts".to_string(),
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "GET /api/hosts returned HTTP 502");
    }

    #[test]
    fn partial_cycle_lists_failed_endpoints() {
        let err = DashboardError::PartialCycle {
            failures: vec![EndpointFailure {
                endpoint: "/api/hosts".to_string(),
                message: "connection refused".to_string(),
            }],
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "1 of 3 endpoints failed: /api/hosts: connection refused"
        );
    }

    #[test]
    fn network_classification() {
        assert!(DashboardError::Network("timeout".to_string()).is_network());
        assert!(DashboardError::Status {
            path: "/".to_string(),
            status: 500,
            message: None
        }
        .is_network());
        assert!(!DashboardError::Decode {
            path: "/".to_string(),
            message: "eof".to_string()
        }
        .is_network());
        assert!(!DashboardError::Config("x".to_string()).is_network());
    }
}
