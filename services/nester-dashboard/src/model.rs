//! Wire types consumed from the probe and central servers
//!
//! Every optional payload field is an explicit `Option`. Missing fields are
//! absent, never zero, except the counters documented as defaulting to zero.
//! Scanner placeholders (`"Unknown"`, empty strings) decode as absent.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type Timestamp = DateTime<Utc>;

/// Connectivity of a remote probe as judged by the central server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Connected,
    #[default]
    #[serde(other)]
    Disconnected,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Connected => write!(f, "connected"),
            ProbeStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// A remote site reporting scan data to the central server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub franchise_id: String,
    #[serde(default, deserialize_with = "opt_text")]
    pub franchise_name: Option<String>,
    #[serde(default)]
    pub status: ProbeStatus,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub registered_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub last_seen: Option<Timestamp>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub last_heartbeat: Option<Timestamp>,
    #[serde(default)]
    pub last_seen_ago_seconds: Option<u64>,
    #[serde(default)]
    pub last_report: Option<Report>,
}

impl Probe {
    /// Name shown to users, falling back to the identifier
    pub fn display_name(&self) -> &str {
        self.franchise_name.as_deref().unwrap_or(&self.franchise_id)
    }

    pub fn is_connected(&self) -> bool {
        self.status == ProbeStatus::Connected
    }

    /// Most recent sign of life: heartbeat if reported, else last contact
    pub fn last_activity(&self) -> Option<Timestamp> {
        self.last_heartbeat.or(self.last_seen)
    }

    /// Seconds since the probe was last heard from.
    ///
    /// `last_seen_ago_seconds` comes first; the naive timestamps are in the
    /// server's local time and only serve servers that omit it.
    pub fn seconds_since_activity(&self, now: Timestamp) -> Option<i64> {
        match self.last_seen_ago_seconds {
            Some(seconds) => Some(i64::try_from(seconds).unwrap_or(i64::MAX)),
            None => self
                .last_activity()
                .map(|at| (now - at).num_seconds()),
        }
    }

    pub fn hosts_up(&self) -> Option<u64> {
        self.last_report.as_ref().and_then(|r| r.summary.hosts_up)
    }

    pub fn ports_open(&self) -> Option<u64> {
        self.last_report
            .as_ref()
            .and_then(|r| r.summary.total_ports_open)
    }

    pub fn wan_latency_ms(&self) -> Option<f64> {
        self.last_report.as_ref().and_then(|r| r.wan_latency_ms)
    }
}

/// Counters a scanner reports alongside its host list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(default)]
    pub hosts_up: Option<u64>,
    #[serde(default)]
    pub total_hosts: Option<u64>,
    #[serde(default)]
    pub hosts_down: Option<u64>,
    #[serde(default)]
    pub total_ports_open: Option<u64>,
}

/// One completed scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub scan_duration_seconds: Option<f64>,
    #[serde(default)]
    pub wan_latency_ms: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: ReportSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hosts: Vec<Host>,
}

impl Report {
    /// Open ports counted from the host entries, not from the summary
    pub fn open_ports(&self) -> usize {
        self.hosts.iter().map(Host::open_ports).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostState {
    Up,
    Down,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Best operating system match for a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub name: String,
    /// Match accuracy in percent, absent when the scanner gave none
    pub accuracy: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub ip: String,
    #[serde(default, deserialize_with = "opt_text")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub state: HostState,
    #[serde(default, deserialize_with = "opt_text")]
    pub mac_address: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub vendor: Option<String>,
    #[serde(default, deserialize_with = "opt_os")]
    pub os: Option<OsInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ports: Vec<Port>,
    /// Port count advertised by abbreviated host listings that omit `ports`
    #[serde(default)]
    pub ports_count: Option<usize>,
}

impl Host {
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.ip)
    }

    pub fn is_up(&self) -> bool {
        self.state == HostState::Up
    }

    pub fn open_ports(&self) -> usize {
        self.ports
            .iter()
            .filter(|p| p.state == PortState::Open)
            .count()
    }

    pub fn closed_ports(&self) -> usize {
        self.ports
            .iter()
            .filter(|p| p.state == PortState::Closed)
            .count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub port: u16,
    #[serde(default, deserialize_with = "opt_text")]
    pub protocol: Option<String>,
    #[serde(default)]
    pub state: PortState,
    #[serde(default, deserialize_with = "opt_text")]
    pub service: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub product: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub version: Option<String>,
}

/// `/api/status` of a single local probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteStatus {
    #[serde(default, deserialize_with = "opt_text")]
    pub franchise_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub franchise_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub last_scan: Option<Timestamp>,
    #[serde(default)]
    pub last_scan_ago_seconds: Option<u64>,
    #[serde(default)]
    pub equipment_count: u64,
    #[serde(default)]
    pub wan_latency_ms: Option<f64>,
}

/// `/api/statistics` of the central server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStatistics {
    #[serde(default)]
    pub total_probes: u64,
    #[serde(default)]
    pub connected_probes: u64,
    #[serde(default)]
    pub disconnected_probes: u64,
    #[serde(default, alias = "total_equipment")]
    pub total_hosts: Option<u64>,
    #[serde(default)]
    pub total_ports_open: Option<u64>,
    #[serde(default, alias = "average_wan_latency")]
    pub average_latency_ms: Option<f64>,
}

/// Tail of a probe's log as uploaded to the central server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeLogs {
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub sent_lines: u64,
    #[serde(default)]
    pub total_lines: u64,
    #[serde(default)]
    pub content: Option<String>,
}

/// Body servers send alongside non-success statuses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: String,
}

/// Parse RFC 3339, or a naive ISO-8601 date-time read as UTC
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|n| n.and_utc())
}

fn normalize_text(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
        None
    } else if trimmed.len() == raw.len() {
        Some(raw)
    } else {
        Some(trimmed.to_string())
    }
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(normalize_text))
}

fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|s| {
        let parsed = parse_timestamp(s);
        if parsed.is_none() {
            tracing::debug!("Ignoring unparsable timestamp {:?}", s);
        }
        parsed
    }))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOs {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        accuracy: Option<f64>,
    },
}

fn opt_os<'de, D>(deserializer: D) -> Result<Option<OsInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let os = match Option::<RawOs>::deserialize(deserializer)? {
        None => None,
        Some(RawOs::Name(name)) => {
            normalize_text(name).map(|name| OsInfo { name, accuracy: None })
        }
        Some(RawOs::Detailed { name, accuracy }) => {
            name.and_then(normalize_text).map(|name| OsInfo {
                name,
                accuracy: accuracy
                    .filter(|a| *a > 0.0)
                    .map(|a| a.round().min(100.0) as u8),
            })
        }
    };
    Ok(os)
}
