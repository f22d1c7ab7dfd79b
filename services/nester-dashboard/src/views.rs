//! View models rendered by the dashboard
//!
//! Pure transforms from a snapshot into display-ready rows and cards. Numbers
//! come from `aggregate`; this module only formats and arranges them.

use serde::Serialize;

use crate::aggregate::{self, DerivedStats, HostStats};
use crate::model::{Host, Probe, Report, Timestamp};
use crate::snapshot::{SiteData, Snapshot};

/// Entries on the top-franchises chart
pub const TOP_FRANCHISES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub label: String,
    pub value: String,
    pub subtitle: Option<String>,
    pub trend: Option<String>,
}

impl StatCard {
    fn new(label: &str, value: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            subtitle: None,
            trend: None,
        }
    }

    fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    fn trend(mut self, trend: impl Into<String>) -> Self {
        self.trend = Some(trend.into());
        self
    }
}

pub fn stat_cards(snapshot: &Snapshot) -> Vec<StatCard> {
    match (&snapshot.data, &snapshot.fleet_stats) {
        (SiteData::MultiSite { .. }, Some(fleet)) => fleet_cards(fleet),
        (SiteData::SingleSite { report, .. }, _) => site_cards(report.as_ref(), &snapshot.host_stats),
        (SiteData::MultiSite { probes, .. }, None) => fleet_cards(&aggregate::aggregate(probes)),
    }
}

pub fn fleet_cards(stats: &DerivedStats) -> Vec<StatCard> {
    let attention = if stats.disconnected > 0 {
        "Action required"
    } else {
        "All good"
    };

    vec![
        StatCard::new("Total probes", stats.total).subtitle("Registered franchises"),
        StatCard::new("Connected", stats.connected)
            .subtitle(format!("{} active", percent_label(stats.availability_percent)))
            .trend("Online"),
        StatCard::new("Disconnected", stats.disconnected)
            .subtitle("Need attention")
            .trend(attention),
        StatCard::new("Equipment", stats.hosts.total_hosts)
            .subtitle("Total detected")
            .trend(format!("{} open ports", stats.hosts.ports_open)),
    ]
}

pub fn site_cards(report: Option<&Report>, stats: &HostStats) -> Vec<StatCard> {
    let latency = report.and_then(|r| r.wan_latency_ms);
    let duration = report.and_then(|r| r.scan_duration_seconds);

    vec![
        StatCard::new("Active hosts", stats.hosts_up)
            .subtitle(format!("of {}", stats.total_hosts)),
        StatCard::new("Open ports", stats.ports_open),
        StatCard::new("WAN latency", latency_label(latency))
            .trend(if latency.is_some() { "Measured" } else { "Not measured" }),
        StatCard::new(
            "Scan duration",
            duration.map_or_else(|| "N/A".to_string(), |d| format!("{:.1}s", d)),
        ),
    ]
}

/// One slice of the connected/disconnected breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSlice {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

pub fn status_breakdown(stats: &DerivedStats) -> Vec<StatusSlice> {
    vec![
        StatusSlice {
            label: "Connected".to_string(),
            count: stats.connected,
            percent: aggregate::percentage(stats.connected, stats.total),
        },
        StatusSlice {
            label: "Disconnected".to_string(),
            count: stats.disconnected,
            percent: aggregate::percentage(stats.disconnected, stats.total),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FranchiseBar {
    pub franchise_id: String,
    pub label: String,
    pub hosts_up: u64,
    pub ports_open: Option<u64>,
}

/// Short chart label: last word of the name, else the id's last two characters
pub fn short_label(probe: &Probe) -> String {
    probe
        .franchise_name
        .as_deref()
        .and_then(|name| name.split_whitespace().last())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let chars: Vec<char> = probe.franchise_id.chars().collect();
            chars[chars.len().saturating_sub(2)..].iter().collect()
        })
}

pub fn top_franchises(probes: &[Probe], n: usize) -> Vec<FranchiseBar> {
    aggregate::top_probes_by_hosts_up(probes, n)
        .into_iter()
        .map(|probe| FranchiseBar {
            franchise_id: probe.franchise_id.clone(),
            label: short_label(probe),
            hosts_up: probe.hosts_up().unwrap_or_default(),
            ports_open: probe.ports_open(),
        })
        .collect()
}

/// Coarse age of a timestamp: seconds, minutes, hours, then days
pub fn time_ago(timestamp: Option<Timestamp>, now: Timestamp) -> String {
    age_label(timestamp.map(|at| (now - at).num_seconds()))
}

/// Label for an age in seconds; negative ages from clock skew read as 0
pub fn age_label(seconds: Option<i64>) -> String {
    let Some(seconds) = seconds else {
        return "never".to_string();
    };
    match seconds.max(0) {
        s if s < 60 => format!("{}s ago", s),
        s if s < 3_600 => format!("{}min ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

pub fn latency_label(latency_ms: Option<f64>) -> String {
    latency_ms.map_or_else(|| "N/A".to_string(), |ms| format!("{:.0}ms", ms))
}

pub fn percent_label(percent: f64) -> String {
    format!("{:.0}%", percent)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRow {
    pub franchise_id: String,
    pub name: String,
    pub connected: bool,
    pub hosts_up: Option<u64>,
    pub ports_open: Option<u64>,
    pub latency: String,
    pub last_activity: String,
}

pub fn probe_rows(probes: &[&Probe], now: Timestamp) -> Vec<ProbeRow> {
    probes
        .iter()
        .map(|probe| ProbeRow {
            franchise_id: probe.franchise_id.clone(),
            name: probe.display_name().to_string(),
            connected: probe.is_connected(),
            hosts_up: probe.hosts_up(),
            ports_open: probe.ports_open(),
            latency: latency_label(probe.wan_latency_ms()),
            last_activity: age_label(probe.seconds_since_activity(now)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRow {
    pub ip: String,
    pub name: String,
    pub up: bool,
    pub mac_address: Option<String>,
    pub vendor: Option<String>,
    pub os: Option<String>,
    pub open_ports: usize,
    pub ports: usize,
}

pub fn host_rows(hosts: &[Host]) -> Vec<HostRow> {
    hosts
        .iter()
        .map(|host| HostRow {
            ip: host.ip.clone(),
            name: host.display_name().to_string(),
            up: host.is_up(),
            mac_address: host.mac_address.clone(),
            vendor: host.vendor.clone(),
            os: host.os.as_ref().map(|os| match os.accuracy {
                Some(accuracy) => format!("{} ({}%)", os.name, accuracy),
                None => os.name.clone(),
            }),
            open_ports: host.open_ports(),
            ports: host.ports_count.unwrap_or(host.ports.len()).max(host.ports.len()),
        })
        .collect()
}
