//! Derived statistics computed from raw probe and host reports
//!
//! Everything here is a pure function of its input. Counters are always
//! recomputed from the reports they summarize, never carried over.

use serde::Serialize;

use crate::model::{Host, HostState, Probe, Report};

/// Host and port counters of one report or host list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub hosts_up: u64,
    pub total_hosts: u64,
    pub ports_open: usize,
    pub ports_closed: usize,
}

impl HostStats {
    fn add(&mut self, other: HostStats) {
        self.hosts_up += other.hosts_up;
        self.total_hosts += other.total_hosts;
        self.ports_open += other.ports_open;
        self.ports_closed += other.ports_closed;
    }
}

/// Fleet-wide statistics over a set of probes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedStats {
    pub total: usize,
    pub connected: usize,
    pub disconnected: usize,
    /// Probes that have delivered at least one report
    pub reporting: usize,
    /// Connected share of all probes in percent, 0 for an empty fleet
    pub availability_percent: f64,
    pub hosts: HostStats,
    /// Mean WAN latency over probes that measured one
    pub average_latency_ms: Option<f64>,
}

/// Count hosts and ports straight from host entries
pub fn summarize_hosts(hosts: &[Host]) -> HostStats {
    hosts.iter().fold(HostStats::default(), |mut acc, host| {
        acc.total_hosts += 1;
        if host.state == HostState::Up {
            acc.hosts_up += 1;
        }
        acc.ports_open += host.open_ports();
        acc.ports_closed += host.closed_ports();
        acc
    })
}

/// Counters of one report.
///
/// Host counts prefer the scanner's summary, which also covers hosts the
/// entry list may omit. Port counts are always taken from the entries.
pub fn summarize_report(report: &Report) -> HostStats {
    let counted = summarize_hosts(&report.hosts);
    HostStats {
        hosts_up: report.summary.hosts_up.unwrap_or(counted.hosts_up),
        total_hosts: report.summary.total_hosts.unwrap_or(counted.total_hosts),
        ..counted
    }
}

pub fn aggregate(probes: &[Probe]) -> DerivedStats {
    let total = probes.len();
    let connected = probes.iter().filter(|p| p.is_connected()).count();

    let mut hosts = HostStats::default();
    let mut reporting = 0;
    for report in probes.iter().filter_map(|p| p.last_report.as_ref()) {
        reporting += 1;
        hosts.add(summarize_report(report));
    }

    DerivedStats {
        total,
        connected,
        disconnected: total - connected,
        reporting,
        availability_percent: percentage(connected, total),
        hosts,
        average_latency_ms: average(probes.iter().filter_map(Probe::wan_latency_ms)),
    }
}

/// `part / whole` in percent; 0 when `whole` is 0
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Arithmetic mean, `None` for an empty input
pub fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// The `n` items with the largest metric, largest first.
///
/// Items without a metric are left out. Ties keep their input order.
pub fn top_n<T, K, F>(items: &[T], n: usize, metric: F) -> Vec<&T>
where
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    let mut ranked: Vec<(K, &T)> = items
        .iter()
        .filter_map(|item| metric(item).map(|key| (key, item)))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().take(n).map(|(_, item)| item).collect()
}

pub fn top_probes_by_hosts_up(probes: &[Probe], n: usize) -> Vec<&Probe> {
    top_n(probes, n, Probe::hosts_up)
}
