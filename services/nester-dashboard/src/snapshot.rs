//! Poll-cycle fan-out and the immutable snapshot it produces

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::aggregate::{self, DerivedStats, HostStats};
use crate::client::{endpoints, ApiClient};
use crate::config::SiteMode;
use crate::error::{DashboardError, EndpointFailure, Result};
use crate::model::{GlobalStatistics, Host, HostState, Probe, Report, SiteStatus, Timestamp};

/// Raw data gathered by one successful poll cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SiteData {
    SingleSite {
        status: SiteStatus,
        /// `None` until the local probe completes its first scan
        report: Option<Report>,
        hosts: Vec<Host>,
    },
    MultiSite {
        probes: Vec<Probe>,
        statistics: GlobalStatistics,
    },
}

/// Everything one render pass shows, taken from a single poll cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub fetched_at: Timestamp,
    pub data: SiteData,
    pub host_stats: HostStats,
    /// Fleet statistics, present in multi-site mode only
    pub fleet_stats: Option<DerivedStats>,
}

impl Snapshot {
    pub fn new(generation: u64, fetched_at: Timestamp, data: SiteData) -> Self {
        let (host_stats, fleet_stats) = match &data {
            SiteData::SingleSite { report, hosts, .. } => {
                let stats = match report {
                    Some(report) => aggregate::summarize_report(report),
                    None => aggregate::summarize_hosts(hosts),
                };
                (stats, None)
            }
            SiteData::MultiSite { probes, .. } => {
                let fleet = aggregate::aggregate(probes);
                (fleet.hosts, Some(fleet))
            }
        };

        Self {
            generation,
            fetched_at,
            data,
            host_stats,
            fleet_stats,
        }
    }

    pub fn mode(&self) -> SiteMode {
        match self.data {
            SiteData::SingleSite { .. } => SiteMode::SingleSite,
            SiteData::MultiSite { .. } => SiteMode::MultiSite,
        }
    }

    /// Probes of the fleet; empty in single-site mode
    pub fn probes(&self) -> &[Probe] {
        match &self.data {
            SiteData::MultiSite { probes, .. } => probes,
            SiteData::SingleSite { .. } => &[],
        }
    }

    /// Hosts of the local site; empty in multi-site mode
    pub fn hosts(&self) -> &[Host] {
        match &self.data {
            SiteData::SingleSite { hosts, .. } => hosts,
            SiteData::MultiSite { .. } => &[],
        }
    }

    pub fn find_probe(&self, franchise_id: &str) -> Option<&Probe> {
        self.probes()
            .iter()
            .find(|p| p.franchise_id == franchise_id)
    }
}

/// One poll cycle's worth of endpoint requests
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Issue every request of the cycle at once and settle all of them.
    ///
    /// Fails with `PartialCycle` if any request fails.
    async fn fetch(&self) -> Result<SiteData>;
}

/// Local probe: status, latest report and host listing
pub struct SingleSiteSource {
    api: Arc<ApiClient>,
}

impl SingleSiteSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SnapshotSource for SingleSiteSource {
    async fn fetch(&self) -> Result<SiteData> {
        let (status, report, hosts) =
            tokio::join!(self.api.status(), self.api.report(), self.api.hosts());

        let mut failures = Vec::new();
        let status = settle(endpoints::STATUS, status, &mut failures);
        let report = settle(endpoints::REPORT, report, &mut failures);
        let hosts = settle(endpoints::HOSTS, hosts, &mut failures);

        match (status, report, hosts) {
            (Some(status), Some(report), Some(hosts)) => {
                let hosts = merge_hosts(hosts, report.as_ref());
                Ok(SiteData::SingleSite {
                    status,
                    report,
                    hosts,
                })
            }
            _ => Err(DashboardError::PartialCycle { failures, total: 3 }),
        }
    }
}

/// Central server: probe list and global statistics
pub struct MultiSiteSource {
    api: Arc<ApiClient>,
}

impl MultiSiteSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SnapshotSource for MultiSiteSource {
    async fn fetch(&self) -> Result<SiteData> {
        let (probes, statistics) = tokio::join!(self.api.probes(), self.api.statistics());

        let mut failures = Vec::new();
        let probes = settle(endpoints::PROBES, probes, &mut failures);
        let statistics = settle(endpoints::STATISTICS, statistics, &mut failures);

        match (probes, statistics) {
            (Some(probes), Some(statistics)) => Ok(SiteData::MultiSite { probes, statistics }),
            _ => Err(DashboardError::PartialCycle { failures, total: 2 }),
        }
    }
}

pub fn source_for(mode: SiteMode, api: Arc<ApiClient>) -> Arc<dyn SnapshotSource> {
    match mode {
        SiteMode::SingleSite => Arc::new(SingleSiteSource::new(api)),
        SiteMode::MultiSite => Arc::new(MultiSiteSource::new(api)),
    }
}

fn settle<T>(endpoint: &str, result: Result<T>, failures: &mut Vec<EndpointFailure>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Endpoint {} failed: {}", endpoint, e);
            failures.push(EndpointFailure {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            });
            None
        }
    }
}

/// Enrich the abbreviated host listing with the report's full entries.
///
/// Hosts are matched by IP. Listed hosts keep their order and their own
/// values where present; report-only hosts are appended in report order.
pub fn merge_hosts(listed: Vec<Host>, report: Option<&Report>) -> Vec<Host> {
    let Some(report) = report else {
        return listed;
    };

    let full_by_ip: HashMap<&str, &Host> =
        report.hosts.iter().map(|h| (h.ip.as_str(), h)).collect();
    let mut matched: HashSet<String> = HashSet::new();

    let mut merged: Vec<Host> = listed
        .into_iter()
        .map(|mut host| {
            if let Some(full) = full_by_ip.get(host.ip.as_str()) {
                matched.insert(host.ip.clone());
                if host.ports.is_empty() {
                    host.ports = full.ports.clone();
                }
                // the report carries accuracy, the listing only a name
                if full.os.is_some() && host.os.as_ref().is_none_or(|os| os.accuracy.is_none()) {
                    host.os = full.os.clone();
                }
                if host.state == HostState::Unknown {
                    host.state = full.state;
                }
                host.hostname = host.hostname.or_else(|| full.hostname.clone());
                host.mac_address = host.mac_address.or_else(|| full.mac_address.clone());
                host.vendor = host.vendor.or_else(|| full.vendor.clone());
            }
            host
        })
        .collect();

    merged.extend(
        report
            .hosts
            .iter()
            .filter(|h| !matched.contains(&h.ip))
            .cloned(),
    );
    merged
}
