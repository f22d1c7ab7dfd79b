//! Property tests for filtering and aggregation

use nester_dashboard::aggregate::{self, summarize_report};
use nester_dashboard::filter::{filter_probes, FilterMode};
use nester_dashboard::model::{
    Host, HostState, Port, PortState, Probe, ProbeStatus, Report, ReportSummary,
};
use proptest::prelude::*;

fn port_strategy() -> impl Strategy<Value = Port> {
    (
        1u16..1024,
        prop_oneof![
            Just(PortState::Open),
            Just(PortState::Closed),
            Just(PortState::Filtered),
            Just(PortState::Unknown),
        ],
    )
        .prop_map(|(port, state)| Port {
            port,
            protocol: Some("tcp".to_string()),
            state,
            service: None,
            product: None,
            version: None,
        })
}

fn host_strategy() -> impl Strategy<Value = Host> {
    (
        0u8..255,
        any::<bool>(),
        prop::collection::vec(port_strategy(), 0..8),
    )
        .prop_map(|(octet, up, ports)| Host {
            ip: format!("10.0.0.{}", octet),
            hostname: None,
            state: if up { HostState::Up } else { HostState::Down },
            mac_address: None,
            vendor: None,
            os: None,
            ports,
            ports_count: None,
        })
}

fn report_strategy() -> impl Strategy<Value = Report> {
    (
        prop::option::of(0.0f64..500.0),
        prop::option::of(0u64..64),
        prop::collection::vec(host_strategy(), 0..6),
    )
        .prop_map(|(wan_latency_ms, hosts_up, hosts)| Report {
            wan_latency_ms,
            summary: ReportSummary {
                hosts_up,
                ..ReportSummary::default()
            },
            hosts,
            ..Report::default()
        })
}

fn probe_strategy() -> impl Strategy<Value = Probe> {
    (
        "[A-Z]{2,3}",
        prop::option::of("[A-Za-z]{1,8}( [A-Za-z]{1,8})?"),
        any::<bool>(),
        prop::option::of(report_strategy()),
    )
        .prop_map(|(id, name, connected, report)| Probe {
            franchise_id: id,
            franchise_name: name,
            status: if connected {
                ProbeStatus::Connected
            } else {
                ProbeStatus::Disconnected
            },
            registered_at: None,
            last_seen: None,
            last_heartbeat: None,
            last_seen_ago_seconds: None,
            last_report: report,
        })
}

fn mode_strategy() -> impl Strategy<Value = FilterMode> {
    prop_oneof![
        Just(FilterMode::All),
        Just(FilterMode::Connected),
        Just(FilterMode::Disconnected),
    ]
}

fn ids(probes: &[&Probe]) -> Vec<String> {
    probes.iter().map(|p| p.franchise_id.clone()).collect()
}

proptest! {
    #[test]
    fn filter_without_search_is_subset_matching_mode(
        probes in prop::collection::vec(probe_strategy(), 0..20),
        mode in mode_strategy(),
    ) {
        let filtered = filter_probes(&probes, mode, "");
        prop_assert!(filtered.len() <= probes.len());
        for probe in &filtered {
            prop_assert!(mode.matches(probe));
            prop_assert!(probes.iter().any(|p| std::ptr::eq(p, *probe)));
        }
    }

    #[test]
    fn search_composes_with_mode(
        probes in prop::collection::vec(probe_strategy(), 0..20),
        mode in mode_strategy(),
        search in "[A-Za-z ]{0,3}",
    ) {
        let direct = filter_probes(&probes, mode, &search);

        let by_mode: Vec<Probe> = filter_probes(&probes, mode, "")
            .into_iter()
            .cloned()
            .collect();
        let staged = filter_probes(&by_mode, FilterMode::All, &search);

        prop_assert_eq!(ids(&direct), ids(&staged));
    }

    #[test]
    fn availability_is_a_percentage(
        probes in prop::collection::vec(probe_strategy(), 0..20),
    ) {
        let stats = aggregate::aggregate(&probes);
        prop_assert!((0.0..=100.0).contains(&stats.availability_percent));
        if probes.is_empty() {
            prop_assert_eq!(stats.availability_percent, 0.0);
        }
        prop_assert_eq!(stats.connected + stats.disconnected, stats.total);
    }

    #[test]
    fn report_open_ports_are_sum_over_hosts(report in report_strategy()) {
        let expected: usize = report.hosts.iter().map(Host::open_ports).sum();
        prop_assert_eq!(summarize_report(&report).ports_open, expected);
    }

    #[test]
    fn fleet_open_ports_are_sum_over_reports(
        probes in prop::collection::vec(probe_strategy(), 0..12),
    ) {
        let expected: usize = probes
            .iter()
            .filter_map(|p| p.last_report.as_ref())
            .map(Report::open_ports)
            .sum();
        prop_assert_eq!(aggregate::aggregate(&probes).hosts.ports_open, expected);
    }

    #[test]
    fn average_latency_lies_within_measured_range(
        probes in prop::collection::vec(probe_strategy(), 0..12),
    ) {
        let measured: Vec<f64> = probes.iter().filter_map(Probe::wan_latency_ms).collect();
        match aggregate::aggregate(&probes).average_latency_ms {
            None => prop_assert!(measured.is_empty()),
            Some(average) => {
                let min = measured.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = measured.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(average >= min - 1e-9 && average <= max + 1e-9);
            }
        }
    }

    #[test]
    fn top_n_is_sorted_and_excludes_missing(
        probes in prop::collection::vec(probe_strategy(), 0..20),
        n in 0usize..12,
    ) {
        let top = aggregate::top_probes_by_hosts_up(&probes, n);
        prop_assert!(top.len() <= n);
        prop_assert!(top.iter().all(|p| p.hosts_up().is_some()));
        for pair in top.windows(2) {
            prop_assert!(pair[0].hosts_up() >= pair[1].hosts_up());
        }
    }
}
