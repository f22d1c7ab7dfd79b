//! Probe list filtering by connectivity and free-text search

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Probe;

/// Structural filter on probe connectivity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    All,
    Connected,
    Disconnected,
}

impl FilterMode {
    pub fn matches(self, probe: &Probe) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Connected => probe.is_connected(),
            FilterMode::Disconnected => !probe.is_connected(),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::All => write!(f, "all"),
            FilterMode::Connected => write!(f, "connected"),
            FilterMode::Disconnected => write!(f, "disconnected"),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(FilterMode::All),
            "connected" => Ok(FilterMode::Connected),
            "disconnected" => Ok(FilterMode::Disconnected),
            other => Err(format!("unknown filter mode: {other}")),
        }
    }
}

/// Number of probes each filter mode would show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeCounts {
    pub all: usize,
    pub connected: usize,
    pub disconnected: usize,
}

pub fn mode_counts(probes: &[Probe]) -> ModeCounts {
    let connected = probes.iter().filter(|p| p.is_connected()).count();
    ModeCounts {
        all: probes.len(),
        connected,
        disconnected: probes.len() - connected,
    }
}

/// Case-insensitive match of an already lowercased needle against name and id
fn matches_search(probe: &Probe, needle: &str) -> bool {
    probe.franchise_id.to_lowercase().contains(needle)
        || probe
            .franchise_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(needle))
}

/// Probes passing both the mode filter and, when non-empty, the search.
///
/// The source slice is never touched; each call builds a fresh view.
pub fn filter_probes<'a>(probes: &'a [Probe], mode: FilterMode, search: &str) -> Vec<&'a Probe> {
    let needle = search.to_lowercase();
    probes
        .iter()
        .filter(|p| mode.matches(p))
        .filter(|p| needle.is_empty() || matches_search(p, &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProbeStatus;

    fn probe(id: &str, name: Option<&str>, status: ProbeStatus) -> Probe {
        Probe {
            franchise_id: id.to_string(),
            franchise_name: name.map(str::to_string),
            status,
            registered_at: None,
            last_seen: None,
            last_heartbeat: None,
            last_seen_ago_seconds: None,
            last_report: None,
        }
    }

    fn fleet() -> Vec<Probe> {
        vec![
            probe("SEA", Some("Seattle Seahawks"), ProbeStatus::Connected),
            probe("NE", Some("New England Patriots"), ProbeStatus::Connected),
            probe("SF", Some("San Francisco 49ers"), ProbeStatus::Disconnected),
        ]
    }

    fn ids(probes: &[&Probe]) -> Vec<String> {
        probes.iter().map(|p| p.franchise_id.clone()).collect()
    }

    #[test]
    fn all_without_search_returns_everything() {
        let probes = fleet();
        assert_eq!(filter_probes(&probes, FilterMode::All, "").len(), 3);
    }

    #[test]
    fn disconnected_mode_ignores_empty_search() {
        let probes = fleet();
        assert_eq!(
            ids(&filter_probes(&probes, FilterMode::Disconnected, "")),
            vec!["SF"]
        );
        assert_eq!(
            ids(&filter_probes(&probes, FilterMode::Disconnected, "san")),
            vec!["SF"]
        );
    }

    #[test]
    fn search_does_not_override_mode() {
        let probes = fleet();
        // "sea" only matches a connected probe
        assert!(filter_probes(&probes, FilterMode::Disconnected, "sea").is_empty());
        assert_eq!(
            ids(&filter_probes(&probes, FilterMode::Connected, "sea")),
            vec!["SEA"]
        );
    }

    #[test]
    fn search_is_case_insensitive_on_name_and_id() {
        let probes = fleet();
        assert_eq!(
            ids(&filter_probes(&probes, FilterMode::All, "PATRIOTS")),
            vec!["NE"]
        );
        assert_eq!(ids(&filter_probes(&probes, FilterMode::All, "sf")), vec!["SF"]);
    }

    #[test]
    fn search_falls_back_to_id_without_name() {
        let probes = vec![probe("DEN", None, ProbeStatus::Connected)];
        assert_eq!(filter_probes(&probes, FilterMode::All, "de").len(), 1);
        assert!(filter_probes(&probes, FilterMode::All, "broncos").is_empty());
    }

    #[test]
    fn source_order_is_preserved() {
        let probes = fleet();
        assert_eq!(
            ids(&filter_probes(&probes, FilterMode::Connected, "")),
            vec!["SEA", "NE"]
        );
    }

    #[test]
    fn counts_per_mode() {
        let counts = mode_counts(&fleet());
        assert_eq!(
            counts,
            ModeCounts {
                all: 3,
                connected: 2,
                disconnected: 1
            }
        );
    }

    #[test]
    fn filter_mode_round_trips_through_str() {
        for mode in [FilterMode::All, FilterMode::Connected, FilterMode::Disconnected] {
            assert_eq!(mode.to_string().parse::<FilterMode>(), Ok(mode));
        }
        assert!("offline".parse::<FilterMode>().is_err());
    }
}
