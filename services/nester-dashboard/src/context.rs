//! Coordinating context: poller, detail caches and the user's view state

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::detail::{DetailCache, DetailEntry, EquipmentCache, LogsCache};
use crate::filter::{self, FilterMode};
use crate::model::{Probe, ProbeLogs, Report};
use crate::poller::{Poller, RefreshOutcome};
use crate::snapshot::Snapshot;
use crate::state::SyncStatus;

/// Filter, search and detail selection of the one dashboard user
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub filter: FilterMode,
    pub search: String,
    pub selected: Option<String>,
    /// Bumped on every selection change so late detail loads can be told apart
    #[serde(skip)]
    selection_epoch: u64,
}

/// Result of a detail load scoped to the selected probe
#[derive(Debug, PartialEq)]
pub enum DetailOutcome<T> {
    Ready(DetailEntry<T>),
    /// The selection changed or closed while the load ran
    Superseded,
    NoSelection,
}

pub struct DashboardContext {
    poller: Poller,
    logs: LogsCache,
    equipment: EquipmentCache,
    view: RwLock<ViewState>,
}

impl DashboardContext {
    pub fn new(poller: Poller, logs: LogsCache, equipment: EquipmentCache) -> Self {
        Self {
            poller,
            logs,
            equipment,
            view: RwLock::new(ViewState::default()),
        }
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn logs(&self) -> &LogsCache {
        &self.logs
    }

    pub fn equipment(&self) -> &EquipmentCache {
        &self.equipment
    }

    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.poller.state().read().await.snapshot()
    }

    pub async fn sync_status(&self) -> SyncStatus {
        self.poller.state().read().await.status()
    }

    pub async fn view(&self) -> ViewState {
        self.view.read().await.clone()
    }

    pub async fn set_filter(&self, mode: FilterMode) {
        self.view.write().await.filter = mode;
    }

    pub async fn set_search(&self, search: &str) {
        self.view.write().await.search = search.to_string();
    }

    /// Probes of the current snapshot passing the view's filter and search
    pub async fn visible_probes(&self) -> Vec<Probe> {
        let Some(snapshot) = self.snapshot().await else {
            return Vec::new();
        };
        let view = self.view.read().await;
        filter::filter_probes(snapshot.probes(), view.filter, &view.search)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Open the detail view of a probe
    pub async fn select_probe(&self, franchise_id: &str) {
        let mut view = self.view.write().await;
        view.selected = Some(franchise_id.to_string());
        view.selection_epoch += 1;
        tracing::debug!("Selected probe '{}'", franchise_id);
    }

    pub async fn close_detail(&self) {
        let mut view = self.view.write().await;
        view.selected = None;
        view.selection_epoch += 1;
    }

    pub async fn load_logs(&self) -> DetailOutcome<ProbeLogs> {
        self.load_selected(&self.logs).await
    }

    pub async fn load_equipment(&self) -> DetailOutcome<Report> {
        self.load_selected(&self.equipment).await
    }

    /// Drop the cached logs of the selected probe and load them again
    pub async fn reload_logs(&self) -> DetailOutcome<ProbeLogs> {
        let selected = self.view.read().await.selected.clone();
        if let Some(id) = selected {
            self.logs.invalidate(&id).await;
        }
        self.load_selected(&self.logs).await
    }

    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.poller.refresh_now().await
    }

    /// Switch timer-driven polling on or off; manual refresh works either way.
    ///
    /// Returns the resulting auto-refresh setting.
    pub async fn set_auto_refresh(&self, enabled: bool) -> bool {
        if enabled {
            self.poller.resume().await
        } else {
            self.poller.pause().await;
            false
        }
    }

    pub async fn shutdown(&self) {
        self.poller.stop().await;
    }

    async fn load_selected<T: Send + Sync + 'static>(
        &self,
        cache: &DetailCache<T>,
    ) -> DetailOutcome<T> {
        let (id, epoch) = {
            let view = self.view.read().await;
            match &view.selected {
                Some(id) => (id.clone(), view.selection_epoch),
                None => return DetailOutcome::NoSelection,
            }
        };

        let entry = cache.get(&id).await;

        if self.view.read().await.selection_epoch != epoch {
            tracing::debug!("Ignoring detail for '{}': selection changed", id);
            return DetailOutcome::Superseded;
        }
        DetailOutcome::Ready(entry)
    }
}
