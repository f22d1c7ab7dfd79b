//! Shared synchronization state: the published snapshot and the error marker

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::model::Timestamp;
use crate::snapshot::{SiteData, Snapshot};

/// Failure of the most recent poll cycle(s)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleError {
    pub message: String,
    /// First failure since the last successful publish
    pub since: Timestamp,
}

/// What the UI should say about data freshness
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SyncPhase {
    /// No data and no error yet
    Loading,
    Fresh,
    /// Data shown is from before a failed cycle
    Stale { since: Timestamp, error: String },
    /// Every cycle so far has failed
    Failed { since: Timestamp, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    #[serde(flatten)]
    pub phase: SyncPhase,
    pub last_update: Option<Timestamp>,
    pub generation: u64,
    pub consecutive_failures: u32,
    /// Snapshots published since startup, across generations
    pub cycles_published: u64,
    pub active: bool,
}

/// State owned by the poller and read by every view.
///
/// Results are only accepted from the current generation of an active
/// poller; anything else is a late answer of an abandoned cycle.
#[derive(Debug, Default)]
pub struct SyncState {
    snapshot: Option<Arc<Snapshot>>,
    generation: u64,
    active: bool,
    last_error: Option<CycleError>,
    consecutive_failures: u32,
    cycles_published: u64,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_error(&self) -> Option<&CycleError> {
        self.last_error.as_ref()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.active && generation == self.generation
    }

    /// Open a new generation, returning its number
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.active = true;
        self.generation
    }

    /// Close the current generation so in-flight results are dropped
    pub fn halt(&mut self) {
        self.generation += 1;
        self.active = false;
    }

    /// Replace the snapshot wholesale, returning false for a stale generation
    pub fn publish(&mut self, generation: u64, data: SiteData, now: Timestamp) -> bool {
        if !self.is_current(generation) {
            tracing::debug!(
                "Discarding snapshot of generation {} (current {}, active={})",
                generation,
                self.generation,
                self.active
            );
            return false;
        }

        self.snapshot = Some(Arc::new(Snapshot::new(generation, now, data)));
        if self.consecutive_failures > 0 {
            tracing::info!(
                "Poll recovered after {} failed cycle(s)",
                self.consecutive_failures
            );
        }
        self.last_error = None;
        self.consecutive_failures = 0;
        self.cycles_published += 1;
        true
    }

    /// Set the error marker, keeping the previous snapshot authoritative
    pub fn record_failure(&mut self, generation: u64, message: String, now: Timestamp) -> bool {
        if !self.is_current(generation) {
            tracing::debug!(
                "Discarding failure of generation {} (current {})",
                generation,
                self.generation
            );
            return false;
        }

        let since = self.last_error.as_ref().map_or(now, |e| e.since);
        self.last_error = Some(CycleError { message, since });
        self.consecutive_failures += 1;
        if self.consecutive_failures % 5 == 0 {
            tracing::warn!(
                "Poll has failed {} consecutive cycles",
                self.consecutive_failures
            );
        }
        true
    }

    pub fn status(&self) -> SyncStatus {
        let phase = match (&self.snapshot, &self.last_error) {
            (None, None) => SyncPhase::Loading,
            (Some(_), None) => SyncPhase::Fresh,
            (Some(_), Some(e)) => SyncPhase::Stale {
                since: e.since,
                error: e.message.clone(),
            },
            (None, Some(e)) => SyncPhase::Failed {
                since: e.since,
                error: e.message.clone(),
            },
        };

        SyncStatus {
            phase,
            last_update: self.snapshot.as_ref().map(|s| s.fetched_at),
            generation: self.generation,
            consecutive_failures: self.consecutive_failures,
            cycles_published: self.cycles_published,
            active: self.active,
        }
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SyncState>>;

pub fn new_state_handle() -> StateHandle {
    Arc::new(RwLock::new(SyncState::new()))
}
