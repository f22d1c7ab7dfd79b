//! Poller: drives poll cycles on a timer and publishes snapshots

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::snapshot::SnapshotSource;
use crate::state::StateHandle;

/// How a single cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    Published,
    Failed,
    /// Another cycle was still running
    Skipped,
    /// The poller was stopped or restarted while the cycle ran
    Discarded,
    /// The poller is not running
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    Started,
    AlreadyInFlight,
    Inactive,
}

#[derive(Default)]
struct RunControl {
    /// Cancels every cycle of the generation, and the timer with it
    cancel: CancellationToken,
    /// Child of `cancel` that only ends the timer
    timer: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct PollerInner {
    source: Arc<dyn SnapshotSource>,
    state: StateHandle,
    interval: Duration,
    in_flight: AtomicBool,
    run: Mutex<RunControl>,
}

/// Releases the single-cycle slot when the cycle ends, however it ends
struct InFlightGuard(Arc<PollerInner>);

impl InFlightGuard {
    fn acquire(inner: &Arc<PollerInner>) -> Option<Self> {
        inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(inner)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// Cloneable handle to the polling task
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

impl Poller {
    pub fn new(source: Arc<dyn SnapshotSource>, state: StateHandle, interval: Duration) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                source,
                state,
                interval,
                in_flight: AtomicBool::new(false),
                run: Mutex::new(RunControl::default()),
            }),
        }
    }

    pub fn state(&self) -> &StateHandle {
        &self.inner.state
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Open a new generation without starting the timer.
    ///
    /// Cycles then only run through `tick` or `refresh_now`.
    pub async fn activate(&self) -> u64 {
        let mut run = self.inner.run.lock().await;
        self.activate_locked(&mut run).await
    }

    async fn activate_locked(&self, run: &mut RunControl) -> u64 {
        run.cancel.cancel();
        if let Some(task) = run.task.take() {
            task.abort();
        }
        run.cancel = CancellationToken::new();
        self.inner.state.write().await.begin()
    }

    /// Start the repeating cycle; the first one fires immediately
    pub async fn start(&self) -> u64 {
        let mut run = self.inner.run.lock().await;
        let generation = self.activate_locked(&mut run).await;
        self.spawn_timer(&mut run, generation);

        tracing::info!(
            "Poller started (generation {}, every {:?})",
            generation,
            self.inner.interval
        );
        generation
    }

    /// Cancel the timer and drop whatever the running cycle brings back
    pub async fn stop(&self) {
        let mut run = self.inner.run.lock().await;
        run.cancel.cancel();
        self.inner.state.write().await.halt();
        if let Some(task) = run.task.take() {
            let _ = task.await;
        }
        tracing::info!("Poller stopped");
    }

    /// Turn the timer off while the generation stays active.
    ///
    /// A cycle already running still publishes, and `tick` and
    /// `refresh_now` keep working.
    pub async fn pause(&self) {
        let mut run = self.inner.run.lock().await;
        run.timer.cancel();
        if let Some(task) = run.task.take() {
            let _ = task.await;
            tracing::info!("Auto-refresh paused");
        }
    }

    /// Turn the timer back on; the first cycle fires immediately.
    ///
    /// Returns false when the poller is not active.
    pub async fn resume(&self) -> bool {
        let mut run = self.inner.run.lock().await;
        if run.task.is_some() {
            return true;
        }
        let generation = {
            let state = self.inner.state.read().await;
            if !state.is_active() {
                return false;
            }
            state.generation()
        };
        self.spawn_timer(&mut run, generation);
        tracing::info!("Auto-refresh resumed (generation {})", generation);
        true
    }

    /// True while the timer drives cycles
    pub async fn is_auto_refreshing(&self) -> bool {
        let run = self.inner.run.lock().await;
        run.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn spawn_timer(&self, run: &mut RunControl, generation: u64) {
        run.timer = run.cancel.child_token();
        run.task = Some(tokio::spawn(run_loop(
            self.clone(),
            generation,
            run.timer.clone(),
            run.cancel.clone(),
        )));
    }

    /// Run one cycle now for the current generation
    pub async fn tick(&self) -> CycleOutcome {
        let Some(guard) = InFlightGuard::acquire(&self.inner) else {
            tracing::debug!("Skipping tick: previous cycle still in flight");
            return CycleOutcome::Skipped;
        };
        match self.current().await {
            Some((generation, cancel)) => self.run_cycle(guard, generation, cancel).await,
            None => CycleOutcome::Inactive,
        }
    }

    /// Out-of-band cycle; dropped if one is already running
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let Some((generation, cancel)) = self.current().await else {
            return RefreshOutcome::Inactive;
        };
        let Some(guard) = InFlightGuard::acquire(&self.inner) else {
            tracing::debug!("Manual refresh dropped: cycle already in flight");
            return RefreshOutcome::AlreadyInFlight;
        };

        tracing::debug!("Manual refresh for generation {}", generation);
        let poller = self.clone();
        tokio::spawn(async move {
            poller.run_cycle(guard, generation, cancel).await;
        });
        RefreshOutcome::Started
    }

    async fn current(&self) -> Option<(u64, CancellationToken)> {
        let run = self.inner.run.lock().await;
        let state = self.inner.state.read().await;
        state
            .is_active()
            .then(|| (state.generation(), run.cancel.clone()))
    }

    async fn run_cycle(
        &self,
        _guard: InFlightGuard,
        generation: u64,
        cancel: CancellationToken,
    ) -> CycleOutcome {
        tracing::debug!("Poll cycle starting (generation {})", generation);

        let result = tokio::select! {
            result = self.inner.source.fetch() => result,
            _ = cancel.cancelled() => {
                tracing::debug!("Poll cycle of generation {} abandoned", generation);
                return CycleOutcome::Discarded;
            }
        };

        let now = Utc::now();
        let mut state = self.inner.state.write().await;
        match result {
            Ok(data) => {
                if state.publish(generation, data, now) {
                    tracing::debug!("Published snapshot (generation {})", generation);
                    CycleOutcome::Published
                } else {
                    CycleOutcome::Discarded
                }
            }
            Err(e) => {
                let message = e.to_string();
                if state.record_failure(generation, message.clone(), now) {
                    tracing::warn!("Poll cycle failed, keeping previous data: {}", message);
                    CycleOutcome::Failed
                } else {
                    CycleOutcome::Discarded
                }
            }
        }
    }
}

async fn run_loop(
    poller: Poller,
    generation: u64,
    timer: CancellationToken,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poller.inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = timer.cancelled() => {
                tracing::debug!("Polling loop of generation {} cancelled", generation);
                break;
            }
            _ = ticker.tick() => {
                let Some(guard) = InFlightGuard::acquire(&poller.inner) else {
                    tracing::debug!("Skipping tick: previous cycle still in flight");
                    continue;
                };
                let poller = poller.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    poller.run_cycle(guard, generation, cancel).await;
                });
            }
        }
    }
}
