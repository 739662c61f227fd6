//! The periodic sampler: owns the tick loop, the snapshot history, and
//! the start/stop lifecycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vitals_types::{Sample, SampleResult, Snapshot};

use crate::aggregator::SnapshotAggregator;
use crate::cancel;
use crate::collector::CollectorRegistry;
use crate::config::SamplerConfig;
use crate::history::BoundedHistory;

type SnapshotHook = dyn Fn(&Snapshot) -> anyhow::Result<()> + Send + Sync;

/// Periodically collects snapshots from a set of collectors.
///
/// Lifecycle is Idle -> Running -> Idle: `start` while running and `stop`
/// while idle are no-ops, and a stopped sampler can be started again. The
/// loop performs its first collection round immediately, then waits
/// `tick_interval` between rounds; tick *n+1* never begins before tick
/// *n*'s snapshot has been delivered.
pub struct Sampler {
    config: SamplerConfig,
    registry: Arc<CollectorRegistry>,
    history: Option<Arc<BoundedHistory<Snapshot>>>,
    latest: Arc<Mutex<Option<Snapshot>>>,
    hook: Option<Arc<SnapshotHook>>,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Sampler {
    pub fn new(config: SamplerConfig, registry: CollectorRegistry) -> SampleResult<Self> {
        config.validate()?;
        let history = if config.history_capacity > 0 {
            Some(Arc::new(BoundedHistory::new(config.history_capacity)?))
        } else {
            None
        };
        Ok(Self {
            config,
            registry: Arc::new(registry),
            history,
            latest: Arc::new(Mutex::new(None)),
            hook: None,
            running: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            shutdown_tx: Mutex::new(None),
            task: Mutex::new(None),
        })
    }

    /// Install a hook invoked synchronously with every delivered snapshot.
    ///
    /// A hook error is logged and does not stop the loop. The hook runs on
    /// the sampler's loop task; from inside it, use
    /// [`Sampler::request_stop`] rather than [`Sampler::stop`].
    pub fn with_snapshot_hook(
        mut self,
        hook: impl Fn(&Snapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Spawn the tick loop. No-op if already running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("sampler already running");
            return;
        }

        let (tx, rx) = watch::channel(false);
        *self.shutdown_tx.lock() = Some(tx);

        tracing::info!(
            tick_interval = %self.config.tick_interval,
            collectors = self.registry.len(),
            "sampler started"
        );

        let handle = tokio::spawn(run_loop(LoopState {
            config: self.config.clone(),
            registry: self.registry.clone(),
            history: self.history.clone(),
            latest: self.latest.clone(),
            hook: self.hook.clone(),
            running: self.running.clone(),
            ticks: self.ticks.clone(),
            shutdown_rx: rx,
        }));
        *self.task.lock() = Some(handle);
    }

    /// Signal the loop to exit at its next suspension point.
    ///
    /// Synchronous and idempotent; safe to call from inside the snapshot
    /// hook. Does not wait for the loop to exit — use [`Sampler::stop`]
    /// for that guarantee.
    pub fn request_stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().as_ref() {
            let _ = tx.send(true);
        }
    }

    /// Stop the loop and wait until it has exited.
    ///
    /// After this returns, no further tick will run. Idempotent; no-op
    /// when idle.
    pub async fn stop(&self) {
        self.request_stop();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if handle.await.is_err() {
                tracing::warn!("sampler loop task aborted or panicked");
            }
        }
        *self.shutdown_tx.lock() = None;
        tracing::info!(ticks = self.tick_count(), "sampler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Total completed collection rounds since construction.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// The most recently delivered snapshot, if any tick has completed.
    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        self.latest.lock().clone()
    }

    /// Retained snapshots, oldest first. Empty when retention is disabled.
    pub fn history_snapshot(&self) -> Vec<Sample<Snapshot>> {
        match &self.history {
            Some(history) => history.snapshot(),
            None => Vec::new(),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}

struct LoopState {
    config: SamplerConfig,
    registry: Arc<CollectorRegistry>,
    history: Option<Arc<BoundedHistory<Snapshot>>>,
    latest: Arc<Mutex<Option<Snapshot>>>,
    hook: Option<Arc<SnapshotHook>>,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    shutdown_rx: watch::Receiver<bool>,
}

async fn run_loop(mut state: LoopState) {
    let aggregator = SnapshotAggregator::new(state.config.aggregator.clone());

    loop {
        if cancel::is_cancelled(&state.shutdown_rx) {
            break;
        }

        match aggregator
            .collect_round(&state.registry, &state.shutdown_rx)
            .await
        {
            Ok(snapshot) => {
                state.ticks.fetch_add(1, Ordering::SeqCst);
                deliver(&state, snapshot);
            }
            Err(err) if err.is_cancelled() => break,
            Err(err) => {
                // Strict aggregator policy rejected the round; the tick
                // still happened.
                state.ticks.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(error = %err, "collection round produced no snapshot");
            }
        }

        tokio::select! {
            biased;
            _ = cancel::cancelled(&mut state.shutdown_rx) => break,
            _ = tokio::time::sleep(state.config.tick_interval.into()) => {}
        }
    }

    state.running.store(false, Ordering::SeqCst);
    tracing::debug!("sampler loop exited");
}

fn deliver(state: &LoopState, snapshot: Snapshot) {
    tracing::debug!(
        successes = snapshot.success_count(),
        failures = snapshot.failure_count(),
        "tick complete"
    );

    if let Some(history) = &state.history {
        if let Err(err) = history.push(snapshot.clone(), snapshot.taken_at()) {
            tracing::warn!(error = %err, "snapshot rejected by history");
        }
    }

    *state.latest.lock() = Some(snapshot.clone());

    if let Some(hook) = &state.hook {
        if let Err(err) = hook(&snapshot) {
            tracing::error!(error = %err, "snapshot hook failed");
        }
    }
}
