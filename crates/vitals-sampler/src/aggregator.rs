//! One collection round: concurrent fan-out to all collectors, fan-in of
//! partial results into a single snapshot.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use vitals_types::{MetricKind, MetricOutcome, SampleError, SampleResult, Snapshot, UtcTime};

use crate::cancel;
use crate::collector::CollectorRegistry;
use crate::config::AggregatorConfig;
use crate::poller::Poller;

/// Runs collection rounds against a [`CollectorRegistry`].
///
/// Every registered collector is invoked concurrently, each wrapped in its
/// own [`Poller`]. A failing or timed-out collector contributes a failure
/// outcome for its kind and never aborts the others; the round produces a
/// best-effort snapshot unless it is cancelled.
pub struct SnapshotAggregator {
    config: AggregatorConfig,
}

impl SnapshotAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Collect one snapshot.
    ///
    /// The snapshot's `taken_at` is captured once at round start, so all
    /// entries share one logical collection instant even though physical
    /// collection is skewed. Collectors still pending when
    /// `round_deadline` elapses are aborted and reported as timed out.
    ///
    /// Returns `Err(Cancelled)` if the signal fires mid-round; with
    /// `fail_when_all_failed` set, a round with zero successes is an
    /// error as well. Everything else is `Ok`.
    pub async fn collect_round(
        &self,
        registry: &CollectorRegistry,
        cancel: &watch::Receiver<bool>,
    ) -> SampleResult<Snapshot> {
        let taken_at = UtcTime::now();
        let entries = registry.entries();
        let expected: Vec<MetricKind> = entries.iter().map(|(kind, _)| *kind).collect();
        tracing::debug!(collectors = entries.len(), "collection round started");

        let (tx, mut rx) = mpsc::channel::<(MetricKind, MetricOutcome)>(entries.len().max(1));
        let mut handles = Vec::with_capacity(entries.len());
        for (kind, collector) in entries {
            let tx = tx.clone();
            let mut cancel_rx = cancel.clone();
            let poller = Poller::new(self.config.poll.clone());
            handles.push(tokio::spawn(async move {
                let result = poller
                    .execute(&mut cancel_rx, || {
                        let collector = collector.clone();
                        async move { collector.collect().await }
                    })
                    .await;
                let outcome = match result {
                    Ok(value) => MetricOutcome::success(value, UtcTime::now()),
                    // The round-level select observes the same signal;
                    // cancellation never becomes a snapshot entry.
                    Err(SampleError::Cancelled) => return,
                    Err(err) => MetricOutcome::failure(kind, err, UtcTime::now()),
                };
                let _ = tx.send((kind, outcome)).await;
            }));
        }
        drop(tx);

        let mut outcomes: HashMap<MetricKind, MetricOutcome> =
            HashMap::with_capacity(expected.len());
        let mut cancel_rx = cancel.clone();
        let deadline = tokio::time::sleep(self.config.round_deadline.into());
        tokio::pin!(deadline);

        let mut pending = expected.len();
        while pending > 0 {
            tokio::select! {
                biased;
                _ = cancel::cancelled(&mut cancel_rx) => {
                    for handle in &handles {
                        handle.abort();
                    }
                    return Err(SampleError::Cancelled);
                }
                _ = &mut deadline => break,
                received = rx.recv() => match received {
                    Some((kind, outcome)) => {
                        if let Some(err) = outcome.error() {
                            tracing::warn!(kind = %kind, error = %err, "collector failed this round");
                        }
                        outcomes.insert(kind, outcome);
                        pending -= 1;
                    }
                    // All senders gone; workers that exited on cancel
                    // produce nothing, handled below.
                    None => break,
                },
            }
        }

        if cancel::is_cancelled(&cancel_rx) {
            for handle in &handles {
                handle.abort();
            }
            return Err(SampleError::Cancelled);
        }

        // Whatever is still missing blew the round deadline.
        for handle in &handles {
            handle.abort();
        }
        for kind in expected {
            if !outcomes.contains_key(&kind) {
                tracing::warn!(kind = %kind, deadline = %self.config.round_deadline, "collector missed the round deadline");
                outcomes.insert(
                    kind,
                    MetricOutcome::failure(
                        kind,
                        SampleError::Timeout {
                            elapsed: self.config.round_deadline,
                        },
                        UtcTime::now(),
                    ),
                );
            }
        }

        let snapshot = Snapshot::new(taken_at, outcomes);
        if self.config.fail_when_all_failed && snapshot.all_failed() {
            return Err(SampleError::fatal("every collector failed in the round"));
        }
        tracing::debug!(
            successes = snapshot.success_count(),
            failures = snapshot.failure_count(),
            elapsed = %taken_at.elapsed(),
            "collection round finished"
        );
        Ok(snapshot)
    }
}
