//! Periodic telemetry sampling.
//!
//! A [`Sampler`] owns a repeating tick loop. On each tick the
//! [`SnapshotAggregator`] fans out to every registered [`Collector`]
//! concurrently, each wrapped in a [`Poller`] (deadline, retry,
//! exponential backoff), and fans the per-source results back into one
//! [`Snapshot`](vitals_types::Snapshot). Snapshots are retained in a
//! [`BoundedHistory`] and optionally delivered to a hook.
//!
//! Cancellation is cooperative: every suspending call observes a
//! `tokio::sync::watch` shutdown signal, and a dropped sender counts as
//! cancellation.

pub mod aggregator;
pub mod backoff;
pub mod cancel;
pub mod collector;
pub mod config;
pub mod history;
pub mod poller;
pub mod sampler;

pub use aggregator::SnapshotAggregator;
pub use backoff::ExponentialBackoff;
pub use collector::{Collector, CollectorRegistry, FnCollector};
pub use config::{AggregatorConfig, PollConfig, SamplerConfig};
pub use history::BoundedHistory;
pub use poller::Poller;
pub use sampler::Sampler;
