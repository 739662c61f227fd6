//! Metric model: kinds, values, per-round outcomes, and snapshots.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SampleError;
use crate::time::UtcTime;

/// Identifies which collector produced a value.
///
/// Closed enumeration; used as the key when merging outcomes into a
/// [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Cpu,
    Memory,
    Power,
    Disk,
    Network,
    Process,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Power,
        MetricKind::Disk,
        MetricKind::Network,
        MetricKind::Process,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Power => "power",
            MetricKind::Disk => "disk",
            MetricKind::Network => "network",
            MetricKind::Process => "process",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU usage shares over the last sampling window, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuLoad {
    pub user_pct: f64,
    pub system_pct: f64,
    pub idle_pct: f64,
}

/// Physical memory occupancy in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

/// Battery charge state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BatteryState {
    pub charge_pct: f64,
    pub on_ac_power: bool,
}

/// Disk capacity for the primary volume, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// Network throughput since the previous sample, in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkThroughput {
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

/// Process table statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessStats {
    pub total: u32,
    pub running: u32,
}

/// A collected metric value, tagged by the kind that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValue {
    Cpu(CpuLoad),
    Memory(MemoryUsage),
    Power(BatteryState),
    Disk(DiskUsage),
    Network(NetworkThroughput),
    Process(ProcessStats),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Cpu(_) => MetricKind::Cpu,
            MetricValue::Memory(_) => MetricKind::Memory,
            MetricValue::Power(_) => MetricKind::Power,
            MetricValue::Disk(_) => MetricKind::Disk,
            MetricValue::Network(_) => MetricKind::Network,
            MetricValue::Process(_) => MetricKind::Process,
        }
    }
}

/// The result of exactly one collector invocation in one round.
#[derive(Debug, Clone)]
pub enum MetricOutcome {
    Success {
        value: MetricValue,
        at: UtcTime,
    },
    Failure {
        kind: MetricKind,
        error: SampleError,
        at: UtcTime,
    },
}

impl MetricOutcome {
    pub fn success(value: MetricValue, at: UtcTime) -> Self {
        Self::Success { value, at }
    }

    pub fn failure(kind: MetricKind, error: SampleError, at: UtcTime) -> Self {
        Self::Failure { kind, error, at }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn value(&self) -> Option<&MetricValue> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&SampleError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    /// Physical completion time of the collector invocation.
    pub fn at(&self) -> UtcTime {
        match self {
            Self::Success { at, .. } | Self::Failure { at, .. } => *at,
        }
    }
}

/// An immutable value with its capture timestamp.
#[derive(Debug, Clone)]
pub struct Sample<T> {
    pub value: T,
    pub captured_at: UtcTime,
}

impl<T> Sample<T> {
    pub fn new(value: T, captured_at: UtcTime) -> Self {
        Self { value, captured_at }
    }
}

/// The merged result of all collectors for one tick.
///
/// `taken_at` is captured once at round start, so every entry shares one
/// logical collection instant even when physical collection is skewed.
/// Constructed once by the aggregator and never mutated afterwards.
#[derive(Debug, Clone)]
#[must_use]
pub struct Snapshot {
    taken_at: UtcTime,
    outcomes: HashMap<MetricKind, MetricOutcome>,
}

impl Snapshot {
    pub fn new(taken_at: UtcTime, outcomes: HashMap<MetricKind, MetricOutcome>) -> Self {
        Self { taken_at, outcomes }
    }

    pub fn taken_at(&self) -> UtcTime {
        self.taken_at
    }

    pub fn get(&self, kind: MetricKind) -> Option<&MetricOutcome> {
        self.outcomes.get(&kind)
    }

    pub fn outcomes(&self) -> &HashMap<MetricKind, MetricOutcome> {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// Every collector in the round succeeded.
    pub fn is_complete(&self) -> bool {
        self.failure_count() == 0
    }

    /// The round produced zero successes (still a deliverable snapshot).
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.success_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_value() -> MetricValue {
        MetricValue::Cpu(CpuLoad {
            user_pct: 12.5,
            system_pct: 4.5,
            idle_pct: 83.0,
        })
    }

    #[test]
    fn test_metric_kind_display() {
        assert_eq!(MetricKind::Cpu.to_string(), "cpu");
        assert_eq!(MetricKind::Network.as_str(), "network");
        assert_eq!(MetricKind::ALL.len(), 6);
    }

    #[test]
    fn test_metric_value_kind() {
        assert_eq!(cpu_value().kind(), MetricKind::Cpu);
        assert_eq!(
            MetricValue::Memory(MemoryUsage::default()).kind(),
            MetricKind::Memory
        );
        assert_eq!(
            MetricValue::Power(BatteryState::default()).kind(),
            MetricKind::Power
        );
    }

    #[test]
    fn test_metric_value_serde() {
        let v = cpu_value();
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("cpu"));
        let back: MetricValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_outcome_accessors() {
        let at = UtcTime::now();
        let ok = MetricOutcome::success(cpu_value(), at);
        assert!(ok.is_success());
        assert!(ok.value().is_some());
        assert!(ok.error().is_none());
        assert_eq!(ok.at(), at);

        let failed = MetricOutcome::failure(
            MetricKind::Memory,
            SampleError::collection("vm_stat unavailable"),
            at,
        );
        assert!(!failed.is_success());
        assert!(failed.value().is_none());
        assert!(failed.error().is_some());
    }

    #[test]
    fn test_snapshot_counts() {
        let at = UtcTime::now();
        let mut outcomes = HashMap::new();
        outcomes.insert(MetricKind::Cpu, MetricOutcome::success(cpu_value(), at));
        outcomes.insert(
            MetricKind::Memory,
            MetricOutcome::failure(MetricKind::Memory, SampleError::collection("nope"), at),
        );
        let snap = Snapshot::new(at, outcomes);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.success_count(), 1);
        assert_eq!(snap.failure_count(), 1);
        assert!(!snap.is_complete());
        assert!(!snap.all_failed());
        assert!(snap.get(MetricKind::Cpu).unwrap().is_success());
    }

    #[test]
    fn test_snapshot_all_failed() {
        let at = UtcTime::now();
        let mut outcomes = HashMap::new();
        outcomes.insert(
            MetricKind::Disk,
            MetricOutcome::failure(MetricKind::Disk, SampleError::collection("statfs"), at),
        );
        let snap = Snapshot::new(at, outcomes);
        assert!(snap.all_failed());

        let empty = Snapshot::new(at, HashMap::new());
        assert!(empty.is_empty());
        assert!(!empty.all_failed());
    }
}
