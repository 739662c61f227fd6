//! The collector contract and the registry the aggregator fans out over.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use vitals_types::{MetricKind, MetricValue, SampleResult};

/// A pluggable source of one metric kind.
///
/// `collect` must be safe to invoke concurrently with other collectors.
/// Any cross-call state (a delta baseline, ticks since the last sample)
/// must be owned by the collector instance itself behind its own lock,
/// never by a process-wide global: concurrent samplers would otherwise
/// corrupt each other's baseline.
#[async_trait]
pub trait Collector: Send + Sync {
    fn kind(&self) -> MetricKind;

    async fn collect(&self) -> SampleResult<MetricValue>;
}

/// Adapts an async closure into a [`Collector`].
pub struct FnCollector<F> {
    kind: MetricKind,
    f: F,
}

impl<F> FnCollector<F> {
    pub fn new(kind: MetricKind, f: F) -> Self {
        Self { kind, f }
    }
}

#[async_trait]
impl<F, Fut> Collector for FnCollector<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = SampleResult<MetricValue>> + Send,
{
    fn kind(&self) -> MetricKind {
        self.kind
    }

    async fn collect(&self) -> SampleResult<MetricValue> {
        (self.f)().await
    }
}

/// Thread-safe mapping from metric kind to its collector.
///
/// One collector per kind; registering a kind twice replaces the previous
/// collector.
pub struct CollectorRegistry {
    collectors: DashMap<MetricKind, Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self {
            collectors: DashMap::new(),
        }
    }

    pub fn register(&self, collector: Arc<dyn Collector>) {
        let kind = collector.kind();
        if self.collectors.insert(kind, collector).is_some() {
            tracing::warn!(kind = %kind, "replaced previously registered collector");
        } else {
            tracing::debug!(kind = %kind, "registered collector");
        }
    }

    pub fn get(&self, kind: MetricKind) -> Option<Arc<dyn Collector>> {
        self.collectors.get(&kind).map(|entry| entry.value().clone())
    }

    pub fn kinds(&self) -> Vec<MetricKind> {
        self.collectors.iter().map(|entry| *entry.key()).collect()
    }

    /// Snapshot of the registered (kind, collector) pairs.
    pub fn entries(&self) -> Vec<(MetricKind, Arc<dyn Collector>)> {
        self.collectors
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use vitals_types::{CpuLoad, NetworkThroughput, SampleError};

    fn cpu_collector(user_pct: f64) -> Arc<dyn Collector> {
        Arc::new(FnCollector::new(MetricKind::Cpu, move || async move {
            Ok(MetricValue::Cpu(CpuLoad {
                user_pct,
                system_pct: 0.0,
                idle_pct: 100.0 - user_pct,
            }))
        }))
    }

    #[tokio::test]
    async fn test_fn_collector() {
        let collector = cpu_collector(25.0);
        assert_eq!(collector.kind(), MetricKind::Cpu);
        let value = collector.collect().await.unwrap();
        assert_eq!(value.kind(), MetricKind::Cpu);
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let registry = CollectorRegistry::new();
        assert!(registry.is_empty());

        registry.register(cpu_collector(10.0));
        registry.register(Arc::new(FnCollector::new(MetricKind::Memory, || async {
            Err::<MetricValue, _>(SampleError::collection("no data"))
        })));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(MetricKind::Cpu).is_some());
        assert!(registry.get(MetricKind::Disk).is_none());

        let mut kinds = registry.kinds();
        kinds.sort_by_key(|k| k.as_str());
        assert_eq!(kinds, vec![MetricKind::Cpu, MetricKind::Memory]);
    }

    #[tokio::test]
    async fn test_registering_same_kind_replaces() {
        let registry = CollectorRegistry::new();
        registry.register(cpu_collector(10.0));
        registry.register(cpu_collector(90.0));
        assert_eq!(registry.len(), 1);

        let value = registry
            .get(MetricKind::Cpu)
            .unwrap()
            .collect()
            .await
            .unwrap();
        match value {
            MetricValue::Cpu(load) => assert_eq!(load.user_pct, 90.0),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    /// A collector computing a rate from the previous raw reading. The
    /// baseline lives inside the instance, so two instances sampled
    /// concurrently cannot corrupt each other.
    struct ThroughputCollector {
        raw_counter: Mutex<u64>,
        previous: Mutex<Option<u64>>,
    }

    #[async_trait]
    impl Collector for ThroughputCollector {
        fn kind(&self) -> MetricKind {
            MetricKind::Network
        }

        async fn collect(&self) -> SampleResult<MetricValue> {
            let raw = {
                let mut counter = self.raw_counter.lock();
                *counter += 1500;
                *counter
            };
            let delta = {
                let mut prev = self.previous.lock();
                let delta = prev.map(|p| raw - p).unwrap_or(0);
                *prev = Some(raw);
                delta
            };
            Ok(MetricValue::Network(NetworkThroughput {
                rx_bytes_per_sec: delta as f64,
                tx_bytes_per_sec: 0.0,
            }))
        }
    }

    #[tokio::test]
    async fn test_delta_state_is_per_instance() {
        let a = ThroughputCollector {
            raw_counter: Mutex::new(0),
            previous: Mutex::new(None),
        };
        let b = ThroughputCollector {
            raw_counter: Mutex::new(0),
            previous: Mutex::new(None),
        };

        // First observation from each instance is the well-known zero.
        let first_a = a.collect().await.unwrap();
        let first_b = b.collect().await.unwrap();
        for value in [first_a, first_b] {
            match value {
                MetricValue::Network(t) => assert_eq!(t.rx_bytes_per_sec, 0.0),
                other => panic!("unexpected value: {:?}", other),
            }
        }

        // Interleaved later observations stay independent.
        match a.collect().await.unwrap() {
            MetricValue::Network(t) => assert_eq!(t.rx_bytes_per_sec, 1500.0),
            other => panic!("unexpected value: {:?}", other),
        }
        match b.collect().await.unwrap() {
            MetricValue::Network(t) => assert_eq!(t.rx_bytes_per_sec, 1500.0),
            other => panic!("unexpected value: {:?}", other),
        }
    }
}
