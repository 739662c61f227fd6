pub mod error;
pub mod metric;
pub mod time;

pub use error::{SampleError, SampleResult};
pub use metric::{
    BatteryState, CpuLoad, DiskUsage, MemoryUsage, MetricKind, MetricOutcome, MetricValue,
    NetworkThroughput, ProcessStats, Sample, Snapshot,
};
pub use time::{Duration, UtcTime};
