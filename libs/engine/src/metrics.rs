use crate::Channel;
use std::time;
use vise::{Buckets, Counter, EncodeLabelSet, EncodeLabelValue, Family, Gauge, Histogram, Metrics, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EncodeLabelValue)]
#[metrics(rename_all = "snake_case")]
pub(crate) enum PutOutcome {
    /// Snapshot took a new slot.
    Enqueued,
    /// Snapshot was already pending on the final channel.
    Duplicate,
    /// Signatures of a pending cache snapshot were replaced.
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EncodeLabelSet)]
pub(crate) struct ChannelLabels {
    pub(crate) channel: Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EncodeLabelSet)]
pub(crate) struct PutLabels {
    pub(crate) channel: Channel,
    pub(crate) outcome: PutOutcome,
}

#[derive(Debug, Metrics)]
#[metrics(prefix = "meridian_snapshot_queue")]
pub(crate) struct QueueMetrics {
    /// Completed puts.
    pub(crate) puts: Family<PutLabels, Counter>,
    /// Puts which found their channel full and had to wait.
    pub(crate) backpressure_waits: Family<ChannelLabels, Counter>,
    /// Drained snapshots.
    pub(crate) pops: Family<ChannelLabels, Counter>,
    /// Latency of a successful `process_snapshot()` call.
    #[metrics(unit = Unit::Seconds, buckets = Buckets::LATENCIES)]
    pub(crate) hook_latency: Histogram<time::Duration>,
    /// Failed `process_snapshot()` calls.
    pub(crate) hook_failures: Counter,
    /// Drain cycles which found both channels empty.
    pub(crate) idle_cycles: Counter,
}

#[vise::register]
pub(crate) static QUEUE: vise::Global<QueueMetrics> = vise::Global::new();

#[derive(Debug, Metrics)]
#[metrics(prefix = "meridian_snapshot_store")]
pub(crate) struct StoreState {
    /// Pending snapshots per channel.
    pub(crate) queue_length: Family<ChannelLabels, Gauge<u64>>,
}

#[vise::register]
pub(crate) static STORE_STATE: vise::Collector<Option<StoreState>> = vise::Collector::new();

#[derive(Debug, Metrics)]
#[metrics(prefix = "meridian_snapshot_store")]
pub(crate) struct PersistentStore {
    /// Latency of a successful `write()` call.
    #[metrics(unit = Unit::Seconds, buckets = Buckets::LATENCIES)]
    pub(crate) write_latency: Histogram<time::Duration>,
    /// Latency of a successful `count()` call.
    #[metrics(unit = Unit::Seconds, buckets = Buckets::LATENCIES)]
    pub(crate) count_latency: Histogram<time::Duration>,
}

#[vise::register]
pub(crate) static PERSISTENT_STORE: vise::Global<PersistentStore> = vise::Global::new();
