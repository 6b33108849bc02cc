use shared::metrics_defs::{MetricDef, MetricType};

pub const SNAPSHOT_CACHE_HIT: MetricDef = MetricDef {
    name: "aggregator.cache.hit",
    metric_type: MetricType::Counter,
    description: "Accelerator cache lookups that found a snapshot",
};

pub const SNAPSHOT_CACHE_MISS: MetricDef = MetricDef {
    name: "aggregator.cache.miss",
    metric_type: MetricType::Counter,
    description: "Accelerator cache lookups that fell through to the store",
};

pub const MERGE_APPLIED: MetricDef = MetricDef {
    name: "aggregator.merge.applied",
    metric_type: MetricType::Counter,
    description: "Merges that wrote to the durable store",
};

pub const MERGE_SKIPPED: MetricDef = MetricDef {
    name: "aggregator.merge.skipped",
    metric_type: MetricType::Counter,
    description: "Merges answered from the cache without a store write",
};

pub const MERGE_FAILED: MetricDef = MetricDef {
    name: "aggregator.merge.failed",
    metric_type: MetricType::Counter,
    description: "Per-report merges that failed; siblings in the batch continue",
};

pub const REPORTS_DROPPED_ALTITUDE: MetricDef = MetricDef {
    name: "aggregator.reports.dropped_altitude",
    metric_type: MetricType::Counter,
    description: "Reports excluded by the altitude ceiling",
};

pub const ALL_METRICS: &[MetricDef] = &[
    SNAPSHOT_CACHE_HIT,
    SNAPSHOT_CACHE_MISS,
    MERGE_APPLIED,
    MERGE_SKIPPED,
    MERGE_FAILED,
    REPORTS_DROPPED_ALTITUDE,
];
