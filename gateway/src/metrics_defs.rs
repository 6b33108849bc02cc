use shared::metrics_defs::{MetricDef, MetricType};

pub const SUBMISSIONS_ACCEPTED: MetricDef = MetricDef {
    name: "gateway.submissions.accepted",
    metric_type: MetricType::Counter,
    description: "Batches acknowledged with 200 and handed to background aggregation",
};

pub const SUBMISSIONS_REJECTED: MetricDef = MetricDef {
    name: "gateway.submissions.rejected",
    metric_type: MetricType::Counter,
    description: "Batches rejected with 400 before any aggregation",
};

pub const RELAY_FAILED: MetricDef = MetricDef {
    name: "gateway.relay.failed",
    metric_type: MetricType::Counter,
    description: "Relay forwards that timed out, errored, or were rejected upstream",
};

pub const ALL_METRICS: &[MetricDef] = &[SUBMISSIONS_ACCEPTED, SUBMISSIONS_REJECTED, RELAY_FAILED];
