use shared::metrics_defs::{MetricDef, MetricType};

pub const BULK_SUBCALLS: MetricDef = MetricDef {
    name: "bulk.subcalls",
    metric_type: MetricType::Counter,
    description: "Sub-requests executed through the bulk dispatcher",
};

pub const BULK_REJECTED: MetricDef = MetricDef {
    name: "bulk.rejected",
    metric_type: MetricType::Counter,
    description: "Bulk requests rejected before any sub-request executed",
};

pub const BULK_SIZE: MetricDef = MetricDef {
    name: "bulk.size",
    metric_type: MetricType::Histogram,
    description: "Number of sub-requests per accepted bulk request",
};

pub const ALL_METRICS: &[MetricDef] = &[BULK_SUBCALLS, BULK_REJECTED, BULK_SIZE];
