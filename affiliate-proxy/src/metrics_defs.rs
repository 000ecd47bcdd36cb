use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Inbound request duration in seconds. Tagged with route, status.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const UPSTREAM_DURATION: MetricDef = MetricDef {
    name: "upstream.duration",
    metric_type: MetricType::Histogram,
    description: "Signed upstream call duration in seconds. Tagged with operation.",
};

pub const UPSTREAM_CALLS: MetricDef = MetricDef {
    name: "upstream.calls",
    metric_type: MetricType::Counter,
    description: "Signed upstream calls. Tagged with operation, outcome.",
};

pub const REFERENCE_RESOLUTIONS: MetricDef = MetricDef {
    name: "resolver.resolutions",
    metric_type: MetricType::Counter,
    description: "Caller references by resolved kind (product_id, search_term, unresolved)",
};

pub const CALLBACKS: MetricDef = MetricDef {
    name: "callback.received",
    metric_type: MetricType::Counter,
    description: "Callback pings and notifications acknowledged. Tagged with kind.",
};

// TODO: all metrics must be added here for now, this can be done dynamically with a macro in the future.
pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    UPSTREAM_DURATION,
    UPSTREAM_CALLS,
    REFERENCE_RESOLUTIONS,
    CALLBACKS,
];
