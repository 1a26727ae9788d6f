//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Routing and command code emit `MetricsEvent`s; nothing outside `obs`
//! touches the counter state directly.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{
    ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};
