//! Observability: in-memory reconcile counters and the sink abstraction.
//!
//! Reconciler logic never touches counter state directly; all
//! instrumentation flows through `MetricsEvent` and `MetricsSink`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventState, RelationCounters};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_sink_override};
