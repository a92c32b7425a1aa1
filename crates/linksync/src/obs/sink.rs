//! Metrics sink boundary.
//!
//! Reconciler logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.

use crate::obs::metrics::{self, EventState};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Debug)]
pub enum MetricsEvent {
    ReconcileFinish {
        relation: String,
        links_applied: u64,
        unlinks_applied: u64,
    },
    DriftRefresh {
        relation: String,
    },
    UnlinkAll {
        relation: String,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ReconcileFinish {
                relation,
                links_applied,
                unlinks_applied,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.reconcile_calls = m.ops.reconcile_calls.saturating_add(1);
                    m.ops.links_applied = m.ops.links_applied.saturating_add(links_applied);
                    m.ops.unlinks_applied = m.ops.unlinks_applied.saturating_add(unlinks_applied);

                    let entry = m.relations.entry(relation).or_default();
                    entry.reconcile_calls = entry.reconcile_calls.saturating_add(1);
                    entry.links_applied = entry.links_applied.saturating_add(links_applied);
                    entry.unlinks_applied = entry.unlinks_applied.saturating_add(unlinks_applied);
                });
            }
            MetricsEvent::DriftRefresh { relation } => {
                metrics::with_state_mut(|m| {
                    m.ops.drift_refreshes = m.ops.drift_refreshes.saturating_add(1);

                    let entry = m.relations.entry(relation).or_default();
                    entry.drift_refreshes = entry.drift_refreshes.saturating_add(1);
                });
            }
            MetricsEvent::UnlinkAll { relation } => {
                metrics::with_state_mut(|m| {
                    m.ops.unlink_all_calls = m.ops.unlink_all_calls.saturating_add(1);

                    let entry = m.relations.entry(relation).or_default();
                    entry.unlink_all_calls = entry.unlink_all_calls.saturating_add(1);
                });
            }
        }
    }
}

/// Route one event to the active sink (scoped override, else global state).
pub(crate) fn record(event: MetricsEvent) {
    let overridden = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match overridden {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Execute one closure with a scoped sink override and always restore the
/// previous sink, even if the closure panics.
pub fn with_sink_override<T>(
    sink: Rc<dyn MetricsSink>,
    f: impl FnOnce() -> T + std::panic::UnwindSafe,
) -> T {
    let previous = SINK_OVERRIDE.with(|cell| cell.replace(Some(sink)));
    let result = std::panic::catch_unwind(f);
    SINK_OVERRIDE.with(|cell| *cell.borrow_mut() = previous);
    match result {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Clone a point-in-time snapshot of the global metrics state.
#[must_use]
pub fn metrics_report() -> EventState {
    metrics::snapshot()
}

/// Reset all global counters to zero.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingSink {
        seen: Cell<u64>,
    }

    impl MetricsSink for CountingSink {
        fn record(&self, _event: MetricsEvent) {
            self.seen.set(self.seen.get() + 1);
        }
    }

    #[test]
    fn global_sink_accumulates_per_relation_counters() {
        metrics_reset_all();

        record(MetricsEvent::ReconcileFinish {
            relation: "categories".to_string(),
            links_applied: 2,
            unlinks_applied: 1,
        });
        record(MetricsEvent::DriftRefresh {
            relation: "categories".to_string(),
        });

        let report = metrics_report();
        assert_eq!(report.ops.reconcile_calls, 1);
        assert_eq!(report.ops.links_applied, 2);
        assert_eq!(report.ops.unlinks_applied, 1);
        assert_eq!(report.ops.drift_refreshes, 1);

        let relation = report.relations.get("categories").unwrap();
        assert_eq!(relation.reconcile_calls, 1);
        assert_eq!(relation.drift_refreshes, 1);

        metrics_reset_all();
    }

    #[test]
    fn report_serializes_for_export() {
        metrics_reset_all();

        record(MetricsEvent::ReconcileFinish {
            relation: "categories".to_string(),
            links_applied: 3,
            unlinks_applied: 0,
        });

        let json = serde_json::to_value(metrics_report()).unwrap();
        assert_eq!(json["ops"]["links_applied"], 3);
        assert_eq!(json["relations"]["categories"]["reconcile_calls"], 1);

        metrics_reset_all();
    }

    #[test]
    fn scoped_override_diverts_events_and_restores() {
        metrics_reset_all();

        let sink = Rc::new(CountingSink { seen: Cell::new(0) });
        with_sink_override(sink.clone(), || {
            record(MetricsEvent::UnlinkAll {
                relation: "tags".to_string(),
            });
        });

        assert_eq!(sink.seen.get(), 1);
        assert_eq!(
            metrics_report().ops.unlink_all_calls,
            0,
            "overridden events must not reach global state"
        );
    }
}
