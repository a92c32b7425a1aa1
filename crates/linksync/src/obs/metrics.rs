use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// Metrics
/// Ephemeral, in-memory counters for reconciliation operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub relations: BTreeMap<String, RelationCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Reconciler entrypoints
    pub reconcile_calls: u64,
    pub unlink_all_calls: u64,

    // Junction mutations applied
    pub links_applied: u64,
    pub unlinks_applied: u64,

    // Reference-value maintenance
    pub drift_refreshes: u64,
}

///
/// RelationCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RelationCounters {
    pub reconcile_calls: u64,
    pub unlink_all_calls: u64,
    pub links_applied: u64,
    pub unlinks_applied: u64,
    pub drift_refreshes: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Clone a point-in-time snapshot of the metrics state.
pub(crate) fn snapshot() -> EventState {
    EVENT_STATE.with(|state| state.borrow().clone())
}

/// Reset all counters to zero.
pub(crate) fn reset_all() {
    EVENT_STATE.with(|state| *state.borrow_mut() = EventState::default());
}
