//! Reconciliation engine for many-to-many associations: keeps a junction
//! table in sync with a virtual attribute holding related-entity keys.
//!
//! A [`reconciler::Reconciler`] attaches to one relation of an owner
//! entity, owns its reference value, detects out-of-band relation drift by
//! fingerprint, and converges the junction table through minimal
//! link/unlink operations after each save.
#![warn(unreachable_pub)]

pub mod dispatch;
pub mod error;
pub mod extra;
pub mod fingerprint;
pub mod key;
pub mod obs;
pub mod reconciler;
pub mod reference;
pub mod traits;
pub mod value;

// In-memory fixtures; gated so only test builds (and the crate's own
// integration tests, via the test-support feature) can reach them.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, fixtures, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        extra::ExtraColumns,
        key::Key,
        reconciler::{Reconciler, ReconcilerConfig},
        reference::{KeyMap, ReferenceAssign},
        traits::{Record, RelationHost, RelationModel, Repository},
        value::Value,
    };
}
