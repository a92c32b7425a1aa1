//! Seams between the reconciler and the host persistence layer.
//!
//! The engine never reaches into storage directly: relation reads, junction
//! mutation, and batched lookup all flow through these traits, and storage
//! failures surface through them unchanged.

use crate::{error::SyncError, key::Key, reference::KeyMap, value::Value};
use std::fmt::Debug;

///
/// Record
///
/// A related entity as the reconciler sees it: a stable entity name, the
/// declared primary-key fields, and a normalized primary-key map. Exactly
/// one primary-key field is supported; attach validation rejects more.
///

pub trait Record: Clone + Debug + 'static {
    const ENTITY_NAME: &'static str;
    const PRIMARY_KEY_FIELDS: &'static [&'static str];

    /// The full primary key as a field → key map, in the shape
    /// `PRIMARY_KEY_FIELDS` declares.
    fn primary_key(&self) -> KeyMap;

    /// Convenience accessor for the single-column key. Errors if the
    /// primary-key map does not carry the first declared field.
    fn key(&self) -> Result<Key, SyncError> {
        let field = Self::PRIMARY_KEY_FIELDS.first().ok_or_else(|| {
            SyncError::usage_reference(format!(
                "entity '{}' declares no primary key fields",
                Self::ENTITY_NAME
            ))
        })?;

        self.primary_key().get(field).cloned().ok_or_else(|| {
            SyncError::usage_reference(format!(
                "entity '{}' primary key map is missing field '{field}'",
                Self::ENTITY_NAME
            ))
        })
    }
}

///
/// RelationModel
///
/// Static descriptor for a named relation on a host: which entity it
/// resolves to. Resolved once at attach time.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RelationModel {
    pub name: &'static str,
    pub related_entity: &'static str,
}

///
/// RelationHost
///
/// The owner-side persistence surface: relation metadata, the currently
/// populated related records, and the link/unlink junction primitives.
/// Mutation calls are sequential and not batched; the caller's transaction
/// boundary owns atomicity.
///

pub trait RelationHost<R: Record> {
    /// Resolve a relation descriptor by name. `None` means the host has no
    /// accessor for that relation.
    fn relation(&self, name: &str) -> Option<RelationModel>;

    /// Whether the named relation is currently populated in memory.
    fn is_relation_populated(&self, name: &str) -> bool;

    /// The related records attached to the relation, lazily populating it
    /// from storage on first access the way an ORM relation accessor does.
    fn related_records(&mut self, name: &str) -> Result<Vec<R>, SyncError>;

    /// Insert a junction row linking `record`, carrying the resolved extra
    /// columns, and attach it to the in-memory relation.
    fn link(&mut self, name: &str, record: &R, extra: &[(String, Value)])
    -> Result<(), SyncError>;

    /// Detach `record` from the in-memory relation; when `delete` is true,
    /// physically delete the junction row as well.
    fn unlink(&mut self, name: &str, record: &R, delete: bool) -> Result<(), SyncError>;

    /// Tear down the whole relation with one bulk call, honoring `delete`.
    fn unlink_all(&mut self, name: &str, delete: bool) -> Result<(), SyncError>;
}

///
/// Repository
///
/// Batched lookup of related records by primary key. Injected at
/// reconciler construction; the engine issues one `find_all` per
/// reconciliation, never per-key fetches.
///

pub trait Repository<R: Record> {
    fn find_all(&self, keys: &[KeyMap]) -> Result<Vec<R>, SyncError>;
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Category, Revision};

    #[test]
    fn record_key_returns_single_column_key() {
        let category = Category::new(4, "music");

        assert_eq!(category.key().unwrap(), Key::Uint(4));
    }

    #[test]
    fn composite_record_declares_multiple_fields() {
        assert_eq!(Revision::PRIMARY_KEY_FIELDS.len(), 2);
    }
}
