use crate::{error::SyncError, key::Key, traits::Record, value::Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator joining ordered primary-key segments into a reference key.
pub const REFERENCE_KEY_SEPARATOR: &str = "-";

///
/// KeyMap
///
/// One-column associative primary key, the normalized element of a
/// reference value. Field order for reference-key construction comes from
/// the related entity's declared primary-key fields, not from the map.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct KeyMap {
    entries: BTreeMap<String, Key>,
}

impl KeyMap {
    /// Build a single-field key map, the only shape this engine produces.
    #[must_use]
    pub fn single(field: impl Into<String>, key: Key) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(field.into(), key);

        Self { entries }
    }

    /// Add a field to the map. Only test fixtures build multi-field maps;
    /// attach validation rejects composite keys before they reach the diff.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, key: Key) -> Self {
        self.entries.insert(field.into(), key);
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Key> {
        self.entries.get(field)
    }

    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Key)> {
        self.entries.iter().map(|(field, key)| (field.as_str(), key))
    }

    /// Build the reference key for this map by concatenating the values of
    /// the ordered fields. A missing field is an upstream normalization bug
    /// and surfaces as a usage error.
    pub fn reference_key(&self, ordered_fields: &[&str]) -> Result<String, SyncError> {
        let mut segments = Vec::with_capacity(ordered_fields.len());

        for field in ordered_fields {
            let key = self.entries.get(*field).ok_or_else(|| {
                SyncError::usage_reference(format!(
                    "missing primary key field '{field}' when building reference key"
                ))
            })?;
            segments.push(key.to_reference_segment());
        }

        Ok(segments.join(REFERENCE_KEY_SEPARATOR))
    }
}

///
/// ReferenceItem
///
/// One element of a reference-value assignment: a bare key, an
/// already-normalized key map, or a related record to take the key from.
///

#[derive(Clone, Debug)]
pub enum ReferenceItem<R: Record> {
    Key(Key),
    Map(KeyMap),
    Record(R),
}

impl<R: Record> From<Key> for ReferenceItem<R> {
    fn from(key: Key) -> Self {
        Self::Key(key)
    }
}

impl<R: Record> From<KeyMap> for ReferenceItem<R> {
    fn from(map: KeyMap) -> Self {
        Self::Map(map)
    }
}

///
/// ReferenceAssign
///
/// Accepted shapes for a reference-value assignment. Bare scalars are not
/// a variant here; the dynamic dispatch surface rejects them explicitly.
///

#[derive(Clone, Debug)]
pub enum ReferenceAssign<R: Record> {
    Record(R),
    Many(Vec<ReferenceItem<R>>),
}

impl<R: Record> ReferenceAssign<R> {
    /// Build an assignment from a list of plain keys.
    #[must_use]
    pub fn keys(keys: impl IntoIterator<Item = Key>) -> Self {
        Self::Many(keys.into_iter().map(ReferenceItem::Key).collect())
    }

    /// Build an assignment from a list of records.
    #[must_use]
    pub fn records(records: impl IntoIterator<Item = R>) -> Self {
        Self::Many(records.into_iter().map(ReferenceItem::Record).collect())
    }

    /// Parse an assignment from the dynamic dispatch surface. Only list
    /// values are accepted; a bare scalar signals caller misuse.
    pub fn try_from_value(value: &Value) -> Result<Self, SyncError> {
        let Value::List(items) = value else {
            return Err(SyncError::usage_reference(
                "invalid reference value: expected a list of keys or records, got a bare scalar",
            ));
        };

        let mut parsed = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let key = item.as_key().ok_or_else(|| {
                SyncError::usage_reference(format!(
                    "invalid reference value element at index {index}: not a key-compatible scalar"
                ))
            })?;
            parsed.push(ReferenceItem::Key(key));
        }

        Ok(Self::Many(parsed))
    }
}

///
/// ReferenceValue
///
/// The desired linked set as currently known to the reconciler. Two
/// states: uninitialized (never computed; save is a no-op) and
/// initialized. A manual-override flag records whether the caller set the
/// value since the last save, which suppresses automatic drift refresh.
///

#[derive(Clone, Debug, Default)]
pub struct ReferenceValue {
    entries: Option<Vec<KeyMap>>,
    manual_override: bool,
}

impl ReferenceValue {
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.entries.is_some()
    }

    #[must_use]
    pub const fn is_manual_override(&self) -> bool {
        self.manual_override
    }

    /// Re-enable automatic drift refresh without touching the entries.
    pub const fn reset_manual_override(&mut self) {
        self.manual_override = false;
    }

    /// Initialize from the live relation. Clears the manual override.
    pub fn init(&mut self, entries: Vec<KeyMap>) {
        self.manual_override = false;
        self.entries = Some(entries);
    }

    /// Overwrite from a caller assignment. Sets the manual override.
    pub fn assign(&mut self, entries: Vec<KeyMap>) {
        self.manual_override = true;
        self.entries = Some(entries);
    }

    #[must_use]
    pub fn entries(&self) -> Option<&[KeyMap]> {
        self.entries.as_deref()
    }

    /// Flatten the stored maps into the single-column key list callers see.
    /// A stored entry missing the expected field is a programmer error.
    pub fn flat_keys(&self, field: &str) -> Result<Vec<Key>, SyncError> {
        let entries = self.entries.as_deref().unwrap_or_default();
        let mut keys = Vec::with_capacity(entries.len());

        for (index, map) in entries.iter().enumerate() {
            let key = map.get(field).ok_or_else(|| {
                SyncError::usage_reference(format!(
                    "invalid reference format at index {index}: expected map with key '{field}'"
                ))
            })?;
            keys.push(key.clone());
        }

        Ok(keys)
    }

    /// Build the reference-key → key-map lookup used by the diff. Duplicate
    /// identifiers collapse here; the first occurrence wins.
    pub fn reference_map(
        &self,
        ordered_fields: &[&str],
    ) -> Result<BTreeMap<String, KeyMap>, SyncError> {
        let entries = self.entries.as_deref().unwrap_or_default();
        let mut map = BTreeMap::new();

        for entry in entries {
            let key = entry.reference_key(ordered_fields)?;
            map.entry(key).or_insert_with(|| entry.clone());
        }

        Ok(map)
    }
}

/// Normalize an assignment into one-column key maps keyed by `field`.
/// Records contribute their primary key; maps must already carry the field.
/// Duplicates (by reference key over `ordered_fields`) are dropped.
pub(crate) fn normalize_assignment<R: Record>(
    assign: ReferenceAssign<R>,
    field: &str,
    ordered_fields: &[&str],
) -> Result<Vec<KeyMap>, SyncError> {
    let items = match assign {
        ReferenceAssign::Record(record) => vec![ReferenceItem::Record(record)],
        ReferenceAssign::Many(items) => items,
    };

    let mut normalized: Vec<KeyMap> = Vec::with_capacity(items.len());
    let mut seen: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let map = match item {
            ReferenceItem::Key(key) => KeyMap::single(field, key),
            ReferenceItem::Record(record) => record.primary_key(),
            ReferenceItem::Map(map) => {
                if !map.contains_field(field) {
                    return Err(SyncError::usage_reference(format!(
                        "invalid reference value element at index {index}: map is missing primary key field '{field}'"
                    )));
                }
                map
            }
        };

        let reference_key = map.reference_key(ordered_fields)?;
        if seen.insert(reference_key) {
            normalized.push(map);
        }
    }

    Ok(normalized)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Category;

    #[test]
    fn reference_key_joins_ordered_fields() {
        let map = KeyMap::single("id", Key::Uint(7));

        assert_eq!(map.reference_key(&["id"]).unwrap(), "7");
    }

    #[test]
    fn reference_key_rejects_missing_field() {
        let map = KeyMap::single("id", Key::Uint(7));
        let err = map.reference_key(&["code"]).unwrap_err();

        assert!(err.is_usage(), "missing field must be a usage error");
        assert!(err.message.contains("'code'"));
    }

    #[test]
    fn uninitialized_reference_value_reports_state() {
        let value = ReferenceValue::default();

        assert!(!value.is_initialized());
        assert!(!value.is_manual_override());
    }

    #[test]
    fn assign_sets_manual_override_and_init_clears_it() {
        let mut value = ReferenceValue::default();

        value.assign(vec![KeyMap::single("id", Key::Uint(1))]);
        assert!(value.is_initialized());
        assert!(value.is_manual_override());

        value.init(vec![KeyMap::single("id", Key::Uint(2))]);
        assert!(value.is_initialized());
        assert!(!value.is_manual_override());
    }

    #[test]
    fn flat_keys_reports_structurally_invalid_entries() {
        let mut value = ReferenceValue::default();
        value.assign(vec![KeyMap::single("code", Key::Uint(1))]);

        let err = value.flat_keys("id").unwrap_err();
        assert!(err.is_usage());
        assert!(err.message.contains("index 0"));
    }

    #[test]
    fn reference_map_collapses_duplicates_first_wins() {
        let mut value = ReferenceValue::default();
        value.assign(vec![
            KeyMap::single("id", Key::Uint(1)),
            KeyMap::single("id", Key::Uint(2)),
            KeyMap::single("id", Key::Uint(1)),
        ]);

        let map = value.reference_map(&["id"]).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("1") && map.contains_key("2"));
    }

    #[test]
    fn normalize_accepts_mixed_items_and_dedups() {
        let assign: ReferenceAssign<Category> = ReferenceAssign::Many(vec![
            ReferenceItem::Key(Key::Uint(1)),
            ReferenceItem::Map(KeyMap::single("id", Key::Uint(2))),
            ReferenceItem::Record(Category::new(1, "dup")),
        ]);

        let normalized = normalize_assignment(assign, "id", &["id"]).unwrap();
        assert_eq!(normalized.len(), 2, "duplicate key 1 must collapse");
    }

    #[test]
    fn normalize_rejects_map_without_primary_key_field() {
        let assign: ReferenceAssign<Category> =
            ReferenceAssign::Many(vec![ReferenceItem::Map(KeyMap::single(
                "code",
                Key::Uint(2),
            ))]);

        let err = normalize_assignment(assign, "id", &["id"]).unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn try_from_value_rejects_bare_scalars() {
        let err = ReferenceAssign::<Category>::try_from_value(&Value::Uint(5)).unwrap_err();

        assert!(err.is_usage());
        assert!(err.message.contains("bare scalar"));
    }

    #[test]
    fn try_from_value_accepts_key_lists() {
        let assign =
            ReferenceAssign::<Category>::try_from_value(&Value::from_keys(&[Key::Uint(5)]))
                .unwrap();

        let ReferenceAssign::Many(items) = assign else {
            panic!("expected Many");
        };
        assert_eq!(items.len(), 1);
    }
}
