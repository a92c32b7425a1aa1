use crate::{
    error::SyncError,
    reference::KeyMap,
    test_support::{Category, Revision, Tag},
    traits::{Record, RelationHost, RelationModel, Repository},
    value::Value,
};
use std::collections::BTreeMap;

///
/// TestStore
///
/// Per-relation in-memory storage: the related table, the in-memory
/// populated relation, and the physical junction rows keyed by reference
/// key. Keeping the three apart is what lets tests tell "detached in
/// memory" from "row deleted in storage".
///

#[derive(Debug)]
pub struct TestStore<R: Record> {
    pub records: Vec<R>,
    pub populated: Option<Vec<R>>,
    pub junction: BTreeMap<String, Vec<(String, Value)>>,
    pub fail_next_unlink: bool,
}

impl<R: Record> Default for TestStore<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: Record> TestStore<R> {
    #[must_use]
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records,
            populated: None,
            junction: BTreeMap::new(),
            fail_next_unlink: false,
        }
    }

    fn reference_key(record: &R) -> Result<String, SyncError> {
        record.primary_key().reference_key(R::PRIMARY_KEY_FIELDS)
    }

    /// Insert a junction row during test setup without touching the
    /// in-memory relation.
    pub fn seed_link(&mut self, record: &R) -> Result<(), SyncError> {
        self.junction.insert(Self::reference_key(record)?, Vec::new());
        Ok(())
    }

    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.populated.is_some()
    }

    /// Externally overwrite the in-memory relation, bypassing the junction
    /// table. This is the out-of-band mutation drift detection watches for.
    pub fn populate(&mut self, records: Vec<R>) {
        self.populated = Some(records);
    }

    /// Relation accessor: lazily loads linked records from the junction
    /// table on first access.
    pub fn load(&mut self) -> Result<Vec<R>, SyncError> {
        if self.populated.is_none() {
            let mut linked = Vec::new();
            for record in &self.records {
                if self.junction.contains_key(&Self::reference_key(record)?) {
                    linked.push(record.clone());
                }
            }
            self.populated = Some(linked);
        }

        Ok(self.populated.clone().unwrap_or_default())
    }

    pub fn link(&mut self, record: &R, extra: &[(String, Value)]) -> Result<(), SyncError> {
        self.junction
            .insert(Self::reference_key(record)?, extra.to_vec());
        self.populated
            .get_or_insert_with(Vec::new)
            .push(record.clone());

        Ok(())
    }

    pub fn unlink(&mut self, record: &R, delete: bool) -> Result<(), SyncError> {
        if self.fail_next_unlink {
            self.fail_next_unlink = false;
            return Err(SyncError::store_conflict(
                "stale row: junction row changed since it was read",
            ));
        }

        let key = Self::reference_key(record)?;
        if delete {
            self.junction.remove(&key);
        }

        let unlinked_key = record.primary_key();
        if let Some(populated) = self.populated.as_mut() {
            populated.retain(|existing| existing.primary_key() != unlinked_key);
        }

        Ok(())
    }

    pub fn unlink_all(&mut self, delete: bool) -> Result<(), SyncError> {
        if delete {
            self.junction.clear();
        }
        self.populated = Some(Vec::new());

        Ok(())
    }

    /// Physical junction row lookup by record.
    pub fn junction_row(&self, record: &R) -> Result<Option<&Vec<(String, Value)>>, SyncError> {
        Ok(self.junction.get(&Self::reference_key(record)?))
    }

    #[must_use]
    pub fn junction_len(&self) -> usize {
        self.junction.len()
    }
}

///
/// InMemoryRepository
///
/// Batched primary-key lookup over a plain record list.
///

#[derive(Clone, Debug)]
pub struct InMemoryRepository<R: Record> {
    pub records: Vec<R>,
}

impl<R: Record> Default for InMemoryRepository<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: Record> InMemoryRepository<R> {
    #[must_use]
    pub const fn new(records: Vec<R>) -> Self {
        Self { records }
    }
}

impl<R: Record> Repository<R> for InMemoryRepository<R> {
    fn find_all(&self, keys: &[KeyMap]) -> Result<Vec<R>, SyncError> {
        let mut found = Vec::with_capacity(keys.len());

        for requested in keys {
            let matched = self.records.iter().find(|record| {
                let pk = record.primary_key();
                R::PRIMARY_KEY_FIELDS
                    .iter()
                    .all(|field| pk.get(field) == requested.get(field))
            });
            if let Some(record) = matched {
                found.push(record.clone());
            }
        }

        Ok(found)
    }
}

///
/// TestHost
///
/// An owner entity with a categories relation, a tags relation, and a
/// composite-key revisions relation (attach-rejection fodder). `miscast`
/// resolves to the tag entity so attach can catch a wrong related type.
///

#[derive(Debug, Default)]
pub struct TestHost {
    pub categories: TestStore<Category>,
    pub tags: TestStore<Tag>,
}

impl TestHost {
    pub const CATEGORIES: &'static str = "categories";
    pub const TAGS: &'static str = "tags";
    pub const REVISIONS: &'static str = "revisions";
    pub const MISCAST: &'static str = "miscast";

    fn known_relation(name: &str) -> Option<RelationModel> {
        match name {
            Self::CATEGORIES => Some(RelationModel {
                name: Self::CATEGORIES,
                related_entity: Category::ENTITY_NAME,
            }),
            Self::TAGS => Some(RelationModel {
                name: Self::TAGS,
                related_entity: Tag::ENTITY_NAME,
            }),
            Self::REVISIONS => Some(RelationModel {
                name: Self::REVISIONS,
                related_entity: Revision::ENTITY_NAME,
            }),
            Self::MISCAST => Some(RelationModel {
                name: Self::MISCAST,
                related_entity: Tag::ENTITY_NAME,
            }),
            _ => None,
        }
    }

    fn unknown_relation(name: &str, entity: &str) -> SyncError {
        SyncError::new(
            crate::error::ErrorClass::Internal,
            crate::error::ErrorOrigin::Store,
            format!("test host cannot serve relation '{name}' with entity '{entity}'"),
        )
    }
}

impl RelationHost<Category> for TestHost {
    fn relation(&self, name: &str) -> Option<RelationModel> {
        Self::known_relation(name)
    }

    fn is_relation_populated(&self, name: &str) -> bool {
        name == Self::CATEGORIES && self.categories.is_populated()
    }

    fn related_records(&mut self, name: &str) -> Result<Vec<Category>, SyncError> {
        if name == Self::CATEGORIES {
            self.categories.load()
        } else {
            Err(Self::unknown_relation(name, Category::ENTITY_NAME))
        }
    }

    fn link(
        &mut self,
        name: &str,
        record: &Category,
        extra: &[(String, Value)],
    ) -> Result<(), SyncError> {
        if name == Self::CATEGORIES {
            self.categories.link(record, extra)
        } else {
            Err(Self::unknown_relation(name, Category::ENTITY_NAME))
        }
    }

    fn unlink(&mut self, name: &str, record: &Category, delete: bool) -> Result<(), SyncError> {
        if name == Self::CATEGORIES {
            self.categories.unlink(record, delete)
        } else {
            Err(Self::unknown_relation(name, Category::ENTITY_NAME))
        }
    }

    fn unlink_all(&mut self, name: &str, delete: bool) -> Result<(), SyncError> {
        if name == Self::CATEGORIES {
            self.categories.unlink_all(delete)
        } else {
            Err(Self::unknown_relation(name, Category::ENTITY_NAME))
        }
    }
}

impl RelationHost<Tag> for TestHost {
    fn relation(&self, name: &str) -> Option<RelationModel> {
        Self::known_relation(name)
    }

    fn is_relation_populated(&self, name: &str) -> bool {
        name == Self::TAGS && self.tags.is_populated()
    }

    fn related_records(&mut self, name: &str) -> Result<Vec<Tag>, SyncError> {
        if name == Self::TAGS {
            self.tags.load()
        } else {
            Err(Self::unknown_relation(name, Tag::ENTITY_NAME))
        }
    }

    fn link(&mut self, name: &str, record: &Tag, extra: &[(String, Value)]) -> Result<(), SyncError> {
        if name == Self::TAGS {
            self.tags.link(record, extra)
        } else {
            Err(Self::unknown_relation(name, Tag::ENTITY_NAME))
        }
    }

    fn unlink(&mut self, name: &str, record: &Tag, delete: bool) -> Result<(), SyncError> {
        if name == Self::TAGS {
            self.tags.unlink(record, delete)
        } else {
            Err(Self::unknown_relation(name, Tag::ENTITY_NAME))
        }
    }

    fn unlink_all(&mut self, name: &str, delete: bool) -> Result<(), SyncError> {
        if name == Self::TAGS {
            self.tags.unlink_all(delete)
        } else {
            Err(Self::unknown_relation(name, Tag::ENTITY_NAME))
        }
    }
}

// Attach validation rejects the composite key before any query runs, so
// these paths only need to exist.
impl RelationHost<Revision> for TestHost {
    fn relation(&self, name: &str) -> Option<RelationModel> {
        Self::known_relation(name)
    }

    fn is_relation_populated(&self, _name: &str) -> bool {
        false
    }

    fn related_records(&mut self, name: &str) -> Result<Vec<Revision>, SyncError> {
        Err(Self::unknown_relation(name, Revision::ENTITY_NAME))
    }

    fn link(
        &mut self,
        name: &str,
        _record: &Revision,
        _extra: &[(String, Value)],
    ) -> Result<(), SyncError> {
        Err(Self::unknown_relation(name, Revision::ENTITY_NAME))
    }

    fn unlink(&mut self, name: &str, _record: &Revision, _delete: bool) -> Result<(), SyncError> {
        Err(Self::unknown_relation(name, Revision::ENTITY_NAME))
    }

    fn unlink_all(&mut self, name: &str, _delete: bool) -> Result<(), SyncError> {
        Err(Self::unknown_relation(name, Revision::ENTITY_NAME))
    }
}
