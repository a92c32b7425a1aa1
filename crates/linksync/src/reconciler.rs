use crate::{
    error::SyncError,
    extra::ExtraColumns,
    fingerprint::RelationFingerprint,
    key::Key,
    obs::sink::{self, MetricsEvent},
    reference::{KeyMap, ReferenceAssign, ReferenceValue, normalize_assignment},
    traits::{Record, RelationHost, Repository},
};
use std::collections::BTreeSet;

///
/// ReconcilerConfig
///
/// Per-relation configuration: the relation name, the virtual attribute
/// name, the extra junction columns, and the unlink deletion policy.
///

#[derive(Clone, Debug)]
pub struct ReconcilerConfig<R: Record> {
    relation: String,
    attribute: String,
    extra_columns: ExtraColumns<R>,
    delete_on_unlink: bool,
}

impl<R: Record> ReconcilerConfig<R> {
    #[must_use]
    pub fn new(relation: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            attribute: attribute.into(),
            extra_columns: ExtraColumns::new(),
            delete_on_unlink: true,
        }
    }

    #[must_use]
    pub fn with_extra_columns(mut self, extra_columns: ExtraColumns<R>) -> Self {
        self.extra_columns = extra_columns;
        self
    }

    /// When false, unlinked junction rows are detached from the in-memory
    /// relation but left in storage (audit-trail mode).
    #[must_use]
    pub const fn with_delete_on_unlink(mut self, delete_on_unlink: bool) -> Self {
        self.delete_on_unlink = delete_on_unlink;
        self
    }
}

///
/// Reconciler
///
/// Owns the virtual-attribute value for one many-to-many relation, detects
/// drift between it and the live relation, and converges the junction
/// table through minimal link/unlink operations on save.
///

#[derive(Debug)]
pub struct Reconciler<R: Record, P: Repository<R>> {
    config: ReconcilerConfig<R>,
    repo: P,
    primary_key_field: &'static str,
    reference: ReferenceValue,
    fingerprint: RelationFingerprint,
}

impl<R, P> Reconciler<R, P>
where
    R: Record,
    P: Repository<R>,
{
    /// Attach a reconciler to an owner. Fails fast on configuration
    /// problems, in order: missing relation name, missing attribute name,
    /// missing relation accessor, relation resolving to the wrong entity,
    /// and a composite primary key — all before any relation query runs.
    /// On success the live relation is eagerly loaded into the reference
    /// value and the initial fingerprint is computed.
    pub fn attach<H>(config: ReconcilerConfig<R>, repo: P, host: &mut H) -> Result<Self, SyncError>
    where
        H: RelationHost<R>,
    {
        if config.relation.is_empty() {
            return Err(SyncError::config_attach("the relation name must be defined"));
        }

        if config.attribute.is_empty() {
            return Err(SyncError::config_attach(
                "the reference attribute name must be defined",
            ));
        }

        let model = host.relation(&config.relation).ok_or_else(|| {
            SyncError::config_attach(format!(
                "relation accessor 'get_{}()' does not exist on the owner",
                config.relation
            ))
        })?;

        if model.related_entity != R::ENTITY_NAME {
            return Err(SyncError::config_attach(format!(
                "relation '{}' must resolve to entity '{}', found '{}'",
                config.relation,
                R::ENTITY_NAME,
                model.related_entity
            )));
        }

        let primary_key_field = match R::PRIMARY_KEY_FIELDS {
            [] => {
                return Err(SyncError::config_attach(format!(
                    "entity '{}' declares no primary key fields",
                    R::ENTITY_NAME
                )));
            }
            [field] => *field,
            fields => {
                return Err(SyncError::config_attach(format!(
                    "composite primary keys are not supported: entity '{}' defines multiple primary key fields: [{}]",
                    R::ENTITY_NAME,
                    fields.join(", ")
                )));
            }
        };

        let mut reconciler = Self {
            config,
            repo,
            primary_key_field,
            reference: ReferenceValue::default(),
            fingerprint: RelationFingerprint::default(),
        };

        let entries = reconciler.load_primary_keys(host)?;
        reconciler.fingerprint.observe_populated(&entries);
        reconciler.reference.init(entries);

        Ok(reconciler)
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.config.relation
    }

    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.config.attribute
    }

    #[must_use]
    pub const fn delete_on_unlink(&self) -> bool {
        self.config.delete_on_unlink
    }

    #[must_use]
    pub const fn is_reference_value_initialized(&self) -> bool {
        self.reference.is_initialized()
    }

    #[must_use]
    pub const fn is_reference_manual_override(&self) -> bool {
        self.reference.is_manual_override()
    }

    /// Re-enable automatic drift refresh without waiting for a save.
    pub const fn reset_reference_manual_override(&mut self) {
        self.reference.reset_manual_override();
    }

    /// Whether the related entity declares a multi-column primary key.
    /// Attach rejects such relations; kept as a diagnostic.
    #[must_use]
    pub const fn is_primary_key_composed() -> bool {
        R::PRIMARY_KEY_FIELDS.len() > 1
    }

    /// The related records currently attached to the owner's relation.
    pub fn related_records<H>(&self, host: &mut H) -> Result<Vec<R>, SyncError>
    where
        H: RelationHost<R>,
    {
        host.related_records(&self.config.relation)
    }

    // Load and normalize the primary keys of the live relation.
    fn load_primary_keys<H>(&self, host: &mut H) -> Result<Vec<KeyMap>, SyncError>
    where
        H: RelationHost<R>,
    {
        let records = host.related_records(&self.config.relation)?;

        Ok(records.iter().map(Record::primary_key).collect())
    }

    /// Whether the live relation no longer matches the stored fingerprint.
    /// A detected change refreshes the reference value and the tracker in
    /// the same step, so a subsequent read never sees a consumed dirty
    /// flag with a stale value. While a manual assignment is pending the
    /// check is read-only and keeps reporting dirty until the next save.
    pub fn is_reference_relation_dirty<H>(&mut self, host: &mut H) -> Result<bool, SyncError>
    where
        H: RelationHost<R>,
    {
        if !self.reference.is_initialized() {
            self.update_reference_from_relation(host)?;
            return Ok(true);
        }

        if !host.is_relation_populated(&self.config.relation) {
            if self.reference.is_manual_override() {
                return Ok(self.fingerprint.is_set());
            }
            return Ok(self.fingerprint.observe_unpopulated());
        }

        let entries = self.load_primary_keys(host)?;
        if self.reference.is_manual_override() {
            return Ok(self.fingerprint.differs_from(&entries));
        }

        if self.fingerprint.observe_populated(&entries) {
            self.reference.init(entries);
            return Ok(true);
        }

        Ok(false)
    }

    /// Re-sync the reference value from the live relation, e.g. after the
    /// relation was modified externally via bulk population or raw links.
    /// Clears the manual override.
    pub fn update_reference_from_relation<H>(&mut self, host: &mut H) -> Result<(), SyncError>
    where
        H: RelationHost<R>,
    {
        let entries = self.load_primary_keys(host)?;
        self.fingerprint.observe_populated(&entries);
        self.reference.init(entries);

        Ok(())
    }

    /// The list of keys the owner is currently configured to be linked to.
    /// Unless the value was manually overridden since the last save, a
    /// drifted relation is transparently re-read first.
    pub fn reference_value<H>(&mut self, host: &mut H) -> Result<Vec<Key>, SyncError>
    where
        H: RelationHost<R>,
    {
        if !self.reference.is_manual_override() && self.is_reference_relation_dirty(host)? {
            sink::record(MetricsEvent::DriftRefresh {
                relation: self.config.relation.clone(),
            });
        }

        self.reference.flat_keys(self.primary_key_field)
    }

    /// Assign the desired linked set. Accepts a single record or a mixed
    /// list of keys, key maps, and records; everything is normalized to
    /// one-column key maps and deduplicated. Marks the value as manually
    /// overridden, suppressing drift refresh until the next save.
    pub fn set_reference_value(&mut self, assign: ReferenceAssign<R>) -> Result<(), SyncError> {
        let normalized =
            normalize_assignment(assign, self.primary_key_field, R::PRIMARY_KEY_FIELDS)?;
        self.reference.assign(normalized);

        Ok(())
    }

    /// Lifecycle hook: the owner was inserted.
    pub fn after_insert<H>(&mut self, host: &mut H) -> Result<(), SyncError>
    where
        H: RelationHost<R>,
    {
        self.reconcile(host)
    }

    /// Lifecycle hook: the owner was updated.
    pub fn after_update<H>(&mut self, host: &mut H) -> Result<(), SyncError>
    where
        H: RelationHost<R>,
    {
        self.reconcile(host)
    }

    /// Lifecycle hook: the owner was deleted. Tears down the whole
    /// relation with one bulk unlink-all call.
    pub fn after_delete<H>(&mut self, host: &mut H) -> Result<(), SyncError>
    where
        H: RelationHost<R>,
    {
        host.unlink_all(&self.config.relation, self.config.delete_on_unlink)?;
        sink::record(MetricsEvent::UnlinkAll {
            relation: self.config.relation.clone(),
        });

        Ok(())
    }

    // Converge the junction table on the reference value: unlink live
    // records absent from the desired set, then link desired records
    // absent from the live set (one batched fetch). Unlink failures
    // propagate immediately; nothing applied so far is rolled back here.
    #[expect(clippy::cast_possible_truncation)]
    fn reconcile<H>(&mut self, host: &mut H) -> Result<(), SyncError>
    where
        H: RelationHost<R>,
    {
        if !self.reference.is_initialized() {
            return Ok(());
        }

        let fields = R::PRIMARY_KEY_FIELDS;
        let reference_map = self.reference.reference_map(fields)?;

        let live = host.related_records(&self.config.relation)?;
        let mut live_keys: BTreeSet<String> = BTreeSet::new();
        let mut to_unlink: Vec<R> = Vec::new();

        for record in live {
            let key = record.primary_key().reference_key(fields)?;
            if !reference_map.contains_key(&key) {
                to_unlink.push(record);
            }
            live_keys.insert(key);
        }

        // Desired-but-missing keys, in assignment order.
        let mut link_maps: Vec<KeyMap> = Vec::new();
        for entry in self.reference.entries().unwrap_or_default() {
            let key = entry.reference_key(fields)?;
            if live_keys.insert(key) {
                link_maps.push(entry.clone());
            }
        }

        let to_link = if link_maps.is_empty() {
            Vec::new()
        } else {
            self.repo.find_all(&link_maps)?
        };

        for record in &to_unlink {
            host.unlink(&self.config.relation, record, self.config.delete_on_unlink)?;
        }

        for record in &to_link {
            let extra = self.config.extra_columns.resolve(record);
            host.link(&self.config.relation, record, &extra)?;
        }

        self.reference.reset_manual_override();
        sink::record(MetricsEvent::ReconcileFinish {
            relation: self.config.relation.clone(),
            links_applied: to_link.len() as u64,
            unlinks_applied: to_unlink.len() as u64,
        });

        Ok(())
    }
}

///
/// TESTS
///
