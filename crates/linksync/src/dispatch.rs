//! Virtual-attribute dispatch.
//!
//! Hosts expose reconcilers as named virtual attributes through a
//! capability table: get/set are resolved by attribute-name lookup, and
//! lifecycle hooks broadcast to every registered attribute. This replaces
//! ad hoc runtime property interception with an explicit registry.

use crate::{
    error::SyncError,
    reconciler::Reconciler,
    reference::ReferenceAssign,
    traits::{Record, RelationHost, Repository},
    value::Value,
};

///
/// VirtualAttribute
///
/// One named virtual attribute bound to a host: a get/set pair speaking
/// `Value`, plus the persistence lifecycle hooks the host invokes
/// synchronously after each successful operation.
///

pub trait VirtualAttribute<H> {
    fn attribute(&self) -> &str;

    fn get(&mut self, host: &mut H) -> Result<Value, SyncError>;

    fn set(&mut self, value: &Value) -> Result<(), SyncError>;

    fn after_insert(&mut self, host: &mut H) -> Result<(), SyncError>;

    fn after_update(&mut self, host: &mut H) -> Result<(), SyncError>;

    fn after_delete(&mut self, host: &mut H) -> Result<(), SyncError>;
}

impl<R, P, H> VirtualAttribute<H> for Reconciler<R, P>
where
    R: Record,
    P: Repository<R>,
    H: RelationHost<R>,
{
    fn attribute(&self) -> &str {
        Self::attribute(self)
    }

    fn get(&mut self, host: &mut H) -> Result<Value, SyncError> {
        let keys = self.reference_value(host)?;

        Ok(Value::from_keys(&keys))
    }

    fn set(&mut self, value: &Value) -> Result<(), SyncError> {
        let assign = ReferenceAssign::try_from_value(value)?;
        self.set_reference_value(assign)
    }

    fn after_insert(&mut self, host: &mut H) -> Result<(), SyncError> {
        Self::after_insert(self, host)
    }

    fn after_update(&mut self, host: &mut H) -> Result<(), SyncError> {
        Self::after_update(self, host)
    }

    fn after_delete(&mut self, host: &mut H) -> Result<(), SyncError> {
        Self::after_delete(self, host)
    }
}

///
/// AttributeRegistry
///
/// Dispatch table keyed by attribute name. A host owns one registry and
/// delegates virtual-attribute reads, writes, and lifecycle events to it.
///

pub struct AttributeRegistry<H> {
    attributes: Vec<Box<dyn VirtualAttribute<H>>>,
}

impl<H> AttributeRegistry<H> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Register a virtual attribute. Attribute names must be unique per
    /// registry.
    pub fn register(
        &mut self,
        attribute: impl VirtualAttribute<H> + 'static,
    ) -> Result<(), SyncError> {
        if self.has_attribute(attribute.attribute()) {
            return Err(SyncError::usage_reference(format!(
                "virtual attribute '{}' is already registered",
                attribute.attribute()
            )));
        }
        self.attributes.push(Box::new(attribute));

        Ok(())
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.attribute() == name)
    }

    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.attribute()).collect()
    }

    fn lookup(
        &mut self,
        name: &str,
    ) -> Result<&mut (dyn VirtualAttribute<H> + 'static), SyncError> {
        self.attributes
            .iter_mut()
            .find(|a| a.attribute() == name)
            .map(|a| a.as_mut())
            .ok_or_else(|| {
                SyncError::usage_reference(format!("unknown virtual attribute '{name}'"))
            })
    }

    /// Read a virtual attribute by name.
    pub fn get(&mut self, host: &mut H, name: &str) -> Result<Value, SyncError> {
        self.lookup(name)?.get(host)
    }

    /// Write a virtual attribute by name.
    pub fn set(&mut self, name: &str, value: &Value) -> Result<(), SyncError> {
        self.lookup(name)?.set(value)
    }

    /// Broadcast the after-insert hook to every registered attribute.
    pub fn after_insert(&mut self, host: &mut H) -> Result<(), SyncError> {
        for attribute in &mut self.attributes {
            attribute.after_insert(host)?;
        }

        Ok(())
    }

    /// Broadcast the after-update hook to every registered attribute.
    pub fn after_update(&mut self, host: &mut H) -> Result<(), SyncError> {
        for attribute in &mut self.attributes {
            attribute.after_update(host)?;
        }

        Ok(())
    }

    /// Broadcast the after-delete hook to every registered attribute.
    pub fn after_delete(&mut self, host: &mut H) -> Result<(), SyncError> {
        for attribute in &mut self.attributes {
            attribute.after_delete(host)?;
        }

        Ok(())
    }
}

impl<H> Default for AttributeRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        key::Key,
        reconciler::ReconcilerConfig,
        test_support::{Category, InMemoryRepository, TestHost, TestStore},
    };

    fn registry_with_categories(host: &mut TestHost) -> AttributeRegistry<TestHost> {
        host.categories = TestStore::new(vec![Category::new(1, "books"), Category::new(2, "games")]);

        let reconciler = Reconciler::attach(
            ReconcilerConfig::new(TestHost::CATEGORIES, "category_ids"),
            InMemoryRepository::new(host.categories.records.clone()),
            host,
        )
        .expect("attach categories");

        let mut registry = AttributeRegistry::new();
        registry.register(reconciler).expect("register attribute");

        registry
    }

    #[test]
    fn get_and_set_dispatch_by_attribute_name() {
        let mut host = TestHost::default();
        let mut registry = registry_with_categories(&mut host);

        registry
            .set("category_ids", &Value::from_keys(&[Key::Uint(2)]))
            .unwrap();
        registry.after_update(&mut host).unwrap();

        assert_eq!(
            registry.get(&mut host, "category_ids").unwrap(),
            Value::from_keys(&[Key::Uint(2)])
        );
    }

    #[test]
    fn unknown_attribute_is_a_usage_error() {
        let mut host = TestHost::default();
        let mut registry = registry_with_categories(&mut host);

        let err = registry.get(&mut host, "tag_ids").unwrap_err();
        assert!(err.is_usage());
        assert!(err.message.contains("'tag_ids'"));
    }

    #[test]
    fn bare_scalar_assignment_is_rejected_at_the_dispatch_surface() {
        let mut host = TestHost::default();
        let mut registry = registry_with_categories(&mut host);

        let err = registry.set("category_ids", &Value::Uint(1)).unwrap_err();
        assert!(err.is_usage());
        assert!(err.message.contains("bare scalar"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut host = TestHost::default();
        let mut registry = registry_with_categories(&mut host);

        let duplicate = Reconciler::attach(
            ReconcilerConfig::new(TestHost::CATEGORIES, "category_ids"),
            InMemoryRepository::<Category>::new(Vec::new()),
            &mut host,
        )
        .expect("attach duplicate");

        let err = registry.register(duplicate).unwrap_err();
        assert!(err.message.contains("already registered"));
    }
}
