//! Fixture entities and an in-memory host for exercising the reconciler.
//!
//! Public so integration tests can drive a complete link/unlink cycle and
//! inspect physical junction rows separately from the in-memory relation.
//! Nothing here is intended for production use.

mod host;

pub use host::{InMemoryRepository, TestHost, TestStore};

use crate::{key::Key, reference::KeyMap, traits::Record};

///
/// Category
///
/// Single-column-key fixture entity, the main related type in tests.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

impl Category {
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Record for Category {
    const ENTITY_NAME: &'static str = "category";
    const PRIMARY_KEY_FIELDS: &'static [&'static str] = &["id"];

    fn primary_key(&self) -> KeyMap {
        KeyMap::single("id", Key::Uint(self.id))
    }
}

///
/// Tag
///
/// Second fixture entity; lets tests run two reconcilers side by side.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tag {
    pub id: u64,
    pub label: String,
}

impl Tag {
    #[must_use]
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

impl Record for Tag {
    const ENTITY_NAME: &'static str = "tag";
    const PRIMARY_KEY_FIELDS: &'static [&'static str] = &["id"];

    fn primary_key(&self) -> KeyMap {
        KeyMap::single("id", Key::Uint(self.id))
    }
}

///
/// Revision
///
/// Composite-key fixture entity. Exists only so attach validation has
/// something to reject.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Revision {
    pub id: u64,
    pub version: u64,
}

impl Record for Revision {
    const ENTITY_NAME: &'static str = "revision";
    const PRIMARY_KEY_FIELDS: &'static [&'static str] = &["id", "version"];

    fn primary_key(&self) -> KeyMap {
        KeyMap::single("id", Key::Uint(self.id)).with("version", Key::Uint(self.version))
    }
}
