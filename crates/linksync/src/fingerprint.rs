use crate::{key::Key, reference::KeyMap};
use xxhash_rust::xxh3::Xxh3;

/// Fingerprint format version byte used by canonical digest encoding.
pub(crate) const FINGERPRINT_VERSION: u8 = 1;

/// Stable XXH3 seed used by canonical fingerprinting across releases.
pub(crate) const FINGERPRINT_SEED: u64 = 0;

// ── Key variant tags (do not reorder) ─────────────────
const TAG_INT: u8 = 0;
const TAG_UINT: u8 = 1;
const TAG_TEXT: u8 = 2;
const TAG_ULID: u8 = 3;

fn feed_u8(h: &mut Xxh3, x: u8) {
    h.update(&[x]);
}
fn feed_u32(h: &mut Xxh3, x: u32) {
    h.update(&x.to_be_bytes());
}
fn feed_i64(h: &mut Xxh3, x: i64) {
    h.update(&x.to_be_bytes());
}
fn feed_u64(h: &mut Xxh3, x: u64) {
    h.update(&x.to_be_bytes());
}
fn feed_bytes(h: &mut Xxh3, b: &[u8]) {
    h.update(b);
}

#[cfg(test)]
thread_local! {
    static TEST_FINGERPRINT_OVERRIDE: std::cell::Cell<Option<[u8; 16]>> =
        const { std::cell::Cell::new(None) };
}

#[cfg(test)]
fn test_fingerprint_override() -> Option<[u8; 16]> {
    TEST_FINGERPRINT_OVERRIDE.with(std::cell::Cell::get)
}

// Execute one closure with a thread-local fingerprint override and always
// restore the previous override state, even if the closure panics.
#[cfg(test)]
pub(crate) fn with_test_fingerprint_override<T>(
    override_digest: [u8; 16],
    f: impl FnOnce() -> T + std::panic::UnwindSafe,
) -> T {
    let previous = TEST_FINGERPRINT_OVERRIDE.with(|cell| cell.replace(Some(override_digest)));
    let result = std::panic::catch_unwind(f);
    TEST_FINGERPRINT_OVERRIDE.with(|cell| cell.set(previous));
    match result {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

#[expect(clippy::cast_possible_truncation)]
fn write_key_to_hasher(key: &Key, h: &mut Xxh3) {
    match key {
        Key::Int(v) => {
            feed_u8(h, TAG_INT);
            feed_i64(h, *v);
        }
        Key::Uint(v) => {
            feed_u8(h, TAG_UINT);
            feed_u64(h, *v);
        }
        Key::Text(s) => {
            feed_u8(h, TAG_TEXT);
            feed_u32(h, s.len() as u32);
            feed_bytes(h, s.as_bytes());
        }
        Key::Ulid(u) => {
            feed_u8(h, TAG_ULID);
            feed_bytes(h, &u.to_bytes());
        }
    }
}

#[expect(clippy::cast_possible_truncation)]
fn write_key_map_to_hasher(map: &KeyMap, h: &mut Xxh3) {
    feed_u32(h, map.len() as u32);
    for (field, key) in map.iter() {
        feed_u8(h, 0xFD);
        feed_u32(h, field.len() as u32);
        feed_bytes(h, field.as_bytes());
        feed_u8(h, 0xFE);
        write_key_to_hasher(key, h);
    }
}

/// Stable digest of the normalized primary keys of a relation, in relation
/// insertion order. Drift detection is exact digest equality.
#[must_use]
#[expect(clippy::cast_possible_truncation)]
pub(crate) fn fingerprint_key_maps(entries: &[KeyMap]) -> [u8; 16] {
    #[cfg(test)]
    if let Some(override_digest) = test_fingerprint_override() {
        return override_digest;
    }

    let mut h = Xxh3::with_seed(FINGERPRINT_SEED);
    feed_u8(&mut h, FINGERPRINT_VERSION); // version

    feed_u32(&mut h, entries.len() as u32);
    for entry in entries {
        feed_u8(&mut h, 0xFF);
        write_key_map_to_hasher(entry, &mut h);
    }

    h.digest128().to_be_bytes()
}

///
/// RelationFingerprint
///
/// Change detector for out-of-band relation mutation. Three states: never
/// computed, digest held, and cleared (the relation was populated and then
/// became unpopulated). Not a security or storage artifact.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RelationFingerprint {
    #[default]
    Unset,
    Set([u8; 16]),
    Cleared,
}

impl RelationFingerprint {
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Whether folding this snapshot would report a change, without
    /// updating the tracker.
    #[must_use]
    pub fn differs_from(&self, entries: &[KeyMap]) -> bool {
        let digest = fingerprint_key_maps(entries);

        !matches!(self, Self::Set(previous) if *previous == digest)
    }

    /// Fold a populated relation snapshot into the tracker. Returns whether
    /// the digest differs from the previously held state; transitions from
    /// Unset or Cleared count as changed.
    pub fn observe_populated(&mut self, entries: &[KeyMap]) -> bool {
        let digest = fingerprint_key_maps(entries);
        let changed = !matches!(self, Self::Set(previous) if *previous == digest);
        *self = Self::Set(digest);

        changed
    }

    /// Fold an unpopulated relation into the tracker. Only a held digest
    /// transitions to Cleared and reports a change.
    pub const fn observe_unpopulated(&mut self) -> bool {
        match self {
            Self::Set(_) => {
                *self = Self::Cleared;
                true
            }
            Self::Unset | Self::Cleared => false,
        }
    }
}

///
/// TESTS
///
