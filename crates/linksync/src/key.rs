use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use ulid::Ulid;

///
/// Key
///
/// The atomic, normalized unit of related-entity identity.
/// Reference values, junction diffs, and fingerprints all speak Key;
/// hosts convert to their storage representation at the boundary.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Key {
    Int(i64),
    Uint(u64),
    Text(String),
    Ulid(Ulid),
}

impl Key {
    const RANK_INT: u8 = 0;
    const RANK_UINT: u8 = 1;
    const RANK_TEXT: u8 = 2;
    const RANK_ULID: u8 = 3;

    const fn variant_rank(&self) -> u8 {
        match self {
            Self::Int(_) => Self::RANK_INT,
            Self::Uint(_) => Self::RANK_UINT,
            Self::Text(_) => Self::RANK_TEXT,
            Self::Ulid(_) => Self::RANK_ULID,
        }
    }

    /// Render the key the way reference keys are built: `Display`, with no
    /// variant tag. Two keys of different variants may render identically;
    /// reference-key joins rely on one key variant per relation.
    #[must_use]
    pub fn to_reference_segment(&self) -> String {
        self.to_string()
    }
}

/// Implements `From<T> for Key` for simple conversions
macro_rules! impl_from_key {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for Key {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    }
}

/// Implements symmetric PartialEq between Key and another type
macro_rules! impl_eq_key {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl PartialEq<$ty> for Key {
                fn eq(&self, other: &$ty) -> bool {
                    matches!(self, Self::$variant(val) if val == other)
                }
            }

            impl PartialEq<Key> for $ty {
                fn eq(&self, other: &Key) -> bool {
                    other == self
                }
            }
        )*
    }
}

impl_from_key! {
    i8  => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8  => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    String => Text,
    Ulid => Ulid,
}

impl_eq_key! {
    i64 => Int,
    u64 => Uint,
    String => Text,
    Ulid => Ulid,
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Self::Text(val) if val == other)
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Ord::cmp(a, b),
            (Self::Uint(a), Self::Uint(b)) => Ord::cmp(a, b),
            (Self::Text(a), Self::Text(b)) => Ord::cmp(a, b),
            (Self::Ulid(a), Self::Ulid(b)) => Ord::cmp(a, b),

            _ => Ord::cmp(&self.variant_rank(), &other.variant_rank()), // fallback for cross-type comparison
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(Ord::cmp(self, other))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_conversions_preserve_variant() {
        assert_eq!(Key::from(42u32), Key::Uint(42));
        assert_eq!(Key::from(-7i32), Key::Int(-7));
        assert_eq!(Key::from("alpha"), Key::Text("alpha".to_string()));
    }

    #[test]
    fn key_ordering_is_total_and_stable() {
        let mut keys = vec![
            Key::Text("b".to_string()),
            Key::Uint(1),
            Key::Int(-1),
            Key::Ulid(Ulid::from_parts(1, 1)),
            Key::Text("a".to_string()),
            Key::Int(0),
        ];
        keys.sort();

        assert_eq!(
            keys,
            vec![
                Key::Int(-1),
                Key::Int(0),
                Key::Uint(1),
                Key::Text("a".to_string()),
                Key::Text("b".to_string()),
                Key::Ulid(Ulid::from_parts(1, 1)),
            ],
            "Key Ord must sort within variants and by rank across variants"
        );
    }

    #[test]
    fn reference_segment_has_no_variant_tag() {
        assert_eq!(Key::Uint(7).to_reference_segment(), "7");
        assert_eq!(Key::Int(7).to_reference_segment(), "7");
        assert_eq!(Key::Text("x-y".to_string()).to_reference_segment(), "x-y");
    }

    #[test]
    fn symmetric_eq_matches_inner_value() {
        assert_eq!(Key::Uint(9), 9u64);
        assert_eq!(9u64, Key::Uint(9));
        assert_ne!(Key::Int(9), 9u64);
    }
}
