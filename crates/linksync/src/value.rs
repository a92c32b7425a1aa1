use crate::key::Key;
use serde::{Deserialize, Serialize};

///
/// Value
///
/// Loosely-typed payload crossing the engine's dynamic surfaces: extra
/// junction columns and virtual-attribute assignments. Scalar variants
/// coerce to Key; List carries mixed assignment elements.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
    Timestamp(u64),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_))
    }

    /// Coerce a scalar value into a Key, if the variant maps onto the
    /// key space. Null, Bool, Timestamp and List do not.
    #[must_use]
    pub fn as_key(&self) -> Option<Key> {
        match self {
            Self::Int(v) => Some(Key::Int(*v)),
            Self::Uint(v) => Some(Key::Uint(*v)),
            Self::Text(v) => Some(Key::Text(v.clone())),
            Self::Null | Self::Bool(_) | Self::Timestamp(_) | Self::List(_) => None,
        }
    }

    /// Build a list value from a slice of keys, the shape the dispatch
    /// surface accepts for assignments.
    #[must_use]
    pub fn from_keys(keys: &[Key]) -> Self {
        Self::List(keys.iter().cloned().map(Self::from).collect())
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Int(v) => Self::Int(v),
            Key::Uint(v) => Self::Uint(v),
            Key::Text(v) => Self::Text(v),
            Key::Ulid(v) => Self::Text(v.to_string()),
        }
    }
}

/// Implements `From<T> for Value` for simple conversions
macro_rules! impl_from_value {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    }
}

impl_from_value! {
    bool => Bool,
    i8  => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8  => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    String => Text,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_values_coerce_to_keys() {
        assert_eq!(Value::Uint(3).as_key(), Some(Key::Uint(3)));
        assert_eq!(Value::Int(-3).as_key(), Some(Key::Int(-3)));
        assert_eq!(
            Value::Text("t".to_string()).as_key(),
            Some(Key::Text("t".to_string()))
        );
    }

    #[test]
    fn non_key_values_do_not_coerce() {
        assert_eq!(Value::Null.as_key(), None);
        assert_eq!(Value::Bool(true).as_key(), None);
        assert_eq!(Value::Timestamp(0).as_key(), None);
        assert_eq!(Value::List(vec![]).as_key(), None);
    }

    #[test]
    fn from_keys_builds_a_list() {
        let value = Value::from_keys(&[Key::Uint(1), Key::Uint(2)]);
        assert_eq!(value, Value::List(vec![Value::Uint(1), Value::Uint(2)]));
        assert!(!value.is_scalar());
    }
}
