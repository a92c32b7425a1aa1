use crate::{traits::Record, value::Value};

///
/// ExtraValueFn
///
/// Function-pointer contract for derived extra-column values. Receives the
/// record being linked and produces the value to store in the junction row.
///

pub type ExtraValueFn<R> = fn(&R) -> Value;

///
/// ExtraValue
///
/// One configured extra junction column: either a literal stored as-is, or
/// a derivation evaluated once per linked record, immediately before the
/// link call.
///

#[derive(Clone, Debug)]
pub enum ExtraValue<R: Record> {
    Literal(Value),
    Derived(ExtraValueFn<R>),
}

impl<R: Record> ExtraValue<R> {
    fn resolve(&self, record: &R) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Derived(f) => f(record),
        }
    }
}

impl<R: Record> From<Value> for ExtraValue<R> {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

///
/// ExtraColumns
///
/// Ordered extra-column configuration for a relation's junction rows.
///

#[derive(Clone, Debug)]
pub struct ExtraColumns<R: Record> {
    columns: Vec<(String, ExtraValue<R>)>,
}

impl<R: Record> ExtraColumns<R> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_literal(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push((column.into(), ExtraValue::Literal(value.into())));
        self
    }

    #[must_use]
    pub fn with_derived(mut self, column: impl Into<String>, f: ExtraValueFn<R>) -> Self {
        self.columns.push((column.into(), ExtraValue::Derived(f)));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolve every configured column against the record being linked.
    /// Each entry is evaluated exactly once per call.
    #[must_use]
    pub fn resolve(&self, record: &R) -> Vec<(String, Value)> {
        self.columns
            .iter()
            .map(|(column, value)| (column.clone(), value.resolve(record)))
            .collect()
    }
}

impl<R: Record> Default for ExtraColumns<R> {
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
    use crate::test_support::Category;

    #[test]
    fn literal_columns_resolve_to_their_value() {
        let columns = ExtraColumns::<Category>::new().with_literal("kind", "manual");
        let record = Category::new(1, "books");

        assert_eq!(
            columns.resolve(&record),
            vec![("kind".to_string(), Value::Text("manual".to_string()))]
        );
    }

    #[test]
    fn derived_columns_receive_the_linked_record() {
        let columns = ExtraColumns::<Category>::new()
            .with_derived("label", |category| Value::from(category.name.as_str()));

        assert_eq!(
            columns.resolve(&Category::new(2, "games")),
            vec![("label".to_string(), Value::Text("games".to_string()))]
        );
    }

    #[test]
    fn resolution_preserves_declaration_order() {
        let columns = ExtraColumns::<Category>::new()
            .with_literal("first", 1u64)
            .with_literal("second", 2u64);

        let resolved = columns.resolve(&Category::new(3, "order"));
        assert_eq!(resolved[0].0, "first");
        assert_eq!(resolved[1].0, "second");
    }
}
