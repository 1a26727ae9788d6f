use crate::value::Value;

///
/// EntityModel
/// Static routing facts for one sharded entity.
///

#[derive(Debug, Eq, PartialEq)]
pub struct EntityModel {
    /// Fully-qualified Rust type path (for diagnostics).
    pub path: &'static str,
    /// Logical table name; `{{%name}}` when the backend applies a prefix.
    pub table: &'static str,
    /// Primary key columns, in tuple order.
    pub primary_key: &'static [&'static str],
    /// Column whose values the coordinator maps onto shards.
    pub sharding_column: &'static str,
    /// Sharding type id looked up in the registry.
    pub sharding_type: &'static str,
}

impl EntityModel {
    /// Table reference used when a query names no FROM clause.
    #[must_use]
    pub fn table_ref(&self) -> String {
        format!("{{{{%{}}}}}", self.table)
    }

    /// Sharding-column value of an insert payload, if present and usable.
    #[must_use]
    pub fn sharding_value<'a>(&self, values: &'a [(String, Value)]) -> Option<&'a Value> {
        values
            .iter()
            .find(|(column, _)| column == self.sharding_column)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty_key())
    }

    #[must_use]
    pub const fn has_composite_key(&self) -> bool {
        self.primary_key.len() > 1
    }
}
