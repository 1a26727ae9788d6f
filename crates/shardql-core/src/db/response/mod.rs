//! Result materialization: merged shard rows into one logical result.

mod row;


use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    value::Value,
};
use std::collections::HashSet;
use thiserror::Error as ThisError;

// re-exports
pub use row::Row;

///
/// MaterializeError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum MaterializeError {
    #[error("primary key must name at least one column")]
    EmptyPrimaryKey,
}

impl From<MaterializeError> for InternalError {
    fn from(err: MaterializeError) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Response, err.to_string())
    }
}

/// Deduplicate merged rows by primary key.
///
/// Rows missing any key column are dropped. The first row seen for a key
/// tuple wins. Tuples containing null are never considered duplicates, so
/// such rows are always kept.
pub fn populate(rows: Vec<Row>, primary_key: &[&str]) -> Result<Vec<Row>, MaterializeError> {
    if primary_key.is_empty() {
        return Err(MaterializeError::EmptyPrimaryKey);
    }

    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(key) = primary_key
            .iter()
            .map(|column| row.get(column).cloned())
            .collect::<Option<Vec<Value>>>()
        else {
            continue;
        };

        if key.iter().any(Value::is_null) || seen.insert(key) {
            out.push(row);
        }
    }

    Ok(out)
}
