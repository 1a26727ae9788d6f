//! Structured condition trees and their rendering into parameterized SQL.

mod ast;
mod build;
pub(crate) mod like;
mod params;

#[cfg(test)]
mod tests;

use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use thiserror::Error as ThisError;

// re-exports
pub use ast::{Condition, Conjunction, Expression, LikeOperator, Operand, Operator};
pub use build::{build_condition, build_where};
pub use like::DEFAULT_LIKE_ESCAPES;
pub use params::{PARAM_PREFIX, ParamSet};

///
/// ConditionError
/// Malformed operands detected while rendering a condition.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConditionError {
    #[error("operator '{operator}' requires {expected} operand(s), found {found}")]
    Arity {
        operator: String,
        expected: &'static str,
        found: usize,
    },

    #[error("operator '{operator}' requires a column as its first operand")]
    ColumnRequired { operator: String },

    #[error("operator '{operator}' accepts only an escape map as its third operand")]
    InvalidEscape { operator: String },
}

impl ConditionError {
    pub(crate) fn arity(op: &Operator, expected: &'static str, found: usize) -> Self {
        Self::Arity {
            operator: op.keyword(),
            expected,
            found,
        }
    }
}

impl From<ConditionError> for InternalError {
    fn from(err: ConditionError) -> Self {
        Self::new(ErrorClass::Argument, ErrorOrigin::Condition, err.to_string())
    }
}
