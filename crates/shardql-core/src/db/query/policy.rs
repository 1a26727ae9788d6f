use crate::{
    db::query::logical::QueryShape,
    error::{ErrorClass, ErrorOrigin, InternalError},
};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// ReadKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadKind {
    Rows,
    Scalar,
}

///
/// UnmergeableFeature
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum UnmergeableFeature {
    #[display("GROUP BY")]
    GroupBy,
    #[display("HAVING")]
    Having,
    #[display("UNION")]
    Union,
    #[display("DISTINCT")]
    Distinct,
}

///
/// CrossShardPolicyError
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
#[error("this query uses more than one database: {feature} cannot be merged across {shard_count} shards")]
pub struct CrossShardPolicyError {
    pub feature: UnmergeableFeature,
    pub shard_count: usize,
}

impl From<CrossShardPolicyError> for InternalError {
    fn from(err: CrossShardPolicyError) -> Self {
        Self::new(ErrorClass::Policy, ErrorOrigin::Command, err.to_string())
    }
}

/// Reject reads whose result cannot be merged from several shards.
///
/// Row and scalar reads refuse GROUP BY, HAVING and UNION; scalar reads also
/// refuse DISTINCT. Single-shard plans and writes always pass.
pub const fn check_cross_shard(
    shape: QueryShape,
    read: ReadKind,
    shard_count: usize,
) -> Result<(), CrossShardPolicyError> {
    if shard_count <= 1 {
        return Ok(());
    }

    let feature = if shape.group_by {
        Some(UnmergeableFeature::GroupBy)
    } else if shape.having {
        Some(UnmergeableFeature::Having)
    } else if shape.union {
        Some(UnmergeableFeature::Union)
    } else if shape.distinct && matches!(read, ReadKind::Scalar) {
        Some(UnmergeableFeature::Distinct)
    } else {
        None
    };

    match feature {
        Some(feature) => Err(CrossShardPolicyError {
            feature,
            shard_count,
        }),
        None => Ok(()),
    }
}
