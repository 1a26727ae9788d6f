use crate::{
    db::condition::{Condition, Operand},
    value::Value,
};

///
/// LogicalQuery
///
/// Dialect-neutral statement handed to each shard's compiler.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogicalQuery {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
}

impl LogicalQuery {
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        match self {
            Self::Select(_) => StatementKind::Select,
            Self::Insert(_) => StatementKind::Insert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
        }
    }

    /// Features that cannot be merged across shards.
    #[must_use]
    pub fn shape(&self) -> QueryShape {
        match self {
            Self::Select(select) => QueryShape {
                distinct: select.distinct,
                group_by: !select.group_by.is_empty(),
                having: !select.having.is_empty(),
                union: !select.unions.is_empty(),
            },
            Self::Insert(_) | Self::Update(_) | Self::Delete(_) => QueryShape::default(),
        }
    }
}

///
/// StatementKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Select)
    }
}

///
/// QueryShape
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct QueryShape {
    pub distinct: bool,
    pub group_by: bool,
    pub having: bool,
    pub union: bool,
}

///
/// SelectQuery
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectQuery {
    /// Empty selects `*`.
    pub select: Vec<String>,
    pub distinct: bool,
    pub from: Vec<String>,
    pub joins: Vec<Join>,
    pub filter: Condition,
    pub group_by: Vec<String>,
    pub having: Condition,
    pub unions: Vec<Union>,
    pub order_by: Vec<(String, SortDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

///
/// Join
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: Condition,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

///
/// Union
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Union {
    pub source: UnionSource,
    pub all: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UnionSource {
    Raw(String),
    Query(Box<SelectQuery>),
}

///
/// SortDirection
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

///
/// InsertQuery
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InsertQuery {
    pub table: String,
    pub values: Vec<(String, Value)>,
}

///
/// UpdateQuery
///
/// `set` operands may be literals, columns, or expressions (counters).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UpdateQuery {
    pub table: String,
    pub set: Vec<(String, Operand)>,
    pub filter: Condition,
}

///
/// DeleteQuery
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteQuery {
    pub table: String,
    pub filter: Condition,
}
