use crate::{db::condition::ParamSet, value::Value};

///
/// Condition AST
///
/// Structured WHERE/HAVING predicate prior to textual rendering.
/// Operators are resolved once at construction ([`Operator::parse`]) and
/// rendered by a closed `match` in the builder; nothing dispatches on
/// operator strings after this point.
///

///
/// Condition
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Condition {
    #[default]
    Empty,

    /// Raw SQL fragment, rendered verbatim.
    Raw(String),

    /// Column → operand pairs joined with AND.
    Hash(Vec<(String, Operand)>),

    /// Operator applied to positional operands. Arity is checked at build.
    Op { op: Operator, operands: Vec<Operand> },
}

impl Condition {
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    #[must_use]
    pub fn hash<C, O>(entries: impl IntoIterator<Item = (C, O)>) -> Self
    where
        C: Into<String>,
        O: Into<Operand>,
    {
        Self::Hash(
            entries
                .into_iter()
                .map(|(c, o)| (c.into(), o.into()))
                .collect(),
        )
    }

    /// Build an operator condition from a keyword, the way legacy
    /// array-shaped conditions spell it (`["BETWEEN", "id", 1, 5]`).
    #[must_use]
    pub fn op(keyword: &str, operands: Vec<Operand>) -> Self {
        Self::Op {
            op: Operator::parse(keyword),
            operands,
        }
    }

    #[must_use]
    pub fn and(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::Op {
            op: Operator::And,
            operands: conditions.into_iter().map(Operand::from).collect(),
        }
    }

    #[must_use]
    pub fn or(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::Op {
            op: Operator::Or,
            operands: conditions.into_iter().map(Operand::from).collect(),
        }
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(condition: Self) -> Self {
        Self::Op {
            op: Operator::Not,
            operands: vec![condition.into()],
        }
    }

    #[must_use]
    pub fn compare(
        symbol: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<Operand>,
    ) -> Self {
        Self::Op {
            op: Operator::Compare(symbol.into()),
            operands: vec![Operand::column(column), value.into()],
        }
    }

    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare("=", column, value)
    }

    #[must_use]
    pub fn between(
        column: impl Into<String>,
        lo: impl Into<Operand>,
        hi: impl Into<Operand>,
    ) -> Self {
        Self::Op {
            op: Operator::Between { negated: false },
            operands: vec![Operand::column(column), lo.into(), hi.into()],
        }
    }

    #[must_use]
    pub fn not_between(
        column: impl Into<String>,
        lo: impl Into<Operand>,
        hi: impl Into<Operand>,
    ) -> Self {
        Self::Op {
            op: Operator::Between { negated: true },
            operands: vec![Operand::column(column), lo.into(), hi.into()],
        }
    }

    #[must_use]
    pub fn in_<V: Into<Operand>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Op {
            op: Operator::In { negated: false },
            operands: vec![Operand::column(column), Operand::list(values)],
        }
    }

    #[must_use]
    pub fn not_in<V: Into<Operand>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Op {
            op: Operator::In { negated: true },
            operands: vec![Operand::column(column), Operand::list(values)],
        }
    }

    #[must_use]
    pub fn like<V: Into<Operand>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Op {
            op: Operator::Like(LikeOperator::default()),
            operands: vec![Operand::column(column), Operand::list(values)],
        }
    }

    #[must_use]
    pub fn exists(subquery: impl Into<String>) -> Self {
        Self::Op {
            op: Operator::Exists { negated: false },
            operands: vec![Operand::Subquery(subquery.into())],
        }
    }

    /// Return true when the condition is structurally empty.
    ///
    /// A non-empty tree may still render to an empty clause.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Raw(sql) => sql.trim().is_empty(),
            Self::Hash(entries) => entries.is_empty(),
            Self::Op { .. } => false,
        }
    }

    /// Combine with another condition under AND, collapsing empties.
    #[must_use]
    pub fn and_with(self, other: Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other,
            (_, true) => self,
            _ => Self::and([self, other]),
        }
    }

    /// Combine with another condition under OR, collapsing empties.
    #[must_use]
    pub fn or_with(self, other: Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other,
            (_, true) => self,
            _ => Self::or([self, other]),
        }
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Self::raw(sql)
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Self::Raw(sql)
    }
}

///
/// Operator
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operator {
    And,
    Or,
    Not,
    Between { negated: bool },
    In { negated: bool },
    Like(LikeOperator),
    Exists { negated: bool },

    /// Two-operand binary comparison; the symbol is rendered as given.
    Compare(String),
}

impl Operator {
    /// Resolve an operator keyword (case-insensitive).
    ///
    /// Keywords outside the recognized set become binary comparisons.
    #[must_use]
    pub fn parse(keyword: &str) -> Self {
        let upper = keyword.trim().to_ascii_uppercase();

        match upper.as_str() {
            "AND" => Self::And,
            "OR" => Self::Or,
            "NOT" => Self::Not,
            "BETWEEN" => Self::Between { negated: false },
            "NOT BETWEEN" => Self::Between { negated: true },
            "IN" => Self::In { negated: false },
            "NOT IN" => Self::In { negated: true },
            "EXISTS" => Self::Exists { negated: false },
            "NOT EXISTS" => Self::Exists { negated: true },
            _ => match LikeOperator::parse(&upper) {
                Some(like) => Self::Like(like),
                None => Self::Compare(keyword.trim().to_string()),
            },
        }
    }

    /// SQL spelling of the operator.
    #[must_use]
    pub fn keyword(&self) -> String {
        match self {
            Self::And => "AND".to_string(),
            Self::Or => "OR".to_string(),
            Self::Not => "NOT".to_string(),
            Self::Between { negated: false } => "BETWEEN".to_string(),
            Self::Between { negated: true } => "NOT BETWEEN".to_string(),
            Self::In { negated: false } => "IN".to_string(),
            Self::In { negated: true } => "NOT IN".to_string(),
            Self::Exists { negated: false } => "EXISTS".to_string(),
            Self::Exists { negated: true } => "NOT EXISTS".to_string(),
            Self::Like(like) => like.keyword().to_string(),
            Self::Compare(symbol) => symbol.clone(),
        }
    }
}

///
/// Conjunction
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

///
/// LikeOperator
///
/// Parsed form of `(AND |OR )?(NOT )?I?LIKE`.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LikeOperator {
    /// Joins the clauses produced for several values.
    pub conjunction: Conjunction,
    pub negated: bool,
    pub case_insensitive: bool,
}

impl LikeOperator {
    /// Parse an upper-cased operator keyword.
    #[must_use]
    pub fn parse(upper: &str) -> Option<Self> {
        let (conjunction, rest) = if let Some(rest) = upper.strip_prefix("AND ") {
            (Conjunction::And, rest)
        } else if let Some(rest) = upper.strip_prefix("OR ") {
            (Conjunction::Or, rest)
        } else {
            (Conjunction::And, upper)
        };

        let (negated, rest) = match rest.strip_prefix("NOT ") {
            Some(rest) => (true, rest),
            None => (false, rest),
        };

        let case_insensitive = match rest {
            "LIKE" => false,
            "ILIKE" => true,
            _ => return None,
        };

        Some(Self {
            conjunction,
            negated,
            case_insensitive,
        })
    }

    /// Comparison keyword emitted per value (`LIKE`, `NOT ILIKE`, ...).
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match (self.negated, self.case_insensitive) {
            (false, false) => "LIKE",
            (true, false) => "NOT LIKE",
            (false, true) => "ILIKE",
            (true, true) => "NOT ILIKE",
        }
    }
}

///
/// Operand
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Value(Value),
    Column(String),

    /// Multi-column operand; only meaningful for IN, where more than one
    /// column is an unsupported shape.
    Columns(Vec<String>),

    List(Vec<Self>),
    Expr(Expression),
    Condition(Box<Condition>),

    /// Opaque sub-select. Builders degrade it to an empty clause.
    Subquery(String),

    /// LIKE escape map; `None` disables escaping.
    Escape(Option<Vec<(String, String)>>),
}

impl Operand {
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    #[must_use]
    pub fn list<V: Into<Self>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub const fn null() -> Self {
        Self::Value(Value::Null)
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Self::Value(v.into())
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Self::Value(v.into())
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Self::Value(v.into())
    }
}

impl From<u64> for Operand {
    fn from(v: u64) -> Self {
        Self::Value(v.into())
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Self::Value(v.into())
    }
}

impl From<String> for Operand {
    fn from(v: String) -> Self {
        Self::Value(v.into())
    }
}

impl From<Condition> for Operand {
    fn from(c: Condition) -> Self {
        Self::Condition(Box::new(c))
    }
}

impl From<Expression> for Operand {
    fn from(e: Expression) -> Self {
        Self::Expr(e)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Self::list(values)
    }
}

///
/// Expression
///
/// Raw SQL fragment carrying its own parameter bindings. Inlined verbatim
/// wherever it appears; its bindings are merged into the enclosing pass.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Expression {
    pub sql: String,
    pub params: ParamSet,
}

impl Expression {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: ParamSet::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.bind(name, value);
        self
    }
}
