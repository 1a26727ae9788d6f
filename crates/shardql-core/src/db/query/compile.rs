use crate::{
    db::{
        condition::{Condition, ConditionError, Operand, ParamSet, build_condition},
        query::logical::{
            DeleteQuery, InsertQuery, LogicalQuery, SelectQuery, UnionSource, UpdateQuery,
        },
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    value::Value,
};
use thiserror::Error as ThisError;

///
/// CompileError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum CompileError {
    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error("insert into '{table}' has no columns")]
    EmptyInsert { table: String },

    #[error("update of '{table}' sets no columns")]
    EmptyUpdate { table: String },

    #[error("update of '{table}' cannot set column '{column}' from a {shape}")]
    UnsupportedSet {
        table: String,
        column: String,
        shape: &'static str,
    },

    #[error("query has no table to select from")]
    MissingTable,
}

impl From<CompileError> for InternalError {
    fn from(err: CompileError) -> Self {
        let origin = match err {
            CompileError::Condition(_) => ErrorOrigin::Condition,
            _ => ErrorOrigin::Build,
        };

        Self::new(ErrorClass::Argument, origin, err.to_string())
    }
}

///
/// SqlCompiler
///
/// Turns a logical query into one shard's SQL dialect.
///
/// Placeholders the compiler allocates must be appended to `params`;
/// compilers that render the same query into different bindings for
/// different shards break fan-out.
///

pub trait SqlCompiler: Send + Sync {
    fn compile(&self, query: &LogicalQuery, params: &mut ParamSet) -> Result<String, CompileError>;
}

///
/// Dialect
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Dialect {
    #[default]
    Ansi,
    MySql,
    Postgres,
}

impl Dialect {
    /// Case-insensitive dialect name lookup.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ansi" | "sqlite" => Some(Self::Ansi),
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgres" | "postgresql" | "pgsql" => Some(Self::Postgres),
            _ => None,
        }
    }

    const fn quote_char(self) -> char {
        match self {
            Self::MySql => '`',
            Self::Ansi | Self::Postgres => '"',
        }
    }
}

///
/// GenericSqlCompiler
///
/// Reference compiler: one quoting rule, an optional table prefix, and the
/// `{{%table}}` / `{{table}}` / `[[column]]` placeholders.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GenericSqlCompiler {
    dialect: Dialect,
    table_prefix: String,
}

impl GenericSqlCompiler {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            table_prefix: String::new(),
        }
    }

    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    // ─── quoting ───

    /// Quote one identifier, part by part across `.` separators.
    #[must_use]
    pub fn quote_name(&self, name: &str) -> String {
        let q = self.dialect.quote_char();

        name.split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    let escaped = part.replace(q, &format!("{q}{q}"));
                    format!("{q}{escaped}{q}")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Expand `{{%t}}`, `{{t}}` and `[[c]]` inside a SQL fragment.
    #[must_use]
    pub fn quote_sql(&self, sql: &str) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut rest = sql;

        while let Some(start) = rest.find(['{', '[']) {
            let (open, close) = if rest[start..].starts_with("{{") {
                ("{{", "}}")
            } else if rest[start..].starts_with("[[") {
                ("[[", "]]")
            } else {
                out.push_str(&rest[..=start]);
                rest = &rest[start + 1..];
                continue;
            };

            let inner_start = start + open.len();
            let Some(len) = rest[inner_start..].find(close) else {
                break;
            };
            let inner = &rest[inner_start..inner_start + len];

            out.push_str(&rest[..start]);
            if open == "{{" {
                let table = inner
                    .strip_prefix('%')
                    .map_or_else(|| inner.to_string(), |t| format!("{}{t}", self.table_prefix));
                out.push_str(&self.quote_name(&table));
            } else {
                out.push_str(&self.quote_name(inner));
            }
            rest = &rest[inner_start + len + close.len()..];
        }
        out.push_str(rest);

        out
    }

    // Plain identifiers are quoted; anything else is passed through quote_sql.
    fn table(&self, table: &str) -> String {
        let table = table.trim();
        let plain = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '.');

        if plain {
            self.quote_name(table)
        } else {
            self.quote_sql(table)
        }
    }

    fn condition(&self, condition: &Condition, params: &mut ParamSet) -> Result<String, CompileError> {
        Ok(self.quote_sql(&build_condition(condition, params)?))
    }

    // ─── statements ───

    fn select(&self, query: &SelectQuery, params: &mut ParamSet) -> Result<String, CompileError> {
        if query.from.is_empty() {
            return Err(CompileError::MissingTable);
        }

        let mut sql = String::from(if query.distinct {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        });
        if query.select.is_empty() {
            sql.push('*');
        } else {
            let columns: Vec<String> = query.select.iter().map(|c| self.quote_sql(c)).collect();
            sql.push_str(&columns.join(", "));
        }

        let tables: Vec<String> = query.from.iter().map(|t| self.table(t)).collect();
        sql.push_str(" FROM ");
        sql.push_str(&tables.join(", "));

        for join in &query.joins {
            sql.push(' ');
            sql.push_str(join.kind.keyword());
            sql.push(' ');
            sql.push_str(&self.table(&join.table));

            let on = self.condition(&join.on, params)?;
            if !on.is_empty() {
                sql.push_str(" ON ");
                sql.push_str(&on);
            }
        }

        let filter = self.condition(&query.filter, params)?;
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }

        if !query.group_by.is_empty() {
            let columns: Vec<String> = query.group_by.iter().map(|c| self.quote_sql(c)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&columns.join(", "));
        }

        let having = self.condition(&query.having, params)?;
        if !having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having);
        }

        if !query.order_by.is_empty() {
            let columns: Vec<String> = query
                .order_by
                .iter()
                .map(|(c, dir)| format!("{} {}", self.quote_sql(c), dir.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&columns.join(", "));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        if query.unions.is_empty() {
            return Ok(sql);
        }

        let mut sql = format!("({sql})");
        for union in &query.unions {
            let part = match &union.source {
                UnionSource::Raw(raw) => self.quote_sql(raw),
                UnionSource::Query(inner) => self.select(inner, params)?,
            };
            let keyword = if union.all { "UNION ALL" } else { "UNION" };
            sql.push_str(&format!(" {keyword} ( {part} )"));
        }

        Ok(sql)
    }

    fn insert(&self, query: &InsertQuery, params: &mut ParamSet) -> Result<String, CompileError> {
        if query.values.is_empty() {
            return Err(CompileError::EmptyInsert {
                table: query.table.clone(),
            });
        }

        let mut columns = Vec::with_capacity(query.values.len());
        let mut placeholders = Vec::with_capacity(query.values.len());
        for (column, value) in &query.values {
            columns.push(self.quote_name(column));
            placeholders.push(match value {
                Value::Null => "NULL".to_string(),
                other => params.push(other.clone()),
            });
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(&query.table),
            columns.join(", "),
            placeholders.join(", ")
        ))
    }

    fn update(&self, query: &UpdateQuery, params: &mut ParamSet) -> Result<String, CompileError> {
        if query.set.is_empty() {
            return Err(CompileError::EmptyUpdate {
                table: query.table.clone(),
            });
        }

        let mut assignments = Vec::with_capacity(query.set.len());
        for (column, operand) in &query.set {
            let rhs = match operand {
                Operand::Value(Value::Null) => "NULL".to_string(),
                Operand::Value(value) => params.push(value.clone()),
                Operand::Column(other) => self.quote_sql(other),
                Operand::Expr(expr) => {
                    params.merge(&expr.params);
                    self.quote_sql(&expr.sql)
                }
                other => {
                    return Err(CompileError::UnsupportedSet {
                        table: query.table.clone(),
                        column: column.clone(),
                        shape: operand_shape(other),
                    });
                }
            };
            assignments.push(format!("{} = {rhs}", self.quote_name(column)));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table(&query.table),
            assignments.join(", ")
        );
        let filter = self.condition(&query.filter, params)?;
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }

        Ok(sql)
    }

    fn delete(&self, query: &DeleteQuery, params: &mut ParamSet) -> Result<String, CompileError> {
        let mut sql = format!("DELETE FROM {}", self.table(&query.table));
        let filter = self.condition(&query.filter, params)?;
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }

        Ok(sql)
    }
}

impl SqlCompiler for GenericSqlCompiler {
    fn compile(&self, query: &LogicalQuery, params: &mut ParamSet) -> Result<String, CompileError> {
        match query {
            LogicalQuery::Select(select) => self.select(select, params),
            LogicalQuery::Insert(insert) => self.insert(insert, params),
            LogicalQuery::Update(update) => self.update(update, params),
            LogicalQuery::Delete(delete) => self.delete(delete, params),
        }
    }
}

const fn operand_shape(operand: &Operand) -> &'static str {
    match operand {
        Operand::Value(_) => "value",
        Operand::Column(_) => "column",
        Operand::Columns(_) => "column list",
        Operand::List(_) => "list",
        Operand::Expr(_) => "expression",
        Operand::Condition(_) => "condition",
        Operand::Subquery(_) => "subquery",
        Operand::Escape(_) => "escape map",
    }
}
