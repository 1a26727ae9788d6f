use crate::{
    db::{
        command::ShardCommand,
        condition::{Condition, Operand, ParamSet},
        query::{
            FanoutBuilder, Join, JoinKind, LogicalQuery, SelectQuery, SortDirection, Union,
            UnionSource,
        },
        response::{Row, populate},
        route::{ShardId, ShardPlan},
        session::ShardSession,
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::entity::EntityModel,
    traits::EntityKind,
    value::Value,
};
use std::marker::PhantomData;

///
/// ViaLink
///
/// Column pairs joining a primary row set to the target entity through a
/// junction table.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ViaLink {
    /// Junction column holding the primary row's key.
    pub junction_source: String,
    /// Primary row column matched by `junction_source`.
    pub primary: String,
    /// Junction column holding the target's key.
    pub junction_target: String,
    /// Target column matched by `junction_target`.
    pub target: String,
}

impl ViaLink {
    #[must_use]
    pub fn new(
        junction_source: impl Into<String>,
        primary: impl Into<String>,
        junction_target: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            junction_source: junction_source.into(),
            primary: primary.into(),
            junction_target: junction_target.into(),
            target: target.into(),
        }
    }
}

#[derive(Clone, Debug)]
struct Via {
    model: &'static EntityModel,
    table: String,
    link: ViaLink,
    primary_rows: Vec<Row>,
}

///
/// ShardedQuery
///
/// Builder for a read of entity `E`. Every terminal recomputes the shard plan
/// from the current filter.
///

pub struct ShardedQuery<'s, E: EntityKind> {
    session: &'s ShardSession,
    query: SelectQuery,
    params: ParamSet,
    shards: Option<Vec<ShardId>>,
    via: Option<Via>,
    _marker: PhantomData<E>,
}

impl<'s, E: EntityKind> ShardedQuery<'s, E> {
    pub(super) fn new(session: &'s ShardSession) -> Self {
        Self {
            session,
            query: SelectQuery::default(),
            params: ParamSet::new(),
            shards: None,
            via: None,
            _marker: PhantomData,
        }
    }

    // ─── projection ───

    /// Replace the select list. Entries containing commas are split.
    #[must_use]
    pub fn select(mut self, columns: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.query.select = split_columns(columns);
        self
    }

    #[must_use]
    pub const fn distinct(mut self, distinct: bool) -> Self {
        self.query.distinct = distinct;
        self
    }

    /// Override the FROM list; defaults to the entity's table.
    #[must_use]
    pub fn from(mut self, tables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.query.from = tables.into_iter().map(Into::into).collect();
        self
    }

    // ─── filtering ───

    #[must_use]
    pub fn filter(mut self, condition: impl Into<Condition>) -> Self {
        self.query.filter = condition.into();
        self
    }

    #[must_use]
    pub fn and_filter(mut self, condition: impl Into<Condition>) -> Self {
        self.query.filter = std::mem::take(&mut self.query.filter).and_with(condition.into());
        self
    }

    #[must_use]
    pub fn or_filter(mut self, condition: impl Into<Condition>) -> Self {
        self.query.filter = std::mem::take(&mut self.query.filter).or_with(condition.into());
        self
    }

    /// Filter on the first primary-key column.
    ///
    /// The column is qualified with the table when joins are present.
    #[must_use]
    pub fn filter_pk(self, value: impl Into<Operand>) -> Self {
        let model = E::MODEL;
        let Some(pk) = model.primary_key.first() else {
            return self;
        };
        let column = if self.query.joins.is_empty() {
            (*pk).to_string()
        } else {
            format!("{}.{pk}", model.table_ref())
        };

        self.and_filter(Condition::eq(column, value))
    }

    /// Merge additional bindings into the query's parameter set.
    #[must_use]
    pub fn params(mut self, params: ParamSet) -> Self {
        self.params.merge(&params);
        self
    }

    // ─── joins ───

    #[must_use]
    pub fn join(mut self, kind: JoinKind, table: impl Into<String>, on: impl Into<Condition>) -> Self {
        self.query.joins.push(Join {
            kind,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    #[must_use]
    pub fn inner_join(self, table: impl Into<String>, on: impl Into<Condition>) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    #[must_use]
    pub fn left_join(self, table: impl Into<String>, on: impl Into<Condition>) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    #[must_use]
    pub fn right_join(self, table: impl Into<String>, on: impl Into<Condition>) -> Self {
        self.join(JoinKind::Right, table, on)
    }

    /// Restrict the target set through a junction table.
    ///
    /// Junction rows are read with `P`'s routing when the query runs.
    #[must_use]
    pub fn via_table<P: EntityKind>(
        mut self,
        table: impl Into<String>,
        link: ViaLink,
        primary_rows: Vec<Row>,
    ) -> Self {
        self.via = Some(Via {
            model: P::MODEL,
            table: table.into(),
            link,
            primary_rows,
        });
        self
    }

    // ─── grouping ───

    #[must_use]
    pub fn group_by(mut self, columns: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.query.group_by = split_columns(columns);
        self
    }

    #[must_use]
    pub fn add_group_by(mut self, columns: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.query.group_by.extend(split_columns(columns));
        self
    }

    #[must_use]
    pub fn having(mut self, condition: impl Into<Condition>) -> Self {
        self.query.having = condition.into();
        self
    }

    #[must_use]
    pub fn and_having(mut self, condition: impl Into<Condition>) -> Self {
        self.query.having = std::mem::take(&mut self.query.having).and_with(condition.into());
        self
    }

    #[must_use]
    pub fn or_having(mut self, condition: impl Into<Condition>) -> Self {
        self.query.having = std::mem::take(&mut self.query.having).or_with(condition.into());
        self
    }

    /// Append a raw UNION member.
    #[must_use]
    pub fn union(mut self, sql: impl Into<String>, all: bool) -> Self {
        self.query.unions.push(Union {
            source: UnionSource::Raw(sql.into()),
            all,
        });
        self
    }

    // ─── ordering / paging ───

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.query.order_by.push((column.into(), direction));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Bypass routing and run on exactly these shards.
    #[must_use]
    pub fn on_shards(mut self, shards: impl IntoIterator<Item = impl Into<ShardId>>) -> Self {
        self.shards = Some(shards.into_iter().map(Into::into).collect());
        self
    }

    // ─── terminals ───

    /// Prepare the per-shard command without running it.
    pub fn command(&self) -> Result<ShardCommand<'s>, InternalError> {
        let query = self.prepare()?;
        self.command_for(query)
    }

    /// All matching rows, de-duplicated by primary key in shard order.
    pub fn all(self) -> Result<Vec<Row>, InternalError> {
        let rows = self.command()?.query_all()?;

        Ok(populate(rows, E::MODEL.primary_key)?)
    }

    /// The first row in shard order, if any.
    pub fn one(self) -> Result<Option<Row>, InternalError> {
        let Some(row) = self.command()?.query_one()? else {
            return Ok(None);
        };

        Ok(populate(vec![row], E::MODEL.primary_key)?.into_iter().next())
    }

    /// `COUNT(*)` summed across the routed shards.
    pub fn count(self) -> Result<u64, InternalError> {
        match self.scalar("COUNT(*)")? {
            Value::Int(n) => u64::try_from(n).map_err(|_| count_error(&Value::Int(n))),
            Value::Uint(n) => Ok(n),
            other => Err(count_error(&other)),
        }
    }

    /// True if any routed shard has a matching row.
    pub fn exists(self) -> Result<bool, InternalError> {
        let mut query = self.prepare()?;
        query.select = vec!["1".to_string()];

        let found = match self.command_for(query)?.query_scalar()? {
            Value::Int(n) => n != 0,
            Value::Uint(n) => n != 0,
            Value::Float64(f) => f.get() != 0.0,
            _ => false,
        };

        Ok(found)
    }

    /// Sum of `expr` across the routed shards; limit and offset are cleared.
    pub fn scalar(self, expr: &str) -> Result<Value, InternalError> {
        let mut query = self.prepare()?;
        query.select = vec![expr.to_string()];
        query.limit = None;
        query.offset = None;

        self.command_for(query)?.query_scalar()
    }

    // ─── internals ───

    // Apply entity defaults and resolve any junction filter.
    fn prepare(&self) -> Result<SelectQuery, InternalError> {
        let mut query = self.query.clone();

        if query.from.is_empty() {
            query.from = vec![E::MODEL.table_ref()];
        }
        if query.select.is_empty() && !query.joins.is_empty() {
            let alias = query.from.first().map_or_else(String::new, |t| table_alias(t));
            query.select = vec![format!("{alias}.*")];
        }
        if let Some(via) = &self.via {
            let keys = self.junction_keys(via)?;
            query.filter = std::mem::take(&mut query.filter)
                .and_with(Condition::in_(via.link.target.clone(), keys));
        }

        Ok(query)
    }

    fn command_for(&self, query: SelectQuery) -> Result<ShardCommand<'s>, InternalError> {
        let plan = self.plan(E::MODEL, &query.filter)?;

        self.compile(E::MODEL, &LogicalQuery::Select(query), &plan)
    }

    fn plan(&self, model: &EntityModel, filter: &Condition) -> Result<ShardPlan, InternalError> {
        match &self.shards {
            Some(shards) => self.session.router().plan_explicit(shards),
            None => self.session.router().plan(model, filter, &self.params),
        }
    }

    fn compile(
        &self,
        model: &'static EntityModel,
        query: &LogicalQuery,
        plan: &ShardPlan,
    ) -> Result<ShardCommand<'s>, InternalError> {
        let registry = self.session.registry();
        let statement = FanoutBuilder::new(registry).build(query, &self.params, plan)?;

        Ok(ShardCommand::new(registry, statement).for_entity(model.path))
    }

    // Distinct non-null target keys read from the junction table.
    fn junction_keys(&self, via: &Via) -> Result<Vec<Value>, InternalError> {
        let sources = distinct_values(via.primary_rows.iter(), &via.link.primary);
        let query = SelectQuery {
            from: vec![via.table.clone()],
            filter: Condition::in_(via.link.junction_source.clone(), sources),
            ..SelectQuery::default()
        };
        let plan = self
            .session
            .router()
            .plan(via.model, &query.filter, &ParamSet::new())?;
        let registry = self.session.registry();
        let statement =
            FanoutBuilder::new(registry).build(&LogicalQuery::Select(query), &ParamSet::new(), &plan)?;
        let rows = ShardCommand::new(registry, statement)
            .for_entity(via.model.path)
            .query_all()?;

        Ok(distinct_values(rows.iter(), &via.link.junction_target))
    }
}

fn split_columns(columns: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    columns
        .into_iter()
        .flat_map(|c| {
            c.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

// `{{%order}} o` → `o`; a bare table is its own alias.
fn table_alias(table: &str) -> String {
    let table = table.trim();
    match table.rsplit_once(char::is_whitespace) {
        Some((_, alias)) if !alias.is_empty() => alias.to_string(),
        _ => table.to_string(),
    }
}

fn distinct_values<'a>(rows: impl Iterator<Item = &'a Row>, column: &str) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for value in rows.filter_map(|row| row.get(column)) {
        if !value.is_null() && !out.contains(value) {
            out.push(value.clone());
        }
    }

    out
}

fn count_error(value: &Value) -> InternalError {
    InternalError::new(
        ErrorClass::Execution,
        ErrorOrigin::Session,
        format!("count returned a non-count value: {}", value.to_plain_text()),
    )
}
