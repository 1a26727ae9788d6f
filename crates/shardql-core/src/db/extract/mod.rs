//! Sharding-key recovery from rendered SQL.
//!
//! The extractor does not parse SQL. It scans text for three shapes bound to
//! the sharding column (equality, IN lists, integer BETWEEN ranges) and is
//! blind to nested subqueries and unusual quoting.
//!
//! It is also blind to boolean structure. A key found under `NOT` or one arm of
//! an `OR` is reported like any other, so `NOT (id = 5)` routes to the shard
//! of 5 alone and `id = 5 OR name = 'x'` misses rows of `x` on other shards.
//! Queries with those shapes should pin their shards with `on_shards`.


use crate::{
    db::condition::{Condition, ParamSet, build_where, like::translate},
    error::{ErrorClass, ErrorOrigin, InternalError},
    value::{Float64, Value},
};
use regex::Regex;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, LazyLock, PoisonError, RwLock},
};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Widest BETWEEN range expanded into individual keys by default.
pub const DEFAULT_MAX_RANGE_SPAN: u64 = 10_000;

// One SQL literal: quoted string (with '' escapes) or a bare token.
const LITERAL: &str = r"'(?:[^']|'')*'|-?[A-Za-z0-9_.]+";

///
/// ExtractError
///

#[derive(Debug, ThisError)]
pub enum ExtractError {
    #[error("key extraction requires a sharding column")]
    MissingColumn,

    #[error("failed to compile key pattern for column '{column}': {source}")]
    Pattern {
        column: String,
        #[source]
        source: regex::Error,
    },
}

impl From<ExtractError> for InternalError {
    fn from(err: ExtractError) -> Self {
        let class = match err {
            ExtractError::MissingColumn => ErrorClass::Configuration,
            ExtractError::Pattern { .. } => ErrorClass::Internal,
        };

        Self::new(class, ErrorOrigin::Extract, err.to_string())
    }
}

///
/// KeyValues
///
/// Duplicate-free sharding-key literals in first-seen order.
///

#[derive(Clone, Debug, Default)]
pub struct KeyValues {
    values: Vec<Value>,
    seen: HashSet<Value>,
}

impl KeyValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value unless already present. Returns true if inserted.
    pub fn insert(&mut self, value: Value) -> bool {
        if self.seen.contains(&value) {
            return false;
        }
        self.seen.insert(value.clone());
        self.values.push(value);

        true
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.seen.contains(value)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }
}

impl PartialEq for KeyValues {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for KeyValues {}

impl FromIterator<Value> for KeyValues {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut keys = Self::new();
        for value in iter {
            keys.insert(value);
        }

        keys
    }
}

///
/// KeyExtractor
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyExtractor {
    /// BETWEEN ranges wider than this contribute no keys. `None` expands any
    /// range.
    pub max_range_span: Option<u64>,
}

impl Default for KeyExtractor {
    fn default() -> Self {
        Self {
            max_range_span: Some(DEFAULT_MAX_RANGE_SPAN),
        }
    }
}

impl KeyExtractor {
    #[must_use]
    pub const fn new(max_range_span: Option<u64>) -> Self {
        Self { max_range_span }
    }

    /// Scan rendered SQL for literals bound to `column`.
    ///
    /// Equality, IN-list and BETWEEN matches are unioned; an empty result
    /// means the caller must fall back to its default shard selection.
    pub fn extract(&self, sql: &str, column: &str) -> Result<KeyValues, ExtractError> {
        let column = column.trim();
        if column.is_empty() {
            return Err(ExtractError::MissingColumn);
        }

        let patterns = KeyPatterns::for_column(column)?;
        let mut keys = KeyValues::new();

        for caps in patterns.equality.captures_iter(sql) {
            if let Some(value) = parse_literal(&caps[1]) {
                keys.insert(value);
            }
        }

        for caps in patterns.in_list.captures_iter(sql) {
            for item in patterns.literal.find_iter(&caps[1]) {
                if let Some(value) = parse_literal(item.as_str()) {
                    keys.insert(value);
                }
            }
        }

        for caps in patterns.between.captures_iter(sql) {
            let (Ok(lo), Ok(hi)) = (caps[1].parse::<i64>(), caps[2].parse::<i64>()) else {
                continue;
            };
            self.expand_range(lo, hi, &mut keys);
        }

        Ok(keys)
    }

    /// Render `condition` with its bindings substituted, then extract.
    pub fn extract_from_condition(
        &self,
        condition: &Condition,
        params: &ParamSet,
        column: &str,
    ) -> Result<KeyValues, InternalError> {
        let (sql, params) = build_where(condition, params.clone())?;
        let rendered = render_sql(&sql, &params, Value::to_sql_literal);

        Ok(self.extract(&rendered, column)?)
    }

    fn expand_range(&self, lo: i64, hi: i64, keys: &mut KeyValues) {
        if hi < lo {
            return;
        }

        let span = (i128::from(hi) - i128::from(lo) + 1).unsigned_abs();
        if let Some(max) = self.max_range_span
            && span > u128::from(max)
        {
            tracing::debug!(lo, hi, max, "between range exceeds max span; no keys taken");
            return;
        }

        for n in lo..=hi {
            keys.insert(Value::Int(n));
        }
    }
}

///
/// KeyPatterns
///

struct KeyPatterns {
    equality: Regex,
    in_list: Regex,
    between: Regex,
    literal: Regex,
}

impl KeyPatterns {
    /// Compiled patterns for `column`, shared process-wide.
    fn for_column(column: &str) -> Result<Arc<Self>, ExtractError> {
        static CACHE: LazyLock<RwLock<HashMap<String, Arc<KeyPatterns>>>> =
            LazyLock::new(Default::default);

        if let Some(patterns) = CACHE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(column)
        {
            return Ok(Arc::clone(patterns));
        }

        let patterns = Arc::new(Self::compile(column)?);
        CACHE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(column.to_string())
            .or_insert_with(|| Arc::clone(&patterns));

        Ok(patterns)
    }

    fn compile(column: &str) -> Result<Self, ExtractError> {
        // word-boundary anchor so `id` never matches inside `parent_id`
        let anchor = if column.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            r"\b"
        } else {
            ""
        };
        let col = format!("{anchor}{}", regex::escape(column));

        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|source| ExtractError::Pattern {
                column: column.to_string(),
                source,
            })
        };

        Ok(Self {
            equality: compile(format!(r"(?i){col}\s*=\s*({LITERAL})"))?,
            in_list: compile(format!(r"(?i){col}\s+IN\s*\(([^()]*)\)"))?,
            between: compile(format!(r"(?i){col}\s+BETWEEN\s+(-?\d+)\s+AND\s+(-?\d+)"))?,
            literal: compile(LITERAL.to_string())?,
        })
    }
}

/// Substitute every placeholder in `sql` with its rendered literal.
///
/// Longer names are replaced first, so `:qp1` never clobbers `:qp10`.
pub fn render_sql(sql: &str, params: &ParamSet, literal: impl Fn(&Value) -> String) -> String {
    if params.is_empty() {
        return sql.to_string();
    }

    let rendered: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| (name.to_string(), literal(value)))
        .collect();
    let pairs: Vec<(&str, &str)> = rendered
        .iter()
        .map(|(n, v)| (n.as_str(), v.as_str()))
        .collect();

    translate(sql, &pairs)
}

// Typed literal from its SQL spelling. NULL carries no key.
fn parse_literal(token: &str) -> Option<Value> {
    let token = token.trim();

    if let Some(inner) = token
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Some(Value::Text(inner.replace("''", "'")));
    }
    if token.is_empty() || token.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if token.eq_ignore_ascii_case("TRUE") {
        return Some(Value::Bool(true));
    }
    if token.eq_ignore_ascii_case("FALSE") {
        return Some(Value::Bool(false));
    }
    if let Ok(n) = token.parse::<i64>() {
        return Some(Value::Int(n));
    }
    if let Ok(n) = token.parse::<u64>() {
        return Some(Value::Uint(n));
    }
    if let Some(f) = token.parse::<f64>().ok().and_then(Float64::try_new) {
        return Some(Value::Float64(f));
    }

    Some(Value::Text(token.to_string()))
}
