use crate::{
    db::condition::{
        Condition, ConditionError, Expression, LikeOperator, Operand, Operator, ParamSet,
        like::EscapeMap,
    },
    value::Value,
};

///
/// Condition building
///
/// Renders a condition tree into a parameterized SQL fragment, appending
/// every literal it meets to the caller's `ParamSet`.
///
/// Failure policy: malformed operand counts fail with `ConditionError`;
/// shapes the builder does not support (subqueries, multi-column IN, nested
/// lists, EXISTS) render as an empty clause instead. Callers that need strict
/// validation on a critical path must check the rendered fragment themselves.
///

/// Render `condition`, registering new placeholders in `params`.
pub fn build_condition(
    condition: &Condition,
    params: &mut ParamSet,
) -> Result<String, ConditionError> {
    match condition {
        Condition::Empty => Ok(String::new()),
        Condition::Raw(sql) => Ok(sql.clone()),
        Condition::Hash(entries) => build_hash(entries, params),
        Condition::Op { op, operands } => build_op(op, operands, params),
    }
}

/// Render a full WHERE clause body, returning it with the final bindings.
pub fn build_where(
    condition: &Condition,
    mut params: ParamSet,
) -> Result<(String, ParamSet), ConditionError> {
    let sql = build_condition(condition, &mut params)?;

    Ok((sql, params))
}

fn build_op(
    op: &Operator,
    operands: &[Operand],
    params: &mut ParamSet,
) -> Result<String, ConditionError> {
    match op {
        Operator::And | Operator::Or => build_junction(op, operands, params),
        Operator::Not => build_not(operands, params),
        Operator::Between { negated } => build_between(*negated, operands, params),
        Operator::In { negated } => build_in(*negated, operands, params),
        Operator::Like(like) => build_like(*like, operands, params),
        // EXISTS needs a query compiler this layer does not own
        Operator::Exists { .. } => Ok(String::new()),
        Operator::Compare(symbol) => build_compare(symbol, operands, params),
    }
}

// ─────────────────────────────────────────────
// Hash
// ─────────────────────────────────────────────

fn build_hash(
    entries: &[(String, Operand)],
    params: &mut ParamSet,
) -> Result<String, ConditionError> {
    let mut parts = Vec::with_capacity(entries.len());

    for (column, operand) in entries {
        let part = match operand {
            Operand::List(values) => build_in_values(false, column, values, params),
            Operand::Value(Value::List(items)) => {
                let values: Vec<Operand> = items.iter().cloned().map(Operand::Value).collect();
                build_in_values(false, column, &values, params)
            }
            Operand::Value(Value::Null) => format!("{column} IS NULL"),
            Operand::Value(value) => {
                let ph = params.push(value.clone());
                format!("{column} = {ph}")
            }
            Operand::Expr(expr) => format!("{column} = {}", inline_expr(expr, params)),
            Operand::Column(other) => format!("{column} = {other}"),
            Operand::Columns(_)
            | Operand::Condition(_)
            | Operand::Subquery(_)
            | Operand::Escape(_) => String::new(),
        };

        if !part.is_empty() {
            parts.push(part);
        }
    }

    Ok(match parts.len() {
        0 => String::new(),
        1 => parts.remove(0),
        _ => parenthesize_join(&parts, "AND"),
    })
}

// ─────────────────────────────────────────────
// Boolean composition
// ─────────────────────────────────────────────

fn build_junction(
    op: &Operator,
    operands: &[Operand],
    params: &mut ParamSet,
) -> Result<String, ConditionError> {
    let mut parts = Vec::with_capacity(operands.len());

    for operand in operands {
        let part = build_fragment(operand, params)?;
        if !part.is_empty() {
            parts.push(part);
        }
    }

    if parts.is_empty() {
        return Ok(String::new());
    }

    Ok(parenthesize_join(&parts, &op.keyword()))
}

fn build_not(operands: &[Operand], params: &mut ParamSet) -> Result<String, ConditionError> {
    let [operand] = operands else {
        return Err(ConditionError::arity(&Operator::Not, "exactly one", operands.len()));
    };

    let inner = build_fragment(operand, params)?;
    if inner.is_empty() {
        return Ok(String::new());
    }

    Ok(format!("NOT ({inner})"))
}

// Operand of AND/OR/NOT: nested conditions recurse, strings are raw SQL.
fn build_fragment(operand: &Operand, params: &mut ParamSet) -> Result<String, ConditionError> {
    match operand {
        Operand::Condition(condition) => build_condition(condition, params),
        Operand::Value(Value::Text(sql)) => Ok(sql.clone()),
        Operand::Expr(expr) => Ok(inline_expr(expr, params)),
        Operand::Value(_)
        | Operand::Column(_)
        | Operand::Columns(_)
        | Operand::List(_)
        | Operand::Subquery(_)
        | Operand::Escape(_) => Ok(String::new()),
    }
}

// ─────────────────────────────────────────────
// Comparisons
// ─────────────────────────────────────────────

fn build_compare(
    symbol: &str,
    operands: &[Operand],
    params: &mut ParamSet,
) -> Result<String, ConditionError> {
    let op = Operator::Compare(symbol.to_string());
    let [column, value] = operands else {
        return Err(ConditionError::arity(&op, "two", operands.len()));
    };
    let column = column_of(&op, column)?;

    let rhs = match value {
        Operand::Value(Value::Null) => "NULL".to_string(),
        Operand::Column(other) => other.clone(),
        other => match bind_scalar(other, params) {
            Some(rhs) => rhs,
            None => return Ok(String::new()),
        },
    };

    Ok(format!("{column} {symbol} {rhs}"))
}

fn build_between(
    negated: bool,
    operands: &[Operand],
    params: &mut ParamSet,
) -> Result<String, ConditionError> {
    let op = Operator::Between { negated };
    let [column, lo, hi] = operands else {
        return Err(ConditionError::arity(&op, "three", operands.len()));
    };
    let column = column_of(&op, column)?;

    let Some(lo) = bind_scalar(lo, params) else {
        return Ok(String::new());
    };
    let Some(hi) = bind_scalar(hi, params) else {
        return Ok(String::new());
    };

    Ok(format!("{column} {} {lo} AND {hi}", op.keyword()))
}

fn build_in(
    negated: bool,
    operands: &[Operand],
    params: &mut ParamSet,
) -> Result<String, ConditionError> {
    let op = Operator::In { negated };
    let [column, values] = operands else {
        return Err(ConditionError::arity(&op, "two", operands.len()));
    };

    let column = match column {
        Operand::Columns(columns) => match columns.as_slice() {
            [] => return Ok(empty_in(negated)),
            [column] => column.as_str(),
            // multi-column IN is not supported
            _ => return Ok(String::new()),
        },
        other => column_of(&op, other)?,
    };

    let values: Vec<Operand> = match values {
        Operand::Subquery(_) => return Ok(String::new()),
        Operand::List(items) => items.clone(),
        Operand::Value(Value::List(items)) => items.iter().cloned().map(Operand::Value).collect(),
        single => vec![single.clone()],
    };

    Ok(build_in_values(negated, column, &values, params))
}

fn build_in_values(
    negated: bool,
    column: &str,
    values: &[Operand],
    params: &mut ParamSet,
) -> String {
    if values.is_empty() {
        return empty_in(negated);
    }

    let mut rendered = Vec::with_capacity(values.len());
    for value in values {
        let sql = match value {
            Operand::Value(Value::Null) => "NULL".to_string(),
            other => match bind_scalar(other, params) {
                Some(sql) => sql,
                None => return String::new(),
            },
        };
        rendered.push(sql);
    }

    if let [single] = rendered.as_slice() {
        let symbol = if negated { "<>" } else { "=" };
        return format!("{column} {symbol} {single}");
    }

    let keyword = if negated { "NOT IN" } else { "IN" };
    format!("{column} {keyword} ({})", rendered.join(", "))
}

fn empty_in(negated: bool) -> String {
    if negated {
        String::new()
    } else {
        "0=1".to_string()
    }
}

fn build_like(
    like: LikeOperator,
    operands: &[Operand],
    params: &mut ParamSet,
) -> Result<String, ConditionError> {
    let op = Operator::Like(like);
    let (column, values, escape) = match operands {
        [column, values] => (column, values, EscapeMap::Default),
        [column, values, Operand::Escape(None)] => (column, values, EscapeMap::Disabled),
        [column, values, Operand::Escape(Some(map))] => {
            (column, values, EscapeMap::Custom(map.clone()))
        }
        [_, _, _] => return Err(ConditionError::InvalidEscape { operator: op.keyword() }),
        _ => return Err(ConditionError::arity(&op, "two or three", operands.len())),
    };
    let column = column_of(&op, column)?;

    let values: Vec<&Operand> = match values {
        Operand::List(items) => items.iter().collect(),
        single => vec![single],
    };

    if values.is_empty() {
        return Ok(if like.negated {
            String::new()
        } else {
            "0=1".to_string()
        });
    }

    let mut parts = Vec::with_capacity(values.len());
    for value in values {
        let ph = match value {
            Operand::Expr(expr) => inline_expr(expr, params),
            Operand::Value(Value::List(_)) => return Ok(String::new()),
            Operand::Value(v) => {
                let bound = match &escape {
                    EscapeMap::Disabled => v.clone(),
                    _ => Value::Text(escape.pattern(&v.to_plain_text())),
                };
                params.push(bound)
            }
            _ => return Ok(String::new()),
        };
        parts.push(format!("{column} {} {ph}", like.keyword()));
    }

    Ok(parts.join(&format!(" {} ", like.conjunction.as_sql())))
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

fn column_of<'a>(op: &Operator, operand: &'a Operand) -> Result<&'a str, ConditionError> {
    match operand {
        Operand::Column(column) | Operand::Value(Value::Text(column)) => Ok(column),
        _ => Err(ConditionError::ColumnRequired {
            operator: op.keyword(),
        }),
    }
}

// Scalar slot: literal → new placeholder, expression → inlined.
// Anything else is an unsupported shape.
fn bind_scalar(operand: &Operand, params: &mut ParamSet) -> Option<String> {
    match operand {
        Operand::Value(Value::List(_)) => None,
        Operand::Value(value) => Some(params.push(value.clone())),
        Operand::Expr(expr) => Some(inline_expr(expr, params)),
        _ => None,
    }
}

fn inline_expr(expr: &Expression, params: &mut ParamSet) -> String {
    params.merge(&expr.params);
    expr.sql.clone()
}

fn parenthesize_join(parts: &[String], keyword: &str) -> String {
    format!("({})", parts.join(&format!(") {keyword} (")))
}
