mod property;

use crate::{
    db::condition::{
        Condition, ConditionError, Conjunction, Expression, LikeOperator, Operand, Operator,
        ParamSet, build_condition, build_where, like::translate,
    },
    value::Value,
};

fn build(condition: &Condition) -> (String, ParamSet) {
    build_where(condition, ParamSet::new()).expect("condition should build")
}

fn params_of(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
    pairs
        .iter()
        .map(|(n, v)| ((*n).to_string(), v.clone()))
        .collect()
}

// ---- hash --------------------------------------------------------------

#[test]
fn hash_with_null_parenthesizes_each_entry() {
    let condition = Condition::hash([("id", Operand::from(5)), ("status", Operand::null())]);
    let (sql, params) = build(&condition);

    assert_eq!(sql, "(id = :qp0) AND (status IS NULL)");
    assert_eq!(params.into_vec(), params_of(&[(":qp0", Value::Int(5))]));
}

#[test]
fn hash_single_entry_is_not_parenthesized() {
    let (sql, _) = build(&Condition::hash([("id", 7)]));

    assert_eq!(sql, "id = :qp0");
}

#[test]
fn hash_list_value_becomes_in_clause() {
    let (sql, params) = build(&Condition::hash([("id", vec![1, 2])]));

    assert_eq!(sql, "id IN (:qp0, :qp1)");
    assert_eq!(params.len(), 2);
}

#[test]
fn hash_expression_value_is_inlined_with_its_params() {
    let expr = Expression::new("LOWER(:name)").with_param("name", "Bob");
    let (sql, params) = build(&Condition::hash([("login", expr)]));

    assert_eq!(sql, "login = LOWER(:name)");
    assert_eq!(params.get(":name"), Some(&Value::Text("Bob".to_string())));
}

// ---- and / or / not ----------------------------------------------------

#[test]
fn and_of_empty_operands_is_empty() {
    let condition = Condition::and([Condition::Empty, Condition::raw(""), Condition::exists("SELECT 1")]);

    assert_eq!(build(&condition).0, "");
}

#[test]
fn and_with_single_survivor_is_parenthesized() {
    let condition = Condition::and([Condition::Empty, Condition::raw("a = 1")]);

    assert_eq!(build(&condition).0, "(a = 1)");
}

#[test]
fn nested_and_or_shares_one_placeholder_counter() {
    let condition = Condition::and([
        Condition::hash([("a", 1)]),
        Condition::or([Condition::hash([("b", 2)]), Condition::raw("c IS NULL")]),
    ]);
    let (sql, params) = build(&condition);

    assert_eq!(sql, "(a = :qp0) AND ((b = :qp1) OR (c IS NULL))");
    assert_eq!(
        params.into_vec(),
        params_of(&[(":qp0", Value::Int(1)), (":qp1", Value::Int(2))])
    );
}

#[test]
fn not_requires_exactly_one_operand() {
    let err = build_where(&Condition::op("not", vec![]), ParamSet::new()).unwrap_err();

    assert_eq!(
        err,
        ConditionError::Arity {
            operator: "NOT".to_string(),
            expected: "exactly one",
            found: 0,
        }
    );
}

#[test]
fn not_of_empty_is_empty_and_otherwise_wraps() {
    assert_eq!(build(&Condition::not(Condition::Empty)).0, "");
    assert_eq!(
        build(&Condition::not(Condition::hash([("id", 1)]))).0,
        "NOT (id = :qp0)"
    );
}

// ---- between -----------------------------------------------------------

#[test]
fn between_binds_both_bounds() {
    let (sql, params) = build(&Condition::between("id", 199, 202));

    assert_eq!(sql, "id BETWEEN :qp0 AND :qp1");
    assert_eq!(
        params.into_vec(),
        params_of(&[(":qp0", Value::Int(199)), (":qp1", Value::Int(202))])
    );
}

#[test]
fn not_between_accepts_expression_bounds() {
    let lo = Expression::new(":lo").with_param(":lo", 1);
    let (sql, params) = build(&Condition::not_between("id", lo, 9));

    assert_eq!(sql, "id NOT BETWEEN :lo AND :qp0");
    assert_eq!(params.len(), 2);
}

#[test]
fn between_with_two_operands_is_an_argument_error() {
    let condition = Condition::op(
        "BETWEEN",
        vec![Operand::column("id"), Operand::from(1)],
    );
    let err = build_where(&condition, ParamSet::new()).unwrap_err();

    assert!(matches!(err, ConditionError::Arity { found: 2, .. }));
}

#[test]
fn between_requires_a_column() {
    let condition = Condition::op(
        "between",
        vec![Operand::from(Value::Int(1)), Operand::from(2), Operand::from(3)],
    );
    let err = build_where(&condition, ParamSet::new()).unwrap_err();

    assert!(matches!(err, ConditionError::ColumnRequired { .. }));
}

// ---- in ----------------------------------------------------------------

#[test]
fn in_collapses_by_value_count() {
    assert_eq!(build(&Condition::in_("id", Vec::<i64>::new())).0, "0=1");
    assert_eq!(build(&Condition::in_("id", [4])).0, "id = :qp0");
    assert_eq!(
        build(&Condition::in_("id", [4, 5, 6])).0,
        "id IN (:qp0, :qp1, :qp2)"
    );
}

#[test]
fn not_in_collapses_by_value_count() {
    assert_eq!(build(&Condition::not_in("id", Vec::<i64>::new())).0, "");
    assert_eq!(build(&Condition::not_in("id", [4])).0, "id <> :qp0");
    assert_eq!(
        build(&Condition::not_in("id", [4, 5])).0,
        "id NOT IN (:qp0, :qp1)"
    );
}

#[test]
fn in_renders_null_inline() {
    let (sql, params) = build(&Condition::in_("id", [Operand::from(1), Operand::null()]));

    assert_eq!(sql, "id IN (:qp0, NULL)");
    assert_eq!(params.len(), 1);
}

#[test]
fn in_unsupported_shapes_degrade_to_empty() {
    let multi = Condition::op(
        "IN",
        vec![
            Operand::Columns(vec!["a".to_string(), "b".to_string()]),
            Operand::list([1, 2]),
        ],
    );
    let subquery = Condition::op(
        "IN",
        vec![Operand::column("id"), Operand::Subquery("SELECT id FROM t".to_string())],
    );
    let nested = Condition::in_("id", [Operand::list([1, 2])]);

    assert_eq!(build(&multi).0, "");
    assert_eq!(build(&subquery).0, "");
    assert_eq!(build(&nested).0, "");
}

#[test]
fn in_with_empty_column_list_is_false() {
    let condition = Condition::op("in", vec![Operand::Columns(vec![]), Operand::list([1])]);

    assert_eq!(build(&condition).0, "0=1");
}

// ---- like --------------------------------------------------------------

#[test]
fn like_escapes_wildcards_by_default() {
    let (sql, params) = build(&Condition::like("title", ["50%_off"]));

    assert_eq!(sql, "title LIKE :qp0");
    assert_eq!(
        params.get(":qp0"),
        Some(&Value::Text("%50\\%\\_off%".to_string()))
    );
}

#[test]
fn or_not_like_joins_values_with_or() {
    let condition = Condition::op(
        "or not like",
        vec![Operand::column("title"), Operand::list(["a", "b"])],
    );

    assert_eq!(
        build(&condition).0,
        "title NOT LIKE :qp0 OR title NOT LIKE :qp1"
    );
}

#[test]
fn like_with_escaping_disabled_binds_value_as_is() {
    let condition = Condition::op(
        "like",
        vec![
            Operand::column("title"),
            Operand::from("a%"),
            Operand::Escape(None),
        ],
    );
    let (_, params) = build(&condition);

    assert_eq!(params.get(":qp0"), Some(&Value::Text("a%".to_string())));
}

#[test]
fn like_with_custom_escape_map() {
    let condition = Condition::op(
        "LIKE",
        vec![
            Operand::column("path"),
            Operand::from("a*b"),
            Operand::Escape(Some(vec![("*".to_string(), "%".to_string())])),
        ],
    );
    let (_, params) = build(&condition);

    assert_eq!(params.get(":qp0"), Some(&Value::Text("%a%b%".to_string())));
}

#[test]
fn like_with_no_values() {
    let empty: Vec<&str> = vec![];
    assert_eq!(build(&Condition::like("t", empty.clone())).0, "0=1");

    let negated = Condition::op("NOT LIKE", vec![Operand::column("t"), Operand::list(empty)]);
    assert_eq!(build(&negated).0, "");
}

#[test]
fn like_rejects_non_escape_third_operand() {
    let condition = Condition::op(
        "LIKE",
        vec![Operand::column("t"), Operand::from("x"), Operand::from(1)],
    );
    let err = build_where(&condition, ParamSet::new()).unwrap_err();

    assert!(matches!(err, ConditionError::InvalidEscape { .. }));
}

#[test]
fn escape_translation_never_rewrites_its_own_output() {
    let pairs = [("%", "\\%"), ("_", "\\_"), ("\\", "\\\\")];

    assert_eq!(translate("a\\%b", &pairs), "a\\\\\\%b");
}

// ---- exists / compare --------------------------------------------------

#[test]
fn exists_always_renders_empty() {
    let condition = Condition::op(
        "NOT EXISTS",
        vec![Operand::Subquery("SELECT 1".to_string())],
    );

    assert_eq!(build(&condition).0, "");
    assert_eq!(build(&Condition::exists("SELECT 1")).0, "");
}

#[test]
fn unknown_keyword_is_a_binary_comparison() {
    let condition = Condition::op(">=", vec![Operand::column("id"), Operand::from(3)]);

    assert_eq!(build(&condition).0, "id >= :qp0");
    assert_eq!(
        build(&Condition::compare("IS", "deleted_at", Operand::null())).0,
        "deleted_at IS NULL"
    );
}

#[test]
fn binary_comparison_requires_two_operands() {
    let condition = Condition::op("<", vec![Operand::column("id")]);
    let err = build_where(&condition, ParamSet::new()).unwrap_err();

    assert!(matches!(err, ConditionError::Arity { found: 1, .. }));
}

#[test]
fn binary_comparison_against_subquery_degrades() {
    let condition = Condition::compare(
        "=",
        "id",
        Operand::Subquery("SELECT max(id) FROM t".to_string()),
    );

    assert_eq!(build(&condition).0, "");
}

// ---- operators ---------------------------------------------------------

#[test]
fn operator_parse_is_case_insensitive_and_closed() {
    assert_eq!(Operator::parse("and"), Operator::And);
    assert_eq!(Operator::parse("Not Between"), Operator::Between { negated: true });
    assert_eq!(
        Operator::parse("or not ilike"),
        Operator::Like(LikeOperator {
            conjunction: Conjunction::Or,
            negated: true,
            case_insensitive: true,
        })
    );
    assert_eq!(Operator::parse("xor like"), Operator::Compare("xor like".to_string()));
    assert_eq!(Operator::parse("<>"), Operator::Compare("<>".to_string()));
}

// ---- placeholders ------------------------------------------------------

#[test]
fn placeholder_allocation_skips_pre_bound_names() {
    let mut params: ParamSet = [(":qp0", 9)].into_iter().collect();
    let sql = build_condition(&Condition::hash([("id", 1)]), &mut params).unwrap();

    assert_eq!(sql, "id = :qp1");
    assert_eq!(params.len(), 2);
}

#[test]
fn placeholder_allocation_skips_names_bound_by_expressions() {
    let condition = Condition::and([
        Condition::hash([("a", Expression::new(":qp0").with_param(":qp0", 1))]),
        Condition::hash([("b", 2)]),
    ]);
    let (sql, params) = build(&condition);

    assert_eq!(sql, "(a = :qp0) AND (b = :qp1)");
    assert_eq!(params.get(":qp0"), Some(&Value::Int(1)));
    assert_eq!(params.get(":qp1"), Some(&Value::Int(2)));
}

#[test]
fn large_in_list_binds_every_value_under_its_own_name() {
    let mut params: ParamSet = [(":qp3", -1)].into_iter().collect();
    let sql = build_condition(&Condition::in_("id", 0..5_000_i64), &mut params).unwrap();

    assert_eq!(params.len(), 5_001);
    assert_eq!(params.get(":qp3"), Some(&Value::Int(-1)));
    assert_eq!(params.get("qp5001"), Some(&Value::Int(4_999)));
    assert!(sql.starts_with("id IN (:qp1, :qp2, :qp4, "), "{}", &sql[..40]);
    assert!(!sql.contains(":qp3,"));
}

#[test]
fn rebinding_a_name_keeps_its_position() {
    let mut params = ParamSet::new();
    params.push(1);
    params.bind("qp0", 9);
    params.push(2);

    assert_eq!(
        params.into_vec(),
        params_of(&[(":qp0", Value::Int(9)), (":qp1", Value::Int(2))])
    );
}
