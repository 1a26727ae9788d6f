use crate::{
    db::condition::{Condition, Expression, Operand, ParamSet, build_condition},
    value::Value,
};
use proptest::prelude::*;

const COLUMNS: [&str; 4] = ["id", "region_id", "title", "status"];

fn arb_column() -> impl Strategy<Value = String> {
    prop::sample::select(COLUMNS.to_vec()).prop_map(str::to_string)
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::Uint),
        any::<bool>().prop_map(Value::Bool),
        "[a-zA-Z0-9_%]{0,8}".prop_map(Value::Text),
        Just(Value::Null),
    ]
}

fn arb_scalar_operand() -> impl Strategy<Value = Operand> {
    prop_oneof![
        4 => arb_value().prop_map(Operand::Value),
        1 => (0u8..4).prop_map(|n| {
            Operand::Expr(Expression::new(format!(":bp{n}")).with_param(&format!(":bp{n}"), i64::from(n)))
        }),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Condition> {
    prop_oneof![
        Just(Condition::Empty),
        "[a-z]{1,4} = [0-9]{1,3}".prop_map(Condition::Raw),
        prop::collection::vec((arb_column(), arb_scalar_operand()), 0..4).prop_map(Condition::Hash),
        (arb_column(), arb_scalar_operand(), arb_scalar_operand())
            .prop_map(|(c, lo, hi)| Condition::between(c, lo, hi)),
        (arb_column(), prop::collection::vec(arb_scalar_operand(), 0..4))
            .prop_map(|(c, vs)| Condition::in_(c, vs)),
        (arb_column(), prop::collection::vec(arb_scalar_operand(), 0..4))
            .prop_map(|(c, vs)| Condition::not_in(c, vs)),
        (arb_column(), prop::collection::vec(arb_value(), 0..3))
            .prop_map(|(c, vs)| Condition::like(c, vs)),
        (prop::sample::select(vec!["=", "<", ">=", "<>"]), arb_column(), arb_scalar_operand())
            .prop_map(|(op, c, v)| Condition::compare(op, c, v)),
        Just(Condition::exists("SELECT 1")),
    ]
}

fn arb_condition() -> impl Strategy<Value = Condition> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Condition::and),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Condition::or),
            inner.prop_map(Condition::not),
        ]
    })
}

proptest! {
    #[test]
    fn well_formed_conditions_never_fail(condition in arb_condition()) {
        let mut params = ParamSet::new();
        prop_assert!(build_condition(&condition, &mut params).is_ok());
    }

    #[test]
    fn placeholder_count_never_decreases(
        condition in arb_condition(),
        seed in prop::collection::vec(arb_value(), 0..3),
    ) {
        let mut params: ParamSet = seed
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!(":seed{i}"), v))
            .collect();
        let before = params.len();

        build_condition(&condition, &mut params).unwrap();
        prop_assert!(params.len() >= before);
    }

    #[test]
    fn every_placeholder_in_output_is_bound(condition in arb_condition()) {
        let mut params = ParamSet::new();
        let sql = build_condition(&condition, &mut params).unwrap();

        for (idx, _) in sql.match_indices(":qp") {
            let digits: String = sql[idx + 3..].chars().take_while(char::is_ascii_digit).collect();
            let name = format!(":qp{digits}");
            prop_assert!(params.contains(&name), "unbound placeholder {name} in {sql}");
        }
    }

    #[test]
    fn junction_of_empties_is_empty(n in 0usize..5, use_or in any::<bool>()) {
        let operands = vec![Condition::Empty; n];
        let condition = if use_or { Condition::or(operands) } else { Condition::and(operands) };

        prop_assert_eq!(build_condition(&condition, &mut ParamSet::new()).unwrap(), "");
    }
}
