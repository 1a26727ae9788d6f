use crate::{
    db::{
        condition::{Condition, Expression, Operand, ParamSet},
        query::{
            CompileError, CrossShardPolicyError, DeleteQuery, Dialect, FanoutBuilder,
            GenericSqlCompiler, InsertQuery, Join, JoinKind, LogicalQuery, QueryShape, ReadKind,
            SelectQuery, SortDirection, SqlCompiler, StatementKind, Union, UnionSource,
            UnmergeableFeature, UpdateQuery, check_cross_shard,
        },
        route::{ShardPlan, ShardRegistry},
    },
    error::ErrorClass,
    test_support::{fixtures::registry, memory::MemoryShard},
    value::Value,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

fn compile(compiler: &GenericSqlCompiler, query: &LogicalQuery) -> (String, ParamSet) {
    let mut params = ParamSet::new();
    let sql = compiler.compile(query, &mut params).expect("query should compile");

    (sql, params)
}

fn select_from(table: &str) -> SelectQuery {
    SelectQuery {
        from: vec![table.to_string()],
        ..SelectQuery::default()
    }
}

// ---- generic compiler --------------------------------------------------

#[test]
fn select_renders_every_clause_in_order() {
    let compiler = GenericSqlCompiler::new(Dialect::MySql).with_table_prefix("tbl_");
    let query = SelectQuery {
        select: vec!["o.id".to_string(), "COUNT(*) AS n".to_string()],
        distinct: true,
        from: vec!["{{%order}} o".to_string()],
        joins: vec![Join {
            kind: JoinKind::Left,
            table: "{{%item}} i".to_string(),
            on: Condition::raw("i.order_id = o.id"),
        }],
        filter: Condition::hash([("o.region_id", 5)]),
        group_by: vec!["o.id".to_string()],
        having: Condition::raw("COUNT(*) > 1"),
        order_by: vec![("o.id".to_string(), SortDirection::Desc)],
        limit: Some(10),
        offset: Some(20),
        ..SelectQuery::default()
    };
    let (sql, params) = compile(&compiler, &LogicalQuery::Select(query));

    assert_eq!(
        sql,
        "SELECT DISTINCT o.id, COUNT(*) AS n FROM `tbl_order` o LEFT JOIN `tbl_item` i \
         ON i.order_id = o.id WHERE o.region_id = :qp0 GROUP BY o.id HAVING COUNT(*) > 1 \
         ORDER BY o.id DESC LIMIT 10 OFFSET 20"
    );
    assert_eq!(params.get(":qp0"), Some(&Value::Int(5)));
}

#[test]
fn plain_table_names_are_quoted_per_dialect() {
    let ansi = GenericSqlCompiler::new(Dialect::Ansi);
    let mysql = GenericSqlCompiler::new(Dialect::MySql);
    let query = LogicalQuery::Select(select_from("shop.order"));

    assert_eq!(compile(&ansi, &query).0, r#"SELECT * FROM "shop"."order""#);
    assert_eq!(compile(&mysql, &query).0, "SELECT * FROM `shop`.`order`");
}

#[test]
fn quote_sql_expands_table_and_column_markers() {
    let compiler = GenericSqlCompiler::new(Dialect::Postgres).with_table_prefix("p_");

    assert_eq!(
        compiler.quote_sql("{{%a}}.[[b]] = {{c}} AND {x} [y]"),
        r#""p_a"."b" = "c" AND {x} [y]"#
    );
    assert_eq!(compiler.quote_sql("[[unterminated"), "[[unterminated");
}

#[test]
fn union_wraps_each_side() {
    let compiler = GenericSqlCompiler::new(Dialect::Ansi);
    let query = SelectQuery {
        unions: vec![
            Union {
                source: UnionSource::Raw("SELECT * FROM b".to_string()),
                all: true,
            },
            Union {
                source: UnionSource::Query(Box::new(select_from("c"))),
                all: false,
            },
        ],
        ..select_from("a")
    };

    assert_eq!(
        compile(&compiler, &LogicalQuery::Select(query)).0,
        r#"(SELECT * FROM "a") UNION ALL ( SELECT * FROM b ) UNION ( SELECT * FROM "c" )"#
    );
}

#[test]
fn select_without_table_is_rejected() {
    let compiler = GenericSqlCompiler::new(Dialect::Ansi);
    let err = compiler
        .compile(&LogicalQuery::Select(SelectQuery::default()), &mut ParamSet::new())
        .unwrap_err();

    assert_eq!(err, CompileError::MissingTable);
}

#[test]
fn insert_binds_values_and_inlines_null() {
    let compiler = GenericSqlCompiler::new(Dialect::Ansi);
    let query = LogicalQuery::Insert(InsertQuery {
        table: "{{%order}}".to_string(),
        values: vec![
            ("id".to_string(), Value::Int(1)),
            ("note".to_string(), Value::Null),
        ],
    });
    let (sql, params) = compile(&compiler, &query);

    assert_eq!(sql, r#"INSERT INTO "order" ("id", "note") VALUES (:qp0, NULL)"#);
    assert_eq!(params.len(), 1);
}

#[test]
fn update_with_counter_expression() {
    let compiler = GenericSqlCompiler::new(Dialect::MySql);
    let query = LogicalQuery::Update(UpdateQuery {
        table: "account".to_string(),
        set: vec![
            (
                "balance".to_string(),
                Operand::Expr(Expression::new("[[balance]] + :bp0").with_param(":bp0", 5)),
            ),
            ("status".to_string(), Operand::from("active")),
        ],
        filter: Condition::hash([("id", 3)]),
    });
    let (sql, params) = compile(&compiler, &query);

    assert_eq!(
        sql,
        "UPDATE `account` SET `balance` = `balance` + :bp0, `status` = :qp0 WHERE id = :qp1"
    );
    assert_eq!(params.get(":bp0"), Some(&Value::Int(5)));
    assert_eq!(params.len(), 3);
}

#[test]
fn update_rejects_empty_and_unsupported_sets() {
    let compiler = GenericSqlCompiler::new(Dialect::Ansi);
    let mut update = UpdateQuery {
        table: "t".to_string(),
        set: vec![],
        filter: Condition::Empty,
    };
    let empty = compiler
        .compile(&LogicalQuery::Update(update.clone()), &mut ParamSet::new())
        .unwrap_err();
    assert!(matches!(empty, CompileError::EmptyUpdate { .. }));

    update.set.push(("a".to_string(), Operand::Subquery("SELECT 1".to_string())));
    let unsupported = compiler
        .compile(&LogicalQuery::Update(update), &mut ParamSet::new())
        .unwrap_err();
    assert!(matches!(
        unsupported,
        CompileError::UnsupportedSet {
            shape: "subquery",
            ..
        }
    ));
}

#[test]
fn delete_without_filter_has_no_where() {
    let compiler = GenericSqlCompiler::new(Dialect::Ansi);
    let query = LogicalQuery::Delete(DeleteQuery {
        table: "t".to_string(),
        filter: Condition::Empty,
    });

    assert_eq!(compile(&compiler, &query).0, r#"DELETE FROM "t""#);
}

#[test]
fn dialect_names_parse_case_insensitively() {
    assert_eq!(Dialect::parse("MySQL"), Some(Dialect::MySql));
    assert_eq!(Dialect::parse("pgsql"), Some(Dialect::Postgres));
    assert_eq!(Dialect::parse("oracle"), None);
}

#[test]
fn shape_and_kind_follow_the_query() {
    let select = LogicalQuery::Select(SelectQuery {
        group_by: vec!["a".to_string()],
        having: Condition::raw("1"),
        ..select_from("t")
    });
    let delete = LogicalQuery::Delete(DeleteQuery {
        table: "t".to_string(),
        filter: Condition::Empty,
    });

    assert!(select.shape().group_by && select.shape().having);
    assert!(select.kind().is_read());
    assert_eq!(delete.shape(), QueryShape::default());
    assert_eq!(delete.kind(), StatementKind::Delete);
}

// ---- policy ------------------------------------------------------------

#[test]
fn cross_shard_policy_rules() {
    let grouped = QueryShape {
        group_by: true,
        ..QueryShape::default()
    };
    let distinct = QueryShape {
        distinct: true,
        ..QueryShape::default()
    };

    assert_eq!(
        check_cross_shard(grouped, ReadKind::Rows, 2),
        Err(CrossShardPolicyError {
            feature: UnmergeableFeature::GroupBy,
            shard_count: 2,
        })
    );
    assert!(check_cross_shard(grouped, ReadKind::Rows, 1).is_ok());
    assert!(check_cross_shard(distinct, ReadKind::Rows, 3).is_ok());
    assert!(check_cross_shard(distinct, ReadKind::Scalar, 3).is_err());
}

#[test]
fn policy_error_message_names_the_feature() {
    let err = CrossShardPolicyError {
        feature: UnmergeableFeature::Having,
        shard_count: 2,
    };

    assert_eq!(
        err.to_string(),
        "this query uses more than one database: HAVING cannot be merged across 2 shards"
    );
}

// ---- fan-out -----------------------------------------------------------

#[test]
fn fanout_compiles_once_per_shard_in_plan_order() {
    let registry = registry(&[MemoryShard::new(), MemoryShard::new(), MemoryShard::new()]);
    let plan = ShardPlan::new(["db2", "db0"]).unwrap();
    let query = LogicalQuery::Select(SelectQuery {
        filter: Condition::hash([("id", 9)]),
        ..select_from("{{%order}}")
    });

    let compiled = FanoutBuilder::new(&registry)
        .build(&query, &ParamSet::new(), &plan)
        .unwrap();

    let shards: Vec<_> = compiled.statements.iter().map(|s| s.shard.as_str()).collect();
    assert_eq!(shards, ["db2", "db0"]);
    assert_eq!(compiled.sql_for(&"db0".into()), Some(r#"SELECT * FROM "order" WHERE id = :qp0"#));
    assert_eq!(compiled.params.len(), 1);
    assert_eq!(compiled.kind, StatementKind::Select);
}

#[test]
fn fanout_rejects_unregistered_backend() {
    let registry = registry(&[MemoryShard::new(), MemoryShard::new(), MemoryShard::new()]);
    let plan = ShardPlan::new(["db0", "db7"]).unwrap();
    let err = FanoutBuilder::new(&registry)
        .build(
            &LogicalQuery::Select(select_from("t")),
            &ParamSet::new(),
            &plan,
        )
        .unwrap_err();

    assert!(err.is_configuration());
}

///
/// Drifting
/// Compiler whose bindings change on every call.
///

#[derive(Default)]
struct Drifting(AtomicUsize);

impl SqlCompiler for Drifting {
    fn compile(&self, _: &LogicalQuery, params: &mut ParamSet) -> Result<String, CompileError> {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        params.push(i64::try_from(n).unwrap_or_default());

        Ok("SELECT 1".to_string())
    }
}

#[test]
fn fanout_detects_diverging_bindings() {
    let compiler = Arc::new(Drifting::default());
    let registry = ShardRegistry::new()
        .with_backend("a", MemoryShard::new().connection(), compiler.clone())
        .with_backend("b", MemoryShard::new().connection(), compiler);
    let plan = ShardPlan::new(["a", "b"]).unwrap();

    let err = FanoutBuilder::new(&registry)
        .build(&LogicalQuery::Select(select_from("t")), &ParamSet::new(), &plan)
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Internal);
}
