use crate::{model::entity::EntityModel, value::Value};

static ORDER: EntityModel = EntityModel {
    path: "tests::Order",
    table: "order",
    primary_key: &["region_id", "id"],
    sharding_column: "region_id",
    sharding_type: "region",
};

#[test]
fn table_ref_is_prefixable() {
    assert_eq!(ORDER.table_ref(), "{{%order}}");
}

#[test]
fn sharding_value_skips_empty_keys() {
    let present = vec![("region_id".to_string(), Value::Int(3))];
    let null = vec![("region_id".to_string(), Value::Null)];
    let blank = vec![("region_id".to_string(), Value::Text(String::new()))];

    assert_eq!(ORDER.sharding_value(&present), Some(&Value::Int(3)));
    assert_eq!(ORDER.sharding_value(&null), None);
    assert_eq!(ORDER.sharding_value(&blank), None);
    assert_eq!(ORDER.sharding_value(&[]), None);
}

#[test]
fn composite_key_detection() {
    assert!(ORDER.has_composite_key());
}
