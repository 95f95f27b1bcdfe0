use std::collections::HashMap;

use sqlcompose::{
    combine_and, filter_to_where_and, where_and, where_or, CompositionError, Filter, FilterPipeline,
    FilterStmt, FilterValue, FulltextSearchExpander, LogicOperator, Operator,
};

fn set(values: &[(&str, FilterValue)]) -> HashMap<String, FilterValue> {
    values.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
}

// S1: AND of three filters, one IN.
#[test]
fn and_of_three_filters_with_in() {
    let filters = vec![
        Filter::new("name", Operator::Eq, "wang"),
        Filter::new("age", Operator::Eq, 10i64),
        Filter::new("fav", Operator::In, vec!["pet", "movie"]),
    ];

    let stmt = where_and(&filters).unwrap();
    assert_eq!(stmt.clause, "name = :name AND age = :age AND fav IN(:fav)");
    assert_eq!(
        stmt.args,
        set(&[
            ("name", "wang".into()),
            ("age", 10i64.into()),
            ("fav", vec!["pet", "movie"].into()),
        ])
    );
}

// S2: between and IS NOT NULL.
#[test]
fn between_and_is_not_null() {
    let filters = vec![
        Filter::new("name", Operator::Eq, "wang"),
        Filter::new("age", Operator::Between, vec![10i64, 15i64]),
        Filter::new("class", Operator::IsNotNull, FilterValue::Null),
    ];

    let stmt = where_and(&filters).unwrap();
    assert_eq!(
        stmt.clause,
        "name = :name AND age > :age_1 AND age < :age_2 AND class IS NOT NULL"
    );
    assert_eq!(
        stmt.args,
        set(&[
            ("name", "wang".into()),
            ("age_1", 10i64.into()),
            ("age_2", 15i64.into()),
        ])
    );
}

// S3: qualified attribute.
#[test]
fn qualified_attribute() {
    let stmt = where_and(&[Filter::new("tb.name", Operator::Eq, "wang")]).unwrap();
    assert_eq!(stmt.clause, "tb.name = :tb_name");
    assert_eq!(stmt.args, set(&[("tb_name", "wang".into())]));
}

// S4: combine with empty.
#[test]
fn combine_skips_empty_statements() {
    let filters = vec![
        Filter::new("age", Operator::Between, vec![10i64, 15i64]),
        Filter::new("class", Operator::IsNotNull, FilterValue::Null),
    ];
    let s = where_and(&filters).unwrap();
    let empty = FilterStmt::default();

    let combined = combine_and(&[s, empty]);
    assert_eq!(
        combined.clause,
        "(age > :age_1 AND age < :age_2 AND class IS NOT NULL)"
    );
    assert_eq!(
        combined.args,
        set(&[("age_1", 10i64.into()), ("age_2", 15i64.into())])
    );
}

// S5: pipeline full-text expansion.
#[test]
fn pipeline_fulltext_expansion() {
    let pipelines = vec![FilterPipeline {
        attr: "name".to_string(),
        combine_op: LogicOperator::And,
        expander: Box::new(FulltextSearchExpander {
            fields: vec!["first_name".to_string(), "nick_name".to_string()],
        }),
    }];

    let filters = vec![
        Filter::new("name", Operator::Eq, "wang"),
        Filter::new("age", Operator::Eq, 10i64),
        Filter::new("fav", Operator::In, vec!["pet", "movie"]),
    ];

    let stmt = filter_to_where_and(&filters, &pipelines).unwrap();
    assert_eq!(
        stmt.clause,
        "(first_name = :first_name OR nick_name = :nick_name) AND (age = :age AND fav IN(:fav))"
    );
    assert_eq!(
        stmt.args,
        set(&[
            ("first_name", "wang".into()),
            ("nick_name", "wang".into()),
            ("age", 10i64.into()),
            ("fav", vec!["pet", "movie"].into()),
        ])
    );
}

#[test]
fn starts_with_ends_with_contains_format_the_pattern_into_args_not_clause() {
    let filters = vec![
        Filter::new("name", Operator::Contains, "xian"),
        Filter::new("nickname", Operator::StartsWith, "wang"),
        Filter::new("firstName", Operator::EndsWith, "barry"),
    ];

    let stmt = where_and(&filters).unwrap();
    assert_eq!(
        stmt.clause,
        "name LIKE :name AND nickname LIKE :nickname AND firstName LIKE :firstName"
    );
    assert_eq!(
        stmt.args,
        set(&[
            ("name", "%xian%".into()),
            ("nickname", "wang%".into()),
            ("firstName", "%barry".into()),
        ])
    );
}

#[test]
fn where_or_joins_with_or() {
    let filters = vec![
        Filter::new("name", Operator::Eq, "wang"),
        Filter::new("age", Operator::Eq, 10i64),
    ];
    let stmt = where_or(&filters).unwrap();
    assert_eq!(stmt.clause, "name = :name OR age = :age");
}

#[test]
fn empty_input_produces_empty_clause() {
    let stmt = where_and(&[]).unwrap();
    assert!(stmt.is_empty());
    assert!(stmt.args.is_empty());
}

#[test]
fn in_with_empty_sequence_is_rejected() {
    let err = where_and(&[Filter::new("fav", Operator::In, Vec::<String>::new())]).unwrap_err();
    assert!(matches!(err, CompositionError::BadValue { .. }));
}

#[test]
fn starts_with_rejects_non_string_value() {
    let err = where_and(&[Filter::new("age", Operator::StartsWith, 10i64)]).unwrap_err();
    assert!(matches!(err, CompositionError::BadValue { .. }));
}

#[test]
fn between_rejects_wrong_length() {
    let err = where_and(&[Filter::new("age", Operator::Between, vec![10i64])]).unwrap_err();
    assert!(matches!(err, CompositionError::BadValue { .. }));
}

#[test]
fn combine_is_a_flat_n_ary_join_independent_of_grouping() {
    let a = where_and(&[Filter::new("a", Operator::Eq, 1i64)]).unwrap();
    let b = where_and(&[Filter::new("b", Operator::Eq, 2i64)]).unwrap();
    let c = where_and(&[Filter::new("c", Operator::Eq, 3i64)]).unwrap();

    // combine takes its whole input in one call, so there is no separate
    // left/right-fold to reconcile: three statements combined at once equal
    // the same three statements combined at once, regardless of how the
    // caller conceptually grouped them.
    let direct = combine_and(&[a.clone(), b.clone(), c.clone()]);
    assert_eq!(
        direct.clause,
        "(a = :a) AND (b = :b) AND (c = :c)"
    );

    // Pre-combining a pair before folding in the third adds its own
    // parenthesisation layer - that's the parenthesisation rule at work,
    // not a violation of it.
    let pre_combined = combine_and(&[combine_and(&[a, b]), c]);
    assert_eq!(
        pre_combined.clause,
        "((a = :a) AND (b = :b)) AND (c = :c)"
    );
}

#[test]
fn not_between_renders_the_asymmetric_source_fragment() {
    let stmt = where_and(&[Filter::new("age", Operator::NotBetween, vec![10i64, 15i64])]).unwrap();
    assert_eq!(stmt.clause, "age < :age_1 AND age > :age_2");
}
