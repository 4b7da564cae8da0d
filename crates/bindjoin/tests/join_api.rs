//! End-to-end checks of algorithm selection through the facade.

use bindjoin::{
    Binding, BindingIter, BuildSide, ExecContext, ExprList, FnPredicate, JoinAlgorithm, JoinConfig,
    JoinError, JoinKey, Term, Var, VecBindingIter, binding, collect_bindings, join, left_join,
};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .try_init();
}

fn configs() -> Vec<JoinConfig> {
    let mut out = Vec::new();
    for algorithm in [JoinAlgorithm::Hash, JoinAlgorithm::NestedLoop] {
        for side in [BuildSide::Left, BuildSide::Right] {
            for bound_seen_vars_by_key in [true, false] {
                out.push(JoinConfig {
                    bound_seen_vars_by_key,
                    ..JoinConfig::default()
                        .with_algorithm(algorithm)
                        .with_left_join_build_side(side)
                });
            }
        }
    }
    out
}

fn a_rows() -> Vec<Binding> {
    vec![binding! { "x" => 1 }, binding! { "x" => 2 }]
}

fn b_rows() -> Vec<Binding> {
    vec![
        binding! { "x" => 1, "y" => "a" },
        binding! { "x" => 3, "y" => "b" },
    ]
}

fn x_key() -> Option<JoinKey> {
    Some(JoinKey::single(Var::new("x")))
}

#[test]
fn every_configuration_agrees_on_the_basic_scenarios() {
    init_tracing();
    let cx = ExecContext::new("facade");
    for config in configs() {
        let mut inner = join(
            VecBindingIter::boxed(a_rows()),
            VecBindingIter::boxed(b_rows()),
            x_key(),
            &config,
            &cx,
        )
        .unwrap();
        assert_eq!(
            collect_bindings(&mut inner).unwrap(),
            vec![binding! { "x" => 1, "y" => "a" }],
            "config={config:?}"
        );

        let mut outer = left_join(
            VecBindingIter::boxed(a_rows()),
            VecBindingIter::boxed(b_rows()),
            x_key(),
            ExprList::new(),
            &config,
            &cx,
        )
        .unwrap();
        assert_eq!(
            collect_bindings(&mut outer).unwrap(),
            vec![binding! { "x" => 1, "y" => "a" }, binding! { "x" => 2 }],
            "config={config:?}"
        );
    }
}

#[test]
fn multi_variable_keys_and_partial_rows_join_fully() {
    init_tracing();
    let cx = ExecContext::default();
    let key = Some(JoinKey::from_vars([Var::new("x"), Var::new("y")]));
    let left = vec![
        binding! { "x" => 1, "y" => 1, "l" => 0 },
        binding! { "x" => 1, "l" => 1 },
        binding! { "l" => 2 },
    ];
    let right = vec![binding! { "x" => 1, "y" => 1, "r" => 0 }, binding! { "y" => 2, "r" => 1 }];
    let config = JoinConfig::from_json_str(r#"{"bound_seen_vars_by_key": false}"#).unwrap();
    let mut joined = join(
        VecBindingIter::boxed(left),
        VecBindingIter::boxed(right),
        key,
        &config,
        &cx,
    )
    .unwrap();
    let mut rows: Vec<String> = collect_bindings(&mut joined)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    rows.sort();
    let mut expected: Vec<String> = [
        binding! { "x" => 1, "y" => 1, "l" => 0, "r" => 0 },
        binding! { "x" => 1, "y" => 1, "l" => 1, "r" => 0 },
        binding! { "x" => 1, "y" => 2, "l" => 1, "r" => 1 },
        binding! { "x" => 1, "y" => 1, "l" => 2, "r" => 0 },
        binding! { "y" => 2, "l" => 2, "r" => 1 },
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    expected.sort();
    assert_eq!(rows, expected);
}

#[test]
fn left_join_filter_errors_surface_unchanged() {
    let cx = ExecContext::default();
    let failing = ExprList::new().with(FnPredicate::new("?y < 3", |row: &Binding| {
        match row.get(&Var::new("y")) {
            Some(Term::Integer(y)) => Ok(*y < 3),
            Some(other) => Err(JoinError::eval(format!("cannot compare {other} with 3"))),
            None => Ok(false),
        }
    }));
    for config in configs() {
        let mut outer = left_join(
            VecBindingIter::boxed(a_rows()),
            VecBindingIter::boxed(b_rows()),
            x_key(),
            failing.clone(),
            &config,
            &cx,
        )
        .unwrap();
        let err = collect_bindings(&mut outer).unwrap_err();
        assert!(matches!(err, JoinError::Eval { .. }), "config={config:?}");
    }
}

#[test]
fn cancelled_context_stops_the_join() {
    let cx = ExecContext::default();
    let mut joined = join(
        VecBindingIter::boxed(a_rows()),
        VecBindingIter::boxed(b_rows()),
        x_key(),
        &JoinConfig::default(),
        &cx,
    )
    .unwrap();
    cx.cancel_signal().cancel();
    assert_eq!(joined.has_next(), Err(JoinError::Cancelled));
}

fn row_strategy() -> impl Strategy<Value = Binding> {
    (proptest::option::of(0i64..3), proptest::option::of(0i64..3), 0i64..4).prop_map(
        |(x, y, tag)| {
            let mut builder = Binding::builder();
            if let Some(x) = x {
                builder.add(Var::new("x"), Term::from(x));
            }
            if let Some(y) = y {
                builder.add(Var::new("y"), Term::from(y));
            }
            builder.add(Var::new("tag"), Term::from(tag));
            builder.build()
        },
    )
}

fn render(rows: Vec<Binding>) -> Vec<String> {
    let mut out: Vec<String> = rows.iter().map(ToString::to_string).collect();
    out.sort();
    out
}

proptest! {
    #[test]
    fn configurations_produce_the_same_multiset(
        left in proptest::collection::vec(row_strategy(), 0..10),
        right in proptest::collection::vec(row_strategy(), 0..10),
    ) {
        let cx = ExecContext::default();
        let mut inner_results = Vec::new();
        let mut left_results = Vec::new();
        for config in configs() {
            let mut inner = join(
                VecBindingIter::boxed(left.clone()),
                VecBindingIter::boxed(right.clone()),
                None,
                &config,
                &cx,
            ).unwrap();
            inner_results.push(render(collect_bindings(&mut inner).unwrap()));

            let mut outer = left_join(
                VecBindingIter::boxed(left.clone()),
                VecBindingIter::boxed(right.clone()),
                None,
                ExprList::new(),
                &config,
                &cx,
            ).unwrap();
            left_results.push(render(collect_bindings(&mut outer).unwrap()));
        }
        for pair in inner_results.windows(2) {
            prop_assert_eq!(&pair[0], &pair[1], "case=inner");
        }
        for pair in left_results.windows(2) {
            prop_assert_eq!(&pair[0], &pair[1], "case=left");
        }
        prop_assert!(left_results[0].len() >= left.len(), "case=left_totality");
    }
}
