//! Property tests for slot bookkeeping and suite generation.

use nwise_compiler::{ConstraintKind, Model, Predicate};
use nwise_engine::{GeneratorOptions, SlotState, SlotSuite, TestSuiteGenerator};
use nwise_ir::{Assignment, SchemeNode, Value};
use proptest::prelude::*;

const NAMES: [&str; 4] = ["p0", "p1", "p2", "p3"];

#[derive(Debug, Clone)]
struct Shape {
    sizes: Vec<i64>,
    valency: usize,
    /// `Some((outer, inner))` covers `outer`-wise over `[p0, inner-wise(rest)]`.
    nested: Option<(usize, usize)>,
    /// Forbid `p0 == .0 && p1 == .1`.
    exclusion: Option<(i64, i64)>,
    /// Avoid, where possible, `p0 == .0 && p1 == .1`.
    avoid: Option<(i64, i64)>,
    seed: Option<Assignment>,
}

fn shape() -> impl Strategy<Value = Shape> {
    (2usize..=4).prop_flat_map(|n| {
        (
            prop::collection::vec(1i64..=3, n),
            1..=n,
            prop::option::of((1usize..=2, 1..n)),
            prop::option::of((0i64..2, 0i64..2)),
            prop::option::of((0i64..2, 0i64..2)),
            prop::option::of(prop::collection::vec(prop::option::of(0i64..3), n)),
        )
            .prop_map(|(mut sizes, valency, nested, exclusion, avoid, picks)| {
                // p0 and p1 keep at least one legal pair for every value.
                sizes[0] = sizes[0].max(2);
                sizes[1] = sizes[1].max(2);
                let seed = picks.and_then(|picks| seed_from(&sizes, &picks, exclusion));
                Shape {
                    sizes,
                    valency,
                    nested,
                    exclusion,
                    avoid,
                    seed,
                }
            })
    })
}

/// A partial seed within the domains that never holds the forbidden pair.
fn seed_from(
    sizes: &[i64],
    picks: &[Option<i64>],
    exclusion: Option<(i64, i64)>,
) -> Option<Assignment> {
    let mut seed: Assignment = NAMES
        .iter()
        .zip(sizes)
        .zip(picks)
        .filter_map(|((name, size), pick)| pick.map(|v| (name.to_string(), Value::Int(v % size))))
        .collect();
    if let Some((v0, v1)) = exclusion {
        if seed.get("p0") == Some(&Value::Int(v0)) && seed.get("p1") == Some(&Value::Int(v1)) {
            seed.remove("p1");
        }
    }
    (!seed.is_empty()).then_some(seed)
}

fn pair_rule(name: &str, kind: ConstraintKind, (v0, v1): (i64, i64)) -> Predicate {
    Predicate::from_fn(name, kind, &["p0", "p1"], move |b| {
        Ok(!(b.value("p0")? == &Value::Int(v0) && b.value("p1")? == &Value::Int(v1)))
    })
}

fn build(shape: &Shape) -> Model {
    let names = &NAMES[..shape.sizes.len()];
    let scheme = match shape.nested {
        Some((outer, inner)) => SchemeNode::group(
            outer,
            vec![SchemeNode::leaf(names[0]), SchemeNode::over(inner, &names[1..])],
        ),
        None => SchemeNode::over(shape.valency, names),
    };
    let mut builder = Model::builder().scheme(scheme);
    for (name, &size) in names.iter().zip(&shape.sizes) {
        builder = builder.parameter(name, 0..size);
    }
    if let Some(pair) = shape.exclusion {
        builder = builder.constraint(pair_rule("forbidden_pair", ConstraintKind::Mandatory, pair));
    }
    if let Some(pair) = shape.avoid {
        builder = builder.constraint(pair_rule("avoided_pair", ConstraintKind::Optional, pair));
    }
    if let Some(seed) = &shape.seed {
        builder = builder.seed(seed.clone());
    }
    builder.build().unwrap()
}

fn full_assignment(shape: &Shape, picks: &[i64]) -> Assignment {
    NAMES
        .iter()
        .zip(&shape.sizes)
        .zip(picks)
        .map(|((name, size), pick)| (name.to_string(), Value::Int(pick % size)))
        .collect()
}

proptest! {
    /// After generation every required slot is covered by a test case that
    /// really contains it, an avoided slot is covered only when some case
    /// holds it, a seed opens the suite and no case holds a forbidden pair.
    #[test]
    fn prop_generation_is_complete_and_legal(shape in shape()) {
        let model = build(&shape);
        let mut generator = TestSuiteGenerator::new(&model, GeneratorOptions::default()).unwrap();
        while generator.next_test_case().unwrap().is_some() {}

        let suite = generator.suite();
        let cases = generator.test_cases();
        prop_assert_eq!(suite.total_uncovered(), 0);
        for bucket in suite.buckets() {
            let params = bucket.scheme().params();
            for slot in bucket.slots() {
                let hit = cases.iter().any(|case| {
                    params.iter().zip(slot.values()).all(|(p, v)| case.get(p) == Some(v))
                });
                match slot.state() {
                    SlotState::Excluded => prop_assert!(!hit),
                    // Still avoided: no case holds it.
                    SlotState::Optional => prop_assert!(!hit),
                    SlotState::Covered => prop_assert!(hit),
                    SlotState::Uncovered => prop_assert!(false, "slot left uncovered"),
                }
            }
        }

        if let Some(seed) = &shape.seed {
            prop_assert!(cases[0].contains(seed));
        }
        for case in cases {
            prop_assert_eq!(case.assignment().len(), shape.sizes.len());
            for (param, value) in case.assignment() {
                prop_assert!(model.domain(param).unwrap().contains(value));
            }
            if let Some((v0, v1)) = shape.exclusion {
                let forbidden = case.get("p0") == Some(&Value::Int(v0))
                    && case.get("p1") == Some(&Value::Int(v1));
                prop_assert!(!forbidden);
            }
        }
    }

    /// Live counters equal a full scan after any sequence of markings.
    #[test]
    fn prop_counters_match_scan(
        shape in shape(),
        marks in prop::collection::vec(prop::collection::vec(0i64..3, 4), 0..12),
    ) {
        let model = build(&shape);
        let mut suite = SlotSuite::new(&model, false).unwrap();
        let mut expected_total = suite.total_uncovered();
        for picks in &marks {
            let newly = suite.mark_covered(&full_assignment(&shape, picks));
            expected_total -= newly;
            prop_assert_eq!(suite.total_uncovered(), expected_total);
            for (b, bucket) in suite.buckets().iter().enumerate() {
                prop_assert_eq!(suite.scan_uncovered(b), Some(bucket.uncovered()));
            }
        }
    }
}
