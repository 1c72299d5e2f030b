use nwise_compiler::{CompileError, ConstraintKind, Model, ValidationError};
use nwise_ir::{parse_model, Assignment, Value};

fn fixture() -> Model {
    let json = include_str!("../../nwise-ir/tests/fixtures/browser_matrix.json");
    let spec = parse_model(json).unwrap();
    Model::from_spec(&spec).unwrap()
}

fn assignment(pairs: &[(&str, Value)]) -> Assignment {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_fixture_slot_schemes() {
    let model = fixture();
    let schemes: Vec<String> = model.slot_schemes().iter().map(|s| s.to_string()).collect();
    assert_eq!(
        schemes,
        vec![
            "{browser,cache}",
            "{browser,locale}",
            "{browser,os__arch}",
            "{browser,os__name}",
            "{cache,locale}",
            "{cache,os__name}",
            "{locale,os__arch}",
            "{locale,os__name}",
            "{os__arch,os__name}",
        ]
    );
}

#[test]
fn test_fixture_constraints_named_and_indexed() {
    let model = fixture();
    let names: Vec<(&str, ConstraintKind)> = model
        .evaluator()
        .predicates()
        .map(|p| (p.name(), p.kind()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("safari_only_on_mac", ConstraintKind::Mandatory),
            ("optional#0", ConstraintKind::Optional),
        ]
    );

    let excluded = assignment(&[
        ("browser", Value::from("safari")),
        ("os__name", Value::from("linux")),
    ]);
    assert!(!model.fits_mandatory(&excluded).unwrap());

    let undesirable = assignment(&[("locale", Value::from("de")), ("cache", Value::Bool(false))]);
    assert!(model.fits_mandatory(&undesirable).unwrap());
    assert!(!model.fits_optional(&undesirable).unwrap());
}

#[test]
fn test_fixture_priorities() {
    let model = fixture();
    assert_eq!(model.priority("browser", &Value::from("chrome")), 5);
    assert_eq!(model.priority("browser", &Value::from("firefox")), 0);
    assert_eq!(model.priority("os__name", &Value::from("mac")), 2);
    assert_eq!(model.priority("os__name", &Value::from("linux")), 2);
}

#[test]
fn test_fixture_seeds_and_domains() {
    let model = fixture();
    assert_eq!(model.seeds().len(), 1);
    assert_eq!(model.domain("os__arch").unwrap(), &[Value::from("x86_64")]);
    assert!(model.domain("os").is_err());
}

#[test]
fn test_unknown_constraint_parameter_rejected() {
    let json = r#"{
        "data": { "a": [1, 2] },
        "scheme": { "__1": ["a"] },
        "constraints": { "mandatory": [ { "rule": ["eq", ["param", "ghost"], 1] } ] }
    }"#;
    let spec = parse_model(json).unwrap();
    match Model::from_spec(&spec).unwrap_err() {
        CompileError::Validation(errors) => assert_eq!(
            errors,
            vec![ValidationError::UnknownParameter {
                context: "constraint 'mandatory#0'".to_string(),
                name: "ghost".to_string()
            }]
        ),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_seed_outside_domain_rejected() {
    let json = r#"{
        "data": { "a": [1, 2] },
        "scheme": { "__1": ["a"] },
        "seeds": [ { "a": 3 } ]
    }"#;
    let spec = parse_model(json).unwrap();
    let err = Model::from_spec(&spec).unwrap_err();
    assert!(matches!(err, CompileError::Validation(ref e) if matches!(e[0], ValidationError::UnknownValue { .. })));
}

#[test]
fn test_empty_domain_from_json_rejected() {
    let json = r#"{ "data": { "a": [] }, "scheme": "a" }"#;
    let spec = parse_model(json).unwrap();
    assert!(matches!(
        Model::from_spec(&spec).unwrap_err(),
        CompileError::Validation(_)
    ));
}

#[test]
fn test_invalid_valency_from_json() {
    let json = r#"{ "data": { "a": [1], "b": [2] }, "scheme": { "__3": ["a", "b"] } }"#;
    let spec = parse_model(json).unwrap();
    assert!(matches!(
        Model::from_spec(&spec).unwrap_err(),
        CompileError::Scheme(_)
    ));
}
