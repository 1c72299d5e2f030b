use std::collections::{BTreeMap, HashSet};

use nwise_ir::{Assignment, Value};

use crate::domain::DomainRegistry;
use crate::predicate::Predicate;
use crate::priority::{resolve_priority_key, PriorityKeyError, PriorityTarget};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty domain: parameter '{param}' has no values")]
    EmptyDomain { param: String },

    #[error("Duplicate value: parameter '{param}' lists {value} more than once")]
    DuplicateValue { param: String, value: Value },

    #[error("Unknown parameter: {context} references '{name}'")]
    UnknownParameter { context: String, name: String },

    #[error("Unknown value: {context} assigns {value} to '{param}', outside its domain")]
    UnknownValue {
        context: String,
        param: String,
        value: Value,
    },

    #[error("Unknown priority key '{key}': not a parameter or parameter__value")]
    UnknownPriorityKey { key: String },

    #[error("Ambiguous priority key '{key}': matches {matches:?}")]
    AmbiguousPriorityKey {
        key: String,
        matches: Vec<PriorityTarget>,
    },
}

/// Check domains: non-empty, no repeated value.
pub fn validate_domains(
    domains: &BTreeMap<String, Vec<Value>>,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    for (param, values) in domains {
        if values.is_empty() {
            errors.push(ValidationError::EmptyDomain {
                param: param.clone(),
            });
        }
        let mut seen = HashSet::new();
        for value in values {
            if !seen.insert(value) {
                errors.push(ValidationError::DuplicateValue {
                    param: param.clone(),
                    value: value.clone(),
                });
            }
        }
    }
    finish(errors)
}

/// Check every reference the rest of the model makes into the registry.
pub fn validate_references(
    registry: &DomainRegistry,
    predicates: &[Predicate],
    priority_keys: &[String],
    seeds: &[Assignment],
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_predicates(registry, predicates, &mut errors);
    validate_priorities(registry, priority_keys, &mut errors);
    validate_seeds(registry, seeds, &mut errors);
    finish(errors)
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every signature parameter must exist.
fn validate_predicates(
    registry: &DomainRegistry,
    predicates: &[Predicate],
    errors: &mut Vec<ValidationError>,
) {
    for predicate in predicates {
        for param in predicate.signature() {
            if !registry.contains(param) {
                errors.push(ValidationError::UnknownParameter {
                    context: format!("constraint '{}'", predicate.name()),
                    name: param.clone(),
                });
            }
        }
    }
}

fn validate_priorities(
    registry: &DomainRegistry,
    keys: &[String],
    errors: &mut Vec<ValidationError>,
) {
    for key in keys {
        match resolve_priority_key(key, registry) {
            Ok(_) => {}
            Err(PriorityKeyError::Unknown) => {
                errors.push(ValidationError::UnknownPriorityKey { key: key.clone() });
            }
            Err(PriorityKeyError::Ambiguous(matches)) => {
                errors.push(ValidationError::AmbiguousPriorityKey {
                    key: key.clone(),
                    matches,
                });
            }
        }
    }
}

/// Seed parameters must exist and seed values must be inside their domain.
fn validate_seeds(registry: &DomainRegistry, seeds: &[Assignment], errors: &mut Vec<ValidationError>) {
    for (index, seed) in seeds.iter().enumerate() {
        let context = format!("seed #{index}");
        for (param, value) in seed {
            if !registry.contains(param) {
                errors.push(ValidationError::UnknownParameter {
                    context: context.clone(),
                    name: param.clone(),
                });
            } else if registry.index_of(param, value).is_none() {
                errors.push(ValidationError::UnknownValue {
                    context: context.clone(),
                    param: param.clone(),
                    value: value.clone(),
                });
            }
        }
    }
}
