//! Priority weights used as the second ranking key during generation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use nwise_ir::parse::PATH_SEPARATOR;
use nwise_ir::Value;

use crate::domain::DomainRegistry;

/// How the weights of a candidate's values combine into one priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityAggregation {
    #[default]
    Sum,
    Max,
}

/// A priority key resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorityTarget {
    Parameter(String),
    Value { param: String, value: Value },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorityKeyError {
    /// Neither a parameter nor `parameter__value`.
    Unknown,
    /// More than one (parameter, value) pair has this flat form.
    Ambiguous(Vec<PriorityTarget>),
}

/// Resolve a flat priority key to a parameter or a (parameter, value) pair.
///
/// A key naming a parameter weights the whole parameter. Otherwise the key is
/// split at every separator; a split matches when the prefix is a parameter
/// and the suffix is the display form of one of its values. Exactly one
/// match is required: `Int(2)` and `Str("2")` in one domain make `p__2`
/// ambiguous.
pub fn resolve_priority_key(
    key: &str,
    registry: &DomainRegistry,
) -> Result<PriorityTarget, PriorityKeyError> {
    if registry.contains(key) {
        return Ok(PriorityTarget::Parameter(key.to_string()));
    }
    let mut matches = Vec::new();
    for (at, _) in key.match_indices(PATH_SEPARATOR) {
        let param = &key[..at];
        let suffix = &key[at + PATH_SEPARATOR.len()..];
        let Ok(domain) = registry.domain(param) else {
            continue;
        };
        for value in domain.iter().filter(|v| v.to_string() == suffix) {
            matches.push(PriorityTarget::Value {
                param: param.to_string(),
                value: value.clone(),
            });
        }
    }
    match matches.len() {
        0 => Err(PriorityKeyError::Unknown),
        1 => Ok(matches.remove(0)),
        _ => Err(PriorityKeyError::Ambiguous(matches)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    values: HashMap<(String, Value), i64>,
    parameters: HashMap<String, i64>,
}

impl PriorityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, target: PriorityTarget, weight: i64) {
        match target {
            PriorityTarget::Parameter(param) => {
                self.parameters.insert(param, weight);
            }
            PriorityTarget::Value { param, value } => {
                self.values.insert((param, value), weight);
            }
        }
    }

    /// Value weight, else the parameter weight, else 0.
    pub fn weight(&self, param: &str, value: &Value) -> i64 {
        if let Some(w) = self.values.get(&(param.to_string(), value.clone())) {
            return *w;
        }
        self.parameters.get(param).copied().unwrap_or(0)
    }

    /// Aggregate the weights of `pairs`. An empty sequence weighs 0; sums
    /// saturate at the `i64` bounds.
    pub fn aggregate<'a, I>(&self, pairs: I, aggregation: PriorityAggregation) -> i64
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let weights = pairs.into_iter().map(|(p, v)| self.weight(p, v));
        match aggregation {
            PriorityAggregation::Sum => weights.fold(0i64, i64::saturating_add),
            PriorityAggregation::Max => weights.max().unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.parameters.is_empty()
    }

    /// All weights keyed by their flat form, in sorted order.
    pub fn entries(&self) -> BTreeMap<String, i64> {
        let mut out = BTreeMap::new();
        for (param, w) in &self.parameters {
            out.insert(param.clone(), *w);
        }
        for ((param, value), w) in &self.values {
            out.insert(format!("{param}{PATH_SEPARATOR}{value}"), *w);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DomainRegistry {
        let mut domains = BTreeMap::new();
        domains.insert(
            "browser".to_string(),
            vec![Value::from("chrome"), Value::from("firefox")],
        );
        domains.insert(
            "os__name".to_string(),
            vec![Value::from("linux"), Value::from("mac")],
        );
        domains.insert("retries".to_string(), vec![Value::Int(0), Value::Int(3)]);
        DomainRegistry::new(domains)
    }

    #[test]
    fn test_resolve_parameter_and_value_keys() {
        let reg = registry();
        assert_eq!(
            resolve_priority_key("os__name", &reg),
            Ok(PriorityTarget::Parameter("os__name".to_string()))
        );
        assert_eq!(
            resolve_priority_key("browser__chrome", &reg),
            Ok(PriorityTarget::Value {
                param: "browser".to_string(),
                value: Value::from("chrome")
            })
        );
        assert_eq!(
            resolve_priority_key("os__name__mac", &reg),
            Ok(PriorityTarget::Value {
                param: "os__name".to_string(),
                value: Value::from("mac")
            })
        );
        assert_eq!(
            resolve_priority_key("retries__3", &reg),
            Ok(PriorityTarget::Value {
                param: "retries".to_string(),
                value: Value::Int(3)
            })
        );
        assert_eq!(
            resolve_priority_key("browser__safari", &reg),
            Err(PriorityKeyError::Unknown)
        );
        assert_eq!(
            resolve_priority_key("ghost", &reg),
            Err(PriorityKeyError::Unknown)
        );
    }

    #[test]
    fn test_same_display_form_is_ambiguous() {
        let mut domains = BTreeMap::new();
        domains.insert("a".to_string(), vec![Value::Int(2), Value::from("2")]);
        domains.insert("a__b".to_string(), vec![Value::from("c")]);
        domains.insert("a__b__c".to_string(), vec![Value::Int(0)]);
        let reg = DomainRegistry::new(domains);

        assert_eq!(
            resolve_priority_key("a__2", &reg),
            Err(PriorityKeyError::Ambiguous(vec![
                PriorityTarget::Value {
                    param: "a".to_string(),
                    value: Value::Int(2)
                },
                PriorityTarget::Value {
                    param: "a".to_string(),
                    value: Value::from("2")
                },
            ]))
        );
        // A whole parameter name wins over any value split.
        assert_eq!(
            resolve_priority_key("a__b__c", &reg),
            Ok(PriorityTarget::Parameter("a__b__c".to_string()))
        );
    }

    #[test]
    fn test_value_weight_overrides_parameter_weight() {
        let mut table = PriorityTable::new();
        table.set(PriorityTarget::Parameter("browser".to_string()), 2);
        table.set(
            PriorityTarget::Value {
                param: "browser".to_string(),
                value: Value::from("chrome"),
            },
            7,
        );
        assert_eq!(table.weight("browser", &Value::from("chrome")), 7);
        assert_eq!(table.weight("browser", &Value::from("firefox")), 2);
        assert_eq!(table.weight("retries", &Value::Int(0)), 0);
    }

    #[test]
    fn test_aggregation() {
        let mut table = PriorityTable::new();
        table.set(PriorityTarget::Parameter("a".to_string()), 3);
        table.set(PriorityTarget::Parameter("b".to_string()), 5);
        let one = Value::Int(1);
        let pairs = [("a", &one), ("b", &one)];
        assert_eq!(table.aggregate(pairs, PriorityAggregation::Sum), 8);
        assert_eq!(table.aggregate(pairs, PriorityAggregation::Max), 5);
        assert_eq!(table.aggregate(std::iter::empty(), PriorityAggregation::Max), 0);
    }

    #[test]
    fn test_aggregate_saturates_at_extreme_weights() {
        let mut table = PriorityTable::new();
        for param in ["a", "b", "c"] {
            table.set(PriorityTarget::Parameter(param.to_string()), i64::MAX);
        }
        let one = Value::Int(1);
        let pairs = [("a", &one), ("b", &one), ("c", &one)];
        assert_eq!(table.aggregate(pairs, PriorityAggregation::Sum), i64::MAX);
        assert_eq!(table.aggregate(pairs, PriorityAggregation::Max), i64::MAX);

        table.set(PriorityTarget::Parameter("a".to_string()), i64::MIN);
        table.set(PriorityTarget::Parameter("b".to_string()), i64::MIN);
        table.set(PriorityTarget::Parameter("c".to_string()), 0);
        assert_eq!(table.aggregate(pairs, PriorityAggregation::Sum), i64::MIN);
    }
}
