//! JSON model loading.
//!
//! The on-disk model nests parameters into groups and allows scalar
//! domains. Loading flattens nested keys with the `__` separator and turns
//! scalars into single-value domains:
//!
//! ```json
//! { "data": { "os": { "name": ["linux", "mac"], "arch": "x86" } } }
//! ```
//!
//! yields parameters `os__arch: ["x86"]` and `os__name: ["linux", "mac"]`.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{Assignment, ConstraintSet, ModelSpec, SchemeNode, Value};

/// Separator between a parent group and a child key in flat names.
pub const PATH_SEPARATOR: &str = "__";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data entry '{path}': {reason}")]
    InvalidData { path: String, reason: String },

    #[error("invalid priority entry '{path}': {reason}")]
    InvalidPriority { path: String, reason: String },
}

#[derive(Deserialize)]
struct RawModel {
    data: serde_json::Map<String, serde_json::Value>,
    scheme: SchemeNode,
    #[serde(default)]
    constraints: ConstraintSet,
    #[serde(default)]
    priority: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    seeds: Vec<Assignment>,
}

pub fn parse_model(json: &str) -> Result<ModelSpec, ParseError> {
    let raw: RawModel = serde_json::from_str(json)?;

    let mut data = BTreeMap::new();
    flatten_data(&raw.data, None, &mut data)?;

    let mut priority = BTreeMap::new();
    flatten_priority(&raw.priority, None, &mut priority)?;

    Ok(ModelSpec {
        data,
        scheme: raw.scheme,
        constraints: raw.constraints,
        priority,
        seeds: raw.seeds,
    })
}

fn join_path(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(p) => format!("{p}{PATH_SEPARATOR}{key}"),
        None => key.to_string(),
    }
}

fn scalar_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => n.as_i64().map(Value::Int),
        serde_json::Value::String(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

fn flatten_data(
    map: &serde_json::Map<String, serde_json::Value>,
    prefix: Option<&str>,
    out: &mut BTreeMap<String, Vec<Value>>,
) -> Result<(), ParseError> {
    for (key, value) in map {
        let path = join_path(prefix, key);
        let domain = match value {
            serde_json::Value::Object(inner) => {
                flatten_data(inner, Some(&path), out)?;
                continue;
            }
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    scalar_value(item).ok_or_else(|| ParseError::InvalidData {
                        path: path.clone(),
                        reason: format!("unsupported domain value: {item}"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            scalar => vec![scalar_value(scalar).ok_or_else(|| ParseError::InvalidData {
                path: path.clone(),
                reason: format!("unsupported domain value: {scalar}"),
            })?],
        };
        if out.insert(path.clone(), domain).is_some() {
            return Err(ParseError::InvalidData {
                path,
                reason: "parameter defined twice".to_string(),
            });
        }
    }
    Ok(())
}

fn flatten_priority(
    map: &serde_json::Map<String, serde_json::Value>,
    prefix: Option<&str>,
    out: &mut BTreeMap<String, i64>,
) -> Result<(), ParseError> {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            serde_json::Value::Object(inner) => flatten_priority(inner, Some(&path), out)?,
            serde_json::Value::Number(n) => {
                let weight = n.as_i64().ok_or_else(|| ParseError::InvalidPriority {
                    path: path.clone(),
                    reason: format!("weight must be an integer, got {n}"),
                })?;
                out.insert(path, weight);
            }
            other => {
                return Err(ParseError::InvalidPriority {
                    path,
                    reason: format!("expected integer or object, got {other}"),
                })
            }
        }
    }
    Ok(())
}

/// Parse a scheme node: a string is a leaf, `{"__k": [children]}` is a
/// valency-k group (any number of leading underscores).
pub fn parse_scheme_node(value: &serde_json::Value) -> Result<SchemeNode, String> {
    match value {
        serde_json::Value::String(name) => Ok(SchemeNode::Leaf(name.clone())),
        serde_json::Value::Object(obj) => {
            if obj.len() != 1 {
                return Err(format!(
                    "scheme group must have exactly one valency key, got {}",
                    obj.len()
                ));
            }
            let (key, children) = obj.iter().next().ok_or("empty scheme group")?;
            let valency = parse_valency(key)?;
            let children = children
                .as_array()
                .ok_or_else(|| format!("children of scheme group '{key}' must be an array"))?
                .iter()
                .map(parse_scheme_node)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SchemeNode::Group { valency, children })
        }
        other => Err(format!("unsupported scheme node: {other}")),
    }
}

fn parse_valency(key: &str) -> Result<usize, String> {
    let digits = key.trim_start_matches('_');
    if digits.len() == key.len() || digits.is_empty() {
        return Err(format!("invalid valency key '{key}', expected e.g. \"__2\""));
    }
    digits
        .parse::<usize>()
        .map_err(|_| format!("invalid valency key '{key}', expected e.g. \"__2\""))
}
