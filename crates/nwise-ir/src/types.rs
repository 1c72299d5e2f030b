use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// A concrete parameter value.
///
/// Values are opaque to the engine: it only compares, orders and hashes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Parameter name -> value. Partial for seeds and growing test cases,
/// total for finished test cases. BTreeMap keeps iteration deterministic.
pub type Assignment = BTreeMap<String, Value>;

// ── Coverage scheme ──────────────────────────────────────────────────

/// A node of the nested coverage scheme.
///
/// `Group { valency: k, .. }` requires every k-combination of its children
/// to be jointly covered. Leaves name parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SchemeNode {
    Leaf(String),
    Group {
        valency: usize,
        children: Vec<SchemeNode>,
    },
}

impl SchemeNode {
    pub fn leaf(name: &str) -> Self {
        SchemeNode::Leaf(name.to_string())
    }

    pub fn group(valency: usize, children: Vec<SchemeNode>) -> Self {
        SchemeNode::Group { valency, children }
    }

    /// Group of leaves, the common flat case.
    pub fn over(valency: usize, names: &[&str]) -> Self {
        SchemeNode::Group {
            valency,
            children: names.iter().map(|n| SchemeNode::leaf(n)).collect(),
        }
    }

    /// All parameter names referenced anywhere below this node, in tree order.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            SchemeNode::Leaf(name) => out.push(name),
            SchemeNode::Group { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for SchemeNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        crate::parse::parse_scheme_node(&value).map_err(serde::de::Error::custom)
    }
}

// ── Constraints ──────────────────────────────────────────────────────

/// A declarative constraint. Its signature is the set of parameters the
/// rule references.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub rule: Expr,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstraintSet {
    #[serde(default)]
    pub mandatory: Vec<ConstraintSpec>,
    #[serde(default)]
    pub optional: Vec<ConstraintSpec>,
}

// ── Model ────────────────────────────────────────────────────────────

/// A loaded model with nested sections already flattened.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Flat parameter name (`group__param`) -> ordered domain.
    pub data: BTreeMap<String, Vec<Value>>,
    pub scheme: SchemeNode,
    pub constraints: ConstraintSet,
    /// Flat priority key -> weight. A key is either a parameter name or
    /// `parameter__value`; the compiler resolves which.
    pub priority: BTreeMap<String, i64>,
    pub seeds: Vec<Assignment>,
}
