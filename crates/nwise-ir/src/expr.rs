use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Declarative constraint rule over named parameters.
///
/// JSON form: literals are plain JSON scalars, `["param", name]` reads a
/// parameter, and `["op", ...args]` applies an operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(Value),
    Param(String),
    Op { op: OpKind, args: Vec<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Eq,
    Neq,
    And,
    Or,
    Not,
    Implies,
    Lt,
    Lte,
    Gt,
    Gte,
    /// First argument equals any of the remaining ones.
    In,
}

impl Expr {
    pub fn param(name: &str) -> Self {
        Expr::Param(name.to_string())
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn op(op: OpKind, args: Vec<Expr>) -> Self {
        Expr::Op { op, args }
    }

    /// Parameters referenced by this rule, sorted and unique.
    pub fn params(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Param(name) => {
                out.insert(name.clone());
            }
            Expr::Op { args, .. } => {
                for arg in args {
                    arg.collect_params(out);
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        parse_expr(&value).map_err(serde::de::Error::custom)
    }
}

pub fn parse_expr(value: &serde_json::Value) -> Result<Expr, String> {
    match value {
        serde_json::Value::Bool(b) => Ok(Expr::Literal(Value::Bool(*b))),
        serde_json::Value::Number(n) => {
            let i = n.as_i64().ok_or_else(|| format!("unsupported number: {n}"))?;
            Ok(Expr::Literal(Value::Int(i)))
        }
        serde_json::Value::String(s) => Ok(Expr::Literal(Value::Str(s.clone()))),

        serde_json::Value::Array(arr) => {
            if arr.is_empty() {
                return Err("empty expression array".to_string());
            }
            let tag = arr[0].as_str().ok_or_else(|| {
                format!(
                    "first element of expression array must be a string, got: {:?}",
                    arr[0]
                )
            })?;

            match tag {
                // ["param", name]
                "param" => {
                    if arr.len() != 2 {
                        return Err(format!(
                            "param expression requires 2 elements, got {}",
                            arr.len()
                        ));
                    }
                    let name = arr[1].as_str().ok_or("param name must be a string")?;
                    Ok(Expr::Param(name.to_string()))
                }

                _ => {
                    let op = match tag {
                        "eq" => OpKind::Eq,
                        "neq" => OpKind::Neq,
                        "and" => OpKind::And,
                        "or" => OpKind::Or,
                        "not" => OpKind::Not,
                        "implies" => OpKind::Implies,
                        "lt" => OpKind::Lt,
                        "lte" => OpKind::Lte,
                        "gt" => OpKind::Gt,
                        "gte" => OpKind::Gte,
                        "in" => OpKind::In,
                        other => return Err(format!("unknown expression operator: {other}")),
                    };
                    let args = arr[1..]
                        .iter()
                        .map(parse_expr)
                        .collect::<Result<Vec<_>, _>>()?;
                    check_arity(op, args.len())?;
                    Ok(Expr::Op { op, args })
                }
            }
        }

        other => Err(format!("unsupported expression value: {other}")),
    }
}

/// Arity rule shared by the parser and evaluators of hand-built rules.
pub fn check_arity(op: OpKind, len: usize) -> Result<(), String> {
    let ok = match op {
        OpKind::Not => len == 1,
        OpKind::Eq
        | OpKind::Neq
        | OpKind::Implies
        | OpKind::Lt
        | OpKind::Lte
        | OpKind::Gt
        | OpKind::Gte => len == 2,
        OpKind::In => len >= 2,
        OpKind::And | OpKind::Or => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("operator {op:?} does not accept {len} arguments"))
    }
}
