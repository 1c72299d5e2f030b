use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use nwise_ir::expr::check_arity;
use nwise_ir::{Expr, OpKind, Value};

use crate::constraint::{ConstraintError, ParamLookup};

// ── Kinds ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Failure excludes the combination entirely.
    Mandatory,
    /// Failure makes the combination undesirable but legal.
    Optional,
}

// ── Bindings ─────────────────────────────────────────────────────────

/// Values bound by name to a predicate's signature.
#[derive(Debug, Default)]
pub struct Bindings<'a> {
    values: BTreeMap<&'a str, &'a Value>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &'a str, value: &'a Value) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.values.get(name).copied()
    }

    /// Value of `name`, or `Unbound` if it is not part of the signature.
    pub fn value(&self, name: &str) -> Result<&'a Value, EvalError> {
        self.get(name).ok_or_else(|| EvalError::Unbound {
            param: name.to_string(),
        })
    }
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("parameter '{param}' is not bound")]
    Unbound { param: String },

    #[error("type error: expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    #[error("malformed rule: {0}")]
    Malformed(String),
}

// ── Evaluation capability ────────────────────────────────────────────

/// Anything that can decide a constraint from named bindings.
pub trait Evaluate: Send + Sync {
    fn evaluate(&self, bindings: &Bindings<'_>) -> Result<bool, EvalError>;
}

struct FnRule<F>(F);

impl<F> Evaluate for FnRule<F>
where
    F: Fn(&Bindings<'_>) -> Result<bool, EvalError> + Send + Sync,
{
    fn evaluate(&self, bindings: &Bindings<'_>) -> Result<bool, EvalError> {
        (self.0)(bindings)
    }
}

/// A declarative rule from the model file.
#[derive(Debug, Clone)]
pub struct ExprRule {
    expr: Expr,
}

impl ExprRule {
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }
}

impl Evaluate for ExprRule {
    fn evaluate(&self, bindings: &Bindings<'_>) -> Result<bool, EvalError> {
        as_bool(eval_expr(&self.expr, bindings)?)
    }
}

// ── Predicate ────────────────────────────────────────────────────────

/// A named constraint over a sorted signature of parameters.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    kind: ConstraintKind,
    signature: Vec<String>,
    rule: Arc<dyn Evaluate>,
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl Predicate {
    pub fn new(name: &str, kind: ConstraintKind, args: &[&str], rule: Arc<dyn Evaluate>) -> Self {
        let mut signature: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        signature.sort();
        signature.dedup();
        Self {
            name: name.to_string(),
            kind,
            signature,
            rule,
        }
    }

    /// Closure-backed predicate. The closure only sees the parameters in `args`.
    pub fn from_fn<F>(name: &str, kind: ConstraintKind, args: &[&str], f: F) -> Self
    where
        F: Fn(&Bindings<'_>) -> Result<bool, EvalError> + Send + Sync + 'static,
    {
        Self::new(name, kind, args, Arc::new(FnRule(f)))
    }

    /// Expression-backed predicate; the signature is every parameter the
    /// expression reads.
    pub fn from_expr(name: &str, kind: ConstraintKind, expr: Expr) -> Self {
        let params = expr.params();
        let args: Vec<&str> = params.iter().map(String::as_str).collect();
        Self::new(name, kind, &args, Arc::new(ExprRule::new(expr)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn signature(&self) -> &[String] {
        &self.signature
    }

    /// Bind the signature from `lookup` and evaluate.
    ///
    /// Callers check applicability first; a missing signature parameter here
    /// is reported as an arity mismatch.
    pub fn evaluate<L: ParamLookup + ?Sized>(&self, lookup: &L) -> Result<bool, ConstraintError> {
        let mut bindings = Bindings::new();
        for param in &self.signature {
            let value = lookup
                .lookup(param)
                .ok_or_else(|| ConstraintError::ArityMismatch {
                    constraint: self.name.clone(),
                    param: param.clone(),
                })?;
            bindings.bind(param.as_str(), value);
        }
        self.rule.evaluate(&bindings).map_err(|e| match e {
            EvalError::Unbound { param } => ConstraintError::ArityMismatch {
                constraint: self.name.clone(),
                param,
            },
            other => ConstraintError::Evaluation {
                constraint: self.name.clone(),
                reason: other.to_string(),
            },
        })
    }
}

// ── Expression evaluation ────────────────────────────────────────────

pub fn eval_expr(expr: &Expr, bindings: &Bindings<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Param(name) => bindings.value(name).cloned(),
        Expr::Op { op, args } => eval_op(*op, args, bindings),
    }
}

fn eval_op(op: OpKind, args: &[Expr], bindings: &Bindings<'_>) -> Result<Value, EvalError> {
    check_arity(op, args.len()).map_err(EvalError::Malformed)?;
    match op {
        OpKind::Eq => {
            let left = eval_expr(&args[0], bindings)?;
            let right = eval_expr(&args[1], bindings)?;
            Ok(Value::Bool(left == right))
        }
        OpKind::Neq => {
            let left = eval_expr(&args[0], bindings)?;
            let right = eval_expr(&args[1], bindings)?;
            Ok(Value::Bool(left != right))
        }
        OpKind::And => {
            for arg in args {
                if !as_bool(eval_expr(arg, bindings)?)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        OpKind::Or => {
            for arg in args {
                if as_bool(eval_expr(arg, bindings)?)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        OpKind::Not => {
            let val = as_bool(eval_expr(&args[0], bindings)?)?;
            Ok(Value::Bool(!val))
        }
        OpKind::Implies => {
            if as_bool(eval_expr(&args[0], bindings)?)? {
                eval_expr(&args[1], bindings)
            } else {
                Ok(Value::Bool(true))
            }
        }
        OpKind::In => {
            let needle = eval_expr(&args[0], bindings)?;
            for arg in &args[1..] {
                if eval_expr(arg, bindings)? == needle {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        OpKind::Lt => eval_compare(args, bindings, |o| o.is_lt()),
        OpKind::Lte => eval_compare(args, bindings, |o| o.is_le()),
        OpKind::Gt => eval_compare(args, bindings, |o| o.is_gt()),
        OpKind::Gte => eval_compare(args, bindings, |o| o.is_ge()),
    }
}

fn eval_compare(
    args: &[Expr],
    bindings: &Bindings<'_>,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EvalError> {
    let left = eval_expr(&args[0], bindings)?;
    let right = eval_expr(&args[1], bindings)?;
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(accept(a.cmp(b)))),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(accept(a.cmp(b)))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(accept(a.cmp(b)))),
        _ => Err(EvalError::TypeError {
            expected: "operands of the same type".to_string(),
            actual: format!("{left:?}, {right:?}"),
        }),
    }
}

fn as_bool(value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::TypeError {
            expected: "bool".to_string(),
            actual: format!("{other:?}"),
        }),
    }
}
