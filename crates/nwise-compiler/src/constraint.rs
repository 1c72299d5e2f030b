//! Constraint evaluator.
//!
//! Predicates are grouped by their sorted signature. A group applies to an
//! assignment only when every parameter of the signature is assigned; all
//! predicates of every applicable group must pass.

use std::collections::BTreeMap;

use nwise_ir::{Assignment, Value};

use crate::predicate::{ConstraintKind, Predicate};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstraintError {
    #[error("constraint '{constraint}' cannot bind parameter '{param}'")]
    ArityMismatch { constraint: String, param: String },

    #[error("constraint '{constraint}' failed to evaluate: {reason}")]
    Evaluation { constraint: String, reason: String },
}

/// Read access to a (partial) assignment of values to parameters.
pub trait ParamLookup {
    fn lookup(&self, param: &str) -> Option<&Value>;
}

impl ParamLookup for Assignment {
    fn lookup(&self, param: &str) -> Option<&Value> {
        self.get(param)
    }
}

type SignatureIndex = BTreeMap<Vec<String>, Vec<Predicate>>;

#[derive(Debug, Clone, Default)]
pub struct ConstraintEvaluator {
    mandatory: SignatureIndex,
    optional: SignatureIndex,
}

impl ConstraintEvaluator {
    pub fn new(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut evaluator = Self::default();
        for predicate in predicates {
            let index = match predicate.kind() {
                ConstraintKind::Mandatory => &mut evaluator.mandatory,
                ConstraintKind::Optional => &mut evaluator.optional,
            };
            index
                .entry(predicate.signature().to_vec())
                .or_default()
                .push(predicate);
        }
        evaluator
    }

    fn index(&self, kind: ConstraintKind) -> &SignatureIndex {
        match kind {
            ConstraintKind::Mandatory => &self.mandatory,
            ConstraintKind::Optional => &self.optional,
        }
    }

    /// Whether `assignment` passes every applicable predicate of `kind`.
    pub fn fits<L: ParamLookup + ?Sized>(
        &self,
        kind: ConstraintKind,
        assignment: &L,
    ) -> Result<bool, ConstraintError> {
        for (signature, predicates) in self.index(kind) {
            if !signature.iter().all(|p| assignment.lookup(p).is_some()) {
                continue;
            }
            for predicate in predicates {
                if !predicate.evaluate(assignment)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub fn fits_mandatory<L: ParamLookup + ?Sized>(
        &self,
        assignment: &L,
    ) -> Result<bool, ConstraintError> {
        self.fits(ConstraintKind::Mandatory, assignment)
    }

    pub fn fits_optional<L: ParamLookup + ?Sized>(
        &self,
        assignment: &L,
    ) -> Result<bool, ConstraintError> {
        self.fits(ConstraintKind::Optional, assignment)
    }

    /// Mandatory first, then optional.
    pub fn fits_all<L: ParamLookup + ?Sized>(&self, assignment: &L) -> Result<bool, ConstraintError> {
        Ok(self.fits_mandatory(assignment)? && self.fits_optional(assignment)?)
    }

    /// Every registered predicate, mandatory ones first.
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.mandatory
            .values()
            .chain(self.optional.values())
            .flatten()
    }

    pub fn signatures(&self, kind: ConstraintKind) -> impl Iterator<Item = &[String]> {
        self.index(kind).keys().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.predicates().count()
    }

    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty() && self.optional.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwise_ir::{Expr, OpKind};

    fn assignment(pairs: &[(&str, Value)]) -> Assignment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn a_is_one_or_b_is_y() -> Predicate {
        Predicate::from_fn("a1_or_by", ConstraintKind::Mandatory, &["b", "a"], |b| {
            Ok(b.value("a")? == &Value::Int(1) || b.value("b")? == &Value::from("y"))
        })
    }

    #[test]
    fn test_inapplicable_signature_passes() {
        let eval = ConstraintEvaluator::new([a_is_one_or_b_is_y()]);
        let partial = assignment(&[("a", Value::Int(2))]);
        assert!(eval.fits_mandatory(&partial).unwrap());
    }

    #[test]
    fn test_applicable_signature_evaluated() {
        let eval = ConstraintEvaluator::new([a_is_one_or_b_is_y()]);
        let bad = assignment(&[("a", Value::Int(2)), ("b", Value::from("x"))]);
        let good = assignment(&[("a", Value::Int(2)), ("b", Value::from("y"))]);
        assert!(!eval.fits_mandatory(&bad).unwrap());
        assert!(eval.fits_mandatory(&good).unwrap());
        // Extra parameters do not matter.
        let wider = assignment(&[
            ("a", Value::Int(1)),
            ("b", Value::from("x")),
            ("c", Value::Bool(true)),
        ]);
        assert!(eval.fits_mandatory(&wider).unwrap());
    }

    #[test]
    fn test_kinds_are_indexed_separately() {
        let optional = Predicate::from_expr(
            "prefer_c_true",
            ConstraintKind::Optional,
            Expr::op(OpKind::Eq, vec![Expr::param("c"), Expr::lit(true)]),
        );
        let eval = ConstraintEvaluator::new([a_is_one_or_b_is_y(), optional]);
        let a = assignment(&[("c", Value::Bool(false))]);
        assert!(eval.fits_mandatory(&a).unwrap());
        assert!(!eval.fits_optional(&a).unwrap());
        assert!(!eval.fits_all(&a).unwrap());
        assert_eq!(eval.len(), 2);
        assert_eq!(
            eval.signatures(ConstraintKind::Mandatory).collect::<Vec<_>>(),
            vec![&["a".to_string(), "b".to_string()][..]]
        );
    }

    #[test]
    fn test_same_signature_shares_group() {
        let extra = Predicate::from_fn("a_not_3", ConstraintKind::Mandatory, &["a", "b"], |b| {
            Ok(b.value("a")? != &Value::Int(3))
        });
        let eval = ConstraintEvaluator::new([a_is_one_or_b_is_y(), extra]);
        assert_eq!(eval.signatures(ConstraintKind::Mandatory).count(), 1);
        let a = assignment(&[("a", Value::Int(3)), ("b", Value::from("y"))]);
        assert!(!eval.fits_mandatory(&a).unwrap());
    }
}
