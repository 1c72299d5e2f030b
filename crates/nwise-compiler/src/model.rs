//! The compiled model: everything derived once from a [`ModelSpec`] or a
//! [`ModelBuilder`] before generation starts.

use std::collections::BTreeMap;

use tracing::{debug, info};

use nwise_ir::{Assignment, ConstraintSpec, ModelSpec, SchemeNode, Value};

use crate::constraint::{ConstraintError, ConstraintEvaluator, ParamLookup};
use crate::domain::{DomainError, DomainRegistry};
use crate::predicate::{ConstraintKind, Predicate};
use crate::priority::{resolve_priority_key, PriorityTable};
use crate::scheme::{compile_scheme, SchemeError, SlotScheme};
use crate::validate::{validate_domains, validate_references, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationError>),

    #[error("Scheme compilation error: {0}")]
    Scheme(#[from] SchemeError),

    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("Seed #{index} violates a mandatory constraint")]
    InvalidSeed { index: usize },

    #[error("Model has no coverage scheme")]
    MissingScheme,
}

#[derive(Debug, Clone)]
pub struct Model {
    registry: DomainRegistry,
    scheme: SchemeNode,
    slot_schemes: Vec<SlotScheme>,
    evaluator: ConstraintEvaluator,
    priorities: PriorityTable,
    seeds: Vec<Assignment>,
}

impl Model {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Compile a loaded model. Declarative rules without a name are called
    /// `mandatory#<i>` / `optional#<i>`.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self, CompileError> {
        let mut predicates = Vec::new();
        push_rules(
            &spec.constraints.mandatory,
            ConstraintKind::Mandatory,
            &mut predicates,
        );
        push_rules(
            &spec.constraints.optional,
            ConstraintKind::Optional,
            &mut predicates,
        );
        let priority = spec
            .priority
            .iter()
            .map(|(k, w)| (k.clone(), *w))
            .collect();

        assemble(
            spec.data.clone(),
            spec.scheme.clone(),
            predicates,
            priority,
            spec.seeds.clone(),
        )
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    pub fn domain(&self, param: &str) -> Result<&[Value], DomainError> {
        self.registry.domain(param)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.registry.parameters()
    }

    pub fn scheme(&self) -> &SchemeNode {
        &self.scheme
    }

    pub fn slot_schemes(&self) -> &[SlotScheme] {
        &self.slot_schemes
    }

    pub fn evaluator(&self) -> &ConstraintEvaluator {
        &self.evaluator
    }

    pub fn fits_mandatory<L: ParamLookup + ?Sized>(
        &self,
        assignment: &L,
    ) -> Result<bool, ConstraintError> {
        self.evaluator.fits_mandatory(assignment)
    }

    pub fn fits_optional<L: ParamLookup + ?Sized>(
        &self,
        assignment: &L,
    ) -> Result<bool, ConstraintError> {
        self.evaluator.fits_optional(assignment)
    }

    pub fn priority(&self, param: &str, value: &Value) -> i64 {
        self.priorities.weight(param, value)
    }

    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    pub fn seeds(&self) -> &[Assignment] {
        &self.seeds
    }
}

fn push_rules(specs: &[ConstraintSpec], kind: ConstraintKind, out: &mut Vec<Predicate>) {
    let prefix = match kind {
        ConstraintKind::Mandatory => "mandatory",
        ConstraintKind::Optional => "optional",
    };
    for (i, spec) in specs.iter().enumerate() {
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| format!("{prefix}#{i}"));
        out.push(Predicate::from_expr(&name, kind, spec.rule.clone()));
    }
}

fn assemble(
    domains: BTreeMap<String, Vec<Value>>,
    scheme: SchemeNode,
    predicates: Vec<Predicate>,
    priority: Vec<(String, i64)>,
    seeds: Vec<Assignment>,
) -> Result<Model, CompileError> {
    // 1. Domains
    validate_domains(&domains).map_err(CompileError::Validation)?;
    let registry = DomainRegistry::new(domains);

    // 2. Slot schemes
    let slot_schemes = compile_scheme(&scheme, &registry)?;
    for param in registry.parameters() {
        if !slot_schemes.iter().any(|s| s.contains(param)) {
            debug!(param, "parameter is not part of any slot scheme");
        }
    }

    // 3. References from constraints, priorities and seeds
    let priority_keys: Vec<String> = priority.iter().map(|(k, _)| k.clone()).collect();
    validate_references(&registry, &predicates, &priority_keys, &seeds)
        .map_err(CompileError::Validation)?;

    let mut priorities = PriorityTable::new();
    for (key, weight) in priority {
        if let Ok(target) = resolve_priority_key(&key, &registry) {
            priorities.set(target, weight);
        }
    }

    // 4. Constraints and seeds
    let evaluator = ConstraintEvaluator::new(predicates);
    for (index, seed) in seeds.iter().enumerate() {
        if !evaluator.fits_mandatory(seed)? {
            return Err(CompileError::InvalidSeed { index });
        }
    }

    info!(
        parameters = registry.len(),
        slot_schemes = slot_schemes.len(),
        constraints = evaluator.len(),
        seeds = seeds.len(),
        "compiled model"
    );

    Ok(Model {
        registry,
        scheme,
        slot_schemes,
        evaluator,
        priorities,
        seeds,
    })
}

// ── Builder ──────────────────────────────────────────────────────────

/// Programmatic model construction, for callers with closure predicates.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    domains: BTreeMap<String, Vec<Value>>,
    scheme: Option<SchemeNode>,
    predicates: Vec<Predicate>,
    priority: Vec<(String, i64)>,
    seeds: Vec<Assignment>,
}

impl ModelBuilder {
    pub fn parameter<V, I>(mut self, name: &str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.domains
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn scheme(mut self, scheme: SchemeNode) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn constraint(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Weight a flat key: a parameter name or `parameter__value`.
    pub fn priority(mut self, key: &str, weight: i64) -> Self {
        self.priority.push((key.to_string(), weight));
        self
    }

    pub fn seed(mut self, seed: Assignment) -> Self {
        self.seeds.push(seed);
        self
    }

    pub fn build(self) -> Result<Model, CompileError> {
        let scheme = self.scheme.ok_or(CompileError::MissingScheme)?;
        assemble(
            self.domains,
            scheme,
            self.predicates,
            self.priority,
            self.seeds,
        )
    }
}
