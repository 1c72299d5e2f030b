//! Greedy test-suite generation.
//!
//! A test case starts from a pending seed or from the first uncovered slot
//! of the bucket with the most uncovered slots. It then grows one candidate
//! slot at a time until every parameter is assigned. Candidates must agree
//! with the values already chosen and keep the merged assignment within the
//! mandatory constraints. Among them, those that also satisfy the optional
//! constraints are preferred, then the ranking picks by
//! (covering index desc, priority desc, names and values asc).

use std::cmp::Ordering;
use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info};

use nwise_compiler::{
    ConstraintError, DomainError, Model, ParamLookup, PriorityAggregation,
};
use nwise_ir::{Assignment, Value};

use crate::slot::{Overlay, SlotId, SlotView};
use crate::stats::SuiteStats;
use crate::suite::{SlotSuite, SuiteError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerateError {
    #[error("Poor model: no candidate can extend {partial:?}; unassigned: {unmet:?}")]
    PoorModel {
        partial: Assignment,
        unmet: Vec<String>,
    },

    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(#[from] DomainError),

    #[error("Slot suite error: {0}")]
    Suite(#[from] SuiteError),
}

// ── Test cases ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCasePhase {
    Empty,
    Growing,
    Full,
}

/// A finished test case: one value for every parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TestCase {
    assignment: Assignment,
}

impl TestCase {
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn get(&self, param: &str) -> Option<&Value> {
        self.assignment.get(param)
    }

    /// Whether every pair of `partial` appears in this test case.
    pub fn contains(&self, partial: &Assignment) -> bool {
        partial
            .iter()
            .all(|(p, v)| self.assignment.get(p) == Some(v))
    }

    pub fn into_assignment(self) -> Assignment {
        self.assignment
    }
}

impl ParamLookup for TestCase {
    fn lookup(&self, param: &str) -> Option<&Value> {
        self.assignment.get(param)
    }
}

/// A test case under construction.
#[derive(Debug, Clone)]
struct PartialTestCase {
    assignment: Assignment,
    width: usize,
}

impl PartialTestCase {
    fn new(width: usize) -> Self {
        Self {
            assignment: Assignment::new(),
            width,
        }
    }

    fn phase(&self) -> TestCasePhase {
        match self.assignment.len() {
            0 => TestCasePhase::Empty,
            n if n >= self.width => TestCasePhase::Full,
            _ => TestCasePhase::Growing,
        }
    }

    fn merge<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a Value)>) {
        for (p, v) in pairs {
            self.assignment
                .entry(p.to_string())
                .or_insert_with(|| v.clone());
        }
    }
}

/// The generated suite.
#[derive(Debug, Clone, Serialize)]
pub struct TestSuite {
    pub test_cases: Vec<TestCase>,
    pub stats: SuiteStats,
}

// ── Candidates ───────────────────────────────────────────────────────

/// One way to extend the current assignment.
#[derive(Debug, Clone)]
struct Candidate {
    /// `None` for a parameter that belongs to no slot scheme.
    slot: Option<SlotId>,
    params: Vec<String>,
    values: Vec<Value>,
}

impl Candidate {
    fn view(&self) -> SlotView<'_> {
        SlotView::new(&self.params, &self.values)
    }
}

#[derive(Debug)]
struct Ranked {
    candidate: Candidate,
    covering: usize,
    priority: i64,
}

impl Ranked {
    /// Greater is better.
    fn cmp_rank(&self, other: &Self) -> Ordering {
        self.covering
            .cmp(&other.covering)
            .then(self.priority.cmp(&other.priority))
            .then_with(|| other.candidate.params.cmp(&self.candidate.params))
            .then_with(|| other.candidate.values.cmp(&self.candidate.values))
    }
}

// ── Generator ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOptions {
    /// Enumerate buckets on the rayon pool.
    pub parallel_enumeration: bool,
    pub aggregation: PriorityAggregation,
}

pub struct TestSuiteGenerator<'m> {
    model: &'m Model,
    suite: SlotSuite,
    aggregation: PriorityAggregation,
    pending_seeds: VecDeque<Assignment>,
    seeds_dropped: usize,
    test_cases: Vec<TestCase>,
}

impl<'m> TestSuiteGenerator<'m> {
    pub fn new(model: &'m Model, options: GeneratorOptions) -> Result<Self, GenerateError> {
        let suite = SlotSuite::new(model, options.parallel_enumeration)?;
        Ok(Self {
            model,
            suite,
            aggregation: options.aggregation,
            pending_seeds: model.seeds().iter().cloned().collect(),
            seeds_dropped: 0,
            test_cases: Vec::new(),
        })
    }

    pub fn suite(&self) -> &SlotSuite {
        &self.suite
    }

    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    /// True once no seed is pending and every required slot is covered.
    pub fn is_exhausted(&self) -> bool {
        self.pending_seeds.is_empty() && self.suite.total_uncovered() == 0
    }

    pub fn stats(&self) -> SuiteStats {
        SuiteStats {
            schemes: self.suite.stats(),
            test_cases: self.test_cases.len(),
            seeds_dropped: self.seeds_dropped,
        }
    }

    /// Build and append the next test case, or `None` when exhausted.
    pub fn next_test_case(&mut self) -> Result<Option<TestCase>, GenerateError> {
        let width = self.model.registry().len();
        let Some(mut current) = self.start(width) else {
            return Ok(None);
        };
        self.suite.mark_covered(&current.assignment);

        while current.phase() != TestCasePhase::Full {
            self.grow(&mut current)?;
        }

        let test_case = TestCase {
            assignment: current.assignment,
        };
        debug!(
            index = self.test_cases.len(),
            remaining = self.suite.total_uncovered(),
            "test case complete"
        );
        self.drop_contained_seeds(&test_case);
        self.test_cases.push(test_case.clone());
        Ok(Some(test_case))
    }

    /// Run until exhausted.
    pub fn generate(mut self) -> Result<TestSuite, GenerateError> {
        while self.next_test_case()?.is_some() {}
        info!(
            test_cases = self.test_cases.len(),
            seeds_dropped = self.seeds_dropped,
            "generated test suite"
        );
        Ok(self.into_test_suite())
    }

    pub fn into_test_suite(self) -> TestSuite {
        let stats = self.stats();
        TestSuite {
            test_cases: self.test_cases,
            stats,
        }
    }

    /// Pending seeds already contained in `test_case` are never started.
    fn drop_contained_seeds(&mut self, test_case: &TestCase) {
        let before = self.pending_seeds.len();
        self.pending_seeds.retain(|seed| !test_case.contains(seed));
        let dropped = before - self.pending_seeds.len();
        if dropped > 0 {
            debug!(dropped, "dropping seeds already contained in a test case");
            self.seeds_dropped += dropped;
        }
    }

    /// Initial partial assignment: the next pending seed, else the first
    /// uncovered slot of the fullest bucket.
    fn start(&mut self, width: usize) -> Option<PartialTestCase> {
        let mut current = PartialTestCase::new(width);
        if let Some(seed) = self.pending_seeds.pop_front() {
            current.assignment = seed;
            return Some(current);
        }

        let bucket = self.suite.most_uncovered_scheme()?;
        let index = self.suite.bucket(bucket)?.first_uncovered()?;
        let view = self.suite.view(SlotId { bucket, index })?;
        current.merge(view.pairs());
        Some(current)
    }

    fn grow(&mut self, current: &mut PartialTestCase) -> Result<(), GenerateError> {
        let unassigned: Vec<&str> = self
            .model
            .parameters()
            .filter(|p| !current.assignment.contains_key(*p))
            .collect();

        let mut preferred = Vec::new();
        let mut fallback = Vec::new();
        for candidate in self.candidates(&unassigned)? {
            let view = candidate.view();
            if !consistent(&current.assignment, &view) {
                continue;
            }
            let merged = Overlay::new(&current.assignment, &view);
            if !self.model.fits_mandatory(&merged)? {
                continue;
            }
            if self.model.fits_optional(&merged)? {
                preferred.push(candidate);
            } else {
                fallback.push(candidate);
            }
        }

        let pool = if preferred.is_empty() { fallback } else { preferred };
        let best = pool
            .into_iter()
            .map(|candidate| self.rank(&current.assignment, candidate))
            .max_by(Ranked::cmp_rank);

        let Some(best) = best else {
            return Err(GenerateError::PoorModel {
                partial: current.assignment.clone(),
                unmet: unassigned.iter().map(|p| p.to_string()).collect(),
            });
        };

        debug!(
            slot = ?best.candidate.slot,
            covering = best.covering,
            priority = best.priority,
            "extending test case"
        );
        current.merge(best.candidate.view().pairs());
        self.suite.mark_covered(&current.assignment);
        Ok(())
    }

    /// Slots of every bucket touching an unassigned parameter, plus one
    /// single-value candidate per value of parameters in no bucket.
    fn candidates(&self, unassigned: &[&str]) -> Result<Vec<Candidate>, GenerateError> {
        let mut out = Vec::new();
        for id in self.suite.candidates_for_parameters(unassigned.iter().copied()) {
            if let Some(view) = self.suite.view(id) {
                out.push(Candidate {
                    slot: Some(id),
                    params: view.params.to_vec(),
                    values: view.values.to_vec(),
                });
            }
        }
        for param in unassigned {
            if self.suite.covers_parameter(param) {
                continue;
            }
            for value in self.model.domain(param)? {
                out.push(Candidate {
                    slot: None,
                    params: vec![param.to_string()],
                    values: vec![value.clone()],
                });
            }
        }
        Ok(out)
    }

    fn rank(&self, base: &Assignment, candidate: Candidate) -> Ranked {
        let view = candidate.view();
        let covering = self.suite.covering_index(base, &view);
        let priority = self
            .model
            .priorities()
            .aggregate(view.pairs(), self.aggregation);
        Ranked {
            candidate,
            covering,
            priority,
        }
    }
}

/// The candidate agrees with every value already assigned.
fn consistent(assignment: &Assignment, view: &SlotView<'_>) -> bool {
    view.pairs()
        .all(|(p, v)| assignment.get(p).map_or(true, |current| current == v))
}
