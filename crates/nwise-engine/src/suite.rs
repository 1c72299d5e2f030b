//! Slot suite: one bucket of slots per slot scheme.
//!
//! Each bucket enumerates the Cartesian product of its scheme's domains in
//! odometer order (last parameter fastest) and classifies every slot once.
//! Because of that order a slot's position is the mixed-radix number formed
//! by its values' domain positions, so slots are located without a search.
//! Every bucket keeps a live count of its `Uncovered` slots.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use tracing::{debug, info};

use nwise_compiler::{
    ConstraintError, ConstraintEvaluator, DomainError, DomainRegistry, Model, ParamLookup,
    SlotScheme,
};
use nwise_ir::Value;

use crate::slot::{Overlay, Slot, SlotId, SlotState, SlotView};
use crate::stats::SchemeStats;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SuiteError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Constraint error while classifying slots: {0}")]
    Constraint(#[from] ConstraintError),
}

// ── Single-scheme bucket ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SingleSchemeSlotSuite {
    scheme: SlotScheme,
    /// Domain size per scheme parameter.
    radices: Vec<usize>,
    slots: Vec<Slot>,
    uncovered: usize,
}

impl SingleSchemeSlotSuite {
    /// Enumerate and classify every slot of `scheme`.
    pub fn enumerate(
        scheme: SlotScheme,
        registry: &DomainRegistry,
        evaluator: &ConstraintEvaluator,
    ) -> Result<Self, SuiteError> {
        let domains: Vec<&[Value]> = scheme
            .params()
            .iter()
            .map(|p| registry.domain(p))
            .collect::<Result<_, _>>()?;
        let radices: Vec<usize> = domains.iter().map(|d| d.len()).collect();

        let mut slots = Vec::with_capacity(radices.iter().product());
        let mut uncovered = 0;
        if radices.iter().all(|&r| r > 0) {
            let mut cursor = vec![0usize; radices.len()];
            loop {
                let values: Vec<Value> = cursor
                    .iter()
                    .zip(&domains)
                    .map(|(&i, d)| d[i].clone())
                    .collect();
                let state = classify(scheme.params(), &values, evaluator)?;
                if state == SlotState::Uncovered {
                    uncovered += 1;
                }
                slots.push(Slot::new(values, state));

                if !advance(&mut cursor, &radices) {
                    break;
                }
            }
        }

        debug!(%scheme, slots = slots.len(), uncovered, "enumerated bucket");
        Ok(Self {
            scheme,
            radices,
            slots,
            uncovered,
        })
    }

    pub fn scheme(&self) -> &SlotScheme {
        &self.scheme
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Live count of `Uncovered` slots.
    pub fn uncovered(&self) -> usize {
        self.uncovered
    }

    /// Count `Uncovered` slots by scanning. Only for checking the live count.
    pub fn scan_uncovered(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state() == SlotState::Uncovered)
            .count()
    }

    pub fn first_uncovered(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.state() == SlotState::Uncovered)
    }

    pub fn view(&self, index: usize) -> Option<SlotView<'_>> {
        self.slots
            .get(index)
            .map(|s| SlotView::new(self.scheme.params(), s.values()))
    }

    /// Position of the slot `assignment` selects, if it assigns the whole
    /// scheme with in-domain values.
    pub fn index_of<L: ParamLookup + ?Sized>(
        &self,
        registry: &DomainRegistry,
        assignment: &L,
    ) -> Option<usize> {
        let mut index = 0;
        for (param, radix) in self.scheme.params().iter().zip(&self.radices) {
            let value = assignment.lookup(param)?;
            let pos = registry.index_of(param, value)?;
            index = index * radix + pos;
        }
        Some(index)
    }

    /// Mark the slot at `index` covered. Returns true when it was `Uncovered`.
    pub fn cover(&mut self, index: usize) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        match slot.state() {
            SlotState::Uncovered => {
                slot.set_state(SlotState::Covered);
                self.uncovered -= 1;
                true
            }
            SlotState::Optional => {
                slot.set_state(SlotState::Covered);
                false
            }
            SlotState::Covered | SlotState::Excluded => false,
        }
    }

    pub fn stats(&self) -> SchemeStats {
        let mut stats = SchemeStats {
            scheme: self.scheme.params().to_vec(),
            total: self.slots.len(),
            uncovered: 0,
            covered: 0,
            excluded: 0,
            optional: 0,
        };
        for slot in &self.slots {
            match slot.state() {
                SlotState::Uncovered => stats.uncovered += 1,
                SlotState::Covered => stats.covered += 1,
                SlotState::Excluded => stats.excluded += 1,
                SlotState::Optional => stats.optional += 1,
            }
        }
        stats
    }
}

/// Mandatory first; Excluded wins over Optional.
fn classify(
    params: &[String],
    values: &[Value],
    evaluator: &ConstraintEvaluator,
) -> Result<SlotState, ConstraintError> {
    let view = SlotView::new(params, values);
    if !evaluator.fits_mandatory(&view)? {
        return Ok(SlotState::Excluded);
    }
    if !evaluator.fits_optional(&view)? {
        return Ok(SlotState::Optional);
    }
    Ok(SlotState::Uncovered)
}

/// Odometer step, last position fastest. False after the last combination.
fn advance(cursor: &mut [usize], radices: &[usize]) -> bool {
    for pos in (0..cursor.len()).rev() {
        cursor[pos] += 1;
        if cursor[pos] < radices[pos] {
            return true;
        }
        cursor[pos] = 0;
    }
    false
}

// ── Whole suite ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SlotSuite {
    registry: DomainRegistry,
    buckets: Vec<SingleSchemeSlotSuite>,
    /// Parameter -> buckets whose scheme contains it, ascending.
    by_param: HashMap<String, Vec<usize>>,
}

impl SlotSuite {
    /// Enumerate one bucket per slot scheme of `model`, optionally in parallel.
    pub fn new(model: &Model, parallel: bool) -> Result<Self, SuiteError> {
        let registry = model.registry();
        let evaluator = model.evaluator();
        let schemes = model.slot_schemes();

        let buckets: Vec<SingleSchemeSlotSuite> = if parallel {
            schemes
                .par_iter()
                .map(|s| SingleSchemeSlotSuite::enumerate(s.clone(), registry, evaluator))
                .collect::<Result<_, _>>()?
        } else {
            schemes
                .iter()
                .map(|s| SingleSchemeSlotSuite::enumerate(s.clone(), registry, evaluator))
                .collect::<Result<_, _>>()?
        };

        let mut by_param: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, bucket) in buckets.iter().enumerate() {
            for param in bucket.scheme().params() {
                by_param.entry(param.clone()).or_default().push(i);
            }
        }

        let suite = Self {
            registry: registry.clone(),
            buckets,
            by_param,
        };
        info!(
            buckets = suite.buckets.len(),
            slots = suite.len(),
            uncovered = suite.total_uncovered(),
            parallel,
            "enumerated slot suite"
        );
        Ok(suite)
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    pub fn buckets(&self) -> &[SingleSchemeSlotSuite] {
        &self.buckets
    }

    pub fn bucket(&self, bucket: usize) -> Option<&SingleSchemeSlotSuite> {
        self.buckets.get(bucket)
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.buckets.get(id.bucket)?.slot(id.index)
    }

    pub fn view(&self, id: SlotId) -> Option<SlotView<'_>> {
        self.buckets.get(id.bucket)?.view(id.index)
    }

    /// Total number of slots across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(SingleSchemeSlotSuite::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any slot scheme contains `param`.
    pub fn covers_parameter(&self, param: &str) -> bool {
        self.by_param.contains_key(param)
    }

    /// Bucket with the most `Uncovered` slots, earliest on ties.
    pub fn most_uncovered_scheme(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, bucket) in self.buckets.iter().enumerate() {
            let count = bucket.uncovered();
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((i, count));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Every non-excluded slot of every bucket whose scheme contains `param`.
    pub fn candidates_for_parameter(&self, param: &str) -> Vec<SlotId> {
        let Some(buckets) = self.by_param.get(param) else {
            return Vec::new();
        };
        buckets
            .iter()
            .flat_map(|&b| {
                self.buckets[b]
                    .slots()
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.state() != SlotState::Excluded)
                    .map(move |(index, _)| SlotId { bucket: b, index })
            })
            .collect()
    }

    /// Mark every slot `assignment` selects as covered.
    ///
    /// Returns the number of `Uncovered` slots newly covered.
    pub fn mark_covered<L: ParamLookup + ?Sized>(&mut self, assignment: &L) -> usize {
        let mut newly = 0;
        for bucket in &mut self.buckets {
            if !bucket.scheme().is_assigned_in(assignment) {
                continue;
            }
            if let Some(index) = bucket.index_of(&self.registry, assignment) {
                if bucket.cover(index) {
                    newly += 1;
                }
            }
        }
        newly
    }

    /// Number of `Uncovered` slots that merging `extension` into `base`
    /// would newly select. Buckets already fully assigned by `base` are
    /// not counted.
    pub fn covering_index<A, B>(&self, base: &A, extension: &B) -> usize
    where
        A: ParamLookup + ?Sized,
        B: ParamLookup + ?Sized,
    {
        let merged = Overlay::new(base, extension);
        self.buckets
            .iter()
            .filter(|b| b.scheme().is_assigned_in(&merged) && !b.scheme().is_assigned_in(base))
            .filter_map(|b| b.index_of(&self.registry, &merged).and_then(|i| b.slot(i)))
            .filter(|s| s.state() == SlotState::Uncovered)
            .count()
    }

    /// Sum of the live counters.
    pub fn total_uncovered(&self) -> usize {
        self.buckets.iter().map(SingleSchemeSlotSuite::uncovered).sum()
    }

    /// Full scan of one bucket, for checking its live counter.
    pub fn scan_uncovered(&self, bucket: usize) -> Option<usize> {
        self.buckets.get(bucket).map(SingleSchemeSlotSuite::scan_uncovered)
    }

    pub fn stats(&self) -> Vec<SchemeStats> {
        self.buckets.iter().map(SingleSchemeSlotSuite::stats).collect()
    }

    /// Distinct slot ids across `params`, in ascending order.
    pub fn candidates_for_parameters<'p, I>(&self, params: I) -> BTreeSet<SlotId>
    where
        I: IntoIterator<Item = &'p str>,
    {
        params
            .into_iter()
            .flat_map(|p| self.candidates_for_parameter(p))
            .collect()
    }
}
