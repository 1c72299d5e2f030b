//! Slots: one value combination of a slot scheme, plus its coverage state.

use serde::Serialize;

use nwise_compiler::ParamLookup;
use nwise_ir::Value;

/// Coverage state of a slot.
///
/// `Excluded` and `Optional` are only assigned by the initial
/// classification. Afterwards the only transitions are
/// `Uncovered -> Covered` and `Optional -> Covered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Uncovered,
    Covered,
    /// Violates a mandatory constraint; never generated.
    Excluded,
    /// Violates an optional constraint; covered only incidentally.
    Optional,
}

/// Address of a slot: bucket number, then position inside the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SlotId {
    pub bucket: usize,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// One value per scheme parameter, aligned with the scheme's sorted names.
    values: Vec<Value>,
    state: SlotState,
}

impl Slot {
    pub(crate) fn new(values: Vec<Value>, state: SlotState) -> Self {
        Self { values, state }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SlotState) {
        self.state = state;
    }
}

/// A slot's values read through its scheme's parameter names.
#[derive(Debug, Clone, Copy)]
pub struct SlotView<'a> {
    pub params: &'a [String],
    pub values: &'a [Value],
}

impl<'a> SlotView<'a> {
    pub fn new(params: &'a [String], values: &'a [Value]) -> Self {
        Self { params, values }
    }

    pub fn pairs(self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.params
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl ParamLookup for SlotView<'_> {
    fn lookup(&self, param: &str) -> Option<&Value> {
        // Parameter names are sorted.
        let i = self
            .params
            .binary_search_by(|p| p.as_str().cmp(param))
            .ok()?;
        self.values.get(i)
    }
}

/// `base` with `extension` layered underneath; `base` wins on overlap.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a, A: ?Sized, B: ?Sized> {
    pub base: &'a A,
    pub extension: &'a B,
}

impl<'a, A: ?Sized, B: ?Sized> Overlay<'a, A, B> {
    pub fn new(base: &'a A, extension: &'a B) -> Self {
        Self { base, extension }
    }
}

impl<A, B> ParamLookup for Overlay<'_, A, B>
where
    A: ParamLookup + ?Sized,
    B: ParamLookup + ?Sized,
{
    fn lookup(&self, param: &str) -> Option<&Value> {
        self.base
            .lookup(param)
            .or_else(|| self.extension.lookup(param))
    }
}
