//! Coverage statistics for a generated suite.

use serde::Serialize;

/// Slot counts of one slot scheme, by state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemeStats {
    /// Sorted parameter names of the scheme.
    pub scheme: Vec<String>,
    /// Number of slots (size of the Cartesian product).
    pub total: usize,
    pub uncovered: usize,
    pub covered: usize,
    /// Slots violating a mandatory constraint.
    pub excluded: usize,
    /// Slots violating only optional constraints and never covered.
    pub optional: usize,
}

impl SchemeStats {
    /// Fraction of required slots that are covered, 1.0 when none are required.
    pub fn coverage(&self) -> f64 {
        let required = self.uncovered + self.covered;
        if required == 0 {
            1.0
        } else {
            self.covered as f64 / required as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteStats {
    /// Per scheme, in declaration order.
    pub schemes: Vec<SchemeStats>,
    /// Number of test cases generated so far.
    pub test_cases: usize,
    /// Seeds dropped because an earlier test case already contained them.
    pub seeds_dropped: usize,
}

impl SuiteStats {
    pub fn total_slots(&self) -> usize {
        self.schemes.iter().map(|s| s.total).sum()
    }

    pub fn total_uncovered(&self) -> usize {
        self.schemes.iter().map(|s| s.uncovered).sum()
    }

    pub fn total_covered(&self) -> usize {
        self.schemes.iter().map(|s| s.covered).sum()
    }

    pub fn total_excluded(&self) -> usize {
        self.schemes.iter().map(|s| s.excluded).sum()
    }
}
