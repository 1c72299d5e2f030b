//! Session configuration: limits, enumeration mode, priority aggregation.
use serde::{Deserialize, Serialize};

use nwise_compiler::PriorityAggregation;
use nwise_engine::GeneratorOptions;

use crate::limits::GenerationLimits;

/// Configuration for one generation session.
///
/// Every field has a default, so a partial JSON object is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub limits: GenerationLimits,
    /// Enumerate slot buckets in parallel before generation starts.
    pub parallel_enumeration: bool,
    /// How per-value weights combine into a candidate's priority.
    pub priority_aggregation: PriorityAggregation,
}

impl GenerationConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            parallel_enumeration: self.parallel_enumeration,
            aggregation: self.priority_aggregation,
        }
    }
}
