//! Resource limits for a generation session.
//!
//! Caps on suite size, wall time and model size. Hitting a cap aborts the
//! session with [`LimitExceeded`]; no partial suite is returned.

use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationLimits {
    /// Maximum number of test cases. None = unlimited.
    pub max_test_cases: Option<usize>,
    /// Maximum wall-clock seconds spent generating. None = unlimited.
    pub max_wall_secs: Option<u64>,
    /// Maximum model JSON size in bytes. None = unlimited.
    pub max_model_bytes: Option<usize>,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_test_cases: None,
            max_wall_secs: Some(300),                // 5 minutes
            max_model_bytes: Some(16 * 1024 * 1024), // 16 MB
        }
    }
}

impl GenerationLimits {
    pub fn unlimited() -> Self {
        Self {
            max_test_cases: None,
            max_wall_secs: None,
            max_model_bytes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitExceeded {
    #[error("Test case limit reached ({max}) before coverage was complete")]
    TestCases { max: usize },

    #[error("Wall-clock limit reached ({max_secs}s)")]
    WallTime { max_secs: u64 },

    #[error("Model JSON too large ({size} bytes, max {max})")]
    ModelTooLarge { size: usize, max: usize },
}

/// Checks a running session against its limits.
pub struct LimitChecker {
    limits: GenerationLimits,
    start_time: Instant,
}

impl LimitChecker {
    pub fn new(limits: GenerationLimits) -> Self {
        Self {
            limits,
            start_time: Instant::now(),
        }
    }

    /// Called before each further test case is generated.
    pub fn check(&self, test_cases: usize) -> Result<(), LimitExceeded> {
        if let Some(max) = self.limits.max_test_cases {
            if test_cases >= max {
                return Err(LimitExceeded::TestCases { max });
            }
        }
        if let Some(max_secs) = self.limits.max_wall_secs {
            if self.start_time.elapsed().as_secs() >= max_secs {
                return Err(LimitExceeded::WallTime { max_secs });
            }
        }
        Ok(())
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn limits(&self) -> &GenerationLimits {
        &self.limits
    }
}

/// Reject oversized model input before parsing it.
pub fn check_model_size(limits: &GenerationLimits, size: usize) -> Result<(), LimitExceeded> {
    match limits.max_model_bytes {
        Some(max) if size > max => Err(LimitExceeded::ModelTooLarge { size, max }),
        _ => Ok(()),
    }
}
