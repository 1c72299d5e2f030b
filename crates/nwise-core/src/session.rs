//! Generation session: model in, report out.
//!
//! Parsing and compilation happen once, then the generator is stepped one
//! test case at a time so the limits can be checked between steps.

use serde::Serialize;
use tracing::{info, warn};

use nwise_compiler::{CompileError, Model};
use nwise_engine::{GenerateError, SuiteStats, TestCase, TestSuiteGenerator};
use nwise_ir::{parse_model, ParseError};

use crate::config::GenerationConfig;
use crate::limits::{check_model_size, LimitChecker, LimitExceeded};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Model parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Compilation error: {0}")]
    Compile(#[from] CompileError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(#[from] LimitExceeded),
}

/// Result of a successful session.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Test cases in generation order.
    pub test_cases: Vec<TestCase>,
    pub stats: SuiteStats,
    /// Wall-clock seconds spent enumerating and generating.
    pub elapsed_secs: f64,
}

impl GenerationReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse, compile and generate from a JSON model.
pub fn generate_from_json(
    json: &str,
    config: &GenerationConfig,
) -> Result<GenerationReport, SessionError> {
    check_model_size(&config.limits, json.len())?;
    let spec = parse_model(json)?;
    let model = Model::from_spec(&spec)?;
    generate(&model, config)
}

/// Generate a suite for an already compiled model.
pub fn generate(model: &Model, config: &GenerationConfig) -> Result<GenerationReport, SessionError> {
    let checker = LimitChecker::new(config.limits.clone());
    let mut generator = TestSuiteGenerator::new(model, config.generator_options())?;

    while !generator.is_exhausted() {
        if let Err(exceeded) = checker.check(generator.test_cases().len()) {
            warn!(
                %exceeded,
                test_cases = generator.test_cases().len(),
                remaining = generator.suite().total_uncovered(),
                "aborting generation"
            );
            return Err(exceeded.into());
        }
        if generator.next_test_case()?.is_none() {
            break;
        }
    }

    let elapsed_secs = checker.elapsed_secs();
    let suite = generator.into_test_suite();
    info!(
        test_cases = suite.test_cases.len(),
        elapsed_secs, "generation session complete"
    );
    Ok(GenerationReport {
        test_cases: suite.test_cases,
        stats: suite.stats,
        elapsed_secs,
    })
}
