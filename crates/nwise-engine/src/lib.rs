pub mod generator;
pub mod slot;
pub mod stats;
pub mod suite;

pub use generator::{
    GenerateError, GeneratorOptions, TestCase, TestCasePhase, TestSuite, TestSuiteGenerator,
};
pub use slot::{Overlay, Slot, SlotId, SlotState, SlotView};
pub use stats::{SchemeStats, SuiteStats};
pub use suite::{SingleSchemeSlotSuite, SlotSuite, SuiteError};
