pub mod constraint;
pub mod domain;
pub mod model;
pub mod predicate;
pub mod priority;
pub mod scheme;
pub mod validate;

pub use constraint::{ConstraintError, ConstraintEvaluator, ParamLookup};
pub use domain::{DomainError, DomainRegistry};
pub use model::{CompileError, Model, ModelBuilder};
pub use predicate::{Bindings, ConstraintKind, EvalError, Evaluate, Predicate};
pub use priority::{PriorityAggregation, PriorityKeyError, PriorityTable, PriorityTarget};
pub use scheme::{compile_scheme, reduce_schemes, SchemeError, SlotScheme};
pub use validate::ValidationError;
