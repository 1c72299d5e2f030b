pub mod expr;
pub mod parse;
pub mod types;

pub use expr::{Expr, OpKind};
pub use parse::{parse_model, ParseError};
pub use types::{Assignment, ConstraintSet, ConstraintSpec, ModelSpec, SchemeNode, Value};
