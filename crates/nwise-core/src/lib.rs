pub mod config;
pub mod limits;
pub mod logging;
pub mod session;

pub use config::GenerationConfig;
pub use limits::{GenerationLimits, LimitExceeded};
pub use session::{generate, generate_from_json, GenerationReport, SessionError};
