//! Extraction state machine - the per-work-unit protocol loop.

pub mod machine;
pub mod parameters;
pub mod session;

pub use machine::{ExtractedPage, ExtractionReport, State, WorkUnitExtractor};
pub use parameters::ParameterResolver;
pub use session::ExtractionSession;
