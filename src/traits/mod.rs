//! Core trait abstractions (Source, StreamProcessor).

pub mod processor;
pub mod source;

pub use processor::{ProcessorRegistry, StreamProcessor};
pub use source::{Source, SourceStatus};
