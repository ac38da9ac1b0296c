//! Source-Agnostic Incremental Extraction Engine
//!
//! A general-purpose engine for incrementally extracting paginated
//! datasets from remote sources (HTTP APIs, file systems, queues) and
//! delivering them as typed pages to a downstream pipeline.
//!
//! # Design Philosophy
//!
//! **"Orchestrate, don't own the wire"**
//!
//! - The engine plans work units, drives pagination, and infers schemas
//! - Sources, decoders, and schedulers stay behind explicit seams
//! - One work unit, one extractor instance, no shared mutable state
//! - Failures surface as work-unit-level errors; re-run policy belongs
//!   to the host scheduler
//!
//! # Usage
//!
//! ```rust,ignore
//! use extraction_engine::{plan, PartitionPolicy, WatermarkRange};
//! use extraction_engine::{ExtractorConfig, WorkUnitExtractor};
//!
//! // Plan once per job.
//! let watermark = WatermarkRange::Datetime {
//!     name: "updated_at".into(),
//!     low: "2020-01-01".into(),
//!     high: "-".into(),
//!     zone: "UTC".into(),
//! }
//! .resolve()?;
//! let units = plan(&watermark, &PartitionPolicy::Daily, true);
//!
//! // The host scheduler runs one extractor per work unit.
//! for unit in units {
//!     let mut extractor =
//!         WorkUnitExtractor::new(source(), unit, ExtractorConfig::new())?;
//!     while let Some(page) = extractor.next_page().await? {
//!         decode(page);
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! - [`planner`] - Split a watermark range into disjoint work units
//! - [`extractor`] - Per-work-unit pagination state machine
//! - [`schema`] - Structural schema inference over sampled records
//! - [`traits`] - Core seams (Source, StreamProcessor)
//! - [`processors`] - Built-in stream processors
//! - [`types`] - Watermarks, work units, declarative configuration
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod extractor;
pub mod planner;
pub mod processors;
pub mod schema;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractionError, ProcessorError, Result, SourceError, WatermarkError};
pub use extractor::{
    ExtractedPage, ExtractionReport, ExtractionSession, ParameterResolver, State,
    WorkUnitExtractor,
};
pub use planner::{plan, plan_datetime, plan_units, CompositeRange, Granularity, PartitionPolicy};
pub use schema::{materialize, ColumnSchema, DataType, SchemaInferencer};
pub use traits::{
    processor::{ProcessorRegistry, StreamProcessor},
    source::{Source, SourceStatus},
};
pub use types::{
    config::{ExtractorConfig, PaginationConfig, SessionConfig},
    watermark::{DatetimeRange, ResolvedWatermark, WatermarkRange, WatermarkValue},
    work_unit::WorkUnit,
};

// Re-export built-in processors
pub use processors::{GzipProcessor, IdentityProcessor};

// Re-export testing utilities
pub use testing::MockSource;
