//! Core data types: watermarks, work units, and declarative configuration.

pub mod config;
pub mod watermark;
pub mod work_unit;

pub use config::{ExtractorConfig, PaginationConfig, SessionConfig};
pub use watermark::{DatetimeRange, ResolvedWatermark, WatermarkRange, WatermarkValue};
pub use work_unit::WorkUnit;
