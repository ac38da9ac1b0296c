//! Schema inference engine - derive a structural schema from a bounded
//! sample of heterogeneous nested data.

pub mod infer;
pub mod types;

pub use infer::SchemaInferencer;
pub use types::{materialize, ColumnSchema, DataType};
