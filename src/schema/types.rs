//! Inferred schema types.

use serde::{Deserialize, Serialize};

/// The type of one column, as a closed set of variants.
///
/// `Enum` is never produced by inference; it exists for caller-supplied
/// overrides and source-provided schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Every sampled value was null or empty; promoted to `String` at
    /// materialization, never legal as a terminal type.
    Null,
    String,
    Boolean,
    Integer,
    Number,
    /// Nested object with its own column schemas.
    Record(Vec<ColumnSchema>),
    /// Homogeneous list with an item type.
    Array(Box<DataType>),
    /// Closed symbol set.
    Enum(Vec<String>),
}

impl DataType {
    /// Replace terminal `Null` with `String`, recursively.
    pub fn materialize(self) -> Self {
        match self {
            DataType::Null => DataType::String,
            DataType::Record(columns) => {
                DataType::Record(columns.into_iter().map(ColumnSchema::materialize).collect())
            }
            DataType::Array(item) => DataType::Array(Box::new(item.materialize())),
            other => other,
        }
    }
}

/// One column of an inferred schema: name, nullability, type.
///
/// Append-only while a sample is being processed; immutable after - a
/// finalized schema is never revised by later records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub nullable: bool,
    pub data_type: DataType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, nullable: bool, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            nullable,
            data_type,
        }
    }

    /// Promote any terminal `Null` in this column to `String`.
    pub fn materialize(self) -> Self {
        Self {
            data_type: self.data_type.materialize(),
            ..self
        }
    }
}

/// Materialize a whole schema: no column keeps the `Null` type.
pub fn materialize(columns: Vec<ColumnSchema>) -> Vec<ColumnSchema> {
    columns.into_iter().map(ColumnSchema::materialize).collect()
}
