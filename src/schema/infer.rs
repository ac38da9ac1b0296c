//! Structural schema inference over a bounded sample of records.
//!
//! Pure and deterministic for a fixed sample and configuration: the same
//! sample always yields the same schema. The sample is pivoted into
//! per-key columns first, because any single record under-samples a
//! column's true nullability and type.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::ExtractionError;
use crate::schema::types::{ColumnSchema, DataType};

/// Column name produced for a sample with no usable records.
const UNKNOWN_COLUMN: &str = "unknown";

/// Schema inference engine.
///
/// Configuration is optional: name cleansing rewrites column names via a
/// regex/replacement pair, and per-column overrides short-circuit typing
/// for named columns. Values are never rewritten.
#[derive(Debug, Default)]
pub struct SchemaInferencer {
    cleanse: Option<CleanseRule>,
    overrides: IndexMap<String, DataType>,
}

#[derive(Debug)]
struct CleanseRule {
    pattern: Regex,
    replacement: String,
}

impl SchemaInferencer {
    /// Create an inferencer with no cleansing and no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite column names matching `pattern` with `replacement`.
    pub fn with_cleanse_rule(
        mut self,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, ExtractionError> {
        self.cleanse = Some(CleanseRule {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        });
        Ok(self)
    }

    /// Force a column (by cleansed name) to a fixed type.
    pub fn with_override(mut self, column: impl Into<String>, data_type: DataType) -> Self {
        self.overrides.insert(column.into(), data_type);
        self
    }

    /// Infer a column schema from a sample of records.
    ///
    /// An empty or object-free sample yields a single nullable `unknown`
    /// column of type `Null`.
    pub fn infer(&self, sample: &[Value]) -> Vec<ColumnSchema> {
        let columns = pivot(sample);
        if columns.is_empty() {
            return vec![ColumnSchema::new(UNKNOWN_COLUMN, true, DataType::Null)];
        }

        columns
            .into_iter()
            .map(|(raw_name, values)| {
                let name = self.cleanse_name(&raw_name);
                let nullable = values.iter().any(|v| is_empty_value(v));
                let data_type = match self.overrides.get(&name) {
                    Some(forced) => forced.clone(),
                    None => self.infer_type(&values),
                };
                ColumnSchema::new(name, nullable, data_type)
            })
            .collect()
    }

    /// Infer and promote terminal `Null` columns to `String`.
    pub fn infer_materialized(&self, sample: &[Value]) -> Vec<ColumnSchema> {
        crate::schema::types::materialize(self.infer(sample))
    }

    fn cleanse_name(&self, name: &str) -> String {
        match &self.cleanse {
            Some(rule) => rule
                .pattern
                .replace_all(name, rule.replacement.as_str())
                .into_owned(),
            None => name.to_string(),
        }
    }

    /// Type a pivoted column (or array-item set) of values.
    ///
    /// The first non-empty value picks the shape; mixed-type columns are
    /// not unioned. This is a known limitation carried on purpose rather
    /// than silently merged away.
    fn infer_type(&self, values: &[Value]) -> DataType {
        let Some(first) = values.iter().find(|v| !is_empty_value(v)) else {
            return DataType::Null;
        };

        match first {
            Value::Object(_) => {
                let objects: Vec<Value> = values
                    .iter()
                    .filter(|v| v.is_object())
                    .cloned()
                    .collect();
                DataType::Record(self.infer(&objects))
            }
            Value::Array(_) => {
                // Strip one level and type the concatenated inner elements.
                let items: Vec<Value> = values
                    .iter()
                    .filter_map(|v| v.as_array())
                    .flatten()
                    .cloned()
                    .collect();
                DataType::Array(Box::new(self.infer_type(&items)))
            }
            primitive => classify_primitive(primitive),
        }
    }
}

/// Regroup an array of objects into one value list per distinct key.
///
/// Keys keep first-seen order across the whole sample; an object lacking
/// a key contributes an explicit null placeholder so nullability is
/// visible downstream.
fn pivot(sample: &[Value]) -> IndexMap<String, Vec<Value>> {
    let objects: Vec<&serde_json::Map<String, Value>> =
        sample.iter().filter_map(|v| v.as_object()).collect();

    let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
    for object in &objects {
        for key in object.keys() {
            columns.entry(key.clone()).or_default();
        }
    }

    for object in &objects {
        for (key, values) in columns.iter_mut() {
            values.push(object.get(key).cloned().unwrap_or(Value::Null));
        }
    }

    columns
}

/// Primitive classification, in declared order: null, string, boolean,
/// integer, then number.
fn classify_primitive(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::String(_) => DataType::String,
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => DataType::Integer,
        Value::Number(_) => DataType::Number,
        // Containers are handled before classification.
        Value::Object(_) | Value::Array(_) => DataType::Null,
    }
}

/// Null placeholders for nullability: JSON null, `""`, `{}`, `[]`.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}
