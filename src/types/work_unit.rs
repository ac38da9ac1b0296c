//! Work units: the bounded slices a planner hands to extraction instances.

use serde::{Deserialize, Serialize};

use crate::types::watermark::WatermarkValue;

/// One bounded sub-range assigned to a single extraction instance.
///
/// Created once by the planner and read-only thereafter; the per-cycle
/// mutable state lives in
/// [`ExtractionSession`](crate::extractor::ExtractionSession) instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnit {
    low: WatermarkValue,
    high: WatermarkValue,
    index: usize,
}

impl WorkUnit {
    /// Create a work unit covering `[low, high)`.
    pub fn new(low: WatermarkValue, high: WatermarkValue, index: usize) -> Self {
        Self { low, high, index }
    }

    /// Low watermark bound (inclusive).
    pub fn low(&self) -> &WatermarkValue {
        &self.low
    }

    /// High watermark bound (exclusive for date-time units).
    pub fn high(&self) -> &WatermarkValue {
        &self.high
    }

    /// Position of this unit in the planner's output.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl std::fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "work unit {} [{} .. {})", self.index, self.low, self.high)
    }
}
