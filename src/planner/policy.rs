//! Partition policies and their advance steps.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// A pure advance step for date-time partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    /// The instant one interval after `start`.
    ///
    /// `None` only on date arithmetic overflow, which the planner treats
    /// as end of planning.
    pub fn advance(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Granularity::Hourly => start.checked_add_signed(Duration::hours(1)),
            Granularity::Daily => start.checked_add_signed(Duration::days(1)),
            Granularity::Weekly => start.checked_add_signed(Duration::weeks(1)),
            Granularity::Monthly => start.checked_add_months(Months::new(1)),
            Granularity::Yearly => start.checked_add_months(Months::new(12)),
        }
    }
}

/// How a watermark range is split into work units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionPolicy {
    /// One work unit covering the whole range.
    None,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Ordered sub-ranges, each advanced by its own granularity.
    ///
    /// Sub-ranges are expected to be sorted and to tile the parent range;
    /// malformed definitions are not validated eagerly - planning fails
    /// open by truncating coverage (callers verify coverage externally).
    Composite(Vec<CompositeRange>),
}

impl PartitionPolicy {
    /// The simple advance step, when this policy has one.
    pub fn granularity(&self) -> Option<Granularity> {
        match self {
            PartitionPolicy::Hourly => Some(Granularity::Hourly),
            PartitionPolicy::Daily => Some(Granularity::Daily),
            PartitionPolicy::Weekly => Some(Granularity::Weekly),
            PartitionPolicy::Monthly => Some(Granularity::Monthly),
            PartitionPolicy::Yearly => Some(Granularity::Yearly),
            PartitionPolicy::None | PartitionPolicy::Composite(_) => None,
        }
    }
}

/// One registered sub-range of a composite policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRange {
    /// Sub-range start (inclusive)
    pub start: DateTime<Utc>,
    /// Sub-range end (exclusive)
    pub end: DateTime<Utc>,
    /// Advance step inside this sub-range
    pub granularity: Granularity,
}

impl CompositeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, granularity: Granularity) -> Self {
        Self {
            start,
            end,
            granularity,
        }
    }

    /// Whether the cursor falls inside `[start, end)`.
    pub fn contains(&self, cursor: DateTime<Utc>) -> bool {
        cursor >= self.start && cursor < self.end
    }
}
