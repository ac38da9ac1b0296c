//! Partition planner - split a watermark range into disjoint work units.
//!
//! Runs once per job. The host scheduler assigns each resulting
//! [`WorkUnit`] to one extraction instance; units from a single plan are
//! contiguous and non-overlapping.

pub mod policy;

use tracing::{debug, warn};

use crate::types::watermark::{DatetimeRange, ResolvedWatermark, WatermarkValue};
use crate::types::work_unit::WorkUnit;

pub use policy::{CompositeRange, Granularity, PartitionPolicy};

/// Split a resolved watermark into ordered work units.
///
/// Discrete (unit) watermarks ignore the policy: each value becomes its
/// own single-value work unit.
pub fn plan(
    watermark: &ResolvedWatermark,
    policy: &PartitionPolicy,
    allow_partial_last: bool,
) -> Vec<WorkUnit> {
    match watermark {
        ResolvedWatermark::Datetime(range) => plan_datetime(*range, policy, allow_partial_last),
        ResolvedWatermark::Unit(values) => plan_units(values),
    }
}

/// Split a date-time range `[from, to)` under a partition policy.
///
/// With `allow_partial_last` the union of the units equals the range
/// exactly; without it the tail short of one full interval is dropped.
pub fn plan_datetime(
    range: DatetimeRange,
    policy: &PartitionPolicy,
    allow_partial_last: bool,
) -> Vec<WorkUnit> {
    if range.from >= range.to {
        return Vec::new();
    }

    let mut units = Vec::new();
    match policy {
        PartitionPolicy::None => {
            units.push(datetime_unit(range.from, range.to, 0));
        }
        PartitionPolicy::Composite(sub_ranges) => {
            plan_composite(range, sub_ranges, allow_partial_last, &mut units);
        }
        simple => {
            // granularity() is Some for every remaining variant
            let Some(granularity) = simple.granularity() else {
                return units;
            };
            let mut current = range.from;
            while current < range.to {
                let Some(next) = granularity.advance(current) else {
                    break;
                };
                if next <= range.to {
                    units.push(datetime_unit(current, next, units.len()));
                } else if allow_partial_last {
                    units.push(datetime_unit(current, range.to, units.len()));
                }
                current = next;
            }
        }
    }

    debug!(
        units = units.len(),
        from = %range.from,
        to = %range.to,
        "planned work units"
    );
    units
}

/// Each discrete value becomes its own one-element work unit.
pub fn plan_units(values: &[String]) -> Vec<WorkUnit> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            WorkUnit::new(
                WatermarkValue::Unit(value.clone()),
                WatermarkValue::Unit(value.clone()),
                index,
            )
        })
        .collect()
}

/// Composite planning: delegate each advance to the sub-range holding the
/// cursor.
///
/// The step start is clamped to `max(cursor, sub.start)` so a dropped
/// partial tail in one sub-range cannot make the next sub-range silently
/// skip the gap. A cursor no registered sub-range contains stops planning
/// early: coverage is truncated, not errored, and callers are expected to
/// verify coverage externally.
fn plan_composite(
    range: DatetimeRange,
    sub_ranges: &[CompositeRange],
    allow_partial_last: bool,
    units: &mut Vec<WorkUnit>,
) {
    let mut cursor = range.from;
    while cursor < range.to {
        let Some(sub) = sub_ranges
            .iter()
            .find(|sub| sub.contains(cursor) && sub.end <= range.to)
        else {
            warn!(
                cursor = %cursor,
                to = %range.to,
                "no composite sub-range covers cursor; truncating plan"
            );
            break;
        };

        let start = cursor.max(sub.start);
        let Some(next) = sub.granularity.advance(start) else {
            break;
        };
        if next <= range.to {
            units.push(datetime_unit(start, next, units.len()));
        } else if allow_partial_last {
            units.push(datetime_unit(start, range.to, units.len()));
        }
        cursor = next;
    }
}

fn datetime_unit(
    low: chrono::DateTime<chrono::Utc>,
    high: chrono::DateTime<chrono::Utc>,
    index: usize,
) -> WorkUnit {
    WorkUnit::new(
        WatermarkValue::Datetime(low),
        WatermarkValue::Datetime(high),
        index,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn range(from: &str, to: &str) -> DatetimeRange {
        DatetimeRange::new(utc(from), utc(to))
    }

    fn bounds(unit: &WorkUnit) -> (DateTime<Utc>, DateTime<Utc>) {
        match (unit.low(), unit.high()) {
            (WatermarkValue::Datetime(low), WatermarkValue::Datetime(high)) => (*low, *high),
            _ => panic!("expected datetime bounds"),
        }
    }

    #[test]
    fn daily_exact_fit() {
        let units = plan_datetime(
            range("2020-01-01T00:00:00Z", "2020-01-04T00:00:00Z"),
            &PartitionPolicy::Daily,
            false,
        );

        assert_eq!(units.len(), 3);
        assert_eq!(
            bounds(&units[0]),
            (utc("2020-01-01T00:00:00Z"), utc("2020-01-02T00:00:00Z"))
        );
        assert_eq!(
            bounds(&units[1]),
            (utc("2020-01-02T00:00:00Z"), utc("2020-01-03T00:00:00Z"))
        );
        assert_eq!(
            bounds(&units[2]),
            (utc("2020-01-03T00:00:00Z"), utc("2020-01-04T00:00:00Z"))
        );
    }

    #[test]
    fn partial_tail_dropped_without_flag() {
        let units = plan_datetime(
            range("2020-01-01T00:00:00Z", "2020-01-03T12:00:00Z"),
            &PartitionPolicy::Daily,
            false,
        );
        assert_eq!(units.len(), 2);
        assert_eq!(bounds(&units[1]).1, utc("2020-01-03T00:00:00Z"));
    }

    #[test]
    fn partial_tail_emitted_with_flag() {
        let units = plan_datetime(
            range("2020-01-01T00:00:00Z", "2020-01-03T12:00:00Z"),
            &PartitionPolicy::Daily,
            true,
        );
        assert_eq!(units.len(), 3);
        assert_eq!(bounds(&units[2]).1, utc("2020-01-03T12:00:00Z"));
    }

    #[test]
    fn none_policy_single_unit() {
        let units = plan_datetime(
            range("2020-01-01T00:00:00Z", "2020-03-01T00:00:00Z"),
            &PartitionPolicy::None,
            false,
        );
        assert_eq!(units.len(), 1);
        assert_eq!(
            bounds(&units[0]),
            (utc("2020-01-01T00:00:00Z"), utc("2020-03-01T00:00:00Z"))
        );
    }

    #[test]
    fn empty_range_plans_nothing() {
        let units = plan_datetime(
            range("2020-01-02T00:00:00Z", "2020-01-02T00:00:00Z"),
            &PartitionPolicy::Daily,
            true,
        );
        assert!(units.is_empty());
    }

    #[test]
    fn unit_values_one_each() {
        let units = plan_units(&["us".to_string(), "eu".to_string(), "apac".to_string()]);
        assert_eq!(units.len(), 3);
        assert_eq!(units[1].low(), &WatermarkValue::Unit("eu".to_string()));
        assert_eq!(units[1].high(), &WatermarkValue::Unit("eu".to_string()));
        assert_eq!(units[2].index(), 2);
    }

    #[test]
    fn composite_tiles_across_granularities() {
        // One week hourly backfill, then daily for the rest of the month.
        let sub_ranges = vec![
            CompositeRange::new(
                utc("2020-01-01T00:00:00Z"),
                utc("2020-01-08T00:00:00Z"),
                Granularity::Hourly,
            ),
            CompositeRange::new(
                utc("2020-01-08T00:00:00Z"),
                utc("2020-02-01T00:00:00Z"),
                Granularity::Daily,
            ),
        ];
        let units = plan_datetime(
            range("2020-01-01T00:00:00Z", "2020-02-01T00:00:00Z"),
            &PartitionPolicy::Composite(sub_ranges),
            true,
        );

        // 7 days hourly + 24 days daily.
        assert_eq!(units.len(), 7 * 24 + 24);

        // Exact tiling: each unit starts where the previous ended.
        let mut expected_start = utc("2020-01-01T00:00:00Z");
        for unit in &units {
            let (low, high) = bounds(unit);
            assert_eq!(low, expected_start);
            expected_start = high;
        }
        assert_eq!(expected_start, utc("2020-02-01T00:00:00Z"));
    }

    #[test]
    fn composite_gap_truncates_plan() {
        // Sub-ranges leave [01-05, 01-10) uncovered.
        let sub_ranges = vec![
            CompositeRange::new(
                utc("2020-01-01T00:00:00Z"),
                utc("2020-01-05T00:00:00Z"),
                Granularity::Daily,
            ),
            CompositeRange::new(
                utc("2020-01-10T00:00:00Z"),
                utc("2020-01-15T00:00:00Z"),
                Granularity::Daily,
            ),
        ];
        let units = plan_datetime(
            range("2020-01-01T00:00:00Z", "2020-01-15T00:00:00Z"),
            &PartitionPolicy::Composite(sub_ranges),
            true,
        );

        // Planning stops at the gap instead of erroring.
        assert_eq!(units.len(), 4);
        assert_eq!(bounds(&units[3]).1, utc("2020-01-05T00:00:00Z"));
    }

    #[test]
    fn composite_sub_range_beyond_parent_ignored() {
        let sub_ranges = vec![CompositeRange::new(
            utc("2020-01-01T00:00:00Z"),
            utc("2020-02-01T00:00:00Z"),
            Granularity::Daily,
        )];
        // Parent ends before the sub-range does, so it never qualifies.
        let units = plan_datetime(
            range("2020-01-01T00:00:00Z", "2020-01-10T00:00:00Z"),
            &PartitionPolicy::Composite(sub_ranges),
            true,
        );
        assert!(units.is_empty());
    }

    proptest! {
        /// Planned units are contiguous, and with `allow_partial_last`
        /// their union is exactly the range.
        #[test]
        fn simple_plans_are_contiguous(
            start_offset_h in 0i64..2_000,
            span_h in 1i64..2_000,
            policy_idx in 0usize..3,
            allow_partial in proptest::bool::ANY,
        ) {
            let policy = [
                PartitionPolicy::Hourly,
                PartitionPolicy::Daily,
                PartitionPolicy::Weekly,
            ][policy_idx].clone();

            let from = utc("2020-01-01T00:00:00Z") + Duration::hours(start_offset_h);
            let to = from + Duration::hours(span_h);
            let units = plan_datetime(DatetimeRange::new(from, to), &policy, allow_partial);

            let mut cursor = from;
            for unit in &units {
                let (low, high) = bounds(unit);
                prop_assert_eq!(low, cursor, "units must be contiguous");
                prop_assert!(high > low);
                prop_assert!(high <= to);
                cursor = high;
            }

            if allow_partial {
                prop_assert_eq!(cursor, to, "partial-last plans cover the range");
            } else {
                // May fall short only at the tail, by less than one interval.
                let interval = policy.granularity().unwrap().advance(cursor).unwrap() - cursor;
                prop_assert!(to - cursor < interval);
            }
        }
    }
}
