//! Liveness predicate.
//!
//! # Invariants
//! - Pure: depends only on its arguments, safe on unsaved data.
//! - Both date bounds are inclusive.
//! - `filter::Visibility::Live` compiles exactly this rule to SQL.

use crate::model::status::{AllowedStatuses, Status};
use chrono::NaiveDate;

/// Returns whether content with the given publication fields is publicly
/// visible on `today`.
pub fn is_live(
    status: &Status,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    allowed: &AllowedStatuses,
    today: NaiveDate,
) -> bool {
    if !allowed.contains(status) {
        return false;
    }
    if start.is_some_and(|start| start > today) {
        return false;
    }
    if end.is_some_and(|end| end < today) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::is_live;
    use crate::model::status::{AllowedStatuses, Status};
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn published_without_dates_is_live() {
        let today = day(2024, 6, 1);
        assert!(is_live(
            &Status::published(),
            None,
            None,
            &AllowedStatuses::published(),
            today
        ));
    }

    #[test]
    fn future_start_is_not_live() {
        let today = day(2024, 6, 1);
        assert!(!is_live(
            &Status::published(),
            Some(day(2999, 1, 1)),
            None,
            &AllowedStatuses::published(),
            today
        ));
    }

    #[test]
    fn past_end_is_not_live() {
        let today = day(2024, 6, 1);
        assert!(!is_live(
            &Status::published(),
            None,
            Some(day(1901, 1, 1)),
            &AllowedStatuses::published(),
            today
        ));
    }

    #[test]
    fn bounds_are_inclusive() {
        let today = day(2024, 6, 1);
        assert!(is_live(
            &Status::published(),
            Some(today),
            Some(today),
            &AllowedStatuses::published(),
            today
        ));
    }

    #[test]
    fn status_must_be_in_allowed_set() {
        let today = day(2024, 6, 1);
        let archived = Status::parse("archived").unwrap();
        assert!(!is_live(
            &archived,
            None,
            None,
            &AllowedStatuses::published(),
            today
        ));
        assert!(is_live(
            &archived,
            None,
            None,
            &AllowedStatuses::new(["archived"]).unwrap(),
            today
        ));
        assert!(!is_live(
            &Status::draft(),
            None,
            None,
            &AllowedStatuses::published(),
            today
        ));
    }

    fn status_strategy() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::draft()),
            Just(Status::published()),
            Just(Status::parse("archived").unwrap()),
        ]
    }

    fn offset_strategy() -> impl Strategy<Value = Option<i64>> {
        prop::option::of(-3i64..=3)
    }

    fn shift(today: NaiveDate, offset: Option<i64>) -> Option<NaiveDate> {
        offset.map(|delta| {
            if delta >= 0 {
                today + Days::new(delta as u64)
            } else {
                today - Days::new(delta.unsigned_abs())
            }
        })
    }

    proptest! {
        #[test]
        fn matches_truth_table(
            status in status_strategy(),
            start_offset in offset_strategy(),
            end_offset in offset_strategy(),
            allow_archived in any::<bool>(),
        ) {
            let today = day(2024, 6, 1);
            let start = shift(today, start_offset);
            let end = shift(today, end_offset);
            let allowed = if allow_archived {
                AllowedStatuses::new(["published", "archived"]).unwrap()
            } else {
                AllowedStatuses::published()
            };

            let expected = allowed.contains(&status)
                && start_offset.map_or(true, |delta| delta <= 0)
                && end_offset.map_or(true, |delta| delta >= 0);
            prop_assert_eq!(is_live(&status, start, end, &allowed, today), expected);
        }
    }
}
