// libs/doctor-cell/src/services/availability.rs
//
// Slot computation over a doctor's weekly window. Everything here is pure:
// callers pass in the window, the date, the granularity and the bookings.

use std::collections::BTreeSet;
use std::iter::FusedIterator;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::models::{AvailableSlot, SlotRequest, WeeklyAvailability};

/// Day of week with Sunday = 0 through Saturday = 6.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Whether the doctor's weekly window covers `date`. Handles windows that wrap the week.
pub fn is_date_served_by_doctor(availability: &WeeklyAvailability, date: NaiveDate) -> bool {
    let dow = day_of_week(date);
    let (from, to) = (availability.from_week_day(), availability.to_week_day());

    if from <= to {
        from <= dow && dow <= to
    } else {
        dow >= from || dow <= to
    }
}

/// Bookable slot starts on `request.date`, ascending.
///
/// Candidates run from `from_time` up to (excluding) `to_time` in steps of the
/// requested granularity. A candidate is dropped when an existing booking starts
/// in the same minute. Days the doctor does not work, and windows whose end is
/// not after their start, produce an empty sequence.
pub fn generate_slots<I>(
    availability: &WeeklyAvailability,
    request: &SlotRequest,
    existing_bookings: I,
) -> Slots
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let (start, end) = availability.window_on(request.date);
    let end = if is_date_served_by_doctor(availability, request.date) {
        end
    } else {
        start
    };

    Slots {
        cursor: start,
        end,
        step: request.granularity.as_duration(),
        booked: existing_bookings.into_iter().map(truncate_to_minute).collect(),
    }
}

fn truncate_to_minute(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(timestamp)
}

/// Lazy slot sequence returned by [`generate_slots`]. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Slots {
    cursor: NaiveDateTime,
    end: NaiveDateTime,
    step: Duration,
    booked: BTreeSet<NaiveDateTime>,
}

impl Iterator for Slots {
    type Item = AvailableSlot;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.end {
            let candidate = self.cursor;
            self.cursor = candidate.checked_add_signed(self.step).unwrap_or(self.end);

            if !self.booked.contains(&candidate) {
                return Some(AvailableSlot { start_time: candidate });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.cursor >= self.end {
            return (0, Some(0));
        }
        let remaining = (self.end - self.cursor).num_seconds().max(1);
        let step = self.step.num_seconds().max(1);
        let upper = ((remaining + step - 1) / step) as usize;
        (upper.saturating_sub(self.booked.len()), Some(upper))
    }
}

impl FusedIterator for Slots {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotGranularity;
    use chrono::NaiveTime;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window(from_day: i64, to_day: i64, from: NaiveTime, to: NaiveTime) -> WeeklyAvailability {
        WeeklyAvailability::new(from_day, to_day, from, to).unwrap()
    }

    // 2025-06-15 is a Sunday; the following days run Monday..Saturday.
    fn date_for_weekday(dow: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15 + dow).unwrap()
    }

    fn request(date: NaiveDate, minutes: i64) -> SlotRequest {
        SlotRequest::new(date, SlotGranularity::new(minutes).unwrap())
    }

    fn starts(slots: Slots) -> Vec<NaiveTime> {
        slots.map(|s| s.time()).collect()
    }

    #[test]
    fn test_day_of_week_counts_from_sunday() {
        assert_eq!(day_of_week(date_for_weekday(0)), 0);
        assert_eq!(day_of_week(date_for_weekday(3)), 3);
        assert_eq!(day_of_week(date_for_weekday(6)), 6);
    }

    #[test]
    fn test_non_wrap_window_is_inclusive_range() {
        let mon_to_fri = window(1, 5, time(9, 0), time(17, 0));

        for dow in 0..7 {
            let expected = (1..=5).contains(&dow);
            assert_eq!(
                is_date_served_by_doctor(&mon_to_fri, date_for_weekday(dow)),
                expected,
                "weekday {}",
                dow
            );
        }
    }

    #[test]
    fn test_wrap_window_spans_weekend() {
        let fri_to_mon = window(5, 1, time(9, 0), time(17, 0));

        for dow in [5, 6, 0, 1] {
            assert!(is_date_served_by_doctor(&fri_to_mon, date_for_weekday(dow)), "weekday {}", dow);
        }
        for dow in [2, 3, 4] {
            assert!(!is_date_served_by_doctor(&fri_to_mon, date_for_weekday(dow)), "weekday {}", dow);
        }
    }

    #[test]
    fn test_single_day_window() {
        let wednesdays = window(3, 3, time(9, 0), time(12, 0));
        assert!(is_date_served_by_doctor(&wednesdays, date_for_weekday(3)));
        assert!(!is_date_served_by_doctor(&wednesdays, date_for_weekday(4)));
    }

    #[test]
    fn test_slots_are_end_exclusive() {
        let availability = window(1, 5, time(8, 0), time(10, 0));
        let slots = generate_slots(&availability, &request(date_for_weekday(1), 30), Vec::new());

        assert_eq!(starts(slots), vec![time(8, 0), time(8, 30), time(9, 0), time(9, 30)]);
    }

    #[test]
    fn test_booked_slot_is_excluded() {
        let monday = date_for_weekday(1);
        let availability = window(1, 5, time(8, 0), time(10, 0));
        let bookings = vec![monday.and_time(time(9, 0))];

        let slots = generate_slots(&availability, &request(monday, 30), bookings);
        assert_eq!(starts(slots), vec![time(8, 0), time(8, 30), time(9, 30)]);
    }

    #[test]
    fn test_booking_matched_to_the_minute() {
        let monday = date_for_weekday(1);
        let availability = window(1, 5, time(8, 0), time(10, 0));
        let booking = monday.and_hms_opt(8, 30, 42).unwrap();

        let slots = generate_slots(&availability, &request(monday, 30), [booking]);
        assert_eq!(starts(slots), vec![time(8, 0), time(9, 0), time(9, 30)]);
    }

    #[test]
    fn test_booking_off_the_grid_does_not_remove_slots() {
        let monday = date_for_weekday(1);
        let availability = window(1, 5, time(8, 0), time(10, 0));
        let booking = monday.and_time(time(8, 15));

        let slots = generate_slots(&availability, &request(monday, 30), [booking]);
        assert_eq!(slots.count(), 4);
    }

    #[test]
    fn test_unserved_date_has_no_slots_regardless_of_bookings() {
        let saturday = date_for_weekday(6);
        let availability = window(1, 5, time(8, 0), time(10, 0));

        let slots = generate_slots(&availability, &request(saturday, 30), [saturday.and_time(time(8, 0))]);
        assert_eq!(slots.count(), 0);
    }

    #[test]
    fn test_degenerate_window_has_no_slots() {
        let monday = date_for_weekday(1);
        let equal = window(1, 5, time(9, 0), time(9, 0));
        let inverted = window(1, 5, time(17, 0), time(9, 0));

        assert_eq!(generate_slots(&equal, &request(monday, 30), Vec::new()).count(), 0);
        assert_eq!(generate_slots(&inverted, &request(monday, 30), Vec::new()).count(), 0);
    }

    #[test]
    fn test_granularity_not_dividing_window() {
        let monday = date_for_weekday(1);
        let availability = window(1, 5, time(8, 0), time(9, 0));

        let slots = generate_slots(&availability, &request(monday, 25), Vec::new());
        assert_eq!(starts(slots), vec![time(8, 0), time(8, 25), time(8, 50)]);
    }

    #[test]
    fn test_full_day_granularity_yields_window_start_only() {
        let monday = date_for_weekday(1);
        let availability = window(1, 5, time(8, 0), time(17, 0));

        let slots = generate_slots(&availability, &request(monday, 24 * 60), Vec::new());
        assert_eq!(slots.size_hint(), (1, Some(1)));
        assert_eq!(starts(slots), vec![time(8, 0)]);
    }

    #[test]
    fn test_generation_is_repeatable() {
        let monday = date_for_weekday(1);
        let availability = window(1, 5, time(8, 0), time(12, 0));
        let bookings = vec![monday.and_time(time(10, 0)), monday.and_time(time(8, 30))];
        let req = request(monday, 30);

        let first: Vec<_> = generate_slots(&availability, &req, bookings.clone()).collect();
        let second: Vec<_> = generate_slots(&availability, &req, bookings).collect();
        assert_eq!(first, second);

        let slots = generate_slots(&availability, &req, Vec::new());
        let restarted: Vec<_> = slots.clone().collect();
        assert_eq!(restarted, slots.collect::<Vec<_>>());
    }

    #[test]
    fn test_slots_ascend_and_stay_inside_window() {
        let sunday = date_for_weekday(0);
        let availability = window(5, 1, time(7, 45), time(13, 10));

        let slots: Vec<_> = generate_slots(&availability, &request(sunday, 20), Vec::new()).collect();
        assert!(!slots.is_empty());
        assert!(slots.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(slots.iter().all(|s| s.start_time.date() == sunday));
        assert!(slots.iter().all(|s| s.time() >= time(7, 45) && s.time() < time(13, 10)));
    }

    #[test]
    fn test_size_hint_bounds_the_count() {
        let monday = date_for_weekday(1);
        let availability = window(1, 5, time(8, 0), time(10, 0));
        let slots = generate_slots(&availability, &request(monday, 30), [monday.and_time(time(8, 0))]);

        let (lower, upper) = slots.size_hint();
        let count = slots.count();
        assert!(lower <= count);
        assert!(upper.map_or(true, |u| count <= u));
    }
}
