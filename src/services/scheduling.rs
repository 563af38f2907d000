use crate::models::{Interval, Slot, Timed};

/// Returns the first existing item whose interval overlaps `candidate`.
///
/// Intervals are half-open, so an item ending exactly where the candidate
/// starts (or starting where it ends) is not a conflict.
pub fn find_conflict<'a, T: Timed>(candidate: &Interval, existing: &'a [T]) -> Option<&'a T> {
    existing
        .iter()
        .find(|item| candidate.overlaps(&item.interval()))
}

/// Free time left in each window once the busy intervals are removed.
///
/// Windows are processed independently and in start order; bookings may be
/// given in any order. Segments shorter than `min_minutes` are dropped.
pub fn free_slots<W: Timed, B: Timed>(
    windows: &[W],
    busy: &[B],
    min_minutes: Option<i64>,
) -> Vec<Slot> {
    let mut windows: Vec<Interval> = windows.iter().map(Timed::interval).collect();
    windows.sort_by_key(|w| w.start);

    let mut busy: Vec<Interval> = busy.iter().map(Timed::interval).collect();
    busy.sort_by_key(|b| b.start);

    windows
        .into_iter()
        .flat_map(|window| subtract(window, &busy))
        .map(Slot::from)
        .filter(|slot| min_minutes.map_or(true, |min| slot.duration_minutes >= min))
        .collect()
}

/// `busy` must be sorted by start.
fn subtract(window: Interval, busy: &[Interval]) -> Vec<Interval> {
    let mut free = vec![];
    let mut cursor = window.start;

    for booking in busy.iter().filter(|b| b.overlaps(&window)) {
        if let Some(gap) = Interval::new(cursor, booking.start) {
            free.push(gap);
        }
        cursor = cursor.max(booking.end);
    }

    if let Some(tail) = Interval::new(cursor, window.end) {
        free.push(tail);
    }

    free
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interval::parse_datetime;

    fn iv(start: &str, end: &str) -> Interval {
        Interval::new(
            parse_datetime(&format!("2030-12-15T{start}:00Z")).unwrap(),
            parse_datetime(&format!("2030-12-15T{end}:00Z")).unwrap(),
        )
        .unwrap()
    }

    fn spans(slots: &[Slot]) -> Vec<(String, String, i64)> {
        slots
            .iter()
            .map(|s| {
                (
                    s.start.format("%H:%M").to_string(),
                    s.end.format("%H:%M").to_string(),
                    s.duration_minutes,
                )
            })
            .collect()
    }

    fn owned(v: &[(&str, &str, i64)]) -> Vec<(String, String, i64)> {
        v.iter()
            .map(|(a, b, d)| (a.to_string(), b.to_string(), *d))
            .collect()
    }

    #[test]
    fn test_window_without_bookings_is_one_slot() {
        let slots = free_slots(&[iv("08:00", "12:00")], &[] as &[Interval], None);
        assert_eq!(spans(&slots), owned(&[("08:00", "12:00", 240)]));
    }

    #[test]
    fn test_booking_in_the_middle_splits_window() {
        let slots = free_slots(&[iv("08:00", "12:00")], &[iv("09:00", "10:00")], None);
        assert_eq!(
            spans(&slots),
            owned(&[("08:00", "09:00", 60), ("10:00", "12:00", 120)])
        );
    }

    #[test]
    fn test_unsorted_and_overlapping_bookings() {
        let bookings = [
            iv("10:30", "11:00"),
            iv("08:30", "09:30"),
            iv("09:00", "10:00"),
        ];
        let slots = free_slots(&[iv("08:00", "12:00")], &bookings, None);
        assert_eq!(
            spans(&slots),
            owned(&[
                ("08:00", "08:30", 30),
                ("10:00", "10:30", 30),
                ("11:00", "12:00", 60)
            ])
        );
    }

    #[test]
    fn test_back_to_back_bookings_leave_no_empty_segment() {
        let bookings = [iv("09:00", "10:00"), iv("10:00", "11:00")];
        let slots = free_slots(&[iv("09:00", "11:00")], &bookings, None);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_bookings_spilling_over_window_edges() {
        let bookings = [iv("07:00", "08:30"), iv("11:30", "13:00")];
        let slots = free_slots(&[iv("08:00", "12:00")], &bookings, None);
        assert_eq!(spans(&slots), owned(&[("08:30", "11:30", 180)]));
    }

    #[test]
    fn test_bookings_outside_window_are_ignored() {
        let bookings = [iv("06:00", "08:00"), iv("12:00", "13:00")];
        let slots = free_slots(&[iv("08:00", "12:00")], &bookings, None);
        assert_eq!(spans(&slots), owned(&[("08:00", "12:00", 240)]));
    }

    #[test]
    fn test_windows_processed_independently_in_order() {
        let windows = [iv("13:00", "15:00"), iv("08:00", "10:00")];
        let bookings = [iv("09:00", "14:00")];
        let slots = free_slots(&windows, &bookings, None);
        assert_eq!(
            spans(&slots),
            owned(&[("08:00", "09:00", 60), ("14:00", "15:00", 60)])
        );
    }

    #[test]
    fn test_minimum_duration_filter() {
        let bookings = [iv("08:30", "09:00"), iv("10:00", "11:45")];
        let slots = free_slots(&[iv("08:00", "12:00")], &bookings, Some(45));
        assert_eq!(spans(&slots), owned(&[("09:00", "10:00", 60)]));
    }

    #[test]
    fn test_fully_booked_window() {
        let slots = free_slots(&[iv("08:00", "09:00")], &[iv("07:00", "10:00")], None);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_find_conflict_reports_first_overlap() {
        let existing = [iv("08:00", "09:00"), iv("09:30", "10:30"), iv("10:00", "11:00")];
        let hit = find_conflict(&iv("10:15", "10:45"), &existing).unwrap();
        assert_eq!(*hit, existing[1]);
    }

    #[test]
    fn test_find_conflict_allows_touching() {
        let existing = [iv("09:00", "10:00")];
        assert!(find_conflict(&iv("10:00", "11:00"), &existing).is_none());
        assert!(find_conflict(&iv("08:00", "09:00"), &existing).is_none());
        assert!(find_conflict(&iv("08:00", "09:01"), &existing).is_some());
    }

    #[test]
    fn test_seconds_in_input_never_yield_empty_minutes() {
        let booking = Interval::new(
            parse_datetime("2030-12-15T08:00:30Z").unwrap(),
            parse_datetime("2030-12-15T09:00:30Z").unwrap(),
        )
        .unwrap();
        let slots = free_slots(&[iv("08:00", "12:00")], &[booking], None);
        assert_eq!(spans(&slots), owned(&[("09:00", "12:00", 180)]));
        assert!(slots.iter().all(|s| s.duration_minutes > 0));
    }
}
