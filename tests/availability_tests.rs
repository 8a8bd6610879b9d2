//! Slot filter properties over every single-booking layout of a day

use chrono::{NaiveDate, NaiveTime, Utc};
use coworking_booking_api::config::DEFAULT_BLACKOUT_WINDOWS;
use coworking_booking_api::core::availability::{
    BlackoutWindow, DateRange, SlotFilter, day_slots, slot_length,
};
use coworking_booking_api::infrastructure::entities::{Booking, BookingStatus};
use uuid::Uuid;

fn day() -> NaiveDate {
    // a Wednesday, outside the default blackout windows
    NaiveDate::from_ymd_opt(2026, 10, 21).unwrap()
}

fn approved(day: NaiveDate, start: NaiveTime, end: NaiveTime) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        location_id: Uuid::new_v4(),
        user_email: "someone@example.com".to_owned(),
        start_time: day.and_time(start),
        end_time: day.and_time(end),
        status: BookingStatus::Approved,
        department: String::new(),
        occasion: String::new(),
        created_at: Utc::now(),
    }
}

/// Every booking `[a, b)` with `a < b` on slot labels.
fn single_bookings() -> Vec<(NaiveTime, NaiveTime)> {
    let slots = day_slots();
    let mut layouts = Vec::new();

    for (i, &a) in slots.iter().enumerate() {
        for &b in &slots[i + 1..] {
            layouts.push((a, b));
        }
    }

    layouts
}

#[test]
fn test_end_options_never_conflict() {
    let range = DateRange::single(day());

    for (a, b) in single_bookings() {
        let bookings = [approved(day(), a, b)];
        let filter = SlotFilter::new(&bookings, &[]);

        for start in filter.start_options(&range) {
            for end in filter.end_options(&range, start) {
                assert!(
                    !filter.conflicts(day().and_time(start), day().and_time(end)),
                    "{start}-{end} offered around booking {a}-{b}"
                );
            }
        }
    }
}

#[test]
fn test_end_options_stop_at_first_blocked_slot() {
    let range = DateRange::single(day());
    let last_label = *day_slots().last().unwrap();

    for (a, b) in single_bookings() {
        let bookings = [approved(day(), a, b)];
        let filter = SlotFilter::new(&bookings, &[]);

        for start in filter.start_options(&range) {
            let options = filter.end_options(&range, start);
            let Some(&last) = options.last() else {
                continue;
            };

            // contiguous half hours from the start
            for (n, end) in options.iter().enumerate() {
                assert_eq!(*end, start + slot_length() * (n as i32 + 1));
            }

            if last < last_label {
                let next = last + slot_length();
                assert!(filter.conflicts(day().and_time(start), day().and_time(next)));
            }
        }
    }
}

#[test]
fn test_start_options_are_the_free_slots() {
    let range = DateRange::single(day());

    for (a, b) in single_bookings() {
        let bookings = [approved(day(), a, b)];
        let filter = SlotFilter::new(&bookings, &[]);
        let starts = filter.start_options(&range);

        for slot in day_slots() {
            let booked = slot >= a && slot < b;
            assert_eq!(starts.contains(&slot), !booked, "slot {slot} around {a}-{b}");
        }
    }
}

#[test]
fn test_multi_day_range_is_the_conjunction_of_its_days() {
    let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let friday = NaiveDate::from_ymd_opt(2026, 10, 23).unwrap();
    let week = DateRange::new(monday, friday).unwrap();
    let blackouts = BlackoutWindow::parse_list(DEFAULT_BLACKOUT_WINDOWS).unwrap();

    let time = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
    let bookings = [approved(day(), time(12, 0), time(13, 0))];
    let filter = SlotFilter::new(&bookings, &blackouts);

    let week_starts = filter.start_options(&week);
    let days = filter.disabled_slots(&week);
    assert_eq!(days.len(), 5);

    for slot in day_slots() {
        let free_every_day = days
            .iter()
            .all(|day| day.slots.iter().any(|s| s.time == slot && !s.disabled));
        assert_eq!(week_starts.contains(&slot), free_every_day, "slot {slot}");
    }

    // Monday morning blackout, Wednesday lunch booking, Friday evening blackout
    assert!(!week_starts.contains(&time(7, 0)));
    assert!(!week_starts.contains(&time(7, 30)));
    assert!(week_starts.contains(&time(8, 0)));
    assert!(!week_starts.contains(&time(12, 30)));
    assert!(!week_starts.contains(&time(18, 0)));
    assert!(week_starts.contains(&time(17, 30)));
}
