//! Slot availability for a location.
//!
//! A day is split into half-hour slots; the first starts at 07:00 and the
//! last at 21:30. A slot label `t` covers `[t, t + 30min)`. Only approved
//! bookings and the weekly blackout windows make a slot unavailable.

use crate::infrastructure::entities::{Booking, BookingStatus};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const SLOT_MINUTES: i64 = 30;
pub const MAX_RANGE_DAYS: i64 = 31;

const FIRST_SLOT_MINUTE: u32 = 7 * 60;
const DAY_END_MINUTE: u32 = 22 * 60;

pub fn slot_length() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// The fixed slot labels of a day, in ascending order.
pub fn day_slots() -> Vec<NaiveTime> {
    (FIRST_SLOT_MINUTE..DAY_END_MINUTE)
        .step_by(SLOT_MINUTES as usize)
        .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
        .collect()
}

pub fn is_slot_label(time: NaiveTime) -> bool {
    day_slots().contains(&time)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Interval {
    fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Calendar days the half-open interval touches.
    fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = (self.end - Duration::nanoseconds(1)).date();
        self.start
            .date()
            .iter_days()
            .take_while(move |day| *day <= last)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlackoutParseError {
    #[error("expected `Day HH:MM-HH:MM`, got `{0}`")]
    Format(String),

    #[error("unknown weekday `{0}`")]
    Weekday(String),

    #[error("invalid time `{0}`")]
    Time(String),

    #[error("window `{0}` ends before it starts")]
    Empty(String),
}

/// A recurring weekly window during which nothing can be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlackoutWindow {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BlackoutWindow {
    fn on(&self, day: NaiveDate) -> Option<Interval> {
        (day.weekday() == self.weekday).then(|| Interval {
            start: day.and_time(self.start),
            end: day.and_time(self.end),
        })
    }

    /// Parses a `;`-separated list such as `Mon 07:00-08:00;Fri 18:00-22:00`.
    pub fn parse_list(list: &str) -> Result<Vec<BlackoutWindow>, BlackoutParseError> {
        list.split(';')
            .map(str::trim)
            .filter(|window| !window.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for BlackoutWindow {
    type Err = BlackoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, times) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| BlackoutParseError::Format(s.to_owned()))?;
        let (start, end) = times
            .trim()
            .split_once('-')
            .ok_or_else(|| BlackoutParseError::Format(s.to_owned()))?;

        let weekday = day
            .parse::<Weekday>()
            .map_err(|_| BlackoutParseError::Weekday(day.to_owned()))?;
        let parse_time = |time: &str| {
            NaiveTime::parse_from_str(time.trim(), "%H:%M")
                .map_err(|_| BlackoutParseError::Time(time.trim().to_owned()))
        };
        let (start, end) = (parse_time(start)?, parse_time(end)?);

        if end <= start {
            return Err(BlackoutParseError::Empty(s.to_owned()));
        }

        Ok(BlackoutWindow {
            weekday,
            start,
            end,
        })
    }
}

impl fmt::Display for BlackoutWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.weekday,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("range start {from} is after its end {to}")]
    Reversed { from: NaiveDate, to: NaiveDate },

    #[error("range spans more than {} days", MAX_RANGE_DAYS)]
    TooLong,
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<DateRange, DateRangeError> {
        if from > to {
            return Err(DateRangeError::Reversed { from, to });
        }
        if (to - from).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(DateRangeError::TooLong);
        }

        Ok(DateRange { from, to })
    }

    pub fn single(day: NaiveDate) -> DateRange {
        DateRange { from: day, to: day }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |day| *day <= to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotState {
    pub time: NaiveTime,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub slots: Vec<SlotState>,
}

/// Availability of one location, built from its bookings and the blackout
/// windows.
#[derive(Debug, Clone)]
pub struct SlotFilter {
    booked: Vec<Interval>,
    blackouts: Vec<BlackoutWindow>,
}

impl SlotFilter {
    /// Bookings that are not approved are ignored.
    pub fn new<'a>(
        bookings: impl IntoIterator<Item = &'a Booking>,
        blackouts: &[BlackoutWindow],
    ) -> SlotFilter {
        SlotFilter {
            booked: bookings
                .into_iter()
                .filter(|booking| booking.status == BookingStatus::Approved)
                .map(|booking| Interval {
                    start: booking.start_time,
                    end: booking.end_time,
                })
                .collect(),
            blackouts: blackouts.to_vec(),
        }
    }

    fn blocks(&self, interval: &Interval) -> bool {
        self.booked.iter().any(|booked| booked.overlaps(interval))
            || interval.days().any(|day| {
                self.blackouts
                    .iter()
                    .filter_map(|window| window.on(day))
                    .any(|window| window.overlaps(interval))
            })
    }

    pub fn is_slot_disabled(&self, day: NaiveDate, slot: NaiveTime) -> bool {
        let start = day.and_time(slot);
        self.blocks(&Interval {
            start,
            end: start + slot_length(),
        })
    }

    /// A slot is free over a range only when it is free on every day of it.
    pub fn is_free_over(&self, range: &DateRange, slot: NaiveTime) -> bool {
        range.days().all(|day| !self.is_slot_disabled(day, slot))
    }

    pub fn disabled_slots(&self, range: &DateRange) -> Vec<DaySlots> {
        let slots = day_slots();

        range
            .days()
            .map(|date| DaySlots {
                date,
                slots: slots
                    .iter()
                    .map(|&time| SlotState {
                        time,
                        disabled: self.is_slot_disabled(date, time),
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn start_options(&self, range: &DateRange) -> Vec<NaiveTime> {
        day_slots()
            .into_iter()
            .filter(|slot| self.is_free_over(range, *slot))
            .collect()
    }

    /// End labels selectable for `start`: every label after it, up to but
    /// excluding the first one whose preceding half hour is blocked on any
    /// day of the range.
    pub fn end_options(&self, range: &DateRange, start: NaiveTime) -> Vec<NaiveTime> {
        let mut options = Vec::new();

        for end in day_slots().into_iter().filter(|slot| *slot > start) {
            let preceding = (end - slot_length()).max(start);
            if !self.is_free_over(range, preceding) {
                break;
            }
            options.push(end);
        }

        options
    }

    /// Whether `[start, end)` overlaps an approved booking or a blackout
    /// window on any day it touches.
    pub fn conflicts(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.blocks(&Interval { start, end })
    }
}
