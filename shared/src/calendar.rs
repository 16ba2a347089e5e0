//! Calendar week grouping for the availability calendar.
//!
//! Turns an ascending list of slot start times into Monday-start weeks so the
//! booking calendar can render a uniform 7-column grid. Weeks without any
//! slot are still emitted (as empty "gap weeks") to keep the sequence
//! contiguous.
//!
//! All day arithmetic happens on the UTC calendar date of each timestamp, so
//! week boundaries never depend on the caller's local timezone.

use std::ops::Index;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Number of days in a calendar week.
pub const DAYS_IN_WEEK: usize = 7;

/// One calendar day and the slot start times that fall on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Day {
    /// UTC calendar date, used as grouping key and for display
    pub date: NaiveDate,
    /// Start times on this date, in input order
    pub times: Vec<DateTime<Utc>>,
}

impl Day {
    /// An empty day with no slots.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            times: Vec::new(),
        }
    }
}

/// Exactly seven days, Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Week([Day; DAYS_IN_WEEK]);

impl Week {
    /// The Monday this week starts on.
    pub fn monday(&self) -> &Day {
        &self.0[0]
    }

    /// The Sunday this week ends on.
    pub fn sunday(&self) -> &Day {
        &self.0[DAYS_IN_WEEK - 1]
    }

    pub fn days(&self) -> &[Day; DAYS_IN_WEEK] {
        &self.0
    }

    /// True when no day of the week holds a slot.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|day| day.times.is_empty())
    }

    /// Total number of slots across the week.
    pub fn slot_count(&self) -> usize {
        self.0.iter().map(|day| day.times.len()).sum()
    }
}

impl Index<usize> for Week {
    type Output = Day;

    fn index(&self, index: usize) -> &Day {
        &self.0[index]
    }
}

/// Contiguous weeks in ascending order.
pub type WeekSequence = Vec<Week>;

/// Shift a date by `n` days (negative moves backwards).
pub fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    date + Duration::days(n)
}

/// Shift a date by `n` weeks (negative moves backwards).
pub fn add_weeks(date: NaiveDate, n: i64) -> NaiveDate {
    add_days(date, 7 * n)
}

/// Weekday position with Monday = 0 and Sunday = 6.
pub fn weekday_position(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Monday of the week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    add_days(date, -(weekday_position(date) as i64))
}

/// Sunday of the (Monday-start) week containing `date`.
pub fn sunday_of(date: NaiveDate) -> NaiveDate {
    add_days(monday_of(date), (DAYS_IN_WEEK - 1) as i64)
}

/// Build the empty week containing `date`.
pub fn create_week(date: NaiveDate) -> Week {
    let monday = monday_of(date);
    Week(std::array::from_fn(|offset| {
        Day::empty(add_days(monday, offset as i64))
    }))
}

/// Empty weeks strictly between two Mondays, in chronological order.
///
/// Argument order does not matter. Identical or adjacent Mondays produce no
/// gap weeks.
pub fn create_gap_weeks(week_a: &Day, week_b: &Day) -> Vec<Week> {
    let (earlier, later) = if week_a.date > week_b.date {
        (week_b.date, week_a.date)
    } else {
        (week_a.date, week_b.date)
    };

    let mut gap_weeks = Vec::new();
    let mut next_monday = add_weeks(earlier, 1);
    while next_monday < later {
        gap_weeks.push(create_week(next_monday));
        next_monday = add_weeks(next_monday, 1);
    }

    gap_weeks
}

/// Group ascending timestamps into contiguous Monday-start weeks.
///
/// `ordered` must be sorted ascending. Unsorted input yields an unspecified
/// week layout; debug builds assert on it.
pub fn group_weeks(ordered: &[DateTime<Utc>]) -> WeekSequence {
    debug_assert!(
        ordered.windows(2).all(|pair| pair[0] <= pair[1]),
        "group_weeks requires ascending timestamps"
    );

    let mut weeks: WeekSequence = Vec::new();

    for &timestamp in ordered {
        let date = timestamp.date_naive();
        let position = weekday_position(date);

        if let Some(current) = weeks.last_mut() {
            if current.0[position].date == date {
                current.0[position].times.push(timestamp);
                continue;
            }
        }

        let mut new_week = create_week(date);
        new_week.0[position].times.push(timestamp);

        if let Some(current) = weeks.last() {
            let gap_weeks = create_gap_weeks(current.monday(), new_week.monday());
            weeks.extend(gap_weeks);
        }
        weeks.push(new_week);
    }

    weeks
}
