//! Next-occurrence projection for important dates.
//!
//! A recurring date keeps only its month and day. It is projected into the
//! current year. Across the year boundary the adjacent year's occurrence wins
//! when it is the one inside the display window: a Dec 31 birthday seen on
//! Jan 2 is two days ago, a Jan 3 anniversary seen on Dec 28 is six days ahead.

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{ImportantDate, ValidationError};
use crate::store::EntityStore;
use crate::utils::{contains_ignore_case, parse_date};

pub const PAST_WINDOW_DAYS: i64 = 5;
pub const FUTURE_WINDOW_DAYS: i64 = 15;
pub const SEARCH_WINDOW_DAYS: i64 = 365;

/// Inclusive range of dates shown in the important-dates list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DisplayWindow {
    /// `[today-5, today+15]`, widened to `today+365` while searching
    pub fn around(today: NaiveDate, searching: bool) -> Self {
        let forward = if searching {
            SEARCH_WINDOW_DAYS
        } else {
            FUTURE_WINDOW_DAYS
        };
        Self {
            start: today - Duration::days(PAST_WINDOW_DAYS),
            end: today + Duration::days(forward),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence<'a> {
    pub date: &'a ImportantDate,
    pub on: NaiveDate,
    /// Signed whole days from today; negative is past
    pub diff_days: i64,
}

/// Same month/day in `year`; Feb 29 falls back to Feb 28 in common years
fn with_year(date: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}

/// Date on which `stored` is observed relative to `today`
pub fn next_occurrence(
    stored: NaiveDate,
    is_recurring: bool,
    today: NaiveDate,
    window: &DisplayWindow,
) -> NaiveDate {
    if !is_recurring {
        return stored;
    }

    let occurrence = with_year(stored, today.year());
    if today.month() == 1 && occurrence.month() == 12 {
        let previous = with_year(stored, today.year() - 1);
        if window.contains(previous) && !window.contains(occurrence) {
            return previous;
        }
    } else if today.month() == 12 && occurrence.month() == 1 {
        let next = with_year(stored, today.year() + 1);
        if window.contains(next) && !window.contains(occurrence) {
            return next;
        }
    }
    occurrence
}

/// Project one important date; `None` when its stored date does not parse
pub fn project<'a>(
    date: &'a ImportantDate,
    today: NaiveDate,
    window: &DisplayWindow,
) -> Option<Occurrence<'a>> {
    let stored = match parse_date(&date.date) {
        Ok(stored) => stored,
        Err(_) => {
            log::warn!("important date {} has unparseable date '{}'", date.id, date.date);
            return None;
        }
    };
    let on = next_occurrence(stored, date.is_recurring, today, window);
    Some(Occurrence {
        date,
        on,
        diff_days: (on - today).num_days(),
    })
}

/// Occurrences inside the display window matching `search`, closest first.
/// Exact ties put the future occurrence before the past one.
pub fn upcoming<'a>(
    dates: &'a EntityStore<ImportantDate>,
    today: NaiveDate,
    search: &str,
) -> Vec<Occurrence<'a>> {
    let search = search.trim();
    let window = DisplayWindow::around(today, !search.is_empty());

    let mut occurrences: Vec<Occurrence<'a>> = dates
        .iter()
        .filter(|d| contains_ignore_case(&d.title, search))
        .filter_map(|d| project(d, today, &window))
        .filter(|o| window.contains(o.on))
        .collect();

    occurrences.sort_by(|a, b| {
        a.diff_days
            .abs()
            .cmp(&b.diff_days.abs())
            .then(b.diff_days.cmp(&a.diff_days))
    });
    occurrences
}

/// Validated important date ready to insert
pub fn new_important_date(
    title: &str,
    date: &str,
    is_recurring: bool,
) -> Result<ImportantDate, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::Required("title"));
    }
    parse_date(date).map_err(|_| ValidationError::InvalidDate(date.to_string()))?;
    Ok(ImportantDate::new(title, date.trim(), is_recurring))
}

/// Replace title, date and recurring flag of an existing entry
pub fn edit_important_date(
    dates: &mut EntityStore<ImportantDate>,
    id: &str,
    title: &str,
    date: &str,
    is_recurring: bool,
) -> Result<bool, ValidationError> {
    let validated = new_important_date(title, date, is_recurring)?;
    Ok(dates.update(id, |d| {
        d.title = validated.title;
        d.date = validated.date;
        d.is_recurring = validated.is_recurring;
    }))
}
