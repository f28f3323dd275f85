use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::{Habit, ValidationError};
use crate::store::EntityStore;
use crate::utils::date_key;

/// Upper bound on how far back a streak scan walks
pub const MAX_STREAK_DAYS: u32 = 3650;

fn done_on(history: &BTreeMap<String, bool>, date: NaiveDate) -> bool {
    history.get(&date_key(date)).copied().unwrap_or(false)
}

/// Consecutive done days ending today, or ending yesterday while today is still open
pub fn current_streak(history: &BTreeMap<String, bool>, today: NaiveDate) -> u32 {
    let mut day = if done_on(history, today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while streak < MAX_STREAK_DAYS && done_on(history, day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitDay {
    pub date: NaiveDate,
    pub done: bool,
}

/// Today and the six days before it, oldest first
pub fn trailing_week(history: &BTreeMap<String, bool>, today: NaiveDate) -> Vec<HabitDay> {
    (0..7)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            HabitDay {
                date,
                done: done_on(history, date),
            }
        })
        .collect()
}

/// Flip the done flag of one day
pub fn toggle_day(habits: &mut EntityStore<Habit>, id: &str, date: NaiveDate) -> bool {
    habits.update(id, |h| {
        let entry = h.history.entry(date_key(date)).or_insert(false);
        *entry = !*entry;
    })
}

pub fn create_habit(
    habits: &mut EntityStore<Habit>,
    title: &str,
    now: DateTime<Utc>,
) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::Required("title"));
    }
    Ok(habits.create(Habit::new(title, now)))
}

pub fn rename_habit(
    habits: &mut EntityStore<Habit>,
    id: &str,
    title: &str,
) -> Result<bool, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::Required("title"));
    }
    Ok(habits.update(id, |h| h.title = title.to_string()))
}
