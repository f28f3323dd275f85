//! Trash view over every soft-deletable collection.
//!
//! Items keep a countdown of days left before they become eligible for purge.
//! Nothing is purged automatically; [`purge_expired`] runs only on request.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::models::{UserData, ValidationError};
use crate::store::{EntityStore, SoftDelete};
use crate::utils::ceil_days;

pub const DEFAULT_RETENTION_DAYS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrashKind {
    Task,
    Note,
    Goal,
    Notebook,
    Expense,
}

impl TrashKind {
    pub const ALL: [TrashKind; 5] = [
        TrashKind::Task,
        TrashKind::Note,
        TrashKind::Goal,
        TrashKind::Notebook,
        TrashKind::Expense,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrashKind::Task => "task",
            TrashKind::Note => "note",
            TrashKind::Goal => "goal",
            TrashKind::Notebook => "notebook",
            TrashKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TrashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrashKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrashKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "trash kind",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl RetentionPolicy {
    pub fn new(days: i64) -> Self {
        Self { days: days.max(0) }
    }

    pub fn days(&self) -> i64 {
        self.days
    }

    /// `max(0, days - ceil(|now - deleted_at| / 1 day))`
    pub fn days_remaining(&self, deleted_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - deleted_at).num_milliseconds().abs();
        (self.days - ceil_days(elapsed)).max(0)
    }

    pub fn is_expired(&self, deleted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.days_remaining(deleted_at, now) == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashItem {
    pub kind: TrashKind,
    pub id: String,
    pub title: String,
    pub deleted_at: DateTime<Utc>,
    pub days_remaining: i64,
}

fn collect<T, F>(
    items: &mut Vec<TrashItem>,
    store: &EntityStore<T>,
    kind: TrashKind,
    title: F,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) where
    T: SoftDelete,
    F: Fn(&T) -> String,
{
    for record in store.deleted() {
        if let Some(deleted_at) = record.deleted_at() {
            items.push(TrashItem {
                kind,
                id: record.id().to_string(),
                title: title(record),
                deleted_at,
                days_remaining: policy.days_remaining(deleted_at, now),
            });
        }
    }
}

fn note_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default();
    first_line.chars().take(60).collect()
}

/// Everything in the trash, most recently deleted first
pub fn list(data: &UserData, policy: &RetentionPolicy, now: DateTime<Utc>) -> Vec<TrashItem> {
    let mut items = Vec::new();
    collect(&mut items, &data.tasks, TrashKind::Task, |t| t.title.clone(), policy, now);
    collect(&mut items, &data.notes, TrashKind::Note, |n| note_title(&n.content), policy, now);
    collect(&mut items, &data.goals, TrashKind::Goal, |g| g.title.clone(), policy, now);
    collect(&mut items, &data.notebooks, TrashKind::Notebook, |nb| nb.title.clone(), policy, now);
    collect(&mut items, &data.expenses, TrashKind::Expense, |e| e.description.clone(), policy, now);
    items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
    items
}

pub fn soft_delete(data: &mut UserData, kind: TrashKind, id: &str, now: DateTime<Utc>) -> bool {
    match kind {
        TrashKind::Task => data.tasks.soft_delete(id, now),
        TrashKind::Note => data.notes.soft_delete(id, now),
        TrashKind::Goal => data.goals.soft_delete(id, now),
        TrashKind::Notebook => data.notebooks.soft_delete(id, now),
        TrashKind::Expense => data.expenses.soft_delete(id, now),
    }
}

pub fn restore(data: &mut UserData, kind: TrashKind, id: &str) -> bool {
    match kind {
        TrashKind::Task => data.tasks.restore(id),
        TrashKind::Note => data.notes.restore(id),
        TrashKind::Goal => data.goals.restore(id),
        TrashKind::Notebook => data.notebooks.restore(id),
        TrashKind::Expense => data.expenses.restore(id),
    }
}

/// Remove one item for good. Callers confirm with the user first.
pub fn purge(data: &mut UserData, kind: TrashKind, id: &str) -> bool {
    match kind {
        TrashKind::Task => data.tasks.purge(id).is_some(),
        TrashKind::Note => data.notes.purge(id).is_some(),
        TrashKind::Goal => data.goals.purge(id).is_some(),
        TrashKind::Notebook => data.notebooks.purge(id).is_some(),
        TrashKind::Expense => data.expenses.purge(id).is_some(),
    }
}

fn purge_expired_in<T: SoftDelete>(
    store: &mut EntityStore<T>,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> usize {
    store.retain(|r| match r.deleted_at() {
        Some(at) => !policy.is_expired(at, now),
        None => true,
    })
}

/// Remove every trashed item whose countdown reached zero; returns the count
pub fn purge_expired(data: &mut UserData, policy: &RetentionPolicy, now: DateTime<Utc>) -> usize {
    let removed = purge_expired_in(&mut data.tasks, policy, now)
        + purge_expired_in(&mut data.notes, policy, now)
        + purge_expired_in(&mut data.goals, policy, now)
        + purge_expired_in(&mut data.notebooks, policy, now)
        + purge_expired_in(&mut data.expenses, policy, now);
    if removed > 0 {
        log::info!("trash: purged {} expired item(s)", removed);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Note, Priority, Task};
    use chrono::{Duration, TimeZone};

    fn deleted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn countdown_starts_at_retention_and_hits_zero_on_day_ten() {
        let policy = RetentionPolicy::default();
        let at = deleted_at();
        assert_eq!(policy.days_remaining(at, at), 10);
        assert_eq!(policy.days_remaining(at, at + Duration::hours(1)), 9);
        assert_eq!(policy.days_remaining(at, at + Duration::days(1)), 9);
        assert_eq!(policy.days_remaining(at, at + Duration::days(9)), 1);
        assert_eq!(policy.days_remaining(at, at + Duration::days(10)), 0);
        assert_eq!(policy.days_remaining(at, at + Duration::days(400)), 0);
    }

    #[test]
    fn countdown_never_increases_as_time_passes() {
        let policy = RetentionPolicy::default();
        let at = deleted_at();
        let mut previous = i64::MAX;
        for hours in 0..(24 * 12) {
            let remaining = policy.days_remaining(at, at + Duration::hours(hours));
            assert!(remaining <= previous);
            assert!(remaining >= 0);
            previous = remaining;
        }
    }

    fn data_with_trash() -> (UserData, String, String) {
        let mut data = UserData::default();
        let old = data.tasks.create(Task::new("work", "Old", Priority::Low, "2024-02-01"));
        let fresh = data
            .notes
            .create(Note::new("ideas", "Fresh idea\nsecond line", deleted_at()));
        data.tasks.create(Task::new("work", "Live", Priority::Low, "2024-02-01"));
        data.tasks.soft_delete(&old, deleted_at() - Duration::days(20));
        data.notes.soft_delete(&fresh, deleted_at());
        (data, old, fresh)
    }

    #[test]
    fn list_shows_newest_deletion_first() {
        let (data, old, fresh) = data_with_trash();
        let items = list(&data, &RetentionPolicy::default(), deleted_at());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, fresh);
        assert_eq!(items[0].kind, TrashKind::Note);
        assert_eq!(items[0].title, "Fresh idea");
        assert_eq!(items[0].days_remaining, 10);
        assert_eq!(items[1].id, old);
        assert_eq!(items[1].days_remaining, 0);
    }

    #[test]
    fn purge_expired_keeps_fresh_and_live_records() {
        let (mut data, old, fresh) = data_with_trash();
        let removed = purge_expired(&mut data, &RetentionPolicy::default(), deleted_at());
        assert_eq!(removed, 1);
        assert!(!data.tasks.contains(&old));
        assert!(data.notes.contains(&fresh));
        assert_eq!(data.tasks.len(), 1);
    }

    #[test]
    fn restore_and_purge_by_kind() {
        let (mut data, old, fresh) = data_with_trash();
        assert!(restore(&mut data, TrashKind::Note, &fresh));
        assert!(!restore(&mut data, TrashKind::Goal, &fresh));
        assert!(purge(&mut data, TrashKind::Task, &old));
        assert!(list(&data, &RetentionPolicy::default(), deleted_at()).is_empty());
    }

    #[test]
    fn deleting_again_does_not_restart_the_countdown() {
        let (mut data, _, fresh) = data_with_trash();
        let later = deleted_at() + Duration::days(8);
        assert!(!soft_delete(&mut data, TrashKind::Note, &fresh, later));

        let items = list(&data, &RetentionPolicy::default(), later);
        let note = items.iter().find(|i| i.id == fresh).unwrap();
        assert_eq!(note.days_remaining, 2);
    }

    #[test]
    fn kind_parses_from_text() {
        assert_eq!("Expense".parse::<TrashKind>().unwrap(), TrashKind::Expense);
        assert!("habit".parse::<TrashKind>().is_err());
    }
}
