//! Derived views for the home dashboard.

use std::cmp::Reverse;

use chrono::{Datelike, NaiveDate};

use crate::models::{Goal, ImportantDate, Language, Priority, Task, ValidationError};
use crate::recurrence::{self, Occurrence};
use crate::store::EntityStore;
use crate::utils::{contains_ignore_case, date_key, parse_date};

/// Category that receives quick tasks typed on the dashboard
pub const QUICK_TASK_CATEGORY: &str = "commitments";

fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.completed && parse_date(&task.due_date).is_ok_and(|due| due < today)
}

/// Tasks to show for `day`. On today this also surfaces every incomplete
/// overdue task. Incomplete before complete, then by priority.
pub fn tasks_for_day<'a>(
    tasks: &'a EntityStore<Task>,
    day: NaiveDate,
    today: NaiveDate,
) -> Vec<&'a Task> {
    let mut selected: Vec<&Task> = tasks
        .active()
        .filter(|t| {
            let due_on_day = parse_date(&t.due_date).is_ok_and(|due| due == day);
            if day == today {
                due_on_day || is_overdue(t, today)
            } else {
                due_on_day
            }
        })
        .collect();
    selected.sort_by_key(|t| (t.completed, Reverse(t.priority.rank())));
    selected
}

/// Today's relevant tasks
pub fn todays_tasks(tasks: &EntityStore<Task>, today: NaiveDate) -> Vec<&Task> {
    tasks_for_day(tasks, today, today)
}

/// Whole days until the goal is due; 0 when the due date is missing or garbled
pub fn days_left(due_date: &str, today: NaiveDate) -> i64 {
    parse_date(due_date)
        .map(|due| (due - today).num_days())
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalCountdown<'a> {
    pub goal: &'a Goal,
    pub days_left: i64,
}

/// Non-deleted goals, most urgent first, regardless of status
pub fn goal_countdowns(goals: &EntityStore<Goal>, today: NaiveDate) -> Vec<GoalCountdown<'_>> {
    let mut countdowns: Vec<GoalCountdown<'_>> = goals
        .active()
        .map(|goal| GoalCountdown {
            goal,
            days_left: days_left(&goal.due_date, today),
        })
        .collect();
    countdowns.sort_by_key(|c| c.days_left);
    countdowns
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub label: &'static str,
    pub completed: u32,
    pub pending: u32,
}

struct Locale {
    today: &'static str,
    tomorrow: &'static str,
    /// Sunday first
    prefixes: [&'static str; 7],
    labels: [&'static str; 7],
}

const PT: Locale = Locale {
    today: "hoje",
    tomorrow: "amanhã",
    prefixes: ["dom", "seg", "ter", "qua", "qui", "sex", "sáb"],
    labels: ["Dom", "Seg", "Ter", "Qua", "Qui", "Sex", "Sáb"],
};

const EN: Locale = Locale {
    today: "today",
    tomorrow: "tomorrow",
    prefixes: ["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
    labels: ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
};

fn locale(language: Language) -> &'static Locale {
    match language {
        Language::Pt => &PT,
        Language::En => &EN,
    }
}

/// Weekday index (Sunday = 0) a task's due text refers to
fn weekday_index(due: &str, today: NaiveDate, locale: &Locale) -> Option<usize> {
    let today_index = today.weekday().num_days_from_sunday() as usize;
    let text = due.trim().to_lowercase();
    if text == locale.today {
        return Some(today_index);
    }
    if text == locale.tomorrow {
        return Some((today_index + 1) % 7);
    }
    if let Ok(date) = parse_date(&text) {
        return Some(date.weekday().num_days_from_sunday() as usize);
    }
    // Scan order Monday..Saturday then Sunday
    [1, 2, 3, 4, 5, 6, 0]
        .into_iter()
        .find(|&i| text.contains(locale.prefixes[i]))
}

/// Completed vs pending counts per weekday, Monday first
pub fn weekly_chart(tasks: &EntityStore<Task>, today: NaiveDate, language: Language) -> Vec<DayBucket> {
    let locale = locale(language);
    let mut buckets: Vec<DayBucket> = locale
        .labels
        .iter()
        .map(|&label| DayBucket {
            label,
            completed: 0,
            pending: 0,
        })
        .collect();

    for task in tasks.active() {
        if let Some(index) = weekday_index(&task.due_date, today, locale) {
            if task.completed {
                buckets[index].completed += 1;
            } else {
                buckets[index].pending += 1;
            }
        }
    }

    buckets.rotate_left(1);
    buckets
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusDistribution {
    pub completed: usize,
    /// Incomplete high-priority tasks
    pub in_progress: usize,
    pub pending: usize,
}

pub fn status_distribution(tasks: &EntityStore<Task>) -> StatusDistribution {
    let mut dist = StatusDistribution::default();
    for task in tasks.active() {
        if task.completed {
            dist.completed += 1;
        } else if task.priority == Priority::High {
            dist.in_progress += 1;
        } else {
            dist.pending += 1;
        }
    }
    dist
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notifications<'a> {
    pub overdue_tasks: Vec<&'a Task>,
    pub dates_today: Vec<Occurrence<'a>>,
}

impl Notifications<'_> {
    pub fn total(&self) -> usize {
        self.overdue_tasks.len() + self.dates_today.len()
    }
}

pub fn notifications<'a>(
    tasks: &'a EntityStore<Task>,
    dates: &'a EntityStore<ImportantDate>,
    today: NaiveDate,
) -> Notifications<'a> {
    Notifications {
        overdue_tasks: tasks.active().filter(|t| is_overdue(t, today)).collect(),
        dates_today: recurrence::upcoming(dates, today, "")
            .into_iter()
            .filter(|o| o.diff_days == 0)
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit<'a> {
    Task(&'a Task),
    Date(&'a ImportantDate),
}

/// Title search over live tasks and important dates
pub fn search<'a>(
    tasks: &'a EntityStore<Task>,
    dates: &'a EntityStore<ImportantDate>,
    query: &str,
) -> Vec<SearchHit<'a>> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    tasks
        .active()
        .filter(|t| contains_ignore_case(&t.title, query))
        .map(SearchHit::Task)
        .chain(
            dates
                .iter()
                .filter(|d| contains_ignore_case(&d.title, query))
                .map(SearchHit::Date),
        )
        .collect()
}

/// Task typed into the dashboard box: due today, medium priority
pub fn quick_task(title: &str, today: NaiveDate) -> Result<Task, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::Required("title"));
    }
    Ok(Task::new(
        QUICK_TASK_CATEGORY,
        title,
        Priority::Medium,
        &date_key(today),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(title: &str, due: &str, priority: Priority, completed: bool) -> Task {
        let mut t = Task::new("work", title, priority, due);
        t.completed = completed;
        t
    }

    fn titles<'a>(tasks: &[&'a Task]) -> Vec<&'a str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn today_includes_due_today_and_open_overdue_only() {
        let mut store = EntityStore::new();
        store.create(task("A", "2024-03-10", Priority::Low, false));
        store.create(task("B", "2024-03-05", Priority::Low, false));
        store.create(task("C", "2024-03-05", Priority::Low, true));
        store.create(task("D", "2024-03-15", Priority::Low, false));
        let deleted = store.create(task("E", "2024-03-10", Priority::High, false));
        store.soft_delete(&deleted, Utc::now());

        let today = ymd(2024, 3, 10);
        let mut got = titles(&todays_tasks(&store, today));
        got.sort();
        assert_eq!(got, vec!["A", "B"]);
    }

    #[test]
    fn completed_sort_last_then_priority_descending() {
        let mut store = EntityStore::new();
        store.create(task("done-high", "2024-03-10", Priority::High, true));
        store.create(task("low", "2024-03-10", Priority::Low, false));
        store.create(task("high", "2024-03-09", Priority::High, false));
        store.create(task("medium", "2024-03-10", Priority::Medium, false));

        let got = titles(&todays_tasks(&store, ymd(2024, 3, 10)));
        assert_eq!(got, vec!["high", "medium", "low", "done-high"]);
    }

    #[test]
    fn another_day_shows_only_its_own_tasks() {
        let mut store = EntityStore::new();
        store.create(task("overdue", "2024-03-01", Priority::High, false));
        store.create(task("tomorrow", "2024-03-11", Priority::Low, false));
        let got = titles(&tasks_for_day(&store, ymd(2024, 3, 11), ymd(2024, 3, 10)));
        assert_eq!(got, vec!["tomorrow"]);
    }

    #[test]
    fn goal_countdown_sign() {
        let today = ymd(2024, 3, 10);
        assert_eq!(days_left("2024-03-10", today), 0);
        assert_eq!(days_left("2024-03-09", today), -1);
        assert_eq!(days_left("2024-03-11", today), 1);
        assert_eq!(days_left("", today), 0);
    }

    #[test]
    fn goals_sort_most_urgent_first() {
        let mut goals = EntityStore::new();
        goals.create(Goal::new("health", "Marathon", "2024-09-01"));
        goals.create(Goal::new("finances", "Overdue", "2024-03-01"));
        goals.create(Goal::new("studies", "Exam", "2024-04-01"));
        let order: Vec<&str> = goal_countdowns(&goals, ymd(2024, 3, 10))
            .iter()
            .map(|c| c.goal.title.as_str())
            .collect();
        assert_eq!(order, vec!["Overdue", "Exam", "Marathon"]);
    }

    #[test]
    fn weekly_chart_buckets_monday_first() {
        // 2024-03-10 is a Sunday
        let today = ymd(2024, 3, 10);
        let mut store = EntityStore::new();
        store.create(task("iso monday", "2024-03-11", Priority::Low, true));
        store.create(task("keyword today", "Hoje", Priority::Low, false));
        store.create(task("keyword tomorrow", "amanhã", Priority::Low, false));
        store.create(task("day name", "próxima sexta", Priority::Low, false));
        store.create(task("nonsense", "whenever", Priority::Low, false));

        let chart = weekly_chart(&store, today, Language::Pt);
        let labels: Vec<&str> = chart.iter().map(|b| b.label).collect();
        assert_eq!(labels, vec!["Seg", "Ter", "Qua", "Qui", "Sex", "Sáb", "Dom"]);
        assert_eq!((chart[0].completed, chart[0].pending), (1, 1));
        assert_eq!(chart[4].pending, 1);
        assert_eq!(chart[6].pending, 1);
        let counted: u32 = chart.iter().map(|b| b.completed + b.pending).sum();
        assert_eq!(counted, 4);
    }

    #[test]
    fn weekly_chart_uses_english_keywords() {
        let today = ymd(2024, 3, 13); // Wednesday
        let mut store = EntityStore::new();
        store.create(task("t", "today", Priority::Low, false));
        store.create(task("f", "friday", Priority::Low, false));
        let chart = weekly_chart(&store, today, Language::En);
        assert_eq!(chart[2].label, "Wed");
        assert_eq!(chart[2].pending, 1);
        assert_eq!(chart[4].pending, 1);
    }

    #[test]
    fn distribution_counts_high_priority_open_tasks_as_in_progress() {
        let mut store = EntityStore::new();
        store.create(task("a", "2024-03-10", Priority::High, false));
        store.create(task("b", "2024-03-10", Priority::Low, false));
        store.create(task("c", "2024-03-10", Priority::High, true));
        let dist = status_distribution(&store);
        assert_eq!(
            dist,
            StatusDistribution {
                completed: 1,
                in_progress: 1,
                pending: 1
            }
        );
    }

    #[test]
    fn notifications_and_search() {
        let mut tasks = EntityStore::new();
        tasks.create(task("Pay rent", "2024-03-01", Priority::High, false));
        tasks.create(task("Pay gym", "2024-03-10", Priority::High, false));
        let mut dates = EntityStore::new();
        dates.create(ImportantDate::new("Ana birthday", "1990-03-10", true));
        dates.create(ImportantDate::new("Rent review", "2024-05-01", false));

        let today = ymd(2024, 3, 10);
        let notes = notifications(&tasks, &dates, today);
        assert_eq!(notes.overdue_tasks.len(), 1);
        assert_eq!(notes.dates_today.len(), 1);
        assert_eq!(notes.total(), 2);

        let hits = search(&tasks, &dates, "RENT");
        assert_eq!(hits.len(), 2);
        assert!(matches!(hits[0], SearchHit::Task(t) if t.title == "Pay rent"));
        assert!(matches!(hits[1], SearchHit::Date(d) if d.title == "Rent review"));
        assert!(search(&tasks, &dates, "  ").is_empty());
    }

    #[test]
    fn quick_task_lands_in_commitments_due_today() {
        let task = quick_task(" Call bank ", ymd(2024, 3, 10)).unwrap();
        assert_eq!(task.title, "Call bank");
        assert_eq!(task.category_id, QUICK_TASK_CATEGORY);
        assert_eq!(task.due_date, "2024-03-10");
        assert!(quick_task("", ymd(2024, 3, 10)).is_err());
    }
}
