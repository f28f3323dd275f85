//! Plain-text report of one category tab.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::{DateTime, TimeZone};

use crate::models::{UserData, ValidationError};

const SEPARATOR: &str = "==========================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTab {
    Tasks,
    Notes,
    Goals,
    Notebooks,
    Expenses,
}

impl ReportTab {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportTab::Tasks => "tasks",
            ReportTab::Notes => "notes",
            ReportTab::Goals => "goals",
            ReportTab::Notebooks => "notebooks",
            ReportTab::Expenses => "expenses",
        }
    }
}

impl fmt::Display for ReportTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportTab {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tasks" => Ok(ReportTab::Tasks),
            "notes" => Ok(ReportTab::Notes),
            "goals" => Ok(ReportTab::Goals),
            "notebooks" | "notebook" => Ok(ReportTab::Notebooks),
            "expenses" => Ok(ReportTab::Expenses),
            other => Err(ValidationError::UnknownValue {
                field: "tab",
                value: other.to_string(),
            }),
        }
    }
}

/// `My_Report_<category>_<tab>.txt`
pub fn default_file_name(category_id: &str, tab: ReportTab) -> String {
    format!("My_Report_{}_{}.txt", category_id, tab)
}

/// One-line blurb used when sharing a category
pub fn share_text(category_id: &str, tab: ReportTab) -> String {
    format!(
        "Check out my progress in \"{}\" ({} tab) on My. Personal Organizer!",
        category_id, tab
    )
}

/// Render the non-deleted items of `category_id` shown under `tab`
pub fn render_report<Tz>(data: &UserData, category_id: &str, tab: ReportTab, emitted_at: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, "MY. ORGANIZER - REPORT: {}", category_id.to_uppercase());
    let _ = writeln!(out, "Issued: {}", emitted_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "{}\n", SEPARATOR);
    let _ = writeln!(out, "TAB: {}\n", tab.as_str().to_uppercase());

    match tab {
        ReportTab::Tasks => {
            for task in data.tasks.active().filter(|t| t.category_id == category_id) {
                let mark = if task.completed { 'X' } else { ' ' };
                let _ = writeln!(out, "[{}] {}", mark, task.title);
                let _ = writeln!(out, "    Priority: {} | Due: {}\n", task.priority, task.due_date);
            }
        }
        ReportTab::Notes => {
            for note in data.notes.active().filter(|n| n.category_id == category_id) {
                let _ = writeln!(out, "- {}", note.timestamp.format("%Y-%m-%d %H:%M"));
                let _ = writeln!(out, "{}\n", note.content);
            }
        }
        ReportTab::Goals => {
            for goal in data.goals.active().filter(|g| g.category_id == category_id) {
                let _ = writeln!(out, "* {} [{}]", goal.title, goal.status);
                let _ = writeln!(out, "    Due: {}", goal.due_date);
                if !goal.description.is_empty() {
                    let _ = writeln!(out, "    {}", goal.description);
                }
                out.push('\n');
            }
        }
        ReportTab::Notebooks => {
            for notebook in data.notebooks.active().filter(|n| n.category_id == category_id) {
                let _ = writeln!(out, "## {}", notebook.title);
                let _ = writeln!(out, "{}", notebook.content);
                if let Some(link) = &notebook.link {
                    let _ = writeln!(out, "Link: {}", link);
                }
                out.push('\n');
            }
        }
        ReportTab::Expenses => {
            for expense in data.expenses.active().filter(|e| e.category_id == category_id) {
                let mark = if expense.paid { 'X' } else { ' ' };
                let _ = writeln!(out, "[{}] {} - {:.2}", mark, expense.description, expense.amount);
                let _ = writeln!(out, "    Due: {}\n", expense.due_date);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Goal, Priority, Task};
    use chrono::Utc;

    fn emitted() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap()
    }

    #[test]
    fn task_report_lists_live_tasks_of_the_category() {
        let mut data = UserData::default();
        let mut done = Task::new("work", "Ship release", Priority::High, "2024-03-09");
        done.completed = true;
        data.tasks.create(done);
        data.tasks.create(Task::new("work", "Write notes", Priority::Low, "2024-03-12"));
        data.tasks.create(Task::new("health", "Run", Priority::Low, "2024-03-12"));
        let gone = data.tasks.create(Task::new("work", "Old", Priority::Low, "2024-03-01"));
        data.tasks.soft_delete(&gone, emitted());

        let report = render_report(&data, "work", ReportTab::Tasks, emitted());
        assert!(report.starts_with("MY. ORGANIZER - REPORT: WORK\nIssued: 2024-03-10 09:30\n"));
        assert!(report.contains("TAB: TASKS"));
        assert!(report.contains("[X] Ship release\n    Priority: high | Due: 2024-03-09"));
        assert!(report.contains("[ ] Write notes"));
        assert!(!report.contains("Run"));
        assert!(!report.contains("Old"));
    }

    #[test]
    fn goal_report_shows_status() {
        let mut data = UserData::default();
        data.goals.create(Goal::new("health", "Marathon", "2024-09-01"));
        let report = render_report(&data, "health", ReportTab::Goals, emitted());
        assert!(report.contains("* Marathon [pending]"));
    }

    #[test]
    fn file_name_and_tab_parsing() {
        assert_eq!(default_file_name("work", ReportTab::Tasks), "My_Report_work_tasks.txt");
        assert_eq!("Notebook".parse::<ReportTab>().unwrap(), ReportTab::Notebooks);
        assert!("bible".parse::<ReportTab>().is_err());
    }
}
