//! Edits of the per-category records: tasks, notes, goals and notebook pages.
//!
//! Each edit takes a patch where `None` keeps the stored value. Validation runs
//! before anything is touched, so a rejected patch leaves the record as it was.

use crate::models::{Goal, GoalStatus, Note, Notebook, Priority, Task, ValidationError};
use crate::store::EntityStore;
use crate::utils::{date_key, parse_date};

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// An empty string clears the due date
    pub due_date: Option<String>,
    pub status: Option<GoalStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct NotebookPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
}

fn title(value: Option<String>) -> Result<Option<String>, ValidationError> {
    match value {
        Some(t) if t.trim().is_empty() => Err(ValidationError::Required("title")),
        Some(t) => Ok(Some(t.trim().to_string())),
        None => Ok(None),
    }
}

fn due_date(value: &str) -> Result<String, ValidationError> {
    parse_date(value)
        .map(date_key)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Empty link or image fields remove them
fn optional_text(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub fn edit_task(tasks: &mut EntityStore<Task>, id: &str, patch: TaskPatch) -> Result<bool, ValidationError> {
    let new_title = title(patch.title)?;
    let due = patch.due_date.as_deref().map(due_date).transpose()?;
    Ok(tasks.update(id, |t| {
        if let Some(title) = new_title {
            t.title = title;
        }
        if let Some(priority) = patch.priority {
            t.priority = priority;
        }
        if let Some(due) = due {
            t.due_date = due;
        }
    }))
}

pub fn edit_note(notes: &mut EntityStore<Note>, id: &str, content: &str) -> Result<bool, ValidationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::Required("content"));
    }
    Ok(notes.update(id, |n| n.content = content.to_string()))
}

pub fn edit_goal(goals: &mut EntityStore<Goal>, id: &str, patch: GoalPatch) -> Result<bool, ValidationError> {
    let new_title = title(patch.title)?;
    let due = match patch.due_date.as_deref().map(str::trim) {
        Some("") => Some(String::new()),
        Some(d) => Some(due_date(d)?),
        None => None,
    };
    Ok(goals.update(id, |g| {
        if let Some(title) = new_title {
            g.title = title;
        }
        if let Some(description) = patch.description {
            g.description = description.trim().to_string();
        }
        if let Some(due) = due {
            g.due_date = due;
        }
        if let Some(status) = patch.status {
            g.status = status;
        }
    }))
}

pub fn edit_notebook(
    notebooks: &mut EntityStore<Notebook>,
    id: &str,
    patch: NotebookPatch,
) -> Result<bool, ValidationError> {
    let new_title = title(patch.title)?;
    Ok(notebooks.update(id, |nb| {
        if let Some(title) = new_title {
            nb.title = title;
        }
        if let Some(content) = patch.content {
            nb.content = content;
        }
        if let Some(link) = patch.link {
            nb.link = optional_text(link);
        }
        if let Some(image_url) = patch.image_url {
            nb.image_url = optional_text(image_url);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn goal_edit_touches_only_the_target() {
        let mut goals = EntityStore::new();
        let marathon = goals.create(Goal::new("health", "Marathon", "2024-09-01"));
        let other = goals.create(Goal::new("health", "Swim", "2024-10-01"));
        let untouched = goals.get(&other).unwrap().clone();

        let patch = GoalPatch {
            title: Some(" Half marathon ".to_string()),
            description: Some("21 km".to_string()),
            due_date: Some("2024-06-30".to_string()),
            status: Some(GoalStatus::PartiallyConcluded),
        };
        assert!(edit_goal(&mut goals, &marathon, patch).unwrap());

        let edited = goals.get(&marathon).unwrap();
        assert_eq!(edited.title, "Half marathon");
        assert_eq!(edited.description, "21 km");
        assert_eq!(edited.due_date, "2024-06-30");
        assert_eq!(edited.status, GoalStatus::PartiallyConcluded);
        assert_eq!(goals.get(&other).unwrap(), &untouched);
    }

    #[test]
    fn goal_edit_validates_before_writing() {
        let mut goals = EntityStore::new();
        let id = goals.create(Goal::new("health", "Marathon", "2024-09-01"));
        let before = goals.clone();

        let blank = GoalPatch {
            title: Some("  ".to_string()),
            ..GoalPatch::default()
        };
        assert_eq!(edit_goal(&mut goals, &id, blank), Err(ValidationError::Required("title")));

        let garbled = GoalPatch {
            status: Some(GoalStatus::Concluded),
            due_date: Some("soon".to_string()),
            ..GoalPatch::default()
        };
        assert!(matches!(
            edit_goal(&mut goals, &id, garbled),
            Err(ValidationError::InvalidDate(_))
        ));
        assert_eq!(goals, before);

        let clear = GoalPatch {
            due_date: Some(String::new()),
            ..GoalPatch::default()
        };
        assert!(edit_goal(&mut goals, &id, clear).unwrap());
        assert_eq!(goals.get(&id).unwrap().due_date, "");
        assert!(!edit_goal(&mut goals, "missing", GoalPatch::default()).unwrap());
    }

    #[test]
    fn notebook_edit_replaces_content_and_clears_links() {
        let mut notebooks = EntityStore::new();
        let mut page = Notebook::new("reading", "Dune", "Spice");
        page.link = Some("https://example.com".to_string());
        let id = notebooks.create(page);
        let other = notebooks.create(Notebook::new("reading", "Emma", "Austen"));

        let patch = NotebookPatch {
            content: Some("Spice must flow".to_string()),
            link: Some(String::new()),
            ..NotebookPatch::default()
        };
        assert!(edit_notebook(&mut notebooks, &id, patch).unwrap());

        let edited = notebooks.get(&id).unwrap();
        assert_eq!(edited.title, "Dune");
        assert_eq!(edited.content, "Spice must flow");
        assert_eq!(edited.link, None);
        assert_eq!(notebooks.get(&other).unwrap().content, "Austen");
    }

    #[test]
    fn note_and_task_edits() {
        let mut notes = EntityStore::new();
        let id = notes.create(Note::new("ideas", "draft", Utc::now()));
        assert!(edit_note(&mut notes, &id, " final ").unwrap());
        assert_eq!(notes.get(&id).unwrap().content, "final");
        assert_eq!(edit_note(&mut notes, &id, ""), Err(ValidationError::Required("content")));

        let mut tasks = EntityStore::new();
        let id = tasks.create(Task::new("work", "Report", Priority::Low, "2024-03-10"));
        let patch = TaskPatch {
            priority: Some(Priority::High),
            due_date: Some("2024-03-12".to_string()),
            ..TaskPatch::default()
        };
        assert!(edit_task(&mut tasks, &id, patch).unwrap());
        let task = tasks.get(&id).unwrap();
        assert_eq!(task.title, "Report");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, "2024-03-12");
    }
}
