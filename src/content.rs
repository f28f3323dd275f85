//! Globally shared content: tutorials, articles and the devotional passage reader.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Article, GlobalContent, Session, Tutorial, ValidationError};
use crate::store::EntityStore;
use crate::utils::new_id;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Only master users can edit shared content")]
    Forbidden,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to load passage: {0}")]
    Passage(String),
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        ContentError::Passage(err.to_string())
    }
}

pub fn default_tutorials() -> EntityStore<Tutorial> {
    [
        (
            "1",
            "Dashboard",
            "Your command center. See priorities, the calendar and the week at a glance.",
            "Layers",
        ),
        (
            "2",
            "Categories",
            "Every area of life has tasks, notes, goals and a notebook.",
            "CheckCircle",
        ),
        (
            "3",
            "Master users",
            "Master users can publish articles for everyone.",
            "Smartphone",
        ),
        (
            "4",
            "Devotional",
            "Read a chapter a day from the devotional category.",
            "Info",
        ),
    ]
    .into_iter()
    .map(|(id, title, desc, icon)| Tutorial {
        id: id.to_string(),
        title: title.to_string(),
        desc: desc.to_string(),
        icon: icon.to_string(),
    })
    .collect::<Vec<_>>()
    .into()
}

pub fn default_articles(now: DateTime<Utc>) -> EntityStore<Article> {
    [("1", "The Art of Deep Focus"), ("2", "Morning Routines That Stick")]
        .into_iter()
        .map(|(id, title)| Article {
            id: id.to_string(),
            title: title.to_string(),
            content: String::new(),
            author: "My. Team".to_string(),
            date: now,
        })
        .collect::<Vec<_>>()
        .into()
}

/// Fill in whichever half of the shared content is missing; true if anything changed
pub fn ensure_defaults(global: &mut GlobalContent, now: DateTime<Utc>) -> bool {
    let mut changed = false;
    if global.tutorials.is_empty() {
        global.tutorials = default_tutorials();
        changed = true;
    }
    if global.articles.is_empty() {
        global.articles = default_articles(now);
        changed = true;
    }
    changed
}

fn ensure_master(session: &Session) -> Result<(), ContentError> {
    if session.can_edit_global_content() {
        Ok(())
    } else {
        Err(ContentError::Forbidden)
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(value)
}

/// Articles, newest first
pub fn articles(global: &GlobalContent) -> Vec<&Article> {
    let mut list: Vec<&Article> = global.articles.iter().collect();
    list.sort_by(|a, b| b.date.cmp(&a.date));
    list
}

pub fn add_article(
    global: &mut GlobalContent,
    session: &Session,
    title: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<String, ContentError> {
    ensure_master(session)?;
    let article = Article {
        id: new_id(),
        title: required(title, "title")?.to_string(),
        content: required(content, "content")?.to_string(),
        author: session.nickname.clone(),
        date: now,
    };
    Ok(global.articles.create(article))
}

pub fn update_article(
    global: &mut GlobalContent,
    session: &Session,
    id: &str,
    title: &str,
    content: &str,
) -> Result<bool, ContentError> {
    ensure_master(session)?;
    let title = required(title, "title")?;
    let content = required(content, "content")?;
    Ok(global.articles.update(id, |a| {
        a.title = title.to_string();
        a.content = content.to_string();
    }))
}

pub fn delete_article(global: &mut GlobalContent, session: &Session, id: &str) -> Result<bool, ContentError> {
    ensure_master(session)?;
    Ok(global.articles.purge(id).is_some())
}

pub fn add_tutorial(
    global: &mut GlobalContent,
    session: &Session,
    title: &str,
    desc: &str,
    icon: &str,
) -> Result<String, ContentError> {
    ensure_master(session)?;
    let tutorial = Tutorial {
        id: new_id(),
        title: required(title, "title")?.to_string(),
        desc: desc.trim().to_string(),
        icon: icon.trim().to_string(),
    };
    Ok(global.tutorials.create(tutorial))
}

pub fn update_tutorial(
    global: &mut GlobalContent,
    session: &Session,
    id: &str,
    title: &str,
    desc: &str,
) -> Result<bool, ContentError> {
    ensure_master(session)?;
    let title = required(title, "title")?;
    Ok(global.tutorials.update(id, |t| {
        t.title = title.to_string();
        t.desc = desc.trim().to_string();
    }))
}

pub fn delete_tutorial(global: &mut GlobalContent, session: &Session, id: &str) -> Result<bool, ContentError> {
    ensure_master(session)?;
    Ok(global.tutorials.purge(id).is_some())
}

pub const BOOKS: [&str; 66] = [
    "Genesis", "Exodus", "Leviticus", "Numbers", "Deuteronomy", "Joshua", "Judges", "Ruth",
    "1 Samuel", "2 Samuel", "1 Kings", "2 Kings", "1 Chronicles", "2 Chronicles", "Ezra",
    "Nehemiah", "Esther", "Job", "Psalms", "Proverbs", "Ecclesiastes", "Song of Solomon",
    "Isaiah", "Jeremiah", "Lamentations", "Ezekiel", "Daniel", "Hosea", "Joel", "Amos",
    "Obadiah", "Jonah", "Micah", "Nahum", "Habakkuk", "Zephaniah", "Haggai", "Zechariah",
    "Malachi", "Matthew", "Mark", "Luke", "John", "Acts", "Romans", "1 Corinthians",
    "2 Corinthians", "Galatians", "Ephesians", "Philippians", "Colossians",
    "1 Thessalonians", "2 Thessalonians", "1 Timothy", "2 Timothy", "Titus", "Philemon",
    "Hebrews", "James", "1 Peter", "2 Peter", "1 John", "2 John", "3 John", "Jude",
    "Revelation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassageRef {
    pub book: &'static str,
    pub chapter: u32,
}

/// Resolve a typed reference such as `psalm 23`, `1 john 4:8` or `gen`.
/// The first book whose name contains the typed book wins; chapter defaults to 1.
pub fn parse_reference(query: &str) -> Option<PassageRef> {
    let parts: Vec<&str> = query.split_whitespace().collect();
    let (book_part, chapter_part) = match parts.as_slice() {
        [] => return None,
        [n, name, rest @ ..] if matches!(*n, "1" | "2" | "3") => (format!("{} {}", n, name), rest.first()),
        [name, rest @ ..] => (name.to_string(), rest.first()),
    };

    let needle = book_part.to_lowercase();
    let book = BOOKS
        .iter()
        .copied()
        .find(|b| b.to_lowercase().contains(&needle))?;
    let chapter = chapter_part
        .and_then(|c| c.split(':').next())
        .and_then(|c| c.parse::<u32>().ok())
        .filter(|c| *c >= 1)
        .unwrap_or(1);
    Some(PassageRef { book, chapter })
}

#[async_trait]
pub trait PassageProvider: Send + Sync {
    async fn fetch_passage(&self, book: &str, chapter: u32) -> Result<String, ContentError>;
}

#[derive(Debug, Deserialize)]
struct PassageResponse {
    #[serde(default)]
    text: String,
}

/// Reads chapters from a bible-api.com compatible endpoint
pub struct HttpPassageProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPassageProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl PassageProvider for HttpPassageProvider {
    async fn fetch_passage(&self, book: &str, chapter: u32) -> Result<String, ContentError> {
        let url = format!("{}/{} {}", self.base_url, book, chapter);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ContentError::Passage(format!("HTTP {}", status)));
        }

        let body: PassageResponse = resp.json().await?;
        if body.text.trim().is_empty() {
            return Err(ContentError::Passage("empty passage".to_string()));
        }
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn session(role: Role) -> Session {
        Session {
            nickname: "ana".to_string(),
            email: "ana@example.com".to_string(),
            role,
            created_at: Utc::now(),
            subscription_plan: None,
        }
    }

    #[test]
    fn members_cannot_touch_shared_content() {
        let mut global = GlobalContent::default();
        ensure_defaults(&mut global, Utc::now());
        let member = session(Role::Member);

        assert!(matches!(
            add_article(&mut global, &member, "Title", "Body", Utc::now()),
            Err(ContentError::Forbidden)
        ));
        assert!(matches!(delete_tutorial(&mut global, &member, "1"), Err(ContentError::Forbidden)));
        assert_eq!(global.tutorials.len(), 4);
        assert_eq!(global.articles.len(), 2);
    }

    #[test]
    fn masters_publish_edit_and_delete() {
        let mut global = GlobalContent::default();
        let master = session(Role::Master);
        let earlier = Utc::now() - chrono::Duration::days(1);
        add_article(&mut global, &master, "Old", "Body", earlier).unwrap();
        let id = add_article(&mut global, &master, " Focus ", " Breathe ", Utc::now()).unwrap();

        let listed = articles(&global);
        assert_eq!(listed[0].title, "Focus");
        assert_eq!(listed[0].author, "ana");

        assert!(update_article(&mut global, &master, &id, "Focus 2", "More").unwrap());
        assert_eq!(global.articles.get(&id).unwrap().title, "Focus 2");
        assert!(matches!(
            update_article(&mut global, &master, &id, "", "More"),
            Err(ContentError::Validation(_))
        ));
        assert!(delete_article(&mut global, &master, &id).unwrap());
        assert!(!delete_article(&mut global, &master, &id).unwrap());

        let tid = add_tutorial(&mut global, &master, "Habits", "Track daily", "Star").unwrap();
        assert!(update_tutorial(&mut global, &master, &tid, "Habit tracker", "").unwrap());
        assert_eq!(global.tutorials.get(&tid).unwrap().title, "Habit tracker");
    }

    #[test]
    fn defaults_fill_only_missing_halves() {
        let mut global = GlobalContent::default();
        let master = session(Role::Master);
        add_tutorial(&mut global, &master, "Mine", "", "").unwrap();
        assert!(ensure_defaults(&mut global, Utc::now()));
        assert_eq!(global.tutorials.len(), 1);
        assert_eq!(global.articles.len(), 2);
        assert!(!ensure_defaults(&mut global, Utc::now()));
    }

    #[test]
    fn references_resolve_book_and_chapter() {
        assert_eq!(
            parse_reference("psalm 23"),
            Some(PassageRef { book: "Psalms", chapter: 23 })
        );
        assert_eq!(
            parse_reference("1 john 4:8"),
            Some(PassageRef { book: "1 John", chapter: 4 })
        );
        assert_eq!(
            parse_reference("gen"),
            Some(PassageRef { book: "Genesis", chapter: 1 })
        );
        assert_eq!(parse_reference("   "), None);
        assert_eq!(parse_reference("xyz 3"), None);
    }
}
