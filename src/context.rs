//! Logged-in application context.
//!
//! Built once per session from the database, mutated through the entity
//! stores and committed with [`AppContext::save`]. Nothing is written behind
//! the caller's back; `needs_save` reports changes made while opening.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::auth::{self, AuthError};
use crate::categories;
use crate::clock::Clock;
use crate::config::Config;
use crate::content;
use crate::dashboard::QUICK_TASK_CATEGORY;
use crate::database::{Database, DatabaseError};
use crate::models::{GlobalContent, Language, Priority, QuickNote, Session, SubscriptionPlan, Task, UserData};
use crate::trash::{self, RetentionPolicy};
use crate::utils::date_key;

pub const WELCOME_TASK: &str = "Set up my profile";
pub const WELCOME_NOTE: &str = "Welcome to My! Your data is saved locally and stays private.";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Bundle handed to a user on first login
pub fn seed_bundle(today: NaiveDate) -> UserData {
    let mut data = UserData::default();
    data.tasks.create(Task::new(
        QUICK_TASK_CATEGORY,
        WELCOME_TASK,
        Priority::High,
        &date_key(today),
    ));
    data.quick_notes.create(QuickNote::new(WELCOME_NOTE, "blue"));
    data.category_configs = categories::default_configs();
    data
}

pub struct AppContext {
    db: Database,
    clock: Clock,
    session: Session,
    retention: RetentionPolicy,
    language: Language,
    dirty: bool,
    pub data: UserData,
    pub global: GlobalContent,
}

impl AppContext {
    /// Load the session owner's bundle and the shared content, seeding what is missing
    pub fn open(db: Database, clock: Clock, config: &Config, session: Session) -> Result<Self, ContextError> {
        let mut dirty = false;

        let mut data = match db.load_user_data(&session.email)? {
            Some(data) => data,
            None => {
                log::info!("context: seeding bundle for @{}", session.nickname);
                dirty = true;
                seed_bundle(clock.today())
            }
        };
        dirty |= categories::ensure_defaults(&mut data.category_configs);

        let mut global = db.load_global_content()?.unwrap_or_default();
        dirty |= content::ensure_defaults(&mut global, clock.now());

        let retention = config.retention();
        if config.trash.auto_purge {
            dirty |= trash::purge_expired(&mut data, &retention, clock.now()) > 0;
        }

        Ok(Self {
            db,
            clock,
            session,
            retention,
            language: config.language,
            dirty,
            data,
            global,
        })
    }

    /// Reopen the persisted session, if there is one
    pub fn restore(db: Database, clock: Clock, config: &Config) -> Result<Option<Self>, ContextError> {
        match auth::current_session(&db)? {
            Some(session) => Ok(Some(Self::open(db, clock, config, session)?)),
            None => Ok(None),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// True when opening the context changed data that has not been saved yet
    pub fn needs_save(&self) -> bool {
        self.dirty
    }

    /// Commit the bundle and the shared content
    pub fn save(&mut self) -> Result<(), ContextError> {
        self.db.save_user_data(&self.session.email, &self.data)?;
        self.db.save_global_content(&self.global)?;
        self.dirty = false;
        log::info!("context: saved data for @{}", self.session.nickname);
        Ok(())
    }

    pub fn change_nickname(&mut self, nickname: &str) -> Result<(), ContextError> {
        auth::change_nickname(&self.db, &mut self.session, nickname)?;
        Ok(())
    }

    pub fn choose_plan(&mut self, plan: SubscriptionPlan) -> Result<(), ContextError> {
        auth::choose_plan(&self.db, &mut self.session, plan)?;
        Ok(())
    }

    /// Clear the session and hand the database back
    pub fn logout(self) -> Result<Database, ContextError> {
        auth::logout(&self.db)?;
        Ok(self.db)
    }

    /// Delete the account behind this context
    pub fn delete_account(self, typed_nickname: &str) -> Result<Database, ContextError> {
        auth::delete_account(&self.db, &self.session, typed_nickname)?;
        Ok(self.db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Registration;
    use crate::models::Note;
    use chrono::{Duration, TimeZone};

    fn fixed_clock() -> Clock {
        Clock::fixed(
            chrono_tz::America::Sao_Paulo,
            Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap(),
        )
    }

    fn logged_in_db() -> (Database, Session) {
        let db = Database::open_in_memory().unwrap();
        let registration = Registration {
            nickname: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        auth::register(&db, &Config::default(), &registration, Utc::now()).unwrap();
        let session = auth::login(&db, "ana", "hunter22").unwrap();
        (db, session)
    }

    #[test]
    fn first_open_seeds_but_does_not_write() {
        let (db, session) = logged_in_db();
        let ctx = AppContext::open(db, fixed_clock(), &Config::default(), session).unwrap();

        assert!(ctx.needs_save());
        let welcome = ctx.data.tasks.iter().next().unwrap();
        assert_eq!(welcome.title, WELCOME_TASK);
        assert_eq!(welcome.due_date, "2024-03-10");
        assert_eq!(welcome.priority, Priority::High);
        assert_eq!(ctx.data.quick_notes.len(), 1);
        assert_eq!(ctx.data.category_configs.len(), 17);
        assert_eq!(ctx.global.tutorials.len(), 4);
        assert!(ctx.db().load_user_data("ana@example.com").unwrap().is_none());
    }

    #[test]
    fn saved_bundle_is_what_the_next_open_sees() {
        let (db, session) = logged_in_db();
        let mut ctx = AppContext::open(db, fixed_clock(), &Config::default(), session).unwrap();
        ctx.data
            .tasks
            .create(Task::new("work", "Report", Priority::Low, "2024-03-11"));
        ctx.save().unwrap();
        assert!(!ctx.needs_save());

        let db = ctx.logout().unwrap();
        assert!(AppContext::restore(db, fixed_clock(), &Config::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn restore_reopens_the_persisted_session() {
        let (db, session) = logged_in_db();
        let mut ctx = AppContext::open(db, fixed_clock(), &Config::default(), session).unwrap();
        ctx.data
            .tasks
            .create(Task::new("work", "Report", Priority::Low, "2024-03-11"));
        ctx.save().unwrap();

        let db = ctx.db;
        let reopened = AppContext::restore(db, fixed_clock(), &Config::default())
            .unwrap()
            .unwrap();
        assert!(!reopened.needs_save());
        assert_eq!(reopened.data.tasks.len(), 2);
        assert!(reopened.data.tasks.iter().any(|t| t.title == "Report"));
    }

    #[test]
    fn auto_purge_runs_only_when_enabled() {
        let (db, session) = logged_in_db();
        let clock = fixed_clock();
        let mut data = seed_bundle(clock.today());
        let id = data.notes.create(Note::new("ideas", "old", clock.now()));
        data.notes.soft_delete(&id, clock.now() - Duration::days(30));
        db.save_user_data(&session.email, &data).unwrap();

        let ctx = AppContext::open(db, clock, &Config::default(), session.clone()).unwrap();
        assert!(ctx.data.notes.contains(&id));

        let mut config = Config::default();
        config.trash.auto_purge = true;
        let ctx = AppContext::open(ctx.db, clock, &config, session).unwrap();
        assert!(!ctx.data.notes.contains(&id));
        assert!(ctx.needs_save());
    }

    #[test]
    fn deleting_the_account_needs_the_nickname() {
        let (db, session) = logged_in_db();
        let mut ctx = AppContext::open(db, fixed_clock(), &Config::default(), session).unwrap();
        ctx.save().unwrap();
        let db = ctx.delete_account("ana").unwrap();
        assert!(db.load_user_data("ana@example.com").unwrap().is_none());
        assert!(db.load_session().unwrap().is_none());
    }
}
