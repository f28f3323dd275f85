pub mod auth;
pub mod categories;
pub mod cli;
pub mod clock;
pub mod config;
pub mod content;
pub mod context;
pub mod dashboard;
pub mod database;
pub mod expenses;
pub mod export;
pub mod gate;
pub mod habits;
pub mod items;
pub mod models;
pub mod recurrence;
pub mod store;
pub mod trash;
pub mod utils;

pub use clock::Clock;
pub use config::Config;
pub use context::AppContext;
pub use database::Database;
pub use models::{
    Article, CategoryConfig, Expense, GlobalContent, Goal, Habit, ImportantDate, Note, Notebook, QuickNote, Session,
    Task, Tutorial, User, UserData,
};
pub use store::EntityStore;
pub use utils::Profile;
