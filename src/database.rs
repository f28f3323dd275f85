use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{GlobalContent, Role, Session, User, UserData};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Failed to encode or decode stored data: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;

        let db = Database { conn };
        db.initialize_schema()?;

        Ok(db)
    }

    /// Throwaway database, used by tests
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        // Email is stored lowercased and is the user's key everywhere
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                email           TEXT PRIMARY KEY,
                nickname        TEXT NOT NULL,
                password        TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'member',
                created_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS session (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                data            TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS user_data (
                email           TEXT PRIMARY KEY,
                data            TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS global_content (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                data            TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_nickname ON users(nickname COLLATE NOCASE)",
            [],
        )?;

        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
        let role: String = row.get(3)?;
        let created_at: String = row.get(4)?;
        Ok(User {
            email: row.get(0)?,
            nickname: row.get(1)?,
            password: row.get(2)?,
            role: role
                .parse::<Role>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        })
    }

    pub fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (email, nickname, password, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                user.email.to_lowercase(),
                user.nickname,
                user.password,
                user.role.as_str(),
                user.created_at.to_rfc3339()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT email, nickname, password, role, created_at FROM users WHERE email = ?1",
        )?;
        let user = stmt
            .query_row(rusqlite::params![email.to_lowercase()], Self::row_to_user)
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_nickname(&self, nickname: &str) -> Result<Option<User>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT email, nickname, password, role, created_at
             FROM users WHERE nickname = ?1 COLLATE NOCASE",
        )?;
        let user = stmt
            .query_row(rusqlite::params![nickname], Self::row_to_user)
            .optional()?;
        Ok(user)
    }

    /// Look a user up by email or nickname, case-insensitively
    pub fn find_user(&self, identifier: &str) -> Result<Option<User>, DatabaseError> {
        let identifier = identifier.trim();
        match self.get_user_by_email(identifier)? {
            Some(user) => Ok(Some(user)),
            None => self.get_user_by_nickname(identifier),
        }
    }

    pub fn update_user_password(&self, email: &str, password: &str) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE users SET password = ?1 WHERE email = ?2",
            rusqlite::params![password, email.to_lowercase()],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    pub fn update_user_nickname(&self, email: &str, nickname: &str) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE users SET nickname = ?1 WHERE email = ?2",
            rusqlite::params![nickname, email.to_lowercase()],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Remove a user together with their bundle and, if it is theirs, the session
    pub fn delete_user(&self, email: &str) -> Result<(), DatabaseError> {
        let email = email.to_lowercase();
        let session_owner = self.load_session()?.map(|s| s.email.to_lowercase());

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM users WHERE email = ?1", rusqlite::params![email])?;
        tx.execute("DELETE FROM user_data WHERE email = ?1", rusqlite::params![email])?;
        if session_owner.as_deref() == Some(email.as_str()) {
            tx.execute("DELETE FROM session", [])?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn save_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let data = serde_json::to_string(session)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO session (id, data) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
            rusqlite::params![data],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<Session>, DatabaseError> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM session WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn clear_session(&self) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM session", [])?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_user_data(&self, email: &str) -> Result<Option<UserData>, DatabaseError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM user_data WHERE email = ?1",
                rusqlite::params![email.to_lowercase()],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_user_data(&self, email: &str, data: &UserData) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(data)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO user_data (email, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(email) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            rusqlite::params![email.to_lowercase(), json, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_global_content(&self) -> Result<Option<GlobalContent>, DatabaseError> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM global_content WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_global_content(&self, content: &GlobalContent) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(content)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO global_content (id, data, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            rusqlite::params![json, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }
}
