//! Local user directory and the persisted session.
//!
//! Credentials are compared in clear text. Nothing here tries to be a
//! security boundary; it only decides whose bundle gets opened.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::Config;
use crate::database::{Database, DatabaseError};
use crate::models::{Role, Session, SubscriptionPlan, User, ValidationError};
use crate::utils::ceil_days;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const TRIAL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("This email is already registered")]
    EmailTaken,
    #[error("The nickname @{0} is already in use")]
    NicknameTaken(String),
    #[error("User not found")]
    UserNotFound,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Password must have at least 6 characters")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Typed nickname does not match the account")]
    ConfirmationMismatch,
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub nickname: String,
    pub email: String,
    pub password: String,
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(value)
}

/// Nickname without the leading `@`; empty after stripping is missing
fn nickname_field(value: &str) -> Result<&str, ValidationError> {
    required(value.trim().trim_start_matches('@'), "nickname")
}

/// Create an account. The role comes from `roles.masters`.
pub fn register(
    db: &Database,
    config: &Config,
    registration: &Registration,
    now: DateTime<Utc>,
) -> Result<User, AuthError> {
    let nickname = nickname_field(&registration.nickname)?;
    let email = required(&registration.email, "email")?;
    if registration.password.is_empty() {
        return Err(ValidationError::Required("password").into());
    }

    if db.get_user_by_email(email)?.is_some() {
        return Err(AuthError::EmailTaken);
    }
    if db.get_user_by_nickname(nickname)?.is_some() {
        return Err(AuthError::NicknameTaken(nickname.to_string()));
    }

    let role = if config.is_master(email) {
        Role::Master
    } else {
        Role::Member
    };
    let user = User {
        nickname: nickname.to_string(),
        email: email.to_lowercase(),
        password: registration.password.clone(),
        role,
        created_at: now,
    };
    db.insert_user(&user)?;
    log::info!("auth: registered @{} as {}", user.nickname, role.as_str());
    Ok(user)
}

/// Check credentials and persist the session
pub fn login(db: &Database, identifier: &str, password: &str) -> Result<Session, AuthError> {
    let user = db
        .find_user(required(identifier, "email or nickname")?)?
        .ok_or(AuthError::UserNotFound)?;
    if user.password != password {
        return Err(AuthError::WrongPassword);
    }
    let session = Session::for_user(&user);
    db.save_session(&session)?;
    log::info!("auth: @{} logged in", session.nickname);
    Ok(session)
}

pub fn current_session(db: &Database) -> Result<Option<Session>, AuthError> {
    Ok(db.load_session()?)
}

pub fn logout(db: &Database) -> Result<(), AuthError> {
    db.clear_session()?;
    log::info!("auth: logged out");
    Ok(())
}

/// Set a new password for the account registered under `email`
pub fn reset_password(
    db: &Database,
    email: &str,
    new_password: &str,
    confirmation: &str,
) -> Result<(), AuthError> {
    let email = required(email, "email")?;
    if db.get_user_by_email(email)?.is_none() {
        return Err(AuthError::UserNotFound);
    }
    if new_password != confirmation {
        return Err(AuthError::PasswordMismatch);
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    db.update_user_password(email, new_password)?;
    log::info!("auth: password reset for {}", email);
    Ok(())
}

/// Rename the logged-in user; the stored session follows
pub fn change_nickname(db: &Database, session: &mut Session, nickname: &str) -> Result<(), AuthError> {
    let nickname = nickname_field(nickname)?;
    if let Some(other) = db.get_user_by_nickname(nickname)? {
        if !other.email.eq_ignore_ascii_case(&session.email) {
            return Err(AuthError::NicknameTaken(nickname.to_string()));
        }
    }
    if !db.update_user_nickname(&session.email, nickname)? {
        return Err(AuthError::UserNotFound);
    }
    session.nickname = nickname.to_string();
    db.save_session(session)?;
    Ok(())
}

/// Record the plan picked on the paywall
pub fn choose_plan(db: &Database, session: &mut Session, plan: SubscriptionPlan) -> Result<(), AuthError> {
    session.subscription_plan = Some(plan);
    db.save_session(session)?;
    Ok(())
}

/// Remove the account, its bundle and the session. The user must type their nickname.
pub fn delete_account(db: &Database, session: &Session, typed_nickname: &str) -> Result<(), AuthError> {
    let typed = typed_nickname.trim().trim_start_matches('@');
    if !typed.eq_ignore_ascii_case(&session.nickname) {
        return Err(AuthError::ConfirmationMismatch);
    }
    db.delete_user(&session.email)?;
    db.clear_session()?;
    log::info!("auth: deleted account @{}", session.nickname);
    Ok(())
}

/// Days left in the free trial, never negative
pub fn trial_days_remaining(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed = (now - created_at).num_milliseconds().max(0);
    (TRIAL_DAYS - ceil_days(elapsed)).max(0)
}
