use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Entity, EntityStore, SoftDelete};
use crate::utils::new_id;

/// Input rejected at the form boundary; no record is created or changed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("At most {max} installments are allowed")]
    TooManyInstallments { max: u32 },
    #[error("Unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank used for sorting, higher is more urgent
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "alta" => Ok(Priority::High),
            "medium" | "média" | "media" => Ok(Priority::Medium),
            "low" | "baixa" => Ok(Priority::Low),
            other => Err(ValidationError::UnknownValue {
                field: "priority",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Goal status; independent of the due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GoalStatus {
    #[serde(rename = "concluded", alias = "concluída")]
    Concluded,
    #[default]
    #[serde(rename = "pending", alias = "pendente")]
    Pending,
    #[serde(rename = "partially-concluded", alias = "parcialmente concluída")]
    PartiallyConcluded,
    #[serde(rename = "unfinished", alias = "inconclusa")]
    Unfinished,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Concluded => "concluded",
            GoalStatus::Pending => "pending",
            GoalStatus::PartiallyConcluded => "partially-concluded",
            GoalStatus::Unfinished => "unfinished",
        }
    }
}

impl FromStr for GoalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concluded" | "concluída" => Ok(GoalStatus::Concluded),
            "pending" | "pendente" => Ok(GoalStatus::Pending),
            "partially-concluded" | "parcialmente concluída" => Ok(GoalStatus::PartiallyConcluded),
            "unfinished" | "inconclusa" => Ok(GoalStatus::Unfinished),
            other => Err(ValidationError::UnknownValue {
                field: "goal status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display language for keywords and day labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub category_id: String,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    /// Calendar date (YYYY-MM-DD), not a timestamp
    pub due_date: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "lenient_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub category_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "lenient_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub category_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "lenient_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub id: String,
    pub category_id: String,
    pub title: String,
    /// Free text or markup
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "lenient_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub title: String,
    /// YYYY-MM-DD -> done; a missing key means not done
    #[serde(default)]
    pub history: BTreeMap<String, bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub category_id: String,
    pub description: String,
    /// Per-installment amount
    pub amount: Decimal,
    pub due_date: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default = "default_installments")]
    pub installments: u32,
    #[serde(default = "default_installments")]
    pub current_installment: u32,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "lenient_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

fn default_installments() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportantDate {
    pub id: String,
    pub title: String,
    pub date: String,
    /// Only month/day matter when set
    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickNote {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryConfig {
    pub id: String,
    #[serde(default)]
    pub is_pinned: bool,
    pub order: i64,
}

impl Task {
    pub fn new(category_id: &str, title: &str, priority: Priority, due_date: &str) -> Self {
        Self {
            id: new_id(),
            category_id: category_id.to_string(),
            title: title.to_string(),
            priority,
            due_date: due_date.to_string(),
            completed: false,
            deleted_at: None,
        }
    }
}

impl Note {
    pub fn new(category_id: &str, content: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            category_id: category_id.to_string(),
            content: content.to_string(),
            timestamp: now,
            deleted_at: None,
        }
    }
}

impl Goal {
    pub fn new(category_id: &str, title: &str, due_date: &str) -> Self {
        Self {
            id: new_id(),
            category_id: category_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            due_date: due_date.to_string(),
            status: GoalStatus::Pending,
            deleted_at: None,
        }
    }
}

impl Notebook {
    pub fn new(category_id: &str, title: &str, content: &str) -> Self {
        Self {
            id: new_id(),
            category_id: category_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            image_url: None,
            link: None,
            deleted_at: None,
        }
    }
}

impl Habit {
    pub fn new(title: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: title.to_string(),
            history: BTreeMap::new(),
            created_at: now,
        }
    }
}

impl ImportantDate {
    pub fn new(title: &str, date: &str, is_recurring: bool) -> Self {
        Self {
            id: new_id(),
            title: title.to_string(),
            date: date.to_string(),
            is_recurring,
        }
    }
}

impl QuickNote {
    pub fn new(content: &str, color: &str) -> Self {
        Self {
            id: new_id(),
            content: content.to_string(),
            color: color.to_string(),
        }
    }
}

macro_rules! impl_entity {
    ($($ty:ty),* $(,)?) => {
        $(impl Entity for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

macro_rules! impl_soft_delete {
    ($($ty:ty),* $(,)?) => {
        $(impl SoftDelete for $ty {
            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }

            fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
                self.deleted_at = at;
            }
        })*
    };
}

impl_entity!(
    Task,
    Note,
    Goal,
    Notebook,
    Habit,
    Expense,
    ImportantDate,
    QuickNote,
    CategoryConfig,
    Tutorial,
    Article,
);
impl_soft_delete!(Task, Note, Goal, Notebook, Expense);

/// Account role; only masters may edit globally shared content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Master,
}

impl Role {
    pub fn can_edit_global_content(self) -> bool {
        matches!(self, Role::Master)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Master => "master",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "master" => Ok(Role::Master),
            other => Err(ValidationError::UnknownValue {
                field: "role",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Monthly,
    Semestral,
    Annual,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Monthly,
        SubscriptionPlan::Semestral,
        SubscriptionPlan::Annual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionPlan::Monthly => "monthly",
            SubscriptionPlan::Semestral => "semestral",
            SubscriptionPlan::Annual => "annual",
        }
    }
}

impl FromStr for SubscriptionPlan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(SubscriptionPlan::Monthly),
            "semestral" => Ok(SubscriptionPlan::Semestral),
            "annual" => Ok(SubscriptionPlan::Annual),
            other => Err(ValidationError::UnknownValue {
                field: "plan",
                value: other.to_string(),
            }),
        }
    }
}

/// Entry in the local user directory. The password is kept in clear text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn can_edit_global_content(&self) -> bool {
        self.role.can_edit_global_content()
    }
}

/// Persisted record of the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub nickname: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<SubscriptionPlan>,
}

impl Session {
    pub fn for_user(user: &User) -> Self {
        Self {
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
            subscription_plan: None,
        }
    }

    pub fn can_edit_global_content(&self) -> bool {
        self.role.can_edit_global_content()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

/// Everything one user owns, persisted as a single bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserData {
    pub tasks: EntityStore<Task>,
    pub notes: EntityStore<Note>,
    pub goals: EntityStore<Goal>,
    pub notebooks: EntityStore<Notebook>,
    pub habits: EntityStore<Habit>,
    pub expenses: EntityStore<Expense>,
    pub important_dates: EntityStore<ImportantDate>,
    pub quick_notes: EntityStore<QuickNote>,
    pub category_configs: EntityStore<CategoryConfig>,
}

/// Content shared by every user of this installation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalContent {
    pub tutorials: EntityStore<Tutorial>,
    pub articles: EntityStore<Article>,
}

/// Timestamps that fail to parse load as `None` so a damaged record stays visible
mod lenient_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => serializer.serialize_some(&at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.and_then(|value| match value {
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|at| at.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        }))
    }
}
