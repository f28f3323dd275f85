use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::auth::{self, AuthError, Registration};
use crate::categories::{self, Direction};
use crate::config::{Config, ConfigError};
use crate::content::{self, ContentError, HttpPassageProvider, PassageProvider};
use crate::context::{AppContext, ContextError};
use crate::dashboard::{self, SearchHit};
use crate::database::{Database, DatabaseError};
use crate::expenses::{self, ExpenseForm, MonthView};
use crate::export::{self, ReportTab};
use crate::gate::{AccessGate, AccessGateway, GateError, HttpAccessGateway};
use crate::habits;
use crate::items::{self, GoalPatch, NotebookPatch, TaskPatch};
use crate::models::{Goal, GoalStatus, Note, Notebook, Priority, QuickNote, Session, SubscriptionPlan, Task, ValidationError};
use crate::recurrence;
use crate::store::{Entity, EntityStore};
use crate::trash::{self, TrashKind};
use crate::utils::{date_key, parse_date};

#[derive(Parser)]
#[command(name = "myorg")]
#[command(about = "My. - personal organizer for tasks, goals, habits, expenses and important dates")]
#[command(version)]
pub struct Cli {
    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a local account
    Register {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in with email or nickname
    Login {
        identifier: String,
        #[arg(long)]
        password: String,
    },
    /// Set a new password for an email
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// End the current session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Change the nickname of the logged-in user
    Rename { nickname: String },
    /// Delete the account and all of its data
    DeleteAccount {
        /// Type your nickname to confirm
        #[arg(long)]
        confirm: String,
    },
    /// Check subscription access again
    Access,
    /// Start a checkout for a plan (monthly, semestral, annual)
    Checkout { plan: String },
    /// Confirm a finished checkout and re-check access
    CheckoutReturn { session_id: String },

    /// Today's tasks, goals, notifications and the week
    Dashboard {
        /// Show tasks of another day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Search tasks and important dates by title
    Search { query: String },
    /// Add a task due today to commitments
    QuickTask { title: String },

    /// Add a task to a category
    AddTask {
        category: String,
        title: String,
        /// high, medium or low
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Due date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        due: Option<String>,
    },
    /// Edit a task
    EditTask {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
    },
    /// Toggle a task between done and open
    ToggleTask { id: String },
    /// List tasks of a category
    Tasks { category: String },

    /// Add a note to a category
    AddNote { category: String, content: String },
    /// Replace the text of a note
    EditNote { id: String, content: String },
    /// List notes of a category
    Notes { category: String },

    /// Add a goal to a category
    AddGoal {
        category: String,
        title: String,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Set a goal's status
    GoalStatus { id: String, status: String },
    /// Edit a goal
    EditGoal {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// Due date (YYYY-MM-DD); an empty value clears it
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// List goals of a category with their countdown
    Goals { category: String },

    /// Add a notebook page to a category
    AddNotebook {
        category: String,
        title: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Edit a notebook page; empty link or image values remove them
    EditNotebook {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// List notebook pages of a category
    Notebooks { category: String },

    /// Add an expense, optionally split in monthly installments
    AddExpense {
        category: String,
        description: String,
        amount: String,
        /// First due date (YYYY-MM-DD)
        #[arg(long)]
        due: String,
        #[arg(long, default_value = "1")]
        installments: String,
        #[arg(long)]
        recurring: bool,
    },
    /// Edit one expense record
    EditExpense {
        id: String,
        description: String,
        amount: String,
        due: String,
    },
    /// Toggle the paid flag of an expense
    PayExpense { id: String },
    /// Expenses of a month with totals
    Expenses {
        /// Month to show: YYYY-MM, next or prev; defaults to the current one
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },

    /// Add a habit
    AddHabit { title: String },
    /// Rename a habit
    RenameHabit { id: String, title: String },
    /// Flip a habit's done flag for a day (defaults to today)
    ToggleHabit {
        id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Habits with streak and the last seven days
    Habits,

    /// Add an important date
    AddDate {
        title: String,
        date: String,
        /// Repeat every year on the same month and day
        #[arg(long)]
        recurring: bool,
    },
    /// Edit an important date
    EditDate {
        id: String,
        title: String,
        date: String,
        #[arg(long)]
        recurring: bool,
    },
    /// Remove an important date
    RemoveDate { id: String },
    /// Upcoming important dates
    Dates {
        #[arg(long)]
        search: Option<String>,
    },

    /// Add a quick note to the dashboard
    AddQuickNote {
        content: String,
        #[arg(long, default_value = "yellow")]
        color: String,
    },
    /// Remove a quick note
    RemoveQuickNote { id: String },
    /// List quick notes
    QuickNotes,

    /// Move an item to the trash (task, note, goal, notebook, expense)
    Delete { kind: String, id: String },
    /// List the trash with days left before purge
    Trash,
    /// Bring an item back from the trash
    Restore { kind: String, id: String },
    /// Permanently delete one trashed item
    Purge {
        kind: String,
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Permanently delete every trashed item whose countdown reached zero
    PurgeExpired {
        #[arg(long)]
        yes: bool,
    },

    /// Pinned and other categories
    Categories,
    /// Pin or unpin a category
    Pin { category: String },
    /// Move a category up or down
    MoveCategory { category: String, direction: String },

    /// Articles for everyone
    Articles,
    /// Publish an article (master only)
    AddArticle {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Edit an article (master only)
    EditArticle {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Delete an article (master only)
    DeleteArticle { id: String },
    /// Tutorials for everyone
    Tutorials,
    /// Add a tutorial (master only)
    AddTutorial {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        desc: String,
        #[arg(long, default_value = "Info")]
        icon: String,
    },
    /// Edit a tutorial (master only)
    EditTutorial {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        desc: String,
    },
    /// Delete a tutorial (master only)
    DeleteTutorial { id: String },
    /// Read a chapter, e.g. "psalm 23"
    Passage { reference: String },

    /// Export one category tab as a text report
    Export {
        category: String,
        /// tasks, notes, goals, notebooks or expenses
        tab: String,
        /// File to write, defaults to My_Report_<category>_<tab>.txt
        #[arg(long)]
        output: Option<PathBuf>,
        /// Copy the report to the clipboard instead of writing a file
        #[arg(long)]
        copy: bool,
    },
    /// Copy a short share text for a category tab to the clipboard
    Share { category: String, tab: String },
}

impl Commands {
    /// Commands that still run while access is denied
    pub fn bypasses_access(&self) -> bool {
        matches!(
            self,
            Commands::Logout
                | Commands::Whoami
                | Commands::DeleteAccount { .. }
                | Commands::Access
                | Commands::Checkout { .. }
                | Commands::CheckoutReturn { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error(transparent)]
    ContextError(#[from] ContextError),
    #[error(transparent)]
    AuthError(#[from] AuthError),
    #[error(transparent)]
    ValidationError(#[from] ValidationError),
    #[error(transparent)]
    ContentError(#[from] ContentError),
    #[error(transparent)]
    GateError(#[from] GateError),
    #[error("Not logged in. Run `myorg login <email or nickname> --password ...` first")]
    NotLoggedIn,
    #[error("No {kind} matches '{id}'")]
    NotFound { kind: &'static str, id: String },
    #[error("'{0}' matches more than one record, type more characters")]
    AmbiguousId(String),
    #[error("Access denied")]
    AccessDenied,
    #[error("No price configured for the {0} plan")]
    MissingPrice(&'static str),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Clipboard error: {0}")]
    ClipboardError(String),
}

/// Resolve a full id or a unique id prefix
fn resolve_id<T: Entity>(store: &EntityStore<T>, kind: &'static str, prefix: &str) -> Result<String, CliError> {
    let prefix = prefix.trim();
    if let Some(exact) = store.get(prefix) {
        return Ok(exact.id().to_string());
    }
    let mut matches = store.iter().filter(|r| !prefix.is_empty() && r.id().starts_with(prefix));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only.id().to_string()),
        (Some(_), Some(_)) => Err(CliError::AmbiguousId(prefix.to_string())),
        _ => Err(CliError::NotFound {
            kind,
            id: prefix.to_string(),
        }),
    }
}

fn resolve_trash_id(ctx: &AppContext, kind: TrashKind, prefix: &str) -> Result<String, CliError> {
    let data = &ctx.data;
    match kind {
        TrashKind::Task => resolve_id(&data.tasks, "task", prefix),
        TrashKind::Note => resolve_id(&data.notes, "note", prefix),
        TrashKind::Goal => resolve_id(&data.goals, "goal", prefix),
        TrashKind::Notebook => resolve_id(&data.notebooks, "notebook", prefix),
        TrashKind::Expense => resolve_id(&data.expenses, "expense", prefix),
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn known_category(category: &str) -> Result<&str, CliError> {
    let category = category.trim();
    if categories::is_known(category) {
        Ok(category)
    } else {
        Err(ValidationError::UnknownValue {
            field: "category",
            value: category.to_string(),
        }
        .into())
    }
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim"))
}

fn copy_to_clipboard(text: &str) -> Result<(), CliError> {
    let mut clipboard = arboard::Clipboard::new().map_err(|e| CliError::ClipboardError(e.to_string()))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|e| CliError::ClipboardError(e.to_string()))
}

fn optional_due(due: Option<&str>, ctx: &AppContext) -> Result<String, CliError> {
    match due {
        Some(due) => {
            let date = parse_date(due).map_err(|_| ValidationError::InvalidDate(due.to_string()))?;
            Ok(date_key(date))
        }
        None => Ok(ctx.clock().today_key()),
    }
}

fn required(value: &str, field: &'static str) -> Result<String, CliError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field).into());
    }
    Ok(value.to_string())
}

/// Handle the register command
pub fn handle_register(
    db: &Database,
    config: &Config,
    nickname: String,
    email: String,
    password: String,
) -> Result<(), CliError> {
    let registration = Registration {
        nickname,
        email,
        password,
    };
    let user = auth::register(db, config, &registration, Utc::now())?;
    println!("Account created for @{} ({}). You can log in now.", user.nickname, user.email);
    Ok(())
}

/// Handle the login command
/// Handle the login command; with `access.enforce` the gate is checked right away
pub async fn handle_login(
    db: &Database,
    config: &Config,
    identifier: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<(), CliError> {
    let session = auth::login(db, identifier, password)?;
    println!("Welcome back, @{}!", session.nickname);
    if config.access.enforce {
        enforce_access(&session, now, config).await?;
    }
    Ok(())
}

/// Handle the reset-password command
pub fn handle_reset_password(db: &Database, email: &str, password: &str, confirmation: &str) -> Result<(), CliError> {
    auth::reset_password(db, email, password, confirmation)?;
    println!("Password updated. You can log in now.");
    Ok(())
}

/// Verify access before a data command; prints the paywall on denial
pub async fn enforce_access(session: &Session, now: DateTime<Utc>, config: &Config) -> Result<(), CliError> {
    let gateway = HttpAccessGateway::from_config(&config.access)?;
    let mut gate = AccessGate::new();
    if gate.check(&gateway, &session.email).await {
        return Ok(());
    }
    print_paywall(&gate, session, now);
    Err(CliError::AccessDenied)
}

fn print_paywall(gate: &AccessGate, session: &Session, now: DateTime<Utc>) {
    if let Some(message) = gate.error() {
        eprintln!("{}", message);
    }
    let trial = auth::trial_days_remaining(session.created_at, now);
    println!("Your access is not active. Trial days left: {}", trial);
    println!("Choose a plan with `myorg checkout <plan>`:");
    for plan in SubscriptionPlan::ALL {
        println!("  - {}", plan.as_str());
    }
}

/// Run a command that needs a logged-in context. Mutating commands save.
pub async fn run(command: Commands, ctx: &mut AppContext, config: &Config) -> Result<(), CliError> {
    let today = ctx.today();
    let mut changed = false;

    match command {
        Commands::Register { .. } | Commands::Login { .. } | Commands::ResetPassword { .. } | Commands::Logout => {
            // Handled before a context exists
        }
        Commands::DeleteAccount { .. } => {
            // Consumes the context; handled by the caller
        }
        Commands::Whoami => {
            let session = ctx.session();
            println!("@{} <{}>", session.nickname, session.email);
            println!("Role: {}", session.role.as_str());
            if let Some(plan) = session.subscription_plan {
                println!("Plan: {}", plan.as_str());
            }
            println!(
                "Trial days left: {}",
                auth::trial_days_remaining(session.created_at, ctx.now())
            );
        }
        Commands::Rename { nickname } => {
            ctx.change_nickname(&nickname)?;
            println!("You are now @{}", ctx.session().nickname);
        }
        Commands::Access => {
            let gateway = HttpAccessGateway::from_config(&config.access)?;
            let mut gate = AccessGate::new();
            if gate.check(&gateway, &ctx.session().email).await {
                println!("Access granted.");
            } else {
                print_paywall(&gate, ctx.session(), ctx.now());
                return Err(CliError::AccessDenied);
            }
        }
        Commands::Checkout { plan } => {
            let plan: SubscriptionPlan = plan.parse()?;
            let price_id = config
                .access
                .price_ids
                .for_plan(plan)
                .ok_or(CliError::MissingPrice(plan.as_str()))?;
            let gateway = HttpAccessGateway::from_config(&config.access)?;
            let url = gateway
                .create_checkout_session(&ctx.session().email, price_id, &config.access.return_url)
                .await?;
            ctx.choose_plan(plan)?;
            println!("Open this page to finish the payment:\n{}", url);
        }
        Commands::CheckoutReturn { session_id } => {
            let gateway = HttpAccessGateway::from_config(&config.access)?;
            let mut gate = AccessGate::new();
            if gate.confirm_checkout(&gateway, &session_id, &ctx.session().email).await {
                println!("Payment confirmed. Access granted.");
            } else {
                print_paywall(&gate, ctx.session(), ctx.now());
                return Err(CliError::AccessDenied);
            }
        }

        Commands::Dashboard { date } => {
            let day = match date {
                Some(d) => parse_date(&d).map_err(|_| ValidationError::InvalidDate(d.clone()))?,
                None => today,
            };
            print_dashboard(ctx, day);
        }
        Commands::Search { query } => {
            let hits = dashboard::search(&ctx.data.tasks, &ctx.data.important_dates, &query);
            if hits.is_empty() {
                println!("Nothing found for '{}'", query);
            }
            for hit in hits {
                match hit {
                    SearchHit::Task(t) => println!("task  {}  {} (due {})", short(&t.id), t.title, t.due_date),
                    SearchHit::Date(d) => println!("date  {}  {} ({})", short(&d.id), d.title, d.date),
                }
            }
        }
        Commands::QuickTask { title } => {
            let task = dashboard::quick_task(&title, today)?;
            let id = ctx.data.tasks.create(task);
            println!("Task created successfully (ID: {})", short(&id));
            changed = true;
        }

        Commands::AddTask {
            category,
            title,
            priority,
            due,
        } => {
            let category = known_category(&category)?;
            let priority: Priority = priority.parse()?;
            let due = optional_due(due.as_deref(), ctx)?;
            let title = required(&title, "title")?;
            let id = ctx.data.tasks.create(Task::new(category, &title, priority, &due));
            println!("Task created successfully (ID: {})", short(&id));
            changed = true;
        }
        Commands::EditTask {
            id,
            title,
            priority,
            due,
        } => {
            let id = resolve_id(&ctx.data.tasks, "task", &id)?;
            let patch = TaskPatch {
                title,
                priority: priority.as_deref().map(str::parse::<Priority>).transpose()?,
                due_date: due,
            };
            items::edit_task(&mut ctx.data.tasks, &id, patch)?;
            println!("Task updated.");
            changed = true;
        }
        Commands::ToggleTask { id } => {
            let id = resolve_id(&ctx.data.tasks, "task", &id)?;
            ctx.data.tasks.update(&id, |t| t.completed = !t.completed);
            changed = true;
        }
        Commands::Tasks { category } => {
            let category = known_category(&category)?;
            for task in ctx.data.tasks.active().filter(|t| t.category_id == category) {
                let mark = if task.completed { 'x' } else { ' ' };
                println!(
                    "[{}] {}  {}  ({}, due {})",
                    mark,
                    short(&task.id),
                    task.title,
                    task.priority,
                    task.due_date
                );
            }
        }

        Commands::AddNote { category, content } => {
            let category = known_category(&category)?;
            let content = required(&content, "content")?;
            let id = ctx.data.notes.create(Note::new(category, &content, ctx.now()));
            println!("Note created successfully (ID: {})", short(&id));
            changed = true;
        }
        Commands::EditNote { id, content } => {
            let id = resolve_id(&ctx.data.notes, "note", &id)?;
            items::edit_note(&mut ctx.data.notes, &id, &content)?;
            println!("Note updated.");
            changed = true;
        }
        Commands::Notes { category } => {
            let category = known_category(&category)?;
            for note in ctx.data.notes.active().filter(|n| n.category_id == category) {
                println!("{}  {}", short(&note.id), note.timestamp.format("%Y-%m-%d %H:%M"));
                println!("    {}", note.content);
            }
        }

        Commands::AddGoal {
            category,
            title,
            due,
            description,
        } => {
            let category = known_category(&category)?;
            let title = required(&title, "title")?;
            let due = match due {
                Some(d) => optional_due(Some(&d), ctx)?,
                None => String::new(),
            };
            let mut goal = Goal::new(category, &title, &due);
            goal.description = description.unwrap_or_default();
            let id = ctx.data.goals.create(goal);
            println!("Goal created successfully (ID: {})", short(&id));
            changed = true;
        }
        Commands::GoalStatus { id, status } => {
            let id = resolve_id(&ctx.data.goals, "goal", &id)?;
            let patch = GoalPatch {
                status: Some(status.parse::<GoalStatus>()?),
                ..GoalPatch::default()
            };
            items::edit_goal(&mut ctx.data.goals, &id, patch)?;
            changed = true;
        }
        Commands::EditGoal {
            id,
            title,
            due,
            description,
            status,
        } => {
            let id = resolve_id(&ctx.data.goals, "goal", &id)?;
            let patch = GoalPatch {
                title,
                description,
                due_date: due,
                status: status.as_deref().map(str::parse::<GoalStatus>).transpose()?,
            };
            items::edit_goal(&mut ctx.data.goals, &id, patch)?;
            println!("Goal updated.");
            changed = true;
        }
        Commands::Goals { category } => {
            let category = known_category(&category)?;
            for countdown in dashboard::goal_countdowns(&ctx.data.goals, today)
                .into_iter()
                .filter(|c| c.goal.category_id == category)
            {
                println!(
                    "{}  {} [{}]  {} day(s) left",
                    short(&countdown.goal.id),
                    countdown.goal.title,
                    countdown.goal.status,
                    countdown.days_left
                );
            }
        }

        Commands::AddNotebook {
            category,
            title,
            content,
            link,
            image_url,
        } => {
            let category = known_category(&category)?;
            let title = required(&title, "title")?;
            let mut notebook = Notebook::new(category, &title, content.as_deref().unwrap_or_default());
            notebook.link = link;
            notebook.image_url = image_url;
            let id = ctx.data.notebooks.create(notebook);
            println!("Notebook page created successfully (ID: {})", short(&id));
            changed = true;
        }
        Commands::EditNotebook {
            id,
            title,
            content,
            link,
            image_url,
        } => {
            let id = resolve_id(&ctx.data.notebooks, "notebook", &id)?;
            let patch = NotebookPatch {
                title,
                content,
                link,
                image_url,
            };
            items::edit_notebook(&mut ctx.data.notebooks, &id, patch)?;
            println!("Notebook page updated.");
            changed = true;
        }
        Commands::Notebooks { category } => {
            let category = known_category(&category)?;
            for notebook in ctx.data.notebooks.active().filter(|n| n.category_id == category) {
                println!("{}  {}", short(&notebook.id), notebook.title);
            }
        }

        Commands::AddExpense {
            category,
            description,
            amount,
            due,
            installments,
            recurring,
        } => {
            let category = known_category(&category)?;
            let form = ExpenseForm {
                description,
                amount,
                due_date: due,
                is_recurring: recurring,
                installments,
            };
            let ids = expenses::create_expense(&mut ctx.data.expenses, category, &form)?;
            println!("{} expense record(s) created.", ids.len());
            changed = true;
        }
        Commands::EditExpense {
            id,
            description,
            amount,
            due,
        } => {
            let id = resolve_id(&ctx.data.expenses, "expense", &id)?;
            expenses::edit_expense(&mut ctx.data.expenses, &id, &description, &amount, &due)?;
            println!("Expense updated.");
            changed = true;
        }
        Commands::PayExpense { id } => {
            let id = resolve_id(&ctx.data.expenses, "expense", &id)?;
            expenses::toggle_paid(&mut ctx.data.expenses, &id);
            changed = true;
        }
        Commands::Expenses { month, category } => {
            let view = MonthView::resolve(month.as_deref().unwrap_or_default(), today)?;
            let category = category.as_deref().map(known_category).transpose()?;
            for expense in expenses::expenses_in_month(&ctx.data.expenses, view, category) {
                let mark = if expense.paid { 'x' } else { ' ' };
                println!(
                    "[{}] {}  {}  {:.2}  due {}",
                    mark,
                    short(&expense.id),
                    expense.description,
                    expense.amount,
                    expense.due_date
                );
            }
            let totals = expenses::monthly_totals(&ctx.data.expenses, view, category);
            println!(
                "{:04}-{:02}  total {:.2}  paid {:.2}  remaining {:.2}",
                view.year, view.month, totals.total, totals.paid, totals.remaining
            );
        }

        Commands::AddHabit { title } => {
            let now = ctx.now();
            let id = habits::create_habit(&mut ctx.data.habits, &title, now)?;
            println!("Habit created successfully (ID: {})", short(&id));
            changed = true;
        }
        Commands::RenameHabit { id, title } => {
            let id = resolve_id(&ctx.data.habits, "habit", &id)?;
            habits::rename_habit(&mut ctx.data.habits, &id, &title)?;
            changed = true;
        }
        Commands::ToggleHabit { id, date } => {
            let id = resolve_id(&ctx.data.habits, "habit", &id)?;
            let day = match date {
                Some(d) => parse_date(&d).map_err(|_| ValidationError::InvalidDate(d.clone()))?,
                None => today,
            };
            habits::toggle_day(&mut ctx.data.habits, &id, day);
            changed = true;
        }
        Commands::Habits => {
            for habit in ctx.data.habits.iter() {
                let week: String = habits::trailing_week(&habit.history, today)
                    .iter()
                    .map(|d| if d.done { '#' } else { '.' })
                    .collect();
                println!(
                    "{}  {}  streak {}  [{}]",
                    short(&habit.id),
                    habit.title,
                    habits::current_streak(&habit.history, today),
                    week
                );
            }
        }

        Commands::AddDate { title, date, recurring } => {
            let record = recurrence::new_important_date(&title, &date, recurring)?;
            let id = ctx.data.important_dates.create(record);
            println!("Date saved (ID: {})", short(&id));
            changed = true;
        }
        Commands::EditDate {
            id,
            title,
            date,
            recurring,
        } => {
            let id = resolve_id(&ctx.data.important_dates, "date", &id)?;
            recurrence::edit_important_date(&mut ctx.data.important_dates, &id, &title, &date, recurring)?;
            changed = true;
        }
        Commands::RemoveDate { id } => {
            let id = resolve_id(&ctx.data.important_dates, "date", &id)?;
            ctx.data.important_dates.purge(&id);
            changed = true;
        }
        Commands::Dates { search } => {
            let search = search.unwrap_or_default();
            for occurrence in recurrence::upcoming(&ctx.data.important_dates, today, &search) {
                println!(
                    "{}  {}  {}  ({:+} day(s))",
                    short(&occurrence.date.id),
                    date_key(occurrence.on),
                    occurrence.date.title,
                    occurrence.diff_days
                );
            }
        }

        Commands::AddQuickNote { content, color } => {
            let content = required(&content, "content")?;
            let id = ctx.data.quick_notes.create(QuickNote::new(&content, &color));
            println!("Quick note added (ID: {})", short(&id));
            changed = true;
        }
        Commands::RemoveQuickNote { id } => {
            let id = resolve_id(&ctx.data.quick_notes, "quick note", &id)?;
            ctx.data.quick_notes.purge(&id);
            changed = true;
        }
        Commands::QuickNotes => {
            for note in ctx.data.quick_notes.iter() {
                println!("{}  ({})  {}", short(&note.id), note.color, note.content);
            }
        }

        Commands::Delete { kind, id } => {
            let kind: TrashKind = kind.parse()?;
            let id = resolve_trash_id(ctx, kind, &id)?;
            let now = ctx.now();
            if trash::soft_delete(&mut ctx.data, kind, &id, now) {
                println!("Moved {} to the trash.", kind);
                changed = true;
            } else {
                println!("That {} is already in the trash.", kind);
            }
        }
        Commands::Trash => {
            let items = trash::list(&ctx.data, ctx.retention(), ctx.now());
            if items.is_empty() {
                println!("The trash is empty.");
            }
            for item in items {
                println!(
                    "{:<8} {}  {}  ({} day(s) left)",
                    item.kind.as_str(),
                    short(&item.id),
                    item.title,
                    item.days_remaining
                );
            }
        }
        Commands::Restore { kind, id } => {
            let kind: TrashKind = kind.parse()?;
            let id = resolve_trash_id(ctx, kind, &id)?;
            trash::restore(&mut ctx.data, kind, &id);
            println!("Restored {}.", kind);
            changed = true;
        }
        Commands::Purge { kind, id, yes } => {
            let kind: TrashKind = kind.parse()?;
            let id = resolve_trash_id(ctx, kind, &id)?;
            if yes || confirm(&format!("Permanently delete this {}?", kind))? {
                trash::purge(&mut ctx.data, kind, &id);
                println!("Deleted permanently.");
                changed = true;
            }
        }
        Commands::PurgeExpired { yes } => {
            if yes || confirm("Permanently delete every expired item in the trash?")? {
                let now = ctx.now();
                let retention = *ctx.retention();
                let removed = trash::purge_expired(&mut ctx.data, &retention, now);
                println!("{} item(s) deleted permanently.", removed);
                changed = removed > 0;
            }
        }

        Commands::Categories => {
            println!("Pinned:");
            for config in categories::pinned(&ctx.data.category_configs) {
                println!("  {}", config.id);
            }
            println!("Categories:");
            for config in categories::unpinned(&ctx.data.category_configs) {
                println!("  {}", config.id);
            }
        }
        Commands::Pin { category } => {
            let category = known_category(&category)?;
            categories::toggle_pin(&mut ctx.data.category_configs, category);
            changed = true;
        }
        Commands::MoveCategory { category, direction } => {
            let category = known_category(&category)?;
            let direction = match direction.trim().to_lowercase().as_str() {
                "up" => Direction::Up,
                "down" => Direction::Down,
                other => {
                    return Err(ValidationError::UnknownValue {
                        field: "direction",
                        value: other.to_string(),
                    }
                    .into());
                }
            };
            changed = categories::move_category(&mut ctx.data.category_configs, category, direction);
        }

        Commands::Articles => {
            for article in content::articles(&ctx.global) {
                println!(
                    "{}  {}  by {} on {}",
                    short(&article.id),
                    article.title,
                    article.author,
                    article.date.format("%Y-%m-%d")
                );
            }
        }
        Commands::AddArticle { title, content } => {
            let session = ctx.session().clone();
            let now = ctx.now();
            content::add_article(&mut ctx.global, &session, &title, &content, now)?;
            println!("Article published.");
            changed = true;
        }
        Commands::EditArticle { id, title, content } => {
            let session = ctx.session().clone();
            let id = resolve_id(&ctx.global.articles, "article", &id)?;
            content::update_article(&mut ctx.global, &session, &id, &title, &content)?;
            changed = true;
        }
        Commands::DeleteArticle { id } => {
            let session = ctx.session().clone();
            let id = resolve_id(&ctx.global.articles, "article", &id)?;
            content::delete_article(&mut ctx.global, &session, &id)?;
            changed = true;
        }
        Commands::Tutorials => {
            for tutorial in ctx.global.tutorials.iter() {
                println!("{}  {}  {}", short(&tutorial.id), tutorial.title, tutorial.desc);
            }
        }
        Commands::AddTutorial { title, desc, icon } => {
            let session = ctx.session().clone();
            content::add_tutorial(&mut ctx.global, &session, &title, &desc, &icon)?;
            changed = true;
        }
        Commands::EditTutorial { id, title, desc } => {
            let session = ctx.session().clone();
            let id = resolve_id(&ctx.global.tutorials, "tutorial", &id)?;
            content::update_tutorial(&mut ctx.global, &session, &id, &title, &desc)?;
            changed = true;
        }
        Commands::DeleteTutorial { id } => {
            let session = ctx.session().clone();
            let id = resolve_id(&ctx.global.tutorials, "tutorial", &id)?;
            content::delete_tutorial(&mut ctx.global, &session, &id)?;
            changed = true;
        }
        Commands::Passage { reference } => {
            let passage = content::parse_reference(&reference).ok_or_else(|| ValidationError::UnknownValue {
                field: "book",
                value: reference.clone(),
            })?;
            let provider = HttpPassageProvider::new(
                &config.content.passage_url,
                Duration::from_secs(config.content.timeout_secs),
            );
            let text = provider.fetch_passage(passage.book, passage.chapter).await?;
            println!("{} {}\n\n{}", passage.book, passage.chapter, text);
        }

        Commands::Export {
            category,
            tab,
            output,
            copy,
        } => {
            let category = known_category(&category)?;
            let tab: ReportTab = tab.parse()?;
            let emitted_at = ctx.now().with_timezone(&ctx.clock().timezone());
            let report = export::render_report(&ctx.data, category, tab, emitted_at);
            if copy {
                copy_to_clipboard(&report)?;
                println!("Report copied to the clipboard.");
            } else {
                let path = output.unwrap_or_else(|| PathBuf::from(export::default_file_name(category, tab)));
                std::fs::write(&path, report)?;
                println!("Report written to {}", path.display());
            }
        }
        Commands::Share { category, tab } => {
            let category = known_category(&category)?;
            let tab: ReportTab = tab.parse()?;
            copy_to_clipboard(&export::share_text(category, tab))?;
            println!("Share text copied to the clipboard.");
        }
    }

    if changed || ctx.needs_save() {
        ctx.save()?;
    }
    Ok(())
}

fn print_dashboard(ctx: &AppContext, day: chrono::NaiveDate) {
    let today = ctx.today();
    let data = &ctx.data;

    println!("Tasks for {}:", date_key(day));
    for task in dashboard::tasks_for_day(&data.tasks, day, today) {
        let mark = if task.completed { 'x' } else { ' ' };
        println!("  [{}] {}  {} ({}, due {})", mark, short(&task.id), task.title, task.priority, task.due_date);
    }

    println!("Goals:");
    for countdown in dashboard::goal_countdowns(&data.goals, today) {
        println!("  {}  {} day(s) left", countdown.goal.title, countdown.days_left);
    }

    let notifications = dashboard::notifications(&data.tasks, &data.important_dates, today);
    println!("Notifications: {}", notifications.total());
    for task in &notifications.overdue_tasks {
        println!("  overdue: {} (due {})", task.title, task.due_date);
    }
    for occurrence in &notifications.dates_today {
        println!("  today: {}", occurrence.date.title);
    }

    println!("This week:");
    for bucket in dashboard::weekly_chart(&data.tasks, today, ctx.language()) {
        println!("  {}  done {}  pending {}", bucket.label, bucket.completed, bucket.pending);
    }

    let dist = dashboard::status_distribution(&data.tasks);
    println!(
        "Status: {} completed, {} in progress, {} pending",
        dist.completed, dist.in_progress, dist.pending
    );

    println!("Upcoming dates:");
    for occurrence in recurrence::upcoming(&data.important_dates, today, "") {
        println!("  {}  {} ({:+} day(s))", date_key(occurrence.on), occurrence.date.title, occurrence.diff_days);
    }
}
