//! Expenses: form parsing, installment generation and monthly totals.

use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Expense, ValidationError};
use crate::store::EntityStore;
use crate::utils::{date_key, new_id, parse_date};

/// Raw expense form as typed by the user
#[derive(Debug, Clone, Default)]
pub struct ExpenseForm {
    pub description: String,
    pub amount: String,
    pub due_date: String,
    pub is_recurring: bool,
    pub installments: String,
}

/// Parse a currency amount, rounded to cents. A lone decimal comma is accepted.
pub fn parse_amount(input: &str) -> Result<Decimal, ValidationError> {
    let trimmed = input.trim();
    let normalized = if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    let amount = Decimal::from_str(&normalized)
        .map_err(|_| ValidationError::InvalidAmount(input.to_string()))?;
    if amount.is_sign_negative() {
        return Err(ValidationError::InvalidAmount(input.to_string()));
    }
    Ok(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

pub const MAX_INSTALLMENTS: u32 = 600;

/// Installment count; anything unparseable or below one means a single payment
pub fn parse_installments(input: &str) -> Result<u32, ValidationError> {
    let count = input.trim().parse::<u32>().ok().filter(|n| *n >= 1).unwrap_or(1);
    if count > MAX_INSTALLMENTS {
        return Err(ValidationError::TooManyInstallments { max: MAX_INSTALLMENTS });
    }
    Ok(count)
}

fn parse_due_date(input: &str) -> Result<NaiveDate, ValidationError> {
    parse_date(input).map_err(|_| ValidationError::InvalidDate(input.to_string()))
}

/// Build the records for one submitted form: one per installment, one month apart
pub fn build_expenses(category_id: &str, form: &ExpenseForm) -> Result<Vec<Expense>, ValidationError> {
    let description = form.description.trim();
    if description.is_empty() {
        return Err(ValidationError::Required("description"));
    }
    let amount = parse_amount(&form.amount)?;
    let base = parse_due_date(&form.due_date)?;
    let count = parse_installments(&form.installments)?;
    let group_id = (count > 1).then(new_id);

    (0..count)
        .map(|index| -> Result<Expense, ValidationError> {
            let due = base
                .checked_add_months(Months::new(index))
                .ok_or_else(|| ValidationError::InvalidDate(form.due_date.clone()))?;
            let description = if count > 1 {
                format!("{} ({}/{})", description, index + 1, count)
            } else {
                description.to_string()
            };
            Ok(Expense {
                id: new_id(),
                category_id: category_id.to_string(),
                description,
                amount,
                due_date: date_key(due),
                is_recurring: form.is_recurring,
                installments: count,
                current_installment: index + 1,
                paid: false,
                group_id: group_id.clone(),
                deleted_at: None,
            })
        })
        .collect()
}

/// Validate the form and insert every generated record; returns their ids
pub fn create_expense(
    store: &mut EntityStore<Expense>,
    category_id: &str,
    form: &ExpenseForm,
) -> Result<Vec<String>, ValidationError> {
    let records = build_expenses(category_id, form)?;
    Ok(store.create_many(records))
}

/// Edit description, amount and due date of a single record. Siblings are untouched.
pub fn edit_expense(
    store: &mut EntityStore<Expense>,
    id: &str,
    description: &str,
    amount: &str,
    due_date: &str,
) -> Result<bool, ValidationError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(ValidationError::Required("description"));
    }
    let amount = parse_amount(amount)?;
    let due = parse_due_date(due_date)?;
    Ok(store.update(id, |e| {
        e.description = description.to_string();
        e.amount = amount;
        e.due_date = date_key(due);
    }))
}

pub fn toggle_paid(store: &mut EntityStore<Expense>, id: &str) -> bool {
    store.update(id, |e| e.paid = !e.paid)
}

/// Month currently being viewed in the expenses module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthView {
    pub year: i32,
    /// 1..=12
    pub month: u32,
}

impl MonthView {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `next`, `prev` or `current` relative to `today`'s month, otherwise `YYYY-MM`
    pub fn resolve(input: &str, today: NaiveDate) -> Result<Self, ValidationError> {
        let current = Self::containing(today);
        match input.trim().to_lowercase().as_str() {
            "" | "current" => Ok(current),
            "next" => Ok(current.shift(1)),
            "prev" | "previous" => Ok(current.shift(-1)),
            other => other.parse(),
        }
    }

    /// Move by `delta` months, wrapping across years
    pub fn shift(self, delta: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + delta;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl FromStr for MonthView {
    type Err = ValidationError;

    /// Parses `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidDate(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        MonthView::new(year, month).ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonthlyTotals {
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
}

/// Non-deleted expenses due in `view`, optionally limited to one category
pub fn expenses_in_month<'a>(
    store: &'a EntityStore<Expense>,
    view: MonthView,
    category_id: Option<&str>,
) -> Vec<&'a Expense> {
    store
        .active()
        .filter(|e| category_id.is_none_or(|c| e.category_id == c))
        .filter(|e| parse_date(&e.due_date).is_ok_and(|d| view.contains(d)))
        .collect()
}

pub fn monthly_totals(
    store: &EntityStore<Expense>,
    view: MonthView,
    category_id: Option<&str>,
) -> MonthlyTotals {
    let mut totals = MonthlyTotals::default();
    for expense in expenses_in_month(store, view, category_id) {
        totals.total += expense.amount;
        if expense.paid {
            totals.paid += expense.amount;
        }
    }
    totals.remaining = totals.total - totals.paid;
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn form(description: &str, amount: &str, due: &str, installments: &str) -> ExpenseForm {
        ExpenseForm {
            description: description.to_string(),
            amount: amount.to_string(),
            due_date: due.to_string(),
            is_recurring: false,
            installments: installments.to_string(),
        }
    }

    #[test]
    fn three_installments_share_a_group_one_month_apart() {
        let mut store = EntityStore::new();
        let ids = create_expense(&mut store, "finances", &form("Rent", "500", "2024-01-10", "3")).unwrap();
        assert_eq!(ids.len(), 3);

        let records: Vec<&Expense> = ids.iter().map(|id| store.get(id).unwrap()).collect();
        let dues: Vec<&str> = records.iter().map(|e| e.due_date.as_str()).collect();
        assert_eq!(dues, vec!["2024-01-10", "2024-02-10", "2024-03-10"]);

        let descriptions: Vec<&str> = records.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Rent (1/3)", "Rent (2/3)", "Rent (3/3)"]);

        let group = records[0].group_id.clone();
        assert!(group.is_some());
        assert!(records.iter().all(|e| e.group_id == group));
        assert!(records.iter().all(|e| e.amount == dec!(500) && e.installments == 3 && !e.paid));
        assert_eq!(records[2].current_installment, 3);
    }

    #[test]
    fn single_payment_has_no_group_or_suffix() {
        let records = build_expenses("finances", &form("Gym", "89,90", "2024-05-05", "")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Gym");
        assert_eq!(records[0].amount, dec!(89.90));
        assert!(records[0].group_id.is_none());
    }

    #[test]
    fn month_end_installments_clamp_to_shorter_months() {
        let records = build_expenses("finances", &form("Card", "10", "2024-01-31", "3")).unwrap();
        let dues: Vec<&str> = records.iter().map(|e| e.due_date.as_str()).collect();
        assert_eq!(dues, vec!["2024-01-31", "2024-02-29", "2024-03-31"]);
    }

    #[test]
    fn non_numeric_amount_creates_nothing() {
        let mut store = EntityStore::new();
        let err = create_expense(&mut store, "finances", &form("Rent", "abc", "2024-01-10", "2"));
        assert!(matches!(err, Err(ValidationError::InvalidAmount(_))));
        assert!(store.is_empty());

        assert!(parse_amount("").is_err());
        assert!(parse_amount("-5").is_err());
        assert_eq!(parse_amount(" 12.345 ").unwrap(), dec!(12.35));
    }

    #[test]
    fn installment_count_falls_back_to_one() {
        assert_eq!(parse_installments("0"), Ok(1));
        assert_eq!(parse_installments("x"), Ok(1));
        assert_eq!(parse_installments("4"), Ok(4));
        assert_eq!(parse_installments("600"), Ok(600));
    }

    #[test]
    fn installment_count_is_capped() {
        let mut store = EntityStore::new();
        let err = create_expense(&mut store, "finances", &form("Car", "100", "2024-01-10", "99999999"));
        assert_eq!(err, Err(ValidationError::TooManyInstallments { max: 600 }));
        assert!(store.is_empty());
    }

    #[test]
    fn edit_touches_only_one_sibling() {
        let mut store = EntityStore::new();
        let ids = create_expense(&mut store, "finances", &form("Sofa", "300", "2024-01-15", "2")).unwrap();
        assert!(edit_expense(&mut store, &ids[0], "Sofa first", "250", "2024-01-20").unwrap());
        assert_eq!(store.get(&ids[0]).unwrap().amount, dec!(250));
        assert_eq!(store.get(&ids[1]).unwrap().amount, dec!(300));
        assert_eq!(store.get(&ids[1]).unwrap().description, "Sofa (2/2)");
        assert!(!edit_expense(&mut store, "missing", "x", "1", "2024-01-01").unwrap());
    }

    #[test]
    fn monthly_totals_split_paid_and_remaining() {
        let mut store = EntityStore::new();
        let ids = create_expense(&mut store, "finances", &form("Rent", "500", "2024-01-10", "2")).unwrap();
        let water = create_expense(&mut store, "finances", &form("Water", "40.50", "2024-01-20", "1")).unwrap();
        let trashed = create_expense(&mut store, "finances", &form("Old", "99", "2024-01-05", "1")).unwrap();
        create_expense(&mut store, "health", &form("Pharmacy", "30", "2024-01-07", "1")).unwrap();
        toggle_paid(&mut store, &water[0]);
        store.soft_delete(&trashed[0], Utc::now());

        let january = MonthView::new(2024, 1).unwrap();
        let all = monthly_totals(&store, january, None);
        assert_eq!(all.total, dec!(570.50));
        assert_eq!(all.paid, dec!(40.50));
        assert_eq!(all.remaining, all.total - all.paid);

        let finances = monthly_totals(&store, january, Some("finances"));
        assert_eq!(finances.total, dec!(540.50));

        let february = monthly_totals(&store, january.shift(1), None);
        assert_eq!(february.total, dec!(500));
        assert!(store.get(&ids[1]).is_some());
    }

    #[test]
    fn month_view_wraps_across_years() {
        let december = MonthView::new(2023, 12).unwrap();
        assert_eq!(december.shift(1), MonthView::new(2024, 1).unwrap());
        assert_eq!(MonthView::new(2024, 1).unwrap().shift(-1), december);
        assert_eq!("2024-02".parse::<MonthView>().unwrap(), MonthView::new(2024, 2).unwrap());
        assert!("2024-13".parse::<MonthView>().is_err());
    }

    #[test]
    fn relative_months_resolve_from_today() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        assert_eq!(MonthView::resolve("next", today), Ok(MonthView::new(2025, 1).unwrap()));
        assert_eq!(MonthView::resolve("prev", today), Ok(MonthView::new(2024, 11).unwrap()));
        assert_eq!(MonthView::resolve("", today), Ok(MonthView::new(2024, 12).unwrap()));
        assert_eq!(MonthView::resolve("2023-03", today), Ok(MonthView::new(2023, 3).unwrap()));
        assert!(MonthView::resolve("later", today).is_err());
    }
}
