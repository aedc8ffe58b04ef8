use chrono::{DateTime, NaiveDate, Utc};
use shared::ExpenseCategory;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use super::user::UserId;

/// Monetary amount held as integer minor units (cents).
///
/// Summation over `Amount` is exact, so category totals always add up to the
/// grand total regardless of the order records arrive in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    /// Largest amount a single expense may carry: one trillion units
    pub const MAX: Amount = Amount(100_000_000_000_000);

    pub fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Parse user-entered text such as "12", "12.5" or "12.50".
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingAmount);
        }
        if trimmed.starts_with('-') {
            return Err(ValidationError::NegativeAmount);
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(ValidationError::InvalidAmount(trimmed.to_string()));
        }
        if fraction.len() > 2 {
            return Err(ValidationError::TooManyDecimals(trimmed.to_string()));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ValidationError::InvalidAmount(trimmed.to_string()))?
        };
        let fraction_value: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().unwrap_or(0) * 10,
            _ => fraction.parse::<i64>().unwrap_or(0),
        };

        whole_value
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction_value))
            .map(Amount)
            .filter(|amount| *amount <= Amount::MAX)
            .ok_or_else(|| ValidationError::InvalidAmount(trimmed.to_string()))
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Amount {
    type Output = Amount;

    /// Saturates at the i64 limits
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, amount| acc + amount)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.copied().sum()
    }
}

/// Store-assigned expense identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpenseId(String);

impl ExpenseId {
    pub fn generate() -> Self {
        ExpenseId(format!("exp_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ExpenseId {
    fn from(value: String) -> Self {
        ExpenseId(value)
    }
}

impl From<&str> for ExpenseId {
    fn from(value: &str) -> Self {
        ExpenseId(value.to_string())
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: ExpenseId,
    pub owner: UserId,
    pub amount: Amount,
    pub category: ExpenseCategory,
    pub occurred_on: NaiveDate,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Raw, unvalidated form fields exactly as the user typed them
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseForm {
    pub amount: String,
    pub category: String,
    /// YYYY-MM-DD
    pub occurred_on: String,
    pub comment: String,
}

impl ExpenseForm {
    pub fn new() -> Self {
        Self {
            amount: String::new(),
            category: ExpenseCategory::default().as_str().to_string(),
            occurred_on: String::new(),
            comment: String::new(),
        }
    }

    /// Pre-populate the form from an existing record for editing
    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            amount: expense.amount.to_string(),
            category: expense.category.as_str().to_string(),
            occurred_on: expense.occurred_on.format("%Y-%m-%d").to_string(),
            comment: expense.comment.clone(),
        }
    }
}

impl Default for ExpenseForm {
    fn default() -> Self {
        Self::new()
    }
}

/// The validated, mutable fields of an expense
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub amount: Amount,
    pub category: ExpenseCategory,
    pub occurred_on: NaiveDate,
    pub comment: String,
}

impl ExpenseDraft {
    /// Validate a form. Presence of amount, category and date is checked
    /// before any of them is parsed.
    pub fn parse(form: &ExpenseForm) -> Result<Self, ValidationError> {
        if form.amount.trim().is_empty() {
            return Err(ValidationError::MissingAmount);
        }
        if form.category.trim().is_empty() {
            return Err(ValidationError::MissingCategory);
        }
        if form.occurred_on.trim().is_empty() {
            return Err(ValidationError::MissingDate);
        }

        let amount = Amount::parse(&form.amount)?;
        let category = form
            .category
            .parse::<ExpenseCategory>()
            .map_err(|e| ValidationError::UnknownCategory(e.0))?;
        let occurred_on = parse_calendar_date(&form.occurred_on)?;

        Ok(Self {
            amount,
            category,
            occurred_on,
            comment: form.comment.trim().to_string(),
        })
    }
}

/// Parse a YYYY-MM-DD date; the result is a plain calendar date, so there is
/// no timezone shift between what the user picked and what gets stored.
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(trimmed.to_string()))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter an amount.")]
    MissingAmount,
    #[error("Please choose a category.")]
    MissingCategory,
    #[error("Please pick a date.")]
    MissingDate,
    #[error("'{0}' is not a valid amount.")]
    InvalidAmount(String),
    #[error("Amount cannot be negative.")]
    NegativeAmount,
    #[error("'{0}' has more than two decimal places.")]
    TooManyDecimals(String),
    #[error("'{0}' is not a known category.")]
    UnknownCategory(String),
    #[error("'{0}' is not a valid date (expected YYYY-MM-DD).")]
    InvalidDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(amount: &str, category: &str, date: &str) -> ExpenseForm {
        ExpenseForm {
            amount: amount.to_string(),
            category: category.to_string(),
            occurred_on: date.to_string(),
            comment: String::new(),
        }
    }

    #[test]
    fn test_amount_parse_accepts_common_inputs() {
        assert_eq!(Amount::parse("12").unwrap().cents(), 1200);
        assert_eq!(Amount::parse("12.5").unwrap().cents(), 1250);
        assert_eq!(Amount::parse(" 12.50 ").unwrap().cents(), 1250);
        assert_eq!(Amount::parse(".99").unwrap().cents(), 99);
        assert_eq!(Amount::parse("0").unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_amount_parse_rejects_bad_inputs() {
        assert_eq!(Amount::parse(""), Err(ValidationError::MissingAmount));
        assert_eq!(Amount::parse("-3"), Err(ValidationError::NegativeAmount));
        assert!(matches!(Amount::parse("1.234"), Err(ValidationError::TooManyDecimals(_))));
        assert!(matches!(Amount::parse("abc"), Err(ValidationError::InvalidAmount(_))));
        assert!(matches!(Amount::parse("."), Err(ValidationError::InvalidAmount(_))));
        assert!(matches!(Amount::parse("NaN"), Err(ValidationError::InvalidAmount(_))));
        assert!(matches!(Amount::parse("1e3"), Err(ValidationError::InvalidAmount(_))));
    }

    #[test]
    fn test_amount_display_and_float_conversion() {
        assert_eq!(Amount::from_cents(1950).to_string(), "19.50");
        assert_eq!(Amount::from_cents(7).to_string(), "0.07");
        assert_eq!(Amount::from_cents(1250).to_f64(), 12.5);
    }

    #[test]
    fn test_amount_parse_rejects_huge_values() {
        assert_eq!(Amount::parse("1000000000000").unwrap(), Amount::MAX);
        assert!(matches!(
            Amount::parse("1000000000000.01"),
            Err(ValidationError::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::parse("92233720368547758"),
            Err(ValidationError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_amount_addition_saturates() {
        let near_limit = Amount::from_cents(i64::MAX - 1);
        assert_eq!(near_limit + Amount::MAX, Amount::from_cents(i64::MAX));
        let mut total = near_limit;
        total += Amount::MAX;
        assert_eq!(total, Amount::from_cents(i64::MAX));
        let sum: Amount = [near_limit, Amount::MAX, Amount::MAX].iter().sum();
        assert_eq!(sum, Amount::from_cents(i64::MAX));
    }

    #[test]
    fn test_draft_requires_fields_before_parsing() {
        assert_eq!(
            ExpenseDraft::parse(&form("", "Food", "2025-01-01")),
            Err(ValidationError::MissingAmount)
        );
        assert_eq!(
            ExpenseDraft::parse(&form("1", "", "2025-01-01")),
            Err(ValidationError::MissingCategory)
        );
        assert_eq!(ExpenseDraft::parse(&form("1", "Food", "  ")), Err(ValidationError::MissingDate));
    }

    #[test]
    fn test_draft_parses_valid_form() {
        let mut input = form("7.00", "transport", "2025-02-28");
        input.comment = "  bus pass ".to_string();
        let draft = ExpenseDraft::parse(&input).unwrap();
        assert_eq!(draft.amount, Amount::from_cents(700));
        assert_eq!(draft.category, ExpenseCategory::Transport);
        assert_eq!(draft.occurred_on, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(draft.comment, "bus pass");
    }

    #[test]
    fn test_draft_rejects_impossible_date_and_unknown_category() {
        assert!(matches!(
            ExpenseDraft::parse(&form("1", "Food", "2025-02-30")),
            Err(ValidationError::InvalidDate(_))
        ));
        assert!(matches!(
            ExpenseDraft::parse(&form("1", "Rent", "2025-02-01")),
            Err(ValidationError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_form_round_trips_existing_expense() {
        let expense = Expense {
            id: ExpenseId::from("exp_1"),
            owner: UserId::from("usr_1"),
            amount: Amount::from_cents(1250),
            category: ExpenseCategory::Groceries,
            occurred_on: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            comment: "weekly shop".to_string(),
            created_at: Utc::now(),
        };
        let form = ExpenseForm::from_expense(&expense);
        assert_eq!(form.amount, "12.50");
        assert_eq!(form.occurred_on, "2025-01-31");
        let draft = ExpenseDraft::parse(&form).unwrap();
        assert_eq!(draft.occurred_on, expense.occurred_on);
        assert_eq!(draft.amount, expense.amount);
    }
}
