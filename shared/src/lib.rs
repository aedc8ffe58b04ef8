use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of expense classifications, in the order the entry form offers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Food,
    Transport,
    Bills,
    Groceries,
    Entertainment,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Food,
        ExpenseCategory::Transport,
        ExpenseCategory::Bills,
        ExpenseCategory::Groceries,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Transport => "Transport",
            ExpenseCategory::Bills => "Bills",
            ExpenseCategory::Groceries => "Groceries",
            ExpenseCategory::Entertainment => "Entertainment",
            ExpenseCategory::Other => "Other",
        }
    }
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        ExpenseCategory::Food
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = UnknownCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ExpenseCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategoryError(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownCategoryError(pub String);

impl fmt::Display for UnknownCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown expense category: '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategoryError {}

/// Time window used to scope spending summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Week
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = UnknownPeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Period::ALL
            .iter()
            .copied()
            .find(|period| period.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownPeriodError(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownPeriodError(pub String);

impl fmt::Display for UnknownPeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown period: '{}' (expected day, week, month or year)", self.0)
    }
}

impl std::error::Error for UnknownPeriodError {}

/// A single expense record as it travels over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Store-assigned identifier, format "exp_<uuid>"
    pub id: String,
    /// ID of the user who created this expense
    pub owner: String,
    /// Amount in currency units, at most two decimals
    pub amount: f64,
    pub category: ExpenseCategory,
    /// Calendar date of the expense (local midnight)
    pub occurred_on: NaiveDate,
    pub comment: String,
    /// Server-assigned creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Raw form input for creating or editing an expense.
/// Fields stay as text so validation happens in one place on the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseFormRequest {
    pub amount: String,
    pub category: String,
    /// Date in YYYY-MM-DD format
    pub occurred_on: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseListResponse {
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteExpenseResponse {
    pub id: String,
    pub success_message: String,
}

/// Summed amount for one category within a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub amount: f64,
    pub formatted_amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummaryResponse {
    pub period: Period,
    pub window_start: NaiveDate,
    /// Sorted by descending amount
    pub categories: Vec<CategoryTotal>,
    pub total: f64,
    pub formatted_total: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveSummaryStatus {
    SignedOut,
    Loading,
    Ready,
    Failed,
}

/// One event on the live summary stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSummaryEvent {
    pub status: LiveSummaryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PeriodSummaryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Input for the chart renderer: category names and parallel totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
