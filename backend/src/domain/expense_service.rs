//! Expense service domain logic.
//!
//! Every operation takes the acting user explicitly and checks ownership
//! before touching a record. Both the view models and the REST handlers go
//! through this service.

use chrono::NaiveDate;
use shared::{ChartData, Period};
use tracing::{info, warn};

use super::category_visualizer::chart_data;
use super::period::PeriodWindow;
use super::summary::{group_by_category, summarize, PeriodSummary};
use crate::domain::models::{Expense, ExpenseDraft, ExpenseId, UserId, ValidationError};
use crate::storage::{Connection, ExpenseQuery, ExpenseStorage, SortOrder, StoreError, Subscription};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpenseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("You must be signed in to do that.")]
    Unauthenticated,
    #[error("You don't have permission to access this expense.")]
    PermissionDenied,
    #[error("That expense no longer exists.")]
    NotFound,
    #[error("Something went wrong. Please try again.")]
    Unavailable(String),
}

impl From<StoreError> for ExpenseError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ExpenseError::NotFound,
            StoreError::PermissionDenied => ExpenseError::PermissionDenied,
            other => ExpenseError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ExpenseService<C: Connection> {
    expense_repository: C::ExpenseRepository,
}

impl<C: Connection> ExpenseService<C> {
    pub fn new(connection: &C) -> Result<Self, StoreError> {
        Ok(Self::from_repository(connection.create_expense_repository()?))
    }

    pub fn from_repository(expense_repository: C::ExpenseRepository) -> Self {
        Self { expense_repository }
    }

    pub async fn create(&self, owner: &UserId, draft: &ExpenseDraft) -> Result<Expense, ExpenseError> {
        let expense = self.expense_repository.create_expense(owner, draft).await?;
        info!("Created expense {} for {}", expense.id, owner);
        Ok(expense)
    }

    /// Fetch a record on behalf of `acting`, refusing records owned by anyone else
    pub async fn load_owned(&self, acting: &UserId, id: &ExpenseId) -> Result<Expense, ExpenseError> {
        let expense = self
            .expense_repository
            .get_expense(id)
            .await?
            .ok_or(ExpenseError::NotFound)?;
        if &expense.owner != acting {
            warn!("User {} tried to access expense {} owned by someone else", acting, id);
            return Err(ExpenseError::PermissionDenied);
        }
        Ok(expense)
    }

    /// Overwrite amount, category, date and comment. Ownership is checked
    /// again at write time.
    pub async fn update(&self, acting: &UserId, id: &ExpenseId, draft: &ExpenseDraft) -> Result<Expense, ExpenseError> {
        self.load_owned(acting, id).await?;
        let updated = self.expense_repository.update_expense(id, draft).await?;
        info!("Updated expense {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, acting: &UserId, id: &ExpenseId) -> Result<(), ExpenseError> {
        self.load_owned(acting, id).await?;
        self.expense_repository.delete_expense(id).await?;
        info!("Deleted expense {}", id);
        Ok(())
    }

    /// All of the owner's expenses, newest first
    pub async fn list(&self, owner: &UserId) -> Result<Vec<Expense>, ExpenseError> {
        let query = list_query(owner);
        Ok(self.expense_repository.fetch_expenses(&query).await?)
    }

    pub fn watch_list(&self, owner: &UserId) -> Subscription {
        self.expense_repository.subscribe(list_query(owner))
    }

    pub fn watch_period(&self, owner: &UserId, period: Period, today: NaiveDate) -> Subscription {
        self.expense_repository.subscribe(period_query(owner, period, today))
    }

    /// One-shot aggregation over the window containing `today`
    pub async fn summary(&self, owner: &UserId, period: Period, today: NaiveDate) -> Result<PeriodSummary, ExpenseError> {
        let query = period_query(owner, period, today);
        let expenses = self.expense_repository.fetch_expenses(&query).await?;
        Ok(summarize(&expenses))
    }

    /// All-time category totals, shaped for a chart
    pub async fn chart(&self, owner: &UserId) -> Result<ChartData, ExpenseError> {
        let expenses = self
            .expense_repository
            .fetch_expenses(&ExpenseQuery::for_owner(owner.clone()))
            .await?;
        Ok(chart_data(&group_by_category(&expenses)))
    }
}

fn list_query(owner: &UserId) -> ExpenseQuery {
    ExpenseQuery::for_owner(owner.clone()).order_by(SortOrder::OccurredOnDescending)
}

fn period_query(owner: &UserId, period: Period, today: NaiveDate) -> ExpenseQuery {
    ExpenseQuery::for_owner(owner.clone()).occurred_on_or_after(period.window_start(today))
}
