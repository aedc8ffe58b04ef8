//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.
//!
//! Every read goes through an [`ExpenseQuery`], and every query carries an
//! owner filter: there is no way to ask the store for "all expenses".

use async_trait::async_trait;
use chrono::NaiveDate;

use super::subscription::Subscription;
use crate::domain::models::{Account, Expense, ExpenseDraft, ExpenseId, UserId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("The requested expense does not exist")]
    NotFound,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("A record with this key already exists")]
    Conflict,
    #[error("Storage is unavailable: {0}")]
    Unavailable(String),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Corrupt(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Storage order
    #[default]
    Unordered,
    OccurredOnDescending,
}

/// Owner-scoped filter plus ordering clause
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseQuery {
    pub owner: UserId,
    /// Inclusive lower bound on the expense date
    pub occurred_on_from: Option<NaiveDate>,
    pub order: SortOrder,
}

impl ExpenseQuery {
    pub fn for_owner(owner: UserId) -> Self {
        Self {
            owner,
            occurred_on_from: None,
            order: SortOrder::Unordered,
        }
    }

    pub fn occurred_on_or_after(mut self, date: NaiveDate) -> Self {
        self.occurred_on_from = Some(date);
        self
    }

    pub fn order_by(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        expense.owner == self.owner
            && self
                .occurred_on_from
                .map_or(true, |from| expense.occurred_on >= from)
    }

    /// Filter and order a full record set into this query's result set
    pub fn apply(&self, records: &[Expense]) -> Vec<Expense> {
        let mut result: Vec<Expense> = records.iter().filter(|e| self.matches(e)).cloned().collect();
        match self.order {
            SortOrder::Unordered => {}
            SortOrder::OccurredOnDescending => result.sort_by(|a, b| {
                b.occurred_on
                    .cmp(&a.occurred_on)
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }
        result
    }
}

/// Trait defining the interface for expense storage operations
///
/// Implementations provide two distinct read capabilities: a one-shot
/// [`fetch_expenses`](ExpenseStorage::fetch_expenses) and a live
/// [`subscribe`](ExpenseStorage::subscribe) that pushes complete snapshots.
#[async_trait]
pub trait ExpenseStorage: Send + Sync {
    /// Store a new expense; the store assigns the id and creation time
    async fn create_expense(&self, owner: &UserId, draft: &ExpenseDraft) -> Result<Expense, StoreError>;

    /// Retrieve a specific expense by ID
    async fn get_expense(&self, id: &ExpenseId) -> Result<Option<Expense>, StoreError>;

    /// Overwrite the mutable fields of an existing expense.
    /// Owner and creation time are never touched.
    async fn update_expense(&self, id: &ExpenseId, draft: &ExpenseDraft) -> Result<Expense, StoreError>;

    /// Remove an expense permanently
    async fn delete_expense(&self, id: &ExpenseId) -> Result<(), StoreError>;

    /// Point-in-time query
    async fn fetch_expenses(&self, query: &ExpenseQuery) -> Result<Vec<Expense>, StoreError>;

    /// Live query. The current result set is delivered first, then a fresh
    /// complete snapshot after every change that touches the result set.
    fn subscribe(&self, query: ExpenseQuery) -> Subscription;
}

/// Trait defining the interface for account storage operations
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Look up an account by its normalized email address
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Store a new account. Fails with [`StoreError::Conflict`] if the email is taken.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;
}

/// Trait defining the interface for storage connections
///
/// This trait abstracts away the specific connection type and provides
/// factory methods for creating repositories.
pub trait Connection: Send + Sync + Clone {
    type ExpenseRepository: ExpenseStorage + Clone + 'static;
    type AccountRepository: AccountStorage + Clone + 'static;

    fn create_expense_repository(&self) -> Result<Self::ExpenseRepository, StoreError>;

    fn create_account_repository(&self) -> Result<Self::AccountRepository, StoreError>;
}
