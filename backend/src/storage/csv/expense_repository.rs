use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::ExpenseCategory;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::connection::CsvConnection;
use crate::domain::models::{Amount, Expense, ExpenseDraft, ExpenseId, UserId};
use crate::storage::subscription::{SubscriberRegistry, Subscription};
use crate::storage::traits::{ExpenseQuery, ExpenseStorage, StoreError};

const HEADER: [&str; 7] = ["id", "owner", "amount", "category", "occurred_on", "comment", "created_at"];

/// CSV-backed expense store with live queries.
///
/// The whole collection is held in memory and rewritten to `expenses.csv`
/// after each mutation; a mutation only becomes visible once it is on disk.
#[derive(Clone)]
pub struct ExpenseRepository {
    inner: Arc<Inner>,
}

struct Inner {
    connection: CsvConnection,
    records: Mutex<Vec<Expense>>,
    subscribers: Arc<SubscriberRegistry>,
    online: AtomicBool,
}

impl ExpenseRepository {
    /// Load the expense file (if any) from the connection's data directory
    pub fn open(connection: CsvConnection) -> Result<Self, StoreError> {
        let path = connection.expenses_file_path();
        let records = connection
            .read_rows(&path)?
            .iter()
            .map(parse_record)
            .collect::<Result<Vec<_>, _>>()?;
        info!("Loaded {} expenses from {}", records.len(), path.display());

        Ok(Self {
            inner: Arc::new(Inner {
                connection,
                records: Mutex::new(records),
                subscribers: SubscriberRegistry::new(),
                online: AtomicBool::new(true),
            }),
        })
    }

    /// Simulate losing or regaining connectivity. Going offline terminates
    /// every live query with an error; operations fail until back online.
    pub fn set_online(&self, online: bool) {
        let was_online = self.inner.online.swap(online, Ordering::SeqCst);
        if was_online && !online {
            warn!("Expense store went offline");
            self.inner
                .subscribers
                .fail_all(StoreError::Unavailable("connection lost".to_string()));
        } else if !was_online && online {
            info!("Expense store back online");
        }
    }

    /// Number of live queries currently attached
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.inner.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection lost".to_string()))
        }
    }

    fn lock_records(&self) -> Result<MutexGuard<'_, Vec<Expense>>, StoreError> {
        self.inner
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("expense store lock poisoned".to_string()))
    }

    fn persist(&self, records: &[Expense]) -> Result<(), StoreError> {
        let path = self.inner.connection.expenses_file_path();
        self.inner
            .connection
            .write_atomically(&path, &HEADER, records, to_record)
    }

    /// Apply a mutation to a copy of the collection, persist it, swap it in,
    /// then notify the live queries touched by the change.
    fn mutate<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<Expense>) -> Result<(T, Vec<Expense>), StoreError>,
    {
        self.ensure_online()?;
        let mut records = self.lock_records()?;
        let mut updated = records.clone();
        let (result, touched) = change(&mut updated)?;
        self.persist(&updated)?;
        *records = updated;

        let touched_refs: Vec<&Expense> = touched.iter().collect();
        self.inner.subscribers.publish(&records, &touched_refs);
        Ok(result)
    }
}

#[async_trait]
impl ExpenseStorage for ExpenseRepository {
    async fn create_expense(&self, owner: &UserId, draft: &ExpenseDraft) -> Result<Expense, StoreError> {
        let expense = Expense {
            id: ExpenseId::generate(),
            owner: owner.clone(),
            amount: draft.amount,
            category: draft.category,
            occurred_on: draft.occurred_on,
            comment: draft.comment.clone(),
            created_at: Utc::now(),
        };

        let stored = self.mutate(|records| {
            records.push(expense.clone());
            Ok((expense.clone(), vec![expense.clone()]))
        })?;
        info!("Stored expense {} for {}", stored.id, stored.owner);
        Ok(stored)
    }

    async fn get_expense(&self, id: &ExpenseId) -> Result<Option<Expense>, StoreError> {
        self.ensure_online()?;
        let records = self.lock_records()?;
        Ok(records.iter().find(|e| &e.id == id).cloned())
    }

    async fn update_expense(&self, id: &ExpenseId, draft: &ExpenseDraft) -> Result<Expense, StoreError> {
        let updated = self.mutate(|records| {
            let existing = records
                .iter_mut()
                .find(|e| &e.id == id)
                .ok_or(StoreError::NotFound)?;
            let before = existing.clone();
            existing.amount = draft.amount;
            existing.category = draft.category;
            existing.occurred_on = draft.occurred_on;
            existing.comment = draft.comment.clone();
            let after = existing.clone();
            Ok((after.clone(), vec![before, after]))
        })?;
        info!("Updated expense {}", updated.id);
        Ok(updated)
    }

    async fn delete_expense(&self, id: &ExpenseId) -> Result<(), StoreError> {
        self.mutate(|records| {
            let position = records
                .iter()
                .position(|e| &e.id == id)
                .ok_or(StoreError::NotFound)?;
            let removed = records.remove(position);
            Ok(((), vec![removed]))
        })?;
        info!("Deleted expense {}", id);
        Ok(())
    }

    async fn fetch_expenses(&self, query: &ExpenseQuery) -> Result<Vec<Expense>, StoreError> {
        self.ensure_online()?;
        let records = self.lock_records()?;
        let result = query.apply(&records);
        debug!("Fetched {} expenses for {}", result.len(), query.owner);
        Ok(result)
    }

    fn subscribe(&self, query: ExpenseQuery) -> Subscription {
        if let Err(e) = self.ensure_online() {
            return self.inner.subscribers.register(query, Err(e));
        }
        // Hold the record lock while registering so no mutation can slip
        // between the initial snapshot and the first published one.
        match self.lock_records() {
            Ok(records) => {
                let initial = query.apply(&records);
                self.inner.subscribers.register(query, Ok(initial))
            }
            Err(e) => self.inner.subscribers.register(query, Err(e)),
        }
    }
}

fn to_record(expense: &Expense) -> Vec<String> {
    vec![
        expense.id.to_string(),
        expense.owner.to_string(),
        expense.amount.to_string(),
        expense.category.as_str().to_string(),
        expense.occurred_on.format("%Y-%m-%d").to_string(),
        expense.comment.clone(),
        expense.created_at.to_rfc3339(),
    ]
}

fn column(record: &csv::StringRecord, index: usize) -> Result<&str, StoreError> {
    record
        .get(index)
        .ok_or_else(|| StoreError::Corrupt(format!("missing column '{}'", HEADER[index])))
}

fn parse_record(record: &csv::StringRecord) -> Result<Expense, StoreError> {
    let field = |index: usize| column(record, index);

    let id = field(0)?;
    let amount_text = field(2)?;
    let amount = Amount::parse(amount_text)
        .map_err(|e| StoreError::Corrupt(format!("expense {}: {}", id, e)))?;
    let category = field(3)?
        .parse::<ExpenseCategory>()
        .map_err(|e| StoreError::Corrupt(format!("expense {}: {}", id, e)))?;
    let occurred_on = NaiveDate::parse_from_str(field(4)?, "%Y-%m-%d")
        .map_err(|e| StoreError::Corrupt(format!("expense {}: bad date: {}", id, e)))?;
    let created_at = DateTime::parse_from_rfc3339(field(6)?)
        .map_err(|e| StoreError::Corrupt(format!("expense {}: bad timestamp: {}", id, e)))?
        .with_timezone(&Utc);

    Ok(Expense {
        id: ExpenseId::from(id),
        owner: UserId::from(field(1)?),
        amount,
        category,
        occurred_on,
        comment: field(5)?.to_string(),
        created_at,
    })
}
