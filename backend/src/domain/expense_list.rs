//! Live list of the signed-in user's expenses, newest first.
//!
//! Deletion is a two-step affair: [`ExpenseListView::request_delete`] hands
//! back a confirmation, and only [`ExpenseListView::confirm_delete`] touches
//! the store. Rows are never removed locally; the next snapshot reflects the
//! deletion.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

use super::expense_service::{ExpenseError, ExpenseService};
use super::live::{LiveEvent, LiveQuery};
use super::session::SessionHandle;
use crate::domain::models::{Expense, ExpenseId, UserId};
use crate::storage::{Connection, Delivery};

const LOAD_FAILED: &str = "Failed to fetch expenses. Please try again.";
const DELETE_PROMPT: &str = "Are you sure you want to delete this expense?";

#[derive(Debug, Clone, PartialEq)]
pub enum ListState {
    SignedOut,
    Loading,
    Empty,
    Loaded(Vec<Expense>),
    Failed(String),
}

/// Pending confirmation for deleting one row
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteConfirmation {
    id: ExpenseId,
}

impl DeleteConfirmation {
    pub fn id(&self) -> &ExpenseId {
        &self.id
    }

    pub fn prompt(&self) -> &'static str {
        DELETE_PROMPT
    }
}

/// Ask the editor to open an existing record
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub id: ExpenseId,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeleteError {
    #[error("This expense is already being deleted.")]
    InFlight,
    #[error(transparent)]
    Expense(#[from] ExpenseError),
}

#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<ExpenseId>>>);

impl InFlight {
    fn begin(&self, id: &ExpenseId) -> Option<InFlightGuard> {
        if !self.lock().insert(id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            ids: self.clone(),
            id: id.clone(),
        })
    }

    fn contains(&self, id: &ExpenseId) -> bool {
        self.lock().contains(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<ExpenseId>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight mark however the delete finishes
struct InFlightGuard {
    ids: InFlight,
    id: ExpenseId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids.lock().remove(&self.id);
    }
}

pub struct ExpenseListView<C: Connection> {
    service: ExpenseService<C>,
    session: SessionHandle,
    live: LiveQuery,
    user: Option<UserId>,
    state: ListState,
    deleting: InFlight,
    last_delete_error: Mutex<Option<String>>,
}

impl<C: Connection> ExpenseListView<C> {
    pub fn new(service: ExpenseService<C>, session: SessionHandle) -> Self {
        let user = session.user_id();
        let mut view = Self {
            service,
            session: session.clone(),
            live: LiveQuery::new(session),
            user,
            state: ListState::SignedOut,
            deleting: InFlight::default(),
            last_delete_error: Mutex::new(None),
        };
        view.resubscribe();
        view
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    /// Rows currently displayed
    pub fn expenses(&self) -> &[Expense] {
        match &self.state {
            ListState::Loaded(expenses) => expenses,
            _ => &[],
        }
    }

    pub async fn next_update(&mut self) -> bool {
        match self.live.next_event().await {
            Some(LiveEvent::UserChanged(user)) => {
                let user = user.map(|u| u.id);
                if user != self.user {
                    self.user = user;
                    self.resubscribe();
                }
                true
            }
            Some(LiveEvent::Delivery(delivery)) => {
                self.apply(delivery);
                true
            }
            None => false,
        }
    }

    pub fn request_delete(&self, id: &ExpenseId) -> DeleteConfirmation {
        DeleteConfirmation { id: id.clone() }
    }

    pub fn is_delete_disabled(&self, id: &ExpenseId) -> bool {
        self.deleting.contains(id)
    }

    pub fn last_delete_error(&self) -> Option<String> {
        self.last_delete_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove the confirmed record. The row stays on screen until the store
    /// delivers a snapshot without it.
    pub async fn confirm_delete(&self, confirmation: DeleteConfirmation) -> Result<(), DeleteError> {
        let id = confirmation.id;
        let user = self.session.user_id().ok_or(ExpenseError::Unauthenticated)?;
        let _guard = self.deleting.begin(&id).ok_or(DeleteError::InFlight)?;

        let result = self.service.delete(&user, &id).await;
        let mut last_error = self.last_delete_error.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(()) => {
                info!("Deleted expense {} from list", id);
                *last_error = None;
                Ok(())
            }
            Err(e) => {
                error!("Error deleting expense {}: {}", id, e);
                *last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn edit(&self, id: &ExpenseId) -> EditRequest {
        EditRequest { id: id.clone() }
    }

    fn apply(&mut self, delivery: Delivery) {
        self.state = match delivery {
            Ok(expenses) if expenses.is_empty() => ListState::Empty,
            Ok(expenses) => ListState::Loaded(expenses),
            Err(e) => {
                error!("Expense list subscription failed: {}", e);
                ListState::Failed(LOAD_FAILED.to_string())
            }
        };
    }

    fn resubscribe(&mut self) {
        self.live.cancel();
        match &self.user {
            None => self.state = ListState::SignedOut,
            Some(user) => {
                self.state = ListState::Loading;
                let subscription = self.service.watch_list(user);
                self.live.attach(subscription);
            }
        }
    }
}
