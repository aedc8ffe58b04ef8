//! Form-driven creation and editing of a single expense.
//!
//! The editor holds raw text and validates it on submit. A failed submit
//! never clears what the user typed.

use tokio::sync::watch;
use tracing::{error, info, warn};

use super::expense_list::EditRequest;
use super::expense_service::{ExpenseError, ExpenseService};
use super::session::SessionHandle;
use crate::domain::models::{Expense, ExpenseDraft, ExpenseForm, ExpenseId};
use crate::storage::Connection;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorMode {
    Create,
    Edit(ExpenseId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorStatus {
    Idle,
    Submitting,
    Saved(Expense),
    Failed(ExpenseError),
}

pub struct ExpenseEditor<C: Connection> {
    service: ExpenseService<C>,
    session: SessionHandle,
    mode: EditorMode,
    pub form: ExpenseForm,
    status: watch::Sender<EditorStatus>,
}

impl<C: Connection> ExpenseEditor<C> {
    /// Blank form for a new expense
    pub fn for_create(service: ExpenseService<C>, session: SessionHandle) -> Self {
        Self::with_form(service, session, EditorMode::Create, ExpenseForm::new())
    }

    /// Load an existing record into the form. Fails without producing an
    /// editor when nobody is signed in, the record is gone, or it belongs to
    /// someone else.
    pub async fn open_for_edit(
        service: ExpenseService<C>,
        session: SessionHandle,
        request: EditRequest,
    ) -> Result<Self, ExpenseError> {
        let user = session.user_id().ok_or(ExpenseError::Unauthenticated)?;
        let expense = match service.load_owned(&user, &request.id).await {
            Ok(expense) => expense,
            Err(e) => {
                warn!("Cannot edit expense {}: {}", request.id, e);
                return Err(e);
            }
        };
        let form = ExpenseForm::from_expense(&expense);
        Ok(Self::with_form(service, session, EditorMode::Edit(expense.id), form))
    }

    fn with_form(service: ExpenseService<C>, session: SessionHandle, mode: EditorMode, form: ExpenseForm) -> Self {
        let (status, _) = watch::channel(EditorStatus::Idle);
        Self {
            service,
            session,
            mode,
            form,
            status,
        }
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn status(&self) -> EditorStatus {
        self.status.borrow().clone()
    }

    /// Observe status transitions, including `Submitting` while a write is in flight
    pub fn watch_status(&self) -> watch::Receiver<EditorStatus> {
        self.status.subscribe()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(*self.status.borrow(), EditorStatus::Submitting)
    }

    /// Message to show beside the form, if the last submit failed
    pub fn error_message(&self) -> Option<String> {
        match &*self.status.borrow() {
            EditorStatus::Failed(ExpenseError::Unavailable(_)) => Some(
                match self.mode {
                    EditorMode::Create => "Failed to add expense. Please try again.",
                    EditorMode::Edit(_) => "Failed to update expense. Please try again.",
                }
                .to_string(),
            ),
            EditorStatus::Failed(e) => Some(e.to_string()),
            _ => None,
        }
    }

    pub async fn submit(&mut self) -> Result<Expense, ExpenseError> {
        let result = self.write().await;
        match &result {
            Ok(expense) => {
                if self.mode == EditorMode::Create {
                    self.form = ExpenseForm::new();
                }
                self.status.send_replace(EditorStatus::Saved(expense.clone()));
            }
            Err(e) => {
                if let ExpenseError::Unavailable(detail) = e {
                    error!("Saving expense failed: {}", detail);
                }
                self.status.send_replace(EditorStatus::Failed(e.clone()));
            }
        }
        result
    }

    async fn write(&self) -> Result<Expense, ExpenseError> {
        let draft = ExpenseDraft::parse(&self.form)?;
        let user = self.session.user_id().ok_or(ExpenseError::Unauthenticated)?;

        self.status.send_replace(EditorStatus::Submitting);
        match &self.mode {
            EditorMode::Create => self.service.create(&user, &draft).await,
            EditorMode::Edit(id) => {
                let updated = self.service.update(&user, id, &draft).await?;
                info!("Saved changes to expense {}", id);
                Ok(updated)
            }
        }
    }
}
