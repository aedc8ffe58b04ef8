//! Live query plumbing shared by storage backends.
//!
//! A [`Subscription`] is the consumer end of a live query: it yields complete
//! snapshots (never diffs) or a single terminal error. Cancelling it is
//! explicit and idempotent, and dropping it cancels as well.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::mpsc;
use tracing::debug;

use super::traits::{ExpenseQuery, StoreError};
use crate::domain::models::Expense;

/// One delivery on a live query
pub type Delivery = Result<Vec<Expense>, StoreError>;

type CancelFn = Box<dyn FnOnce() + Send + Sync>;

pub struct Subscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<Delivery>,
    cancel: Option<CancelFn>,
}

impl Subscription {
    pub fn new(id: u64, receiver: mpsc::UnboundedReceiver<Delivery>, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that delivers one error and then ends
    pub fn failed(error: StoreError) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Err(error));
        Self::new(0, receiver, || {})
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next delivery. Returns `None` once the subscription has
    /// been cancelled or the store has closed it.
    pub async fn next(&mut self) -> Option<Delivery> {
        if self.is_cancelled() {
            return None;
        }
        self.receiver.recv().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }

    /// Detach from the store. Buffered deliveries are discarded.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
            self.receiver.close();
            debug!("Subscription {} cancelled", self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct Subscriber {
    query: ExpenseQuery,
    sender: mpsc::UnboundedSender<Delivery>,
}

/// Bookkeeping for the live queries attached to one store
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a live query, delivering `initial` straight away. An error as
    /// the initial delivery ends the subscription immediately.
    pub fn register(self: &Arc<Self>, query: ExpenseQuery, initial: Delivery) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = mpsc::unbounded_channel();

        let failed = initial.is_err();
        let _ = sender.send(initial);
        if failed {
            return Subscription::new(id, receiver, || {});
        }

        self.lock().insert(id, Subscriber { query, sender });
        debug!("Subscription {} registered", id);

        let registry: Weak<SubscriberRegistry> = Arc::downgrade(self);
        Subscription::new(id, receiver, move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().remove(&id);
            }
        })
    }

    /// Push a fresh snapshot to every subscriber whose result set may have
    /// changed, i.e. whose query matches one of the `touched` records.
    pub fn publish(&self, records: &[Expense], touched: &[&Expense]) {
        let mut subscribers = self.lock();
        subscribers.retain(|id, subscriber| {
            if !touched.iter().any(|expense| subscriber.query.matches(expense)) {
                return !subscriber.sender.is_closed();
            }
            let snapshot = subscriber.query.apply(records);
            let delivered = subscriber.sender.send(Ok(snapshot)).is_ok();
            if !delivered {
                debug!("Dropping closed subscription {}", id);
            }
            delivered
        });
    }

    /// Terminate every live query with an error
    pub fn fail_all(&self, error: StoreError) {
        let mut subscribers = self.lock();
        for (_, subscriber) in subscribers.drain() {
            let _ = subscriber.sender.send(Err(error.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Subscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
