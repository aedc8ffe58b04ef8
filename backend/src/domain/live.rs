//! Waiting on a session and a live query at the same time.
//!
//! The list view and the period aggregator both hold one [`LiveQuery`]. It
//! owns at most one [`Subscription`]; replacing it always cancels the old
//! one first.

use tracing::debug;

use super::session::SessionHandle;
use crate::domain::models::{User, UserId};
use crate::storage::{Delivery, Subscription};

#[derive(Debug)]
pub enum LiveEvent {
    UserChanged(Option<User>),
    Delivery(Delivery),
}

pub struct LiveQuery {
    session: SessionHandle,
    session_open: bool,
    subscription: Option<Subscription>,
}

enum Woke {
    Session(Option<Option<User>>),
    Store(Option<Delivery>),
}

impl LiveQuery {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            session_open: true,
            subscription: None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.session.user_id()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Tear down the current subscription, if any
    pub fn cancel(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Install a new subscription. Callers cancel before subscribing so the
    /// old query is gone before the new one is registered with the store.
    pub fn attach(&mut self, subscription: Subscription) {
        self.cancel();
        debug!("Attached live query {}", subscription.id());
        self.subscription = Some(subscription);
    }

    /// Wait for the next user change or store delivery.
    ///
    /// Returns `None` when the session has ended and no subscription is
    /// left. A failed delivery ends the subscription.
    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        loop {
            if !self.session_open && self.subscription.is_none() {
                return None;
            }

            let woke = {
                let session_open = self.session_open;
                let session = &mut self.session;
                let subscription = self.subscription.as_mut();
                tokio::select! {
                    changed = session.changed(), if session_open => Woke::Session(changed),
                    delivery = next_delivery(subscription) => Woke::Store(delivery),
                }
            };

            match woke {
                Woke::Session(Some(user)) => return Some(LiveEvent::UserChanged(user)),
                Woke::Session(None) => self.session_open = false,
                Woke::Store(Some(delivery)) => {
                    if delivery.is_err() {
                        self.subscription = None;
                    }
                    return Some(LiveEvent::Delivery(delivery));
                }
                Woke::Store(None) => self.subscription = None,
            }
        }
    }
}

async fn next_delivery(subscription: Option<&mut Subscription>) -> Option<Delivery> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
