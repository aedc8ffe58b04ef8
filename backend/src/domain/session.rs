//! Current-user state.
//!
//! A [`Session`] owns the live "who is signed in" value. Components never
//! look it up globally; each is constructed with a [`SessionHandle`] and
//! observes changes through it.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::identity_service::{AuthError, IdentityService};
use crate::domain::models::{User, UserId};
use crate::storage::Connection;

#[derive(Clone)]
pub struct Session {
    current: Arc<watch::Sender<Option<User>>>,
}

impl Session {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            current: Arc::new(sender),
        }
    }

    /// A session that starts out signed in
    pub fn with_user(user: User) -> Self {
        let session = Self::new();
        session.set_user(Some(user));
        session
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            receiver: self.current.subscribe(),
            _keep_alive: None,
        }
    }

    pub fn current(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    pub async fn sign_up<C: Connection>(
        &self,
        identity: &IdentityService<C>,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = identity.sign_up(email, password).await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    pub async fn log_in<C: Connection>(
        &self,
        identity: &IdentityService<C>,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = identity.log_in(email, password).await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    pub fn log_out(&self) {
        if let Some(user) = self.current() {
            info!("Logged out {}", user.email);
        }
        self.set_user(None);
    }

    pub(crate) fn set_user(&self, user: Option<User>) {
        self.current.send_replace(user);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a [`Session`], cloned into every component
#[derive(Clone)]
pub struct SessionHandle {
    receiver: watch::Receiver<Option<User>>,
    // Detached handles own their sender so `changed` pends instead of ending.
    _keep_alive: Option<Arc<watch::Sender<Option<User>>>>,
}

impl SessionHandle {
    /// A handle fixed to one user, not attached to any [`Session`]
    pub fn signed_in(user: User) -> Self {
        Self::detached(Some(user))
    }

    pub fn signed_out() -> Self {
        Self::detached(None)
    }

    fn detached(user: Option<User>) -> Self {
        let (sender, receiver) = watch::channel(user);
        Self {
            receiver,
            _keep_alive: Some(Arc::new(sender)),
        }
    }

    pub fn current(&self) -> Option<User> {
        self.receiver.borrow().clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.receiver.borrow().as_ref().map(|user| user.id.clone())
    }

    /// Wait until the signed-in user changes and return the new value.
    /// Returns `None` once the owning session is gone.
    pub async fn changed(&mut self) -> Option<Option<User>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("user", &*self.receiver.borrow())
            .finish()
    }
}
