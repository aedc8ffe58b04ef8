//! Bearer-token sessions for the REST API.
//!
//! Each issued token owns one [`Session`]. Revoking a token logs that session
//! out, so live streams opened with it see the sign-out. Tokens expire after
//! a fixed lifetime; expired entries are logged out and swept whenever a new
//! token is issued.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::error::ApiError;
use crate::domain::models::User;
use crate::domain::Session;
use crate::AppState;

/// How long a token stays valid after it is issued
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct IssuedSession {
    session: Session,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct SessionTokens {
    sessions: Arc<Mutex<HashMap<String, IssuedSession>>>,
    lifetime: Duration,
}

impl Default for SessionTokens {
    fn default() -> Self {
        Self::with_lifetime(DEFAULT_TOKEN_LIFETIME)
    }
}

impl SessionTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            lifetime,
        }
    }

    /// Start a signed-in session and return its token
    pub fn issue(&self, user: User) -> String {
        let now = Instant::now();
        let token = uuid::Uuid::new_v4().simple().to_string();
        let mut sessions = self.lock();
        sweep_expired(&mut sessions, now);
        sessions.insert(
            token.clone(),
            IssuedSession {
                session: Session::with_user(user),
                expires_at: now + self.lifetime,
            },
        );
        debug!("Issued session token");
        token
    }

    /// The live session behind `token`, unless it was revoked or has expired
    pub fn resolve(&self, token: &str) -> Option<Session> {
        let mut sessions = self.lock();
        let expired = match sessions.get(token) {
            Some(issued) if issued.expires_at > Instant::now() => return Some(issued.session.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            if let Some(issued) = sessions.remove(token) {
                info!("Session token expired");
                issued.session.log_out();
            }
        }
        None
    }

    /// Log the session out and forget the token. Returns false for unknown tokens.
    pub fn revoke(&self, token: &str) -> bool {
        match self.lock().remove(token) {
            Some(issued) => {
                issued.session.log_out();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, IssuedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sweep_expired(sessions: &mut HashMap<String, IssuedSession>, now: Instant) {
    sessions.retain(|_, issued| {
        let live = issued.expires_at > now;
        if !live {
            issued.session.log_out();
        }
        live
    });
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The caller behind a valid bearer token
pub struct Authenticated {
    pub token: String,
    pub session: Session,
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(ApiError::unauthenticated)?;
        let session = match state.session_tokens.resolve(token) {
            Some(session) => session,
            None => {
                warn!("Request with unknown session token");
                return Err(ApiError::unauthenticated());
            }
        };
        let user = session.current().ok_or_else(ApiError::unauthenticated)?;
        Ok(Self {
            token: token.to_string(),
            session,
            user,
        })
    }
}
