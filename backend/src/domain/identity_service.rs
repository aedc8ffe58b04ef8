//! Account sign-up and log-in.
//!
//! Passwords are stored as Argon2id PHC strings and never leave this module
//! in clear text.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::models::{Account, User, UserId};
use crate::storage::{AccountStorage, Connection, StoreError};

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect email or password.")]
    InvalidCredentials,
    #[error("An account with this email already exists.")]
    AccountAlreadyExists,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Password must be at least 6 characters.")]
    WeakPassword,
    #[error("Could not reach the sign-in service. Please try again.")]
    Unavailable(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AuthError::AccountAlreadyExists,
            other => AuthError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct IdentityService<C: Connection> {
    account_repository: C::AccountRepository,
}

impl<C: Connection> IdentityService<C> {
    pub fn new(connection: &C) -> Result<Self, StoreError> {
        Ok(Self {
            account_repository: connection.create_account_repository()?,
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }
        if self.account_repository.find_account_by_email(&email).await?.is_some() {
            return Err(AuthError::AccountAlreadyExists);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .to_string();

        let account = Account {
            user: User {
                id: UserId::generate(),
                email,
            },
            password_hash,
            created_at: Utc::now(),
        };
        self.account_repository.insert_account(&account).await?;

        info!("Signed up {}", account.user.email);
        Ok(account.user)
    }

    pub async fn log_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let account = match self.account_repository.find_account_by_email(&email).await? {
            Some(account) => account,
            None => {
                warn!("Log-in attempt for unknown account {}", email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let parsed = PasswordHash::new(&account.password_hash)
            .map_err(|e| AuthError::Unavailable(format!("stored hash unreadable: {}", e)))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            warn!("Wrong password for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        info!("Logged in {}", account.user.email);
        Ok(account.user)
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::TestEnvironment;
    use crate::storage::CsvConnection;

    fn service(env: &TestEnvironment) -> IdentityService<CsvConnection> {
        IdentityService::new(&env.connection).unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_then_log_in() {
        let env = TestEnvironment::new().unwrap();
        let identity = service(&env);

        let created = identity.sign_up(" Kim@Example.com ", "hunter22").await.unwrap();
        assert_eq!(created.email, "kim@example.com");
        assert!(created.id.as_str().starts_with("usr_"));

        let logged_in = identity.log_in("kim@example.com", "hunter22").await.unwrap();
        assert_eq!(logged_in, created);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let env = TestEnvironment::new().unwrap();
        let identity = service(&env);
        identity.sign_up("kim@example.com", "hunter22").await.unwrap();

        assert_eq!(
            identity.log_in("kim@example.com", "hunter23").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            identity.log_in("lee@example.com", "hunter22").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_sign_up_rejections() {
        let env = TestEnvironment::new().unwrap();
        let identity = service(&env);
        identity.sign_up("kim@example.com", "hunter22").await.unwrap();

        assert_eq!(
            identity.sign_up("KIM@example.com", "another1").await,
            Err(AuthError::AccountAlreadyExists)
        );
        assert_eq!(identity.sign_up("not-an-email", "hunter22").await, Err(AuthError::InvalidEmail));
        assert_eq!(identity.sign_up("lee@example.com", "12345").await, Err(AuthError::WeakPassword));
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_clear() {
        let env = TestEnvironment::new().unwrap();
        service(&env).sign_up("kim@example.com", "hunter22").await.unwrap();

        let contents = std::fs::read_to_string(env.connection.accounts_file_path()).unwrap();
        assert!(!contents.contains("hunter22"));
        assert!(contents.contains("$argon2id$"));
    }
}
