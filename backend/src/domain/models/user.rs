use std::fmt;

/// Stable identifier issued by the identity service at sign-up
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn generate() -> Self {
        UserId(format!("usr_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        UserId(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

/// A stored account: identity plus credential hash
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub user: User,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
