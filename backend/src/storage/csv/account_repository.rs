use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use super::connection::CsvConnection;
use crate::domain::models::{Account, User, UserId};
use crate::storage::traits::{AccountStorage, StoreError};

const HEADER: [&str; 4] = ["user_id", "email", "password_hash", "created_at"];

/// CSV-backed account store (`accounts.csv`)
#[derive(Clone)]
pub struct AccountRepository {
    connection: CsvConnection,
    accounts: Arc<Mutex<Vec<Account>>>,
}

impl AccountRepository {
    pub fn open(connection: CsvConnection) -> Result<Self, StoreError> {
        let path = connection.accounts_file_path();
        let accounts = connection
            .read_rows(&path)?
            .iter()
            .map(parse_record)
            .collect::<Result<Vec<_>, _>>()?;
        info!("Loaded {} accounts", accounts.len());

        Ok(Self {
            connection,
            accounts: Arc::new(Mutex::new(accounts)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Account>>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Unavailable("account store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStorage for AccountRepository {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.lock()?;
        Ok(accounts.iter().find(|a| a.user.email == email).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.lock()?;
        if accounts.iter().any(|a| a.user.email == account.user.email) {
            return Err(StoreError::Conflict);
        }

        let mut updated = accounts.clone();
        updated.push(account.clone());
        let path = self.connection.accounts_file_path();
        self.connection.write_atomically(&path, &HEADER, &updated, to_record)?;
        *accounts = updated;

        info!("Created account {}", account.user.id);
        Ok(())
    }
}

fn to_record(account: &Account) -> Vec<String> {
    vec![
        account.user.id.to_string(),
        account.user.email.clone(),
        account.password_hash.clone(),
        account.created_at.to_rfc3339(),
    ]
}

fn parse_record(record: &csv::StringRecord) -> Result<Account, StoreError> {
    if record.len() < HEADER.len() {
        return Err(StoreError::Corrupt(format!(
            "account row has {} columns, expected {}",
            record.len(),
            HEADER.len()
        )));
    }
    let created_at = DateTime::parse_from_rfc3339(&record[3])
        .map_err(|e| StoreError::Corrupt(format!("account {}: bad timestamp: {}", &record[0], e)))?
        .with_timezone(&Utc);

    Ok(Account {
        user: User {
            id: UserId::from(&record[0]),
            email: record[1].to_string(),
        },
        password_hash: record[2].to_string(),
        created_at,
    })
}
