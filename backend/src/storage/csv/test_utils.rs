//! Test utilities for CSV storage.
//!
//! `TestEnvironment` owns a temporary directory that is removed when the
//! environment is dropped, even if the test panics.

use tempfile::TempDir;

use super::account_repository::AccountRepository;
use super::connection::CsvConnection;
use super::expense_repository::ExpenseRepository;
use crate::storage::traits::StoreError;

pub struct TestEnvironment {
    _temp_dir: TempDir,
    pub connection: CsvConnection,
}

impl TestEnvironment {
    pub fn new() -> Result<Self, StoreError> {
        let temp_dir = TempDir::new()?;
        let connection = CsvConnection::new(temp_dir.path())?;
        Ok(Self {
            _temp_dir: temp_dir,
            connection,
        })
    }

    /// Open a fresh repository over this environment's data directory
    pub fn expense_repository(&self) -> ExpenseRepository {
        ExpenseRepository::open(self.connection.clone()).expect("open expense repository")
    }

    pub fn account_repository(&self) -> AccountRepository {
        AccountRepository::open(self.connection.clone()).expect("open account repository")
    }
}
