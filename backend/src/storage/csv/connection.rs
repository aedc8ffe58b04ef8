use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use super::account_repository::AccountRepository;
use super::expense_repository::ExpenseRepository;
use crate::storage::traits::{Connection, StoreError};

pub const EXPENSES_FILE: &str = "expenses.csv";
pub const ACCOUNTS_FILE: &str = "accounts.csv";

/// CsvConnection manages the data directory and the CSV files inside it
#[derive(Clone, Debug)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self, StoreError> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Default data directory: ~/Documents/Expense Tracker
    pub fn default_directory() -> PathBuf {
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Expense Tracker")
    }

    pub fn expenses_file_path(&self) -> PathBuf {
        self.base_directory.join(EXPENSES_FILE)
    }

    pub fn accounts_file_path(&self) -> PathBuf {
        self.base_directory.join(ACCOUNTS_FILE)
    }

    /// Write a CSV file through a temporary sibling and rename it into place
    pub fn write_atomically<T, F>(
        &self,
        path: &Path,
        header: &[&str],
        rows: &[T],
        to_record: F,
    ) -> Result<(), StoreError>
    where
        F: Fn(&T) -> Vec<String>,
    {
        let temp_path = path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));
            csv_writer.write_record(header)?;
            for row in rows {
                csv_writer.write_record(to_record(row))?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Read every data row of a CSV file that has a header line.
    /// A missing file reads as empty.
    pub fn read_rows(&self, path: &Path) -> Result<Vec<csv::StringRecord>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for result in reader.records() {
            rows.push(result?);
        }
        Ok(rows)
    }
}

impl Connection for CsvConnection {
    type ExpenseRepository = ExpenseRepository;
    type AccountRepository = AccountRepository;

    fn create_expense_repository(&self) -> Result<ExpenseRepository, StoreError> {
        ExpenseRepository::open(self.clone())
    }

    fn create_account_repository(&self) -> Result<AccountRepository, StoreError> {
        AccountRepository::open(self.clone())
    }
}
