pub mod account_repository;
pub mod connection;
pub mod expense_repository;

#[cfg(test)]
pub mod test_utils;

pub use account_repository::AccountRepository;
pub use connection::CsvConnection;
pub use expense_repository::ExpenseRepository;
