pub mod expense_mapper;
pub mod summary_mapper;

pub use expense_mapper::ExpenseMapper;
pub use summary_mapper::SummaryMapper;
