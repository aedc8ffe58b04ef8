//! # Storage Module
//!
//! Handles all data persistence for the expense tracker.
//!
//! The domain layer only sees the traits in [`traits`]; the CSV backend in
//! [`csv`] is one implementation of them. Besides plain CRUD, an expense
//! store offers two read capabilities:
//!
//! - **One-shot fetch**: a point-in-time result set
//! - **Live subscription**: an initial snapshot followed by a complete new
//!   snapshot whenever the result set may have changed
//!
//! ## Design Principles
//!
//! - **Repository Pattern**: Clean separation between domain and data access
//! - **Owner Scoping**: Every query is filtered by the owning user
//! - **Snapshots, not diffs**: Consumers never merge deliveries

pub mod csv;
pub mod subscription;
pub mod traits;

pub use self::csv::{AccountRepository, CsvConnection, ExpenseRepository};
pub use subscription::{Delivery, SubscriberRegistry, Subscription};
pub use traits::*;
