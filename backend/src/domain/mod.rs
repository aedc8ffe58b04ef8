//! # Domain Module
//!
//! Business logic of the expense tracker, independent of HTTP and of the
//! storage backend.
//!
//! ## Services
//!
//! - **ExpenseService**: ownership-checked CRUD plus one-shot queries
//! - **IdentityService**: sign-up and log-in against stored accounts
//!
//! ## View models
//!
//! Each view model is handed a [`SessionHandle`] and opens its own query
//! against the store. None of them talk to each other; they converge because
//! they all watch the same store.
//!
//! - **PeriodAggregator**: live per-category totals for a day/week/month/year window
//! - **ExpenseListView**: live newest-first list with confirmed deletes
//! - **ExpenseEditor**: validated create and edit forms
//! - **CategoryVisualizer**: one-shot all-time category chart

pub mod category_visualizer;
pub mod chart_renderer;
pub mod expense_editor;
pub mod expense_list;
pub mod expense_service;
pub mod identity_service;
pub mod live;
pub mod models;
pub mod period;
pub mod period_aggregator;
pub mod session;
pub mod summary;

pub use category_visualizer::{chart_data, CategoryVisualizer, VisualizerState};
pub use chart_renderer::{ChartError, ChartRenderer, SvgBarChart};
pub use expense_editor::{EditorMode, EditorStatus, ExpenseEditor};
pub use expense_list::{DeleteConfirmation, DeleteError, EditRequest, ExpenseListView, ListState};
pub use expense_service::{ExpenseError, ExpenseService};
pub use identity_service::{AuthError, IdentityService};
pub use period::{Clock, FixedClock, LocalClock, PeriodWindow};
pub use period_aggregator::{AggregatorState, PeriodAggregator};
pub use session::{Session, SessionHandle};
pub use summary::{group_by_category, summarize, PeriodSummary};
