//! Live per-category spending totals for a period window.
//!
//! The aggregator keeps one live query open for the signed-in user and the
//! selected [`Period`]. Every delivered snapshot replaces the summary
//! outright; nothing is carried over between deliveries.

use shared::Period;
use std::sync::Arc;
use tracing::{error, info};

use super::expense_service::{ExpenseError, ExpenseService};
use super::live::{LiveEvent, LiveQuery};
use super::period::Clock;
use super::session::SessionHandle;
use super::summary::{summarize, PeriodSummary};
use crate::domain::models::UserId;
use crate::storage::{Connection, Delivery};

#[derive(Debug, Clone, PartialEq)]
pub enum AggregatorState {
    SignedOut,
    /// Waiting for the first snapshot of the current window
    Loading,
    Ready(PeriodSummary),
    /// The live query failed; no further updates until the user or period changes
    Failed(String),
}

pub struct PeriodAggregator<C: Connection> {
    service: ExpenseService<C>,
    clock: Arc<dyn Clock>,
    live: LiveQuery,
    user: Option<UserId>,
    period: Period,
    state: AggregatorState,
}

impl<C: Connection> PeriodAggregator<C> {
    pub fn new(service: ExpenseService<C>, clock: Arc<dyn Clock>, session: SessionHandle, period: Period) -> Self {
        let user = session.user_id();
        let mut aggregator = Self {
            service,
            clock,
            live: LiveQuery::new(session),
            user,
            period,
            state: AggregatorState::SignedOut,
        };
        aggregator.resubscribe();
        aggregator
    }

    pub fn state(&self) -> &AggregatorState {
        &self.state
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Current summary; empty with a zero total unless a snapshot has arrived
    pub fn summary(&self) -> PeriodSummary {
        match &self.state {
            AggregatorState::Ready(summary) => summary.clone(),
            _ => PeriodSummary::default(),
        }
    }

    pub fn set_period(&mut self, period: Period) {
        if period == self.period {
            return;
        }
        info!("Summary period changed to {}", period);
        self.period = period;
        self.resubscribe();
    }

    pub fn set_user(&mut self, user: Option<UserId>) {
        if user == self.user {
            return;
        }
        self.user = user;
        self.resubscribe();
    }

    /// Wait for the next session change or snapshot and apply it.
    /// Returns `false` once there is nothing left to wait on.
    pub async fn next_update(&mut self) -> bool {
        match self.live.next_event().await {
            Some(LiveEvent::UserChanged(user)) => {
                self.set_user(user.map(|u| u.id));
                true
            }
            Some(LiveEvent::Delivery(delivery)) => {
                self.apply(delivery);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, delivery: Delivery) {
        match delivery {
            Ok(snapshot) => self.state = AggregatorState::Ready(summarize(&snapshot)),
            Err(e) => {
                error!("Summary subscription for {} failed: {}", self.period, e);
                self.state = AggregatorState::Failed(ExpenseError::from(e).to_string());
            }
        }
    }

    fn resubscribe(&mut self) {
        self.live.cancel();
        match &self.user {
            None => self.state = AggregatorState::SignedOut,
            Some(user) => {
                self.state = AggregatorState::Loading;
                let subscription = self.service.watch_period(user, self.period, self.clock.today());
                self.live.attach(subscription);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Amount, ExpenseDraft, ExpenseForm, User};
    use crate::domain::period::FixedClock;
    use crate::domain::session::Session;
    use crate::storage::csv::test_utils::TestEnvironment;
    use crate::storage::CsvConnection;
    use chrono::NaiveDate;
    use shared::ExpenseCategory;

    fn draft(amount: &str, category: &str, date: &str) -> ExpenseDraft {
        ExpenseDraft::parse(&ExpenseForm {
            amount: amount.to_string(),
            category: category.to_string(),
            occurred_on: date.to_string(),
            comment: String::new(),
        })
        .unwrap()
    }

    fn kim() -> User {
        User {
            id: UserId::from("usr_kim"),
            email: "kim@example.com".to_string(),
        }
    }

    fn wednesday() -> Arc<dyn Clock> {
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()))
    }

    async fn seed(service: &ExpenseService<CsvConnection>) {
        let owner = kim().id;
        service.create(&owner, &draft("12.50", "Food", "2025-03-12")).await.unwrap();
        service.create(&owner, &draft("7.00", "Food", "2025-03-09")).await.unwrap();
        service.create(&owner, &draft("20.00", "Transport", "2025-02-20")).await.unwrap();
    }

    #[tokio::test]
    async fn test_week_summary_from_first_snapshot() {
        let env = TestEnvironment::new().unwrap();
        let service: ExpenseService<CsvConnection> = ExpenseService::from_repository(env.expense_repository());
        seed(&service).await;

        let mut aggregator = PeriodAggregator::new(service, wednesday(), SessionHandle::signed_in(kim()), Period::Week);
        assert_eq!(aggregator.state(), &AggregatorState::Loading);

        assert!(aggregator.next_update().await);
        let summary = aggregator.summary();
        assert_eq!(summary.categories, vec![(ExpenseCategory::Food, Amount::from_cents(1950))]);
        assert_eq!(summary.total, Amount::from_cents(1950));
    }

    #[tokio::test]
    async fn test_switching_period_resets_before_new_snapshot() {
        let env = TestEnvironment::new().unwrap();
        let service: ExpenseService<CsvConnection> = ExpenseService::from_repository(env.expense_repository());
        seed(&service).await;
        let mut aggregator = PeriodAggregator::new(service, wednesday(), SessionHandle::signed_in(kim()), Period::Week);
        aggregator.next_update().await;
        assert!(matches!(aggregator.state(), AggregatorState::Ready(_)));

        aggregator.set_period(Period::Year);
        assert_eq!(aggregator.state(), &AggregatorState::Loading);
        assert!(aggregator.summary().is_empty());
        assert_eq!(aggregator.summary().total, Amount::ZERO);

        aggregator.next_update().await;
        let summary = aggregator.summary();
        assert_eq!(summary.total, Amount::from_cents(3950));
        assert_eq!(summary.amount_for(ExpenseCategory::Transport), Some(Amount::from_cents(2000)));
    }

    #[tokio::test]
    async fn test_updates_follow_store_changes() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.expense_repository();
        let writer: ExpenseService<CsvConnection> = ExpenseService::from_repository(repo.clone());
        let mut aggregator: PeriodAggregator<CsvConnection> = PeriodAggregator::new(
            ExpenseService::from_repository(repo),
            wednesday(),
            SessionHandle::signed_in(kim()),
            Period::Month,
        );
        aggregator.next_update().await;
        assert_eq!(aggregator.summary().total, Amount::ZERO);

        let created = writer.create(&kim().id, &draft("3.25", "Bills", "2025-03-02")).await.unwrap();
        aggregator.next_update().await;
        assert_eq!(aggregator.summary().total, Amount::from_cents(325));

        writer.delete(&kim().id, &created.id).await.unwrap();
        aggregator.next_update().await;
        assert!(aggregator.summary().is_empty());
    }

    #[tokio::test]
    async fn test_record_edited_out_of_window_leaves_summary() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.expense_repository();
        let writer: ExpenseService<CsvConnection> = ExpenseService::from_repository(repo.clone());
        let created = writer.create(&kim().id, &draft("6.00", "Food", "2025-03-10")).await.unwrap();

        let mut aggregator: PeriodAggregator<CsvConnection> = PeriodAggregator::new(
            ExpenseService::from_repository(repo),
            wednesday(),
            SessionHandle::signed_in(kim()),
            Period::Week,
        );
        aggregator.next_update().await;
        assert_eq!(aggregator.summary().total, Amount::from_cents(600));

        writer
            .update(&kim().id, &created.id, &draft("6.00", "Food", "2025-03-08"))
            .await
            .unwrap();
        aggregator.next_update().await;
        assert_eq!(aggregator.state(), &AggregatorState::Ready(PeriodSummary::default()));
    }

    #[tokio::test]
    async fn test_sign_out_and_back_in() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.expense_repository();
        let session = Session::with_user(kim());
        let mut aggregator: PeriodAggregator<CsvConnection> = PeriodAggregator::new(
            ExpenseService::from_repository(repo.clone()),
            wednesday(),
            session.handle(),
            Period::Day,
        );
        aggregator.next_update().await;
        assert!(matches!(aggregator.state(), AggregatorState::Ready(_)));

        session.log_out();
        aggregator.next_update().await;
        assert_eq!(aggregator.state(), &AggregatorState::SignedOut);
        assert_eq!(repo.subscriber_count(), 0);

        session.set_user(Some(kim()));
        aggregator.next_update().await;
        assert_eq!(aggregator.state(), &AggregatorState::Loading);
        aggregator.next_update().await;
        assert_eq!(aggregator.state(), &AggregatorState::Ready(PeriodSummary::default()));
    }

    #[tokio::test]
    async fn test_delivery_error_fails_without_retry() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.expense_repository();
        let mut aggregator = PeriodAggregator::new(
            ExpenseService::<CsvConnection>::from_repository(repo.clone()),
            wednesday(),
            SessionHandle::signed_in(kim()),
            Period::Week,
        );
        aggregator.next_update().await;

        repo.set_online(false);
        aggregator.next_update().await;
        assert!(matches!(aggregator.state(), AggregatorState::Failed(_)));

        repo.set_online(true);
        assert_eq!(repo.subscriber_count(), 0);
        let pending = tokio::time::timeout(std::time::Duration::from_millis(20), aggregator.next_update()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_signed_out_aggregator_does_not_subscribe() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.expense_repository();
        let aggregator: PeriodAggregator<CsvConnection> = PeriodAggregator::new(
            ExpenseService::from_repository(repo.clone()),
            wednesday(),
            SessionHandle::signed_out(),
            Period::Week,
        );
        assert_eq!(aggregator.state(), &AggregatorState::SignedOut);
        assert_eq!(repo.subscriber_count(), 0);
    }
}
