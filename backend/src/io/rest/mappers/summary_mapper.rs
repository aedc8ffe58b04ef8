use chrono::NaiveDate;
use shared::{CategoryTotal, LiveSummaryEvent, LiveSummaryStatus, Period, PeriodSummaryResponse};

use crate::domain::{AggregatorState, PeriodSummary};

pub struct SummaryMapper;

impl SummaryMapper {
    /// Categories are ordered for display: largest total first
    pub fn to_dto(summary: &PeriodSummary, period: Period, window_start: NaiveDate) -> PeriodSummaryResponse {
        PeriodSummaryResponse {
            period,
            window_start,
            categories: summary
                .sorted_for_display()
                .into_iter()
                .map(|(category, amount)| CategoryTotal {
                    category,
                    amount: amount.to_f64(),
                    formatted_amount: amount.to_string(),
                })
                .collect(),
            total: summary.total.to_f64(),
            formatted_total: summary.total.to_string(),
        }
    }

    pub fn to_live_event(state: &AggregatorState, period: Period, window_start: NaiveDate) -> LiveSummaryEvent {
        let (status, summary, error) = match state {
            AggregatorState::SignedOut => (LiveSummaryStatus::SignedOut, None, None),
            AggregatorState::Loading => (
                LiveSummaryStatus::Loading,
                Some(Self::to_dto(&PeriodSummary::default(), period, window_start)),
                None,
            ),
            AggregatorState::Ready(summary) => (
                LiveSummaryStatus::Ready,
                Some(Self::to_dto(summary, period, window_start)),
                None,
            ),
            AggregatorState::Failed(message) => (LiveSummaryStatus::Failed, None, Some(message.clone())),
        };
        LiveSummaryEvent { status, summary, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Amount;
    use shared::ExpenseCategory;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    #[test]
    fn test_to_dto_sorts_and_formats() {
        let summary = PeriodSummary {
            categories: vec![
                (ExpenseCategory::Food, Amount::from_cents(1950)),
                (ExpenseCategory::Bills, Amount::from_cents(4000)),
            ],
            total: Amount::from_cents(5950),
        };
        let dto = SummaryMapper::to_dto(&summary, Period::Week, start());
        assert_eq!(dto.categories[0].category, ExpenseCategory::Bills);
        assert_eq!(dto.categories[1].formatted_amount, "19.50");
        assert_eq!(dto.formatted_total, "59.50");
        assert_eq!(dto.total, 59.5);
    }

    #[test]
    fn test_loading_event_carries_zeroed_summary() {
        let event = SummaryMapper::to_live_event(&AggregatorState::Loading, Period::Month, start());
        assert_eq!(event.status, LiveSummaryStatus::Loading);
        let summary = event.summary.unwrap();
        assert!(summary.categories.is_empty());
        assert_eq!(summary.formatted_total, "0.00");

        let failed = SummaryMapper::to_live_event(&AggregatorState::Failed("boom".to_string()), Period::Month, start());
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.summary.is_none());
    }
}
