//! Category aggregation.
//!
//! Every call folds the snapshot from scratch, so feeding the same snapshot
//! twice always yields the same summary.

use shared::ExpenseCategory;

use crate::domain::models::{Amount, Expense};

/// Per-category totals plus a grand total.
///
/// Categories appear in order of first occurrence in the folded records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodSummary {
    pub categories: Vec<(ExpenseCategory, Amount)>,
    pub total: Amount,
}

impl PeriodSummary {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn amount_for(&self, category: ExpenseCategory) -> Option<Amount> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, amount)| *amount)
    }

    /// Entries by descending amount. The sort is stable, so ties keep their
    /// first-occurrence order and re-rendering a snapshot never reshuffles.
    pub fn sorted_for_display(&self) -> Vec<(ExpenseCategory, Amount)> {
        let mut entries = self.categories.clone();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

pub fn group_by_category(expenses: &[Expense]) -> Vec<(ExpenseCategory, Amount)> {
    let mut groups: Vec<(ExpenseCategory, Amount)> = Vec::new();
    for expense in expenses {
        match groups.iter_mut().find(|(category, _)| *category == expense.category) {
            Some((_, sum)) => *sum += expense.amount,
            None => groups.push((expense.category, expense.amount)),
        }
    }
    groups
}

pub fn summarize(expenses: &[Expense]) -> PeriodSummary {
    let categories = group_by_category(expenses);
    let total = categories.iter().map(|(_, amount)| amount).sum();
    PeriodSummary { categories, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExpenseId, UserId};
    use crate::domain::period::PeriodWindow;
    use chrono::{NaiveDate, Utc};
    use shared::Period;

    fn expense(category: ExpenseCategory, cents: i64, occurred_on: NaiveDate) -> Expense {
        Expense {
            id: ExpenseId::generate(),
            owner: UserId::from("usr_a"),
            amount: Amount::from_cents(cents),
            category,
            occurred_on,
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_week_example_excludes_out_of_window_records() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let records = vec![
            expense(ExpenseCategory::Food, 1250, today),
            expense(ExpenseCategory::Food, 700, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            expense(ExpenseCategory::Transport, 2000, NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()),
        ];
        let start = Period::Week.window_start(today);
        let in_window: Vec<Expense> = records.into_iter().filter(|e| e.occurred_on >= start).collect();

        let summary = summarize(&in_window);
        assert_eq!(summary.categories, vec![(ExpenseCategory::Food, Amount::from_cents(1950))]);
        assert_eq!(summary.total, Amount::from_cents(1950));
        assert_eq!(summary.total.to_string(), "19.50");
    }

    #[test]
    fn test_total_equals_sum_of_categories() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let records: Vec<Expense> = (0..50)
            .map(|i| expense(ExpenseCategory::ALL[i % 6], 10 + i as i64 * 7, day))
            .collect();
        let summary = summarize(&records);

        let by_category: Amount = summary.categories.iter().map(|(_, a)| a).sum();
        let by_record: Amount = records.iter().map(|e| e.amount).sum();
        assert_eq!(summary.total, by_category);
        assert_eq!(summary.total, by_record);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let records = vec![
            expense(ExpenseCategory::Bills, 10, day),
            expense(ExpenseCategory::Other, 20, day),
            expense(ExpenseCategory::Bills, 30, day),
        ];
        assert_eq!(summarize(&records), summarize(&records));
    }

    #[test]
    fn test_sorted_for_display_is_stable_on_ties() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let records = vec![
            expense(ExpenseCategory::Bills, 500, day),
            expense(ExpenseCategory::Food, 900, day),
            expense(ExpenseCategory::Other, 500, day),
        ];
        let sorted = summarize(&records).sorted_for_display();
        let order: Vec<ExpenseCategory> = sorted.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![ExpenseCategory::Food, ExpenseCategory::Bills, ExpenseCategory::Other]
        );
    }

    #[test]
    fn test_extreme_amounts_do_not_panic() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let records = vec![
            expense(ExpenseCategory::Bills, i64::MAX / 2 + 1, day),
            expense(ExpenseCategory::Bills, i64::MAX / 2 + 1, day),
            expense(ExpenseCategory::Food, Amount::MAX.cents(), day),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.amount_for(ExpenseCategory::Bills), Some(Amount::from_cents(i64::MAX)));
        assert_eq!(summary.total, Amount::from_cents(i64::MAX));
        assert_eq!(group_by_category(&records).len(), 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let summary = summarize(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.total, Amount::ZERO);
    }
}
