use crate::domain::models::{Expense as DomainExpense, ExpenseForm};
use shared::{Expense as SharedExpense, ExpenseFormRequest};

pub struct ExpenseMapper;

impl ExpenseMapper {
    pub fn to_dto(domain: DomainExpense) -> SharedExpense {
        SharedExpense {
            id: domain.id.to_string(),
            owner: domain.owner.to_string(),
            amount: domain.amount.to_f64(),
            category: domain.category,
            occurred_on: domain.occurred_on,
            comment: domain.comment,
            created_at: domain.created_at,
        }
    }

    /// Form requests carry raw text; validation happens in the domain
    pub fn to_form(dto: ExpenseFormRequest) -> ExpenseForm {
        ExpenseForm {
            amount: dto.amount,
            category: dto.category,
            occurred_on: dto.occurred_on,
            comment: dto.comment.unwrap_or_default(),
        }
    }
}
