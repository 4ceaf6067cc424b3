use crate::schemas::{Category, LedgerState, ParticipantId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpend {
    pub category: Category,
    pub allocated: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub currency: String,
    pub total_budget: Decimal,
    pub total_spent: Decimal,
    pub remaining: Decimal,
    pub allocated: Decimal,
    pub unallocated: Decimal,
    pub categories: Vec<CategorySpend>,
}

/// Everything spent on the trip, shared or not.
pub fn total_expenses(snapshot: &LedgerState) -> Decimal {
    snapshot.expenses.iter().map(|e| e.amount).sum()
}

pub fn remaining_budget(snapshot: &LedgerState) -> Decimal {
    snapshot.budget.total - total_expenses(snapshot)
}

pub fn expenses_by_category(snapshot: &LedgerState) -> BTreeMap<Category, Decimal> {
    let mut spent = BTreeMap::new();
    for expense in &snapshot.expenses {
        *spent
            .entry(expense.category.clone())
            .or_insert(Decimal::ZERO) += expense.amount;
    }
    spent
}

/// Gross amount each participant fronted, including personal spend.
pub fn spend_by_participant(snapshot: &LedgerState) -> BTreeMap<ParticipantId, Decimal> {
    let mut spent: BTreeMap<ParticipantId, Decimal> = snapshot
        .participants
        .iter()
        .map(|p| (p.id.clone(), Decimal::ZERO))
        .collect();
    for expense in &snapshot.expenses {
        *spent
            .entry(expense.paid_by.clone())
            .or_insert(Decimal::ZERO) += expense.amount;
    }
    spent
}

pub fn summarize(snapshot: &LedgerState) -> BudgetSummary {
    let budget = &snapshot.budget;
    let mut spent = expenses_by_category(snapshot);
    let total_spent: Decimal = spent.values().copied().sum();
    let allocated: Decimal = budget.categories.values().copied().sum();

    let mut categories: Vec<CategorySpend> = budget
        .categories
        .iter()
        .map(|(category, allocated)| {
            let spent = spent.remove(category).unwrap_or(Decimal::ZERO);
            CategorySpend {
                category: category.clone(),
                allocated: *allocated,
                spent,
                remaining: *allocated - spent,
            }
        })
        .collect();
    categories.extend(spent.into_iter().map(|(category, spent)| CategorySpend {
        category,
        allocated: Decimal::ZERO,
        spent,
        remaining: -spent,
    }));
    categories.sort_by(|a, b| a.category.cmp(&b.category));

    BudgetSummary {
        currency: snapshot.currency.code.clone(),
        total_budget: budget.total,
        total_spent,
        remaining: budget.total - total_spent,
        allocated,
        unallocated: budget.total - allocated,
        categories,
    }
}
