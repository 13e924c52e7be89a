use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::models::transaction::add_amount;
use crate::models::{Budget, Transaction};

/// A proposed write of a budget's cached `spent` figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpentUpdate {
    pub budget_id: i64,
    pub previous_spent: Decimal,
    pub new_spent: Decimal,
}

/// Recompute each budget's `spent` as the sum of the transactions whose category
/// equals the budget name. Only budgets whose figure changed are returned.
///
/// The caller decides which transactions belong to the budget's period.
pub fn reconcile_spent(transactions: &[Transaction], budgets: &[Budget]) -> Vec<SpentUpdate> {
    let mut spent_by_category: HashMap<&str, Decimal> = HashMap::new();
    for tx in transactions {
        let Some(category) = tx.category.as_deref() else {
            continue;
        };
        let spent = spent_by_category.entry(category).or_default();
        *spent = add_amount(*spent, tx.parsed_amount().unwrap_or(Decimal::ZERO));
    }

    let updates: Vec<SpentUpdate> = budgets
        .iter()
        .filter_map(|budget| {
            let new_spent = spent_by_category
                .get(budget.name.as_str())
                .copied()
                .unwrap_or(Decimal::ZERO);
            (new_spent != budget.spent).then(|| SpentUpdate {
                budget_id: budget.id,
                previous_spent: budget.spent,
                new_spent,
            })
        })
        .collect();

    debug!(
        budgets = budgets.len(),
        changed = updates.len(),
        "Reconciled budget spending"
    );
    updates
}
