use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monthly spending limit for one category. `name` is the join key to
/// `Transaction::category`; `spent` is a cached sum the reconciler keeps current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub name: String,
    pub budget_limit: Decimal,
    pub spent: Decimal,
    pub month: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBudget {
    pub name: String,
    pub budget_limit: Decimal,
    #[serde(default)]
    pub spent: Decimal,
    /// `YYYY-MM`; the current month when omitted.
    pub month: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetUpdate {
    pub budget_limit: Option<Decimal>,
    pub spent: Option<Decimal>,
}
