use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub savings: Decimal,
    pub recorded_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub current_savings: Decimal,
    pub monthly_contribution: Decimal,
    pub category: String,
    pub target_date: Option<String>,
    /// Oldest first.
    pub history: Vec<HistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
}

impl Goal {
    /// Share of the target already saved, uncapped. A non-positive target
    /// counts as fully saved.
    pub fn raw_progress_percent(&self) -> Decimal {
        if self.target_amount <= Decimal::ZERO {
            return Decimal::ONE_HUNDRED;
        }
        self.current_savings
            .checked_div(self.target_amount)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX)
    }

    /// Progress towards the target, capped at 100 and rounded to one decimal.
    pub fn progress_percent(&self) -> Decimal {
        self.raw_progress_percent()
            .min(Decimal::ONE_HUNDRED)
            .round_dp(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: Decimal,
    pub current_savings: Decimal,
    #[serde(default)]
    pub monthly_contribution: Decimal,
    pub category: Option<String>,
    pub target_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHistoryEntry {
    pub savings: Decimal,
    /// Defaults to the current time.
    pub recorded_at: Option<String>,
}
