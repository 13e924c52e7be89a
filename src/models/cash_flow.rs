use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A cached cash-flow prediction for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPrediction {
    pub id: i64,
    pub month: String,
    pub predicted_cash_flow: Decimal,
    pub actual_cash_flow: Option<Decimal>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetActualCashFlow {
    pub month: String,
    pub actual_cash_flow: Decimal,
}
