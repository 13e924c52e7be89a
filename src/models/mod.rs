pub mod budget;
pub mod cash_flow;
pub mod goal;
pub mod transaction;

pub use budget::{Budget, BudgetUpdate, NewBudget};
pub use cash_flow::{CashFlowPrediction, SetActualCashFlow};
pub use goal::{Goal, HistoryEntry, NewGoal, NewHistoryEntry};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
