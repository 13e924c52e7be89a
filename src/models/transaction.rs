use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::date_utils;

/// Categories whose transactions count as income rather than spending.
pub const INCOME_CATEGORIES: [&str; 3] = ["Salary", "Investment", "Freelance"];

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Largest amount a single new record may carry (one trillion).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn for_category(category: Option<&str>) -> Self {
        match category {
            Some(c) if INCOME_CATEGORIES.contains(&c) => Self::Income,
            _ => Self::Expense,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Income" => Self::Income,
            _ => Self::Expense,
        }
    }
}

/// A transaction as the store holds it.
///
/// `amount` and `date` are kept as stored text: rows written by other tools may
/// not parse, and the report engine decides per record what to do with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: String,
    pub category: Option<String>,
    pub date: String,
    pub description: String,
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn parsed_amount(&self) -> Option<Decimal> {
        parse_amount(&self.amount)
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        date_utils::parse_timestamp(&self.date)
    }

    pub fn category_or_default(&self) -> &str {
        match self.category.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => UNCATEGORIZED,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub amount: String,
    pub category: Option<String>,
    pub date: String,
    #[serde(default)]
    pub description: String,
}

/// Parse a decimal amount, tolerating surrounding whitespace and thousands
/// separators ("1,250.50").
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let cleaned = value.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// `total + amount`, pinned at the representable limit instead of overflowing.
/// Stored rows are not bounded, so sums over them can reach the limit.
pub fn add_amount(total: Decimal, amount: Decimal) -> Decimal {
    total.checked_add(amount).unwrap_or_else(|| {
        warn!(%total, %amount, "Amount sum overflowed, saturating");
        if amount.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, add_amount)
}
