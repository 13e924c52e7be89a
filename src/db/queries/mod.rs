pub mod budgets;
pub mod cash_flow;
pub mod goals;
pub mod transactions;

use rust_decimal::Decimal;
use rusqlite::types::Type;
use rusqlite::Row;
use std::str::FromStr;

/// Read a TEXT column holding a decimal amount.
pub(crate) fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional_decimal_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Decimal::from_str(s.trim())
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
