use crate::db::queries::{decimal_column, optional_decimal_column};
use crate::models::cash_flow::CashFlowPrediction;
use rust_decimal::Decimal;
use rusqlite::{params, Connection, Row};
use tracing::debug;

fn map_prediction(row: &Row<'_>) -> rusqlite::Result<CashFlowPrediction> {
    Ok(CashFlowPrediction {
        id: row.get(0)?,
        month: row.get(1)?,
        predicted_cash_flow: decimal_column(row, 2)?,
        actual_cash_flow: optional_decimal_column(row, 3)?,
        created_at: row.get(4)?,
    })
}

pub fn list_predictions(conn: &Connection) -> rusqlite::Result<Vec<CashFlowPrediction>> {
    let mut stmt = conn.prepare(
        "SELECT id, month, predicted_cash_flow, actual_cash_flow, created_at
         FROM cash_flow_predictions
         ORDER BY month",
    )?;
    let predictions = stmt
        .query_map([], map_prediction)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(predictions)
}

/// Insert or replace the prediction for `month`. One row per month is kept; an
/// actual figure recorded earlier survives a new prediction.
pub fn upsert_prediction(
    conn: &Connection,
    month: &str,
    predicted_cash_flow: Decimal,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO cash_flow_predictions (month, predicted_cash_flow)
         VALUES (?, ?)
         ON CONFLICT(month) DO UPDATE SET
            predicted_cash_flow = excluded.predicted_cash_flow,
            updated_at = datetime('now')",
        params![month, predicted_cash_flow.to_string()],
    )?;
    debug!(month, %predicted_cash_flow, "Stored cash flow prediction");
    Ok(())
}

pub fn set_actual(conn: &Connection, month: &str, actual: Decimal) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE cash_flow_predictions
         SET actual_cash_flow = ?, updated_at = datetime('now')
         WHERE month = ?",
        params![actual.to_string(), month],
    )?;
    if rows > 0 {
        debug!(month, %actual, "Recorded actual cash flow");
    }
    Ok(rows > 0)
}
