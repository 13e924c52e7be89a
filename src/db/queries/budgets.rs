use crate::db::queries::decimal_column;
use crate::models::budget::{Budget, BudgetUpdate, NewBudget};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

const SELECT_COLUMNS: &str =
    "SELECT id, name, budget_limit, spent, month, created_at, updated_at FROM budgets";

fn map_budget(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        name: row.get(1)?,
        budget_limit: decimal_column(row, 2)?,
        spent: decimal_column(row, 3)?,
        month: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn list_budgets(conn: &Connection, month: &str) -> rusqlite::Result<Vec<Budget>> {
    let mut stmt = conn.prepare(&format!("{} WHERE month = ? ORDER BY name", SELECT_COLUMNS))?;

    let budgets = stmt
        .query_map([month], map_budget)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(month, count = budgets.len(), "Listed budgets");
    Ok(budgets)
}

pub fn get_budget(conn: &Connection, id: i64) -> rusqlite::Result<Option<Budget>> {
    trace!(budget_id = id, "Fetching budget");
    conn.query_row(&format!("{} WHERE id = ?", SELECT_COLUMNS), [id], map_budget)
        .optional()
}

pub fn create_budget(conn: &Connection, budget: &NewBudget, month: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO budgets (name, budget_limit, spent, month) VALUES (?, ?, ?, ?)",
        params![
            budget.name,
            budget.budget_limit.to_string(),
            budget.spent.to_string(),
            month
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(budget_id = id, name = %budget.name, month, "Created budget");
    Ok(id)
}

pub fn update_budget(conn: &Connection, id: i64, update: &BudgetUpdate) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE budgets SET
            budget_limit = COALESCE(?, budget_limit),
            spent = COALESCE(?, spent),
            updated_at = datetime('now')
         WHERE id = ?",
        params![
            update.budget_limit.map(|d| d.to_string()),
            update.spent.map(|d| d.to_string()),
            id
        ],
    )?;
    if rows > 0 {
        debug!(budget_id = id, "Updated budget");
    }
    Ok(rows > 0)
}

pub fn set_spent(conn: &Connection, id: i64, spent: Decimal) -> rusqlite::Result<bool> {
    update_budget(
        conn,
        id,
        &BudgetUpdate {
            budget_limit: None,
            spent: Some(spent),
        },
    )
}

pub fn delete_budget(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM budgets WHERE id = ?", [id])?;
    if rows > 0 {
        debug!(budget_id = id, "Deleted budget");
    }
    Ok(rows > 0)
}
