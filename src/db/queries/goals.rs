use crate::db::queries::decimal_column;
use crate::models::goal::{Goal, HistoryEntry, NewGoal};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use tracing::{debug, trace};

const SELECT_COLUMNS: &str = "SELECT id, name, target_amount, current_savings, monthly_contribution,
        category, target_date, created_at, updated_at
 FROM goals";

fn map_goal(row: &Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        target_amount: decimal_column(row, 2)?,
        current_savings: decimal_column(row, 3)?,
        monthly_contribution: decimal_column(row, 4)?,
        category: row.get(5)?,
        target_date: row.get(6)?,
        history: Vec::new(),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn list_goals(conn: &Connection) -> rusqlite::Result<Vec<Goal>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))?;
    let mut goals = stmt
        .query_map([], map_goal)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut history = get_all_history(conn)?;
    for goal in &mut goals {
        goal.history = history.remove(&goal.id).unwrap_or_default();
    }

    debug!(count = goals.len(), "Listed goals");
    Ok(goals)
}

pub fn get_goal(conn: &Connection, id: i64) -> rusqlite::Result<Option<Goal>> {
    trace!(goal_id = id, "Fetching goal");
    let goal = conn
        .query_row(&format!("{} WHERE id = ?", SELECT_COLUMNS), [id], map_goal)
        .optional()?;

    match goal {
        Some(mut goal) => {
            goal.history = get_history(conn, id)?;
            Ok(Some(goal))
        }
        None => Ok(None),
    }
}

pub fn create_goal(conn: &Connection, goal: &NewGoal) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO goals (name, target_amount, current_savings, monthly_contribution,
                            category, target_date)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            goal.name,
            goal.target_amount.to_string(),
            goal.current_savings.to_string(),
            goal.monthly_contribution.to_string(),
            goal.category.as_deref().unwrap_or("other"),
            goal.target_date,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(goal_id = id, name = %goal.name, "Created goal");
    Ok(id)
}

pub fn update_goal(conn: &Connection, id: i64, goal: &NewGoal) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE goals SET name = ?, target_amount = ?, current_savings = ?,
                monthly_contribution = ?, category = ?, target_date = ?,
                updated_at = datetime('now')
         WHERE id = ?",
        params![
            goal.name,
            goal.target_amount.to_string(),
            goal.current_savings.to_string(),
            goal.monthly_contribution.to_string(),
            goal.category.as_deref().unwrap_or("other"),
            goal.target_date,
            id,
        ],
    )?;
    if rows > 0 {
        debug!(goal_id = id, "Updated goal");
    }
    Ok(rows > 0)
}

pub fn delete_goal(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM goals WHERE id = ?", [id])?;
    if rows > 0 {
        debug!(goal_id = id, "Deleted goal");
    }
    Ok(rows > 0)
}

pub fn append_history(
    conn: &Connection,
    goal_id: i64,
    savings: Decimal,
    recorded_at: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO goal_history (goal_id, savings, recorded_at) VALUES (?, ?, ?)",
        params![goal_id, savings.to_string(), recorded_at],
    )?;
    let id = conn.last_insert_rowid();
    debug!(goal_id, history_id = id, %savings, "Appended goal history");
    Ok(id)
}

fn map_history(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        savings: decimal_column(row, 0)?,
        recorded_at: row.get(1)?,
    })
}

pub fn get_history(conn: &Connection, goal_id: i64) -> rusqlite::Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT savings, recorded_at FROM goal_history
         WHERE goal_id = ?
         ORDER BY recorded_at, id",
    )?;
    let history = stmt
        .query_map([goal_id], map_history)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(history)
}

fn get_all_history(conn: &Connection) -> rusqlite::Result<HashMap<i64, Vec<HistoryEntry>>> {
    let mut stmt = conn.prepare(
        "SELECT goal_id, savings, recorded_at FROM goal_history ORDER BY goal_id, recorded_at, id",
    )?;

    let mut map: HashMap<i64, Vec<HistoryEntry>> = HashMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            HistoryEntry {
                savings: decimal_column(row, 1)?,
                recorded_at: row.get(2)?,
            },
        ))
    })?;

    for row in rows {
        let (goal_id, entry) = row?;
        map.entry(goal_id).or_default().push(entry);
    }

    Ok(map)
}
