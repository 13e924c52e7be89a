use crate::models::transaction::{NewTransaction, Transaction, TransactionKind};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct TransactionFilter {
    /// Inclusive `YYYY-MM-DD`.
    pub from_date: Option<String>,
    /// Inclusive `YYYY-MM-DD`; matches any time on that day.
    pub to_date: Option<String>,
    pub category: Option<String>,
}

const SELECT_COLUMNS: &str = "SELECT id, amount, category, date, description, kind FROM transactions";

fn map_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let kind: String = row.get(5)?;
    Ok(Transaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        category: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        kind: TransactionKind::parse(&kind),
    })
}

pub fn list_transactions(
    conn: &Connection,
    filter: &TransactionFilter,
) -> rusqlite::Result<Vec<Transaction>> {
    let mut sql = format!("{} WHERE 1=1", SELECT_COLUMNS);
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref from_date) = filter.from_date {
        sql.push_str(" AND substr(date, 1, 10) >= ?");
        params_vec.push(Box::new(from_date.clone()));
    }
    if let Some(ref to_date) = filter.to_date {
        sql.push_str(" AND substr(date, 1, 10) <= ?");
        params_vec.push(Box::new(to_date.clone()));
    }
    if let Some(ref category) = filter.category {
        sql.push_str(" AND category = ?");
        params_vec.push(Box::new(category.clone()));
    }
    sql.push_str(" ORDER BY id");

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;

    let transactions = stmt
        .query_map(params_refs.as_slice(), map_transaction)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = transactions.len(), "Listed transactions");
    Ok(transactions)
}

pub fn get_transaction(conn: &Connection, id: i64) -> rusqlite::Result<Option<Transaction>> {
    trace!(transaction_id = id, "Fetching transaction");
    conn.query_row(
        &format!("{} WHERE id = ?", SELECT_COLUMNS),
        [id],
        map_transaction,
    )
    .optional()
}

/// True when a transaction with the same amount, category and date exists.
pub fn is_duplicate(
    conn: &Connection,
    amount: &str,
    category: Option<&str>,
    date: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions
                       WHERE amount = ? AND category IS ? AND date = ?)",
        params![amount, category, date],
        |row| row.get(0),
    )
}

pub fn create_transaction(conn: &Connection, tx: &NewTransaction) -> rusqlite::Result<i64> {
    let kind = TransactionKind::for_category(tx.category.as_deref());
    conn.execute(
        "INSERT INTO transactions (amount, category, date, description, kind)
         VALUES (?, ?, ?, ?, ?)",
        params![tx.amount, tx.category, tx.date, tx.description, kind.as_str()],
    )?;

    let id = conn.last_insert_rowid();
    debug!(
        transaction_id = id,
        amount = %tx.amount,
        kind = kind.as_str(),
        "Created transaction"
    );
    Ok(id)
}

pub fn delete_transaction(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM transactions WHERE id = ?", [id])?;
    if rows > 0 {
        debug!(transaction_id = id, "Deleted transaction");
    }
    Ok(rows > 0)
}

/// Distinct `YYYY-MM` months that have transactions, newest first.
pub fn available_months(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT substr(date, 1, 7) AS month
         FROM transactions
         WHERE date GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]*'
         ORDER BY month DESC",
    )?;

    let months = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(months)
}
