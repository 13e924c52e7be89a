use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use crate::date_utils;
use crate::db::queries::transactions::{self, TransactionFilter};
use crate::error::{AppError, AppResult};
use crate::handlers::validate_amount;
use crate::models::transaction::parse_amount;
use crate::models::{NewTransaction, Transaction};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransactionParams {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub category: Option<String>,
}

fn validate_day(value: Option<String>, field: &str) -> AppResult<Option<String>> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => date_utils::parse_date(&v)
            .map(|d| Some(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| AppError::Validation(format!("Invalid {}: {}", field, v))),
        None => Ok(None),
    }
}

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<TransactionParams>,
) -> AppResult<Json<Vec<Transaction>>> {
    let conn = state.db.get()?;

    let filter = TransactionFilter {
        from_date: validate_day(params.from_date, "from_date")?,
        to_date: validate_day(params.to_date, "to_date")?,
        category: params.category.filter(|c| !c.is_empty()),
    };

    Ok(Json(transactions::list_transactions(&conn, &filter)?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Transaction>> {
    let conn = state.db.get()?;
    transactions::get_transaction(&conn, id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(mut new): Json<NewTransaction>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    new.amount = new.amount.trim().to_string();
    new.date = new.date.trim().to_string();
    new.category = new
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    debug!(amount = %new.amount, date = %new.date, "Creating transaction");

    let amount = parse_amount(&new.amount)
        .ok_or_else(|| AppError::Validation(format!("Invalid amount: {}", new.amount)))?;
    validate_amount(amount, "amount")?;
    new.date = date_utils::storage_timestamp(&new.date)
        .ok_or_else(|| AppError::Validation(format!("Invalid date: {}", new.date)))?;

    let conn = state.db.get()?;

    if transactions::is_duplicate(&conn, &new.amount, new.category.as_deref(), &new.date)? {
        return Err(AppError::Validation(
            "Duplicate transaction: same amount, category and date already recorded".into(),
        ));
    }

    let id = transactions::create_transaction(&conn, &new)?;
    let created = transactions::get_transaction(&conn, id)?
        .ok_or_else(|| AppError::Internal(format!("Transaction {} vanished after insert", id)))?;

    info!(transaction_id = id, "Transaction created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if !transactions::delete_transaction(&conn, id)? {
        return Err(AppError::NotFound(format!("Transaction {} not found", id)));
    }
    info!(transaction_id = id, "Transaction deleted");
    Ok(StatusCode::NO_CONTENT)
}
