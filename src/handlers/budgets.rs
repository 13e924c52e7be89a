use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::date_utils::{self, DateRange};
use crate::db::queries::budgets;
use crate::db::queries::transactions::{self, TransactionFilter};
use crate::error::{AppError, AppResult};
use crate::handlers::validate_amount;
use crate::models::{Budget, BudgetUpdate, NewBudget, Transaction};
use crate::services::aggregation;
use crate::services::budget::{reconcile_spent, SpentUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MonthParams {
    pub month: Option<String>,
}

/// Normalize a `YYYY-MM` parameter, defaulting to the current month.
fn resolve_month(state: &AppState, month: Option<&str>) -> AppResult<String> {
    match month.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => date_utils::parse_month_key(m)
            .map(date_utils::month_key)
            .ok_or_else(|| AppError::Validation(format!("Invalid month: {}", m))),
        None => Ok(date_utils::month_key(state.today())),
    }
}

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> AppResult<Json<Vec<Budget>>> {
    let month = resolve_month(&state, params.month.as_deref())?;
    let conn = state.db.get()?;
    Ok(Json(budgets::list_budgets(&conn, &month)?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Budget>> {
    let conn = state.db.get()?;
    budgets::get_budget(&conn, id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Budget {} not found", id)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewBudget>,
) -> AppResult<(StatusCode, Json<Budget>)> {
    if new.name.trim().is_empty() {
        return Err(AppError::Validation("Budget name is required".into()));
    }
    validate_amount(new.budget_limit, "budget_limit")?;
    validate_amount(new.spent, "spent")?;
    let month = resolve_month(&state, new.month.as_deref())?;

    let conn = state.db.get()?;
    let id = match budgets::create_budget(&conn, &new, &month) {
        Ok(id) => id,
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(AppError::Validation(format!(
                "A budget named '{}' already exists for {}",
                new.name, month
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let budget = budgets::get_budget(&conn, id)?
        .ok_or_else(|| AppError::Internal(format!("Budget {} vanished after insert", id)))?;
    info!(budget_id = id, month = %month, "Budget created");
    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<BudgetUpdate>,
) -> AppResult<Json<Budget>> {
    if let Some(limit) = update.budget_limit {
        validate_amount(limit, "budget_limit")?;
    }
    if let Some(spent) = update.spent {
        validate_amount(spent, "spent")?;
    }

    let conn = state.db.get()?;
    if !budgets::update_budget(&conn, id, &update)? {
        return Err(AppError::NotFound(format!("Budget {} not found", id)));
    }
    budgets::get_budget(&conn, id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Budget {} not found", id)))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if !budgets::delete_budget(&conn, id)? {
        return Err(AppError::NotFound(format!("Budget {} not found", id)));
    }
    info!(budget_id = id, "Budget deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub month: String,
    pub checked: usize,
    pub updates: Vec<SpentUpdate>,
}

/// Recompute `spent` for every budget of a month from that month's transactions.
pub async fn reconcile(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> AppResult<Json<ReconcileResponse>> {
    let month = resolve_month(&state, params.month.as_deref())?;
    let range = date_utils::parse_month_key(&month)
        .map(DateRange::month_of)
        .ok_or_else(|| AppError::Internal(format!("Unparseable month key {}", month)))?;

    let conn = state.db.get()?;
    let month_budgets = budgets::list_budgets(&conn, &month)?;
    // Month membership follows the parsed timestamp, which can differ from the
    // stored text for offset timestamps.
    let all = transactions::list_transactions(&conn, &TransactionFilter::default())?;
    let month_transactions: Vec<Transaction> = aggregation::transactions_in_range(&all, range)
        .into_iter()
        .map(|(tx, _, _)| tx.clone())
        .collect();

    let updates = reconcile_spent(&month_transactions, &month_budgets);
    for update in &updates {
        debug!(
            budget_id = update.budget_id,
            previous = %update.previous_spent,
            new = %update.new_spent,
            "Applying reconciled spending"
        );
        budgets::set_spent(&conn, update.budget_id, update.new_spent)?;
    }

    info!(month = %month, updated = updates.len(), "Budgets reconciled");
    Ok(Json(ReconcileResponse {
        month,
        checked: month_budgets.len(),
        updates,
    }))
}
