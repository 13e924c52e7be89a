pub mod budgets;
pub mod cash_flow;
pub mod goals;
pub mod reports;
pub mod transactions;

use axum::http::{StatusCode, Uri};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::transaction::MAX_AMOUNT;
use crate::state::AppState;

/// Money entered through the API must be non-negative and at most [`MAX_AMOUNT`].
pub(crate) fn validate_amount(value: Decimal, field: &str) -> AppResult<()> {
    if value < Decimal::ZERO {
        return Err(AppError::Validation(format!("{} must not be negative", field)));
    }
    if value > MAX_AMOUNT {
        return Err(AppError::Validation(format!(
            "{} must not exceed {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        // Transactions
        .route("/transactions", get(transactions::index).post(transactions::create))
        .route(
            "/transactions/:id",
            get(transactions::show).delete(transactions::delete),
        )
        // Budgets
        .route("/budgets", get(budgets::index).post(budgets::create))
        .route("/budgets/reconcile", post(budgets::reconcile))
        .route(
            "/budgets/:id",
            get(budgets::show).put(budgets::update).delete(budgets::delete),
        )
        // Goals
        .route("/goals", get(goals::index).post(goals::create))
        .route("/goals/stats", get(goals::stats))
        .route(
            "/goals/:id",
            get(goals::show).put(goals::update).delete(goals::delete),
        )
        .route("/goals/:id/history", post(goals::add_history))
        .route("/goals/:id/projection", get(goals::projection))
        .route("/api/goal-projection", post(goals::trend_projection))
        // Reports (JSON for charts, CSV for download)
        .route("/api/reports/summary", get(reports::summary))
        .route("/api/reports/available-months", get(reports::available_months))
        .route("/api/reports/savings-trend", get(reports::savings_trend))
        .route("/api/reports/download", get(reports::download))
        // Cash flow
        .route("/api/cash-flow/analysis", get(cash_flow::analysis))
        .route(
            "/api/cash-flow/generate-predictions",
            post(cash_flow::generate_predictions),
        )
        .route("/api/cash-flow/predictions", get(cash_flow::list_predictions))
        .route("/api/cash-flow/set-actual", post(cash_flow::set_actual))
        .route("/api/cash-flow/forecast", get(cash_flow::forecast))
        // Health check
        .route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

pub async fn fallback(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("No route for {}", uri.path()) })),
    )
}
