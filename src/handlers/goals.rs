use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use crate::date_utils;
use crate::db::queries::goals;
use crate::db::queries::transactions::{self, TransactionFilter};
use crate::error::{AppError, AppResult};
use crate::handlers::validate_amount;
use crate::models::{Goal, NewGoal, NewHistoryEntry};
use crate::services::cash_flow;
use crate::services::projection::{
    goal_stats, project_from_trend, project_goal, GoalStats, ProjectionResult, TrendProjection,
};
use crate::state::AppState;

fn validate_goal(goal: &NewGoal) -> AppResult<()> {
    if goal.name.trim().is_empty() {
        return Err(AppError::Validation("Goal name is required".into()));
    }
    if goal.target_amount <= Decimal::ZERO {
        return Err(AppError::Validation(
            "target_amount must be greater than zero".into(),
        ));
    }
    validate_amount(goal.target_amount, "target_amount")?;
    validate_amount(goal.current_savings, "current_savings")?;
    validate_amount(goal.monthly_contribution, "monthly_contribution")?;
    if let Some(date) = goal.target_date.as_deref().filter(|d| !d.is_empty()) {
        if date_utils::parse_date(date).is_none() {
            return Err(AppError::Validation(format!("Invalid target_date: {}", date)));
        }
    }
    Ok(())
}

fn load_goal(conn: &rusqlite::Connection, id: i64) -> AppResult<Goal> {
    goals::get_goal(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Goal {} not found", id)))
}

pub async fn index(State(state): State<AppState>) -> AppResult<Json<Vec<Goal>>> {
    let conn = state.db.get()?;
    Ok(Json(goals::list_goals(&conn)?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Goal>> {
    let conn = state.db.get()?;
    Ok(Json(load_goal(&conn, id)?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewGoal>,
) -> AppResult<(StatusCode, Json<Goal>)> {
    validate_goal(&new)?;

    let conn = state.db.get()?;
    let id = goals::create_goal(&conn, &new)?;
    info!(goal_id = id, "Goal created");
    Ok((StatusCode::CREATED, Json(load_goal(&conn, id)?)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(goal): Json<NewGoal>,
) -> AppResult<Json<Goal>> {
    validate_goal(&goal)?;

    let conn = state.db.get()?;
    if !goals::update_goal(&conn, id, &goal)? {
        return Err(AppError::NotFound(format!("Goal {} not found", id)));
    }
    Ok(Json(load_goal(&conn, id)?))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if !goals::delete_goal(&conn, id)? {
        return Err(AppError::NotFound(format!("Goal {} not found", id)));
    }
    info!(goal_id = id, "Goal deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Append a savings entry to a goal's history.
pub async fn add_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(entry): Json<NewHistoryEntry>,
) -> AppResult<(StatusCode, Json<Goal>)> {
    // Withdrawals are recorded as negative savings.
    validate_amount(entry.savings.abs(), "savings")?;

    let recorded_at = match entry.recorded_at.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => date_utils::parse_timestamp(value)
            .ok_or_else(|| AppError::Validation(format!("Invalid recorded_at: {}", value)))?,
        _ => Local::now().naive_local(),
    };

    let conn = state.db.get()?;
    load_goal(&conn, id)?;

    goals::append_history(
        &conn,
        id,
        entry.savings,
        &recorded_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    )?;
    Ok((StatusCode::CREATED, Json(load_goal(&conn, id)?)))
}

pub async fn projection(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ProjectionResult>> {
    let conn = state.db.get()?;
    let goal = load_goal(&conn, id)?;
    Ok(Json(project_goal(&goal, state.today())))
}

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<GoalStats>> {
    let conn = state.db.get()?;
    Ok(Json(goal_stats(&goals::list_goals(&conn)?)))
}

#[derive(Debug, Deserialize)]
pub struct TrendProjectionRequest {
    pub target_amount: Decimal,
    pub current_savings: Decimal,
}

/// Project an ad-hoc target from the monthly net savings in the transactions.
pub async fn trend_projection(
    State(state): State<AppState>,
    Json(request): Json<TrendProjectionRequest>,
) -> AppResult<Json<TrendProjection>> {
    validate_amount(request.target_amount, "target_amount")?;
    validate_amount(request.current_savings, "current_savings")?;

    let conn = state.db.get()?;
    let all = transactions::list_transactions(&conn, &TransactionFilter::default())?;
    let history = cash_flow::monthly_flows(&all);

    let projection = project_from_trend(
        &history,
        request.target_amount,
        request.current_savings,
        state.today(),
    )
    .ok_or_else(|| AppError::Validation("Not enough data for projection".into()))?;

    debug!(months_used = projection.months_used, "Trend projection computed");
    Ok(Json(projection))
}
