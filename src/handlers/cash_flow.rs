use axum::extract::{Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::date_utils;
use crate::db::queries::cash_flow as predictions;
use crate::db::queries::transactions::{self, TransactionFilter};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CashFlowPrediction, SetActualCashFlow};
use crate::services::cash_flow::{
    self, CashFlowAnalysis, ForecastMonth, MonthlyCashFlow, MIN_FORECAST_HISTORY,
};
use crate::state::AppState;

/// Future predictions returned by a single listing.
const MAX_FUTURE_PREDICTIONS: usize = 6;

/// Months forecast when generating predictions: the current one and the next.
const GENERATED_FORECAST_MONTHS: u32 = 2;

const MAX_FORECAST_MONTHS: u32 = 12;

/// Store predictions without failing the request; the cache is best effort.
fn persist_predictions<'a>(db: &DbPool, rows: impl IntoIterator<Item = (&'a str, Decimal)>) -> usize {
    let conn = match db.get() {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, "Skipping prediction cache write, no connection");
            return 0;
        }
    };

    let mut stored = 0;
    for (month, value) in rows {
        match predictions::upsert_prediction(&conn, month, value) {
            Ok(()) => stored += 1,
            Err(e) => warn!(month, error = %e, "Failed to cache cash flow prediction"),
        }
    }
    stored
}

pub async fn analysis(State(state): State<AppState>) -> AppResult<Json<CashFlowAnalysis>> {
    let conn = state.db.get()?;
    let all = transactions::list_transactions(&conn, &TransactionFilter::default())?;
    Ok(Json(cash_flow::predict_cash_flow(&all, state.trend_model.as_ref())))
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub past_months_cached: usize,
    pub predictions: Vec<ForecastMonth>,
}

/// Fill the prediction cache: past months that have no entry get their observed
/// monthly sum, and the current and next month get a fresh forecast.
pub async fn generate_predictions(
    State(state): State<AppState>,
) -> AppResult<Json<GenerateResponse>> {
    let today = state.today();
    let current_month = date_utils::month_key(today);

    let (all, existing) = {
        let conn = state.db.get()?;
        (
            transactions::list_transactions(&conn, &TransactionFilter::default())?,
            predictions::list_predictions(&conn)?,
        )
    };

    if all.is_empty() {
        return Err(AppError::Validation(
            "No transactions available for prediction".into(),
        ));
    }

    let model = state.trend_model.as_ref();
    let analysis = cash_flow::predict_cash_flow(&all, model);

    let known: HashSet<&str> = existing.iter().map(|p| p.month.as_str()).collect();
    let missing_past: Vec<&MonthlyCashFlow> = analysis
        .predictions
        .iter()
        .filter(|p| p.month < current_month && !known.contains(p.month.as_str()))
        .collect();
    let past_months_cached = persist_predictions(
        &state.db,
        missing_past
            .iter()
            .map(|p| (p.month.as_str(), p.predicted_cash_flow)),
    );

    // Forecast from complete months only.
    let history = cash_flow::monthly_flows(&all);
    let last_complete = date_utils::shift_months(date_utils::month_start(today), -1);
    let future = cash_flow::forecast(&history, last_complete, GENERATED_FORECAST_MONTHS, model)
        .unwrap_or_default();
    persist_predictions(
        &state.db,
        future.iter().map(|f| (f.month.as_str(), f.predicted_net_flow)),
    );

    info!(
        past = past_months_cached,
        future = future.len(),
        model = model.name(),
        "Generated cash flow predictions"
    );

    let message = if future.is_empty() {
        format!(
            "Past months cached; forecasting needs at least {} months of history",
            MIN_FORECAST_HISTORY
        )
    } else {
        "Cash flow predictions generated successfully".to_string()
    };

    Ok(Json(GenerateResponse {
        message,
        past_months_cached,
        predictions: future,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Past,
    #[default]
    Future,
}

#[derive(Debug, Deserialize)]
pub struct PredictionParams {
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
pub struct PredictionView {
    #[serde(flatten)]
    pub prediction: CashFlowPrediction,
    /// Observed net flow for past months that have transactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_net_flow: Option<Decimal>,
}

/// Cached predictions strictly before or after the current month, oldest first.
pub async fn list_predictions(
    State(state): State<AppState>,
    Query(params): Query<PredictionParams>,
) -> AppResult<Json<Vec<PredictionView>>> {
    let current_month = date_utils::month_key(state.today());
    let conn = state.db.get()?;

    let cached: Vec<CashFlowPrediction> = predictions::list_predictions(&conn)?
        .into_iter()
        .filter(|p| match params.direction {
            Direction::Past => p.month < current_month,
            Direction::Future => p.month > current_month,
        })
        .collect();

    let views = match params.direction {
        Direction::Future => cached
            .into_iter()
            .take(MAX_FUTURE_PREDICTIONS)
            .map(|prediction| PredictionView {
                prediction,
                observed_net_flow: None,
            })
            .collect(),
        Direction::Past => {
            let all = transactions::list_transactions(&conn, &TransactionFilter::default())?;
            let observed: HashMap<String, Decimal> = cash_flow::monthly_flows(&all)
                .into_iter()
                .map(|flow| (flow.month, flow.net_flow))
                .collect();
            cached
                .into_iter()
                .map(|prediction| PredictionView {
                    observed_net_flow: observed.get(&prediction.month).copied(),
                    prediction,
                })
                .collect()
        }
    };

    Ok(Json(views))
}

#[derive(Debug, Serialize)]
pub struct SetActualResponse {
    pub message: String,
    pub prediction: CashFlowPrediction,
}

pub async fn set_actual(
    State(state): State<AppState>,
    Json(body): Json<SetActualCashFlow>,
) -> AppResult<Json<SetActualResponse>> {
    let month = date_utils::parse_month_key(&body.month)
        .map(date_utils::month_key)
        .ok_or_else(|| AppError::Validation(format!("Invalid month: {}", body.month)))?;

    let conn = state.db.get()?;
    if !predictions::set_actual(&conn, &month, body.actual_cash_flow)? {
        return Err(AppError::NotFound(format!("No prediction for {}", month)));
    }

    let prediction = predictions::list_predictions(&conn)?
        .into_iter()
        .find(|p| p.month == month)
        .ok_or_else(|| AppError::NotFound(format!("No prediction for {}", month)))?;

    info!(month = %month, actual = %body.actual_cash_flow, "Actual cash flow recorded");
    Ok(Json(SetActualResponse {
        message: "Actual cash flow updated".to_string(),
        prediction,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub months: Option<u32>,
}

pub async fn forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> AppResult<Json<Vec<ForecastMonth>>> {
    let months = params.months.unwrap_or(3);
    if months == 0 || months > MAX_FORECAST_MONTHS {
        return Err(AppError::Validation(format!(
            "months must be between 1 and {}",
            MAX_FORECAST_MONTHS
        )));
    }

    let conn = state.db.get()?;
    let all = transactions::list_transactions(&conn, &TransactionFilter::default())?;
    let history = cash_flow::monthly_flows(&all);

    cash_flow::forecast(&history, state.today(), months, state.trend_model.as_ref())
        .map(Json)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Insufficient data for prediction. Need at least {} months of history.",
                MIN_FORECAST_HISTORY
            ))
        })
}
