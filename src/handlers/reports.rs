use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::date_utils::{self, DatePreset, DateRange};
use crate::db::queries::budgets;
use crate::db::queries::transactions::{self, TransactionFilter};
use crate::error::{AppError, AppResult};
use crate::services::aggregation::{self, AggregationReport};
use crate::services::cash_flow::{self, MonthlyFlow};
use crate::services::csv_export::{self, MonthlyReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub preset: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Defaults to an explicit `to`, otherwise today.
    pub reference: Option<String>,
}

fn parse_day(value: Option<&str>, field: &str) -> AppResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => date_utils::parse_date(v)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {}: {}", field, v))),
        None => Ok(None),
    }
}

/// A preset wins over explicit bounds; missing bounds fall back to the current month.
fn resolve_range(params: &SummaryParams, today: NaiveDate) -> AppResult<DateRange> {
    if let Some(preset) = params.preset.as_deref().filter(|p| !p.is_empty()) {
        let preset: DatePreset = preset
            .parse()
            .map_err(|_| AppError::Validation(format!("Unknown preset: {}", preset)))?;
        return Ok(DateRange::from_preset(preset, today));
    }

    let default = DateRange::from_preset(DatePreset::ThisMonth, today);
    Ok(DateRange::new(
        parse_day(params.from.as_deref(), "from")?.unwrap_or(default.from),
        parse_day(params.to.as_deref(), "to")?.unwrap_or(default.to),
    ))
}

pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<AggregationReport>> {
    let today = state.today();
    let range = resolve_range(&params, today)?;
    let uses_preset = params.preset.as_deref().is_some_and(|p| !p.is_empty());
    let reference = match parse_day(params.reference.as_deref(), "reference")? {
        Some(day) => day,
        None if uses_preset => today,
        None => parse_day(params.to.as_deref(), "to")?.unwrap_or(today),
    };

    if range.is_empty() {
        debug!(from = %range.from, to = %range.to, "Report range is inverted");
    }

    let conn = state.db.get()?;
    let all = transactions::list_transactions(&conn, &TransactionFilter::default())?;

    Ok(Json(aggregation::aggregate(&all, range, reference)))
}

pub async fn available_months(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let conn = state.db.get()?;
    Ok(Json(transactions::available_months(&conn)?))
}

/// Income against expenses per month, oldest first.
pub async fn savings_trend(State(state): State<AppState>) -> AppResult<Json<Vec<MonthlyFlow>>> {
    let conn = state.db.get()?;
    let all = transactions::list_transactions(&conn, &TransactionFilter::default())?;
    Ok(Json(cash_flow::monthly_flows(&all)))
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub month: String,
    #[serde(default)]
    pub include_transactions: bool,
}

pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> AppResult<impl IntoResponse> {
    let month = date_utils::parse_month_key(&params.month)
        .ok_or_else(|| AppError::Validation(format!("Invalid month: {}", params.month)))?;
    let conn = state.db.get()?;
    // The report filters by parsed timestamp itself.
    let all = transactions::list_transactions(&conn, &TransactionFilter::default())?;
    let month_budgets = budgets::list_budgets(&conn, &date_utils::month_key(month))?;

    let report = MonthlyReport::build(month, &all, &month_budgets, params.include_transactions);
    let body = csv_export::write_report_csv(&report)?;

    info!(
        month = %report.label,
        categories = report.categories.len(),
        "Report downloaded"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.filename()),
            ),
        ],
        body,
    ))
}
