//! Time-to-target estimates for savings goals.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::date_utils;
use crate::models::transaction::{add_amount, sum_amounts};
use crate::models::Goal;
use crate::services::cash_flow::MonthlyFlow;

/// Number of most recent history entries averaged into the contribution rate.
const HISTORY_WINDOW: usize = 3;

/// Goals further out than this many months are long-term.
const SHORT_TERM_MONTHS: u64 = 12;

/// Savings plan length for goals without a target date.
const DEFAULT_PLAN_MONTHS: u32 = 12;

/// Most recent months of net savings averaged by [`project_from_trend`].
const TREND_WINDOW_MONTHS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalStatus {
    #[serde(rename = "Increase Savings")]
    IncreaseSavings,
    #[serde(rename = "Short-term")]
    ShortTerm,
    #[serde(rename = "Long-term")]
    LongTerm,
    Achieved,
}

/// Serializes as a number, or `"N/A"` when the goal cannot be projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatedMonths {
    Months(u64),
    NotAvailable,
}

impl Serialize for EstimatedMonths {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Months(n) => serializer.serialize_u64(*n),
            Self::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionResult {
    pub goal_id: i64,
    pub estimated_months: EstimatedMonths,
    pub projected_completion_date: Option<NaiveDate>,
    pub status: GoalStatus,
    pub average_contribution: Decimal,
    pub remaining_amount: Decimal,
    /// Capped at 100, one decimal.
    pub progress_percent: Decimal,
    /// Calendar months until `target_date` (at least 1), or 12 without one.
    pub months_to_target_date: u32,
    /// What must be saved each month to reach the target in that time.
    pub monthly_savings_needed: Decimal,
}

/// Totals across every goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalStats {
    pub total_goals: usize,
    pub total_target: Decimal,
    pub total_saved: Decimal,
    /// Mean uncapped progress percentage, one decimal.
    pub average_progress: Decimal,
}

/// A projection driven by observed monthly net savings instead of goal history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendProjection {
    pub average_monthly_savings: Decimal,
    pub months_used: usize,
    pub estimated_months: EstimatedMonths,
    pub projected_completion_date: Option<NaiveDate>,
    pub status: GoalStatus,
}

/// Mean of the last few history entries, or the planned monthly contribution
/// when there is no history yet.
pub fn average_contribution(goal: &Goal) -> Decimal {
    let recent = &goal.history[goal.history.len().saturating_sub(HISTORY_WINDOW)..];
    if recent.is_empty() {
        return goal.monthly_contribution;
    }
    sum_amounts(recent.iter().map(|entry| entry.savings)) / Decimal::from(recent.len())
}

/// Months to close `remaining` at `average` per month, and what that means.
fn estimate(
    remaining: Decimal,
    average: Decimal,
    reference_date: NaiveDate,
) -> (EstimatedMonths, Option<NaiveDate>, GoalStatus) {
    if remaining <= Decimal::ZERO {
        return (EstimatedMonths::Months(0), Some(reference_date), GoalStatus::Achieved);
    }
    if average <= Decimal::ZERO {
        return (EstimatedMonths::NotAvailable, None, GoalStatus::IncreaseSavings);
    }

    match remaining
        .checked_div(average)
        .and_then(|months| months.ceil().to_u64())
    {
        Some(months) => {
            let date = u32::try_from(months)
                .ok()
                .and_then(|m| reference_date.checked_add_months(Months::new(m)));
            let status = if months > SHORT_TERM_MONTHS {
                GoalStatus::LongTerm
            } else {
                GoalStatus::ShortTerm
            };
            (EstimatedMonths::Months(months), date, status)
        }
        None => (EstimatedMonths::NotAvailable, None, GoalStatus::IncreaseSavings),
    }
}

/// Whole calendar months from `reference_date` to the goal's target date, never
/// less than one. Goals without a (parseable) target date plan over a year.
pub fn plan_months(goal: &Goal, reference_date: NaiveDate) -> u32 {
    let Some(target) = goal.target_date.as_deref().and_then(date_utils::parse_date) else {
        return DEFAULT_PLAN_MONTHS;
    };
    let months = (target.year() - reference_date.year()) * 12 + target.month() as i32
        - reference_date.month() as i32;
    u32::try_from(months.max(1)).unwrap_or(1)
}

pub fn project_goal(goal: &Goal, reference_date: NaiveDate) -> ProjectionResult {
    let average = average_contribution(goal);
    let remaining = add_amount(goal.target_amount, -goal.current_savings);
    let (estimated_months, projected_completion_date, status) =
        estimate(remaining, average, reference_date);

    let months_to_target_date = plan_months(goal, reference_date);
    let monthly_savings_needed =
        (remaining.max(Decimal::ZERO) / Decimal::from(months_to_target_date)).round_dp(2);

    debug!(
        goal_id = goal.id,
        %average,
        ?estimated_months,
        ?status,
        "Projected goal"
    );

    ProjectionResult {
        goal_id: goal.id,
        estimated_months,
        projected_completion_date,
        status,
        average_contribution: average,
        remaining_amount: remaining.max(Decimal::ZERO),
        progress_percent: goal.progress_percent(),
        months_to_target_date,
        monthly_savings_needed,
    }
}

pub fn goal_stats(goals: &[Goal]) -> GoalStats {
    let average_progress = if goals.is_empty() {
        Decimal::ZERO
    } else {
        let total = sum_amounts(goals.iter().map(Goal::raw_progress_percent));
        (total / Decimal::from(goals.len())).round_dp(1)
    };

    GoalStats {
        total_goals: goals.len(),
        total_target: sum_amounts(goals.iter().map(|g| g.target_amount)),
        total_saved: sum_amounts(goals.iter().map(|g| g.current_savings)),
        average_progress,
    }
}

/// Project reaching `target_amount` from `current_savings` at the average net
/// savings of the latest months in `history` (oldest first). `None` when there
/// is no history at all.
pub fn project_from_trend(
    history: &[MonthlyFlow],
    target_amount: Decimal,
    current_savings: Decimal,
    reference_date: NaiveDate,
) -> Option<TrendProjection> {
    if history.is_empty() {
        return None;
    }
    let recent = &history[history.len().saturating_sub(TREND_WINDOW_MONTHS)..];
    let average = sum_amounts(recent.iter().map(|m| m.net_flow)) / Decimal::from(recent.len());

    let remaining = add_amount(target_amount, -current_savings);
    let (estimated_months, projected_completion_date, status) =
        estimate(remaining, average, reference_date);

    debug!(months = recent.len(), %average, ?estimated_months, "Projected from savings trend");

    Some(TrendProjection {
        average_monthly_savings: average.round_dp(2),
        months_used: recent.len(),
        estimated_months,
        projected_completion_date,
        status,
    })
}
