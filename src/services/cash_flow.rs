//! Month-level cash-flow analysis: monthly sums, recurring-amount detection and
//! short-range forecasts driven by a pluggable trend model.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::date_utils;
use crate::models::transaction::add_amount;
use crate::models::{Transaction, TransactionKind};

/// Two amounts closer than this are considered the same recurring charge.
pub const RECURRING_AMOUNT_THRESHOLD: i64 = 5;

/// Above this many transactions recurring detection switches from the pairwise
/// scan to the sorted scan.
const PAIRWISE_LIMIT: usize = 256;

/// Months of history a forecast looks back over.
const FORECAST_LOOKBACK_MONTHS: i32 = 6;

pub const MIN_FORECAST_HISTORY: usize = 3;

/// Income, expenses and net flow for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyFlow {
    /// `YYYY-MM`
    pub month: String,
    #[serde(skip)]
    pub month_number: u32,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net_flow: Decimal,
    pub transaction_count: usize,
}

impl MonthlyFlow {
    /// Plain sum of every amount booked in the month.
    pub fn total(&self) -> Decimal {
        add_amount(self.income, self.expenses)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowFactors {
    pub income: f64,
    pub expenses: f64,
    pub net_flow: f64,
}

impl FlowFactors {
    pub const NEUTRAL: Self = Self {
        income: 1.0,
        expenses: 1.0,
        net_flow: 1.0,
    };
}

/// Seasonal multipliers keyed by calendar month (1 = January).
pub type SeasonalFactors = BTreeMap<u32, FlowFactors>;

/// Average month-over-month growth rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GrowthTrends {
    pub income: f64,
    pub expenses: f64,
    pub net_flow: f64,
}

/// Source of the seasonal and growth figures used by the analysis and forecast.
pub trait TrendModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn seasonal_factors(&self, history: &[MonthlyFlow]) -> SeasonalFactors;

    fn growth_trends(&self, history: &[MonthlyFlow]) -> GrowthTrends;
}

/// Neutral figures: every month weighs 1.0 and nothing grows.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTrends;

impl TrendModel for PlaceholderTrends {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn seasonal_factors(&self, _history: &[MonthlyFlow]) -> SeasonalFactors {
        (1..=12).map(|month| (month, FlowFactors::NEUTRAL)).collect()
    }

    fn growth_trends(&self, _history: &[MonthlyFlow]) -> GrowthTrends {
        GrowthTrends::default()
    }
}

/// Figures derived from the history itself.
///
/// A month's seasonal index is its average divided by the average over all
/// months. Growth is the mean of the month-over-month relative changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoricalTrends;

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn ratio(value: f64, base: f64) -> f64 {
    if base == 0.0 {
        1.0
    } else {
        value / base
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl TrendModel for HistoricalTrends {
    fn name(&self) -> &'static str {
        "historical"
    }

    fn seasonal_factors(&self, history: &[MonthlyFlow]) -> SeasonalFactors {
        if history.is_empty() {
            return SeasonalFactors::new();
        }

        let count = history.len() as f64;
        let overall_income = history.iter().map(|m| to_f64(m.income)).sum::<f64>() / count;
        let overall_expenses = history.iter().map(|m| to_f64(m.expenses)).sum::<f64>() / count;
        let overall_net = history.iter().map(|m| to_f64(m.net_flow)).sum::<f64>() / count;

        let mut by_month: BTreeMap<u32, Vec<&MonthlyFlow>> = BTreeMap::new();
        for flow in history {
            by_month.entry(flow.month_number).or_default().push(flow);
        }

        by_month
            .into_iter()
            .map(|(month, flows)| {
                let income: Vec<f64> = flows.iter().map(|m| to_f64(m.income)).collect();
                let expenses: Vec<f64> = flows.iter().map(|m| to_f64(m.expenses)).collect();
                let net: Vec<f64> = flows.iter().map(|m| to_f64(m.net_flow)).collect();
                (
                    month,
                    FlowFactors {
                        income: ratio(mean(&income), overall_income),
                        expenses: ratio(mean(&expenses), overall_expenses),
                        net_flow: ratio(mean(&net), overall_net),
                    },
                )
            })
            .collect()
    }

    fn growth_trends(&self, history: &[MonthlyFlow]) -> GrowthTrends {
        let mut income = Vec::new();
        let mut expenses = Vec::new();
        let mut net = Vec::new();

        for pair in history.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);

            let prev_income = to_f64(prev.income);
            if prev_income > 0.0 {
                income.push((to_f64(curr.income) - prev_income) / prev_income);
            }
            let prev_expenses = to_f64(prev.expenses);
            if prev_expenses > 0.0 {
                expenses.push((to_f64(curr.expenses) - prev_expenses) / prev_expenses);
            }
            let prev_net = to_f64(prev.net_flow);
            if prev_net != 0.0 {
                net.push((to_f64(curr.net_flow) - prev_net) / prev_net.abs());
            }
        }

        GrowthTrends {
            income: mean(&income),
            expenses: mean(&expenses),
            net_flow: mean(&net),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCashFlow {
    pub month: String,
    pub predicted_cash_flow: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowAnalysis {
    pub predictions: Vec<MonthlyCashFlow>,
    pub recurring_transactions: Vec<Transaction>,
    pub seasonal_factors: SeasonalFactors,
    pub growth_trends: GrowthTrends,
    pub trend_model: &'static str,
}

/// Group transactions into calendar months, oldest first. Records with an
/// unparseable date are left out; unparseable amounts count as zero.
pub fn monthly_flows(transactions: &[Transaction]) -> Vec<MonthlyFlow> {
    let mut months: BTreeMap<(i32, u32), MonthlyFlow> = BTreeMap::new();

    for tx in transactions {
        let Some(at) = tx.timestamp() else {
            warn!(transaction_id = tx.id, date = %tx.date, "Skipping transaction with unparseable date");
            continue;
        };
        let amount = tx.parsed_amount().unwrap_or(Decimal::ZERO);
        let day = at.date();

        let flow = months
            .entry((day.year(), day.month()))
            .or_insert_with(|| MonthlyFlow {
                month: date_utils::month_key(day),
                month_number: day.month(),
                income: Decimal::ZERO,
                expenses: Decimal::ZERO,
                net_flow: Decimal::ZERO,
                transaction_count: 0,
            });

        match tx.kind {
            TransactionKind::Income => {
                flow.income = add_amount(flow.income, amount);
                flow.net_flow = add_amount(flow.net_flow, amount);
            }
            TransactionKind::Expense => {
                flow.expenses = add_amount(flow.expenses, amount);
                flow.net_flow = add_amount(flow.net_flow, -amount);
            }
        }
        flow.transaction_count += 1;
    }

    months.into_values().collect()
}

/// Whether `a` and `b` differ by less than `threshold`. A difference too large
/// to represent is never close.
fn within(a: Decimal, b: Decimal, threshold: Decimal) -> bool {
    a.checked_sub(b).is_some_and(|diff| diff.abs() < threshold)
}

/// Flags, by position, the amounts that have another amount within the
/// recurring threshold. Compares every pair.
fn recurring_flags_pairwise(amounts: &[Option<Decimal>]) -> Vec<bool> {
    let threshold = Decimal::from(RECURRING_AMOUNT_THRESHOLD);
    amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let Some(a) = amount else { return false };
            amounts
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && other.is_some_and(|b| within(*a, b, threshold)))
        })
        .collect()
}

/// Same result as [`recurring_flags_pairwise`] in O(n log n): after sorting, the
/// closest other amount is always an immediate neighbour.
fn recurring_flags_sorted(amounts: &[Option<Decimal>]) -> Vec<bool> {
    let threshold = Decimal::from(RECURRING_AMOUNT_THRESHOLD);
    let mut sorted: Vec<(Decimal, usize)> = amounts
        .iter()
        .enumerate()
        .filter_map(|(i, amount)| amount.map(|a| (a, i)))
        .collect();
    sorted.sort();

    let mut flags = vec![false; amounts.len()];
    for (pos, (amount, index)) in sorted.iter().enumerate() {
        let near_prev = pos > 0 && within(*amount, sorted[pos - 1].0, threshold);
        let near_next = sorted
            .get(pos + 1)
            .is_some_and(|(next, _)| within(*next, *amount, threshold));
        flags[*index] = near_prev || near_next;
    }
    flags
}

/// Transactions whose amount is within the recurring threshold of some other
/// transaction, in input order. Records with an unparseable amount never match.
pub fn recurring_transactions(transactions: &[Transaction]) -> Vec<Transaction> {
    let amounts: Vec<Option<Decimal>> = transactions.iter().map(|t| t.parsed_amount()).collect();
    let flags = if amounts.len() > PAIRWISE_LIMIT {
        recurring_flags_sorted(&amounts)
    } else {
        recurring_flags_pairwise(&amounts)
    };

    transactions
        .iter()
        .zip(flags)
        .filter_map(|(tx, recurring)| recurring.then(|| tx.clone()))
        .collect()
}

pub fn predict_cash_flow(transactions: &[Transaction], model: &dyn TrendModel) -> CashFlowAnalysis {
    let history = monthly_flows(transactions);

    let predictions: Vec<MonthlyCashFlow> = history
        .iter()
        .map(|flow| MonthlyCashFlow {
            month: flow.month.clone(),
            predicted_cash_flow: flow.total(),
        })
        .collect();

    let analysis = CashFlowAnalysis {
        predictions,
        recurring_transactions: recurring_transactions(transactions),
        seasonal_factors: model.seasonal_factors(&history),
        growth_trends: model.growth_trends(&history),
        trend_model: model.name(),
    };

    debug!(
        months = analysis.predictions.len(),
        recurring = analysis.recurring_transactions.len(),
        model = model.name(),
        "Analyzed cash flow"
    );
    analysis
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastMonth {
    pub month: String,
    pub predicted_income: Decimal,
    pub predicted_expenses: Decimal,
    pub predicted_net_flow: Decimal,
    /// 0 to 100.
    pub confidence_score: u8,
}

fn money(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .unwrap_or(Decimal::ZERO)
}

/// Forecast the `months` calendar months after the one containing
/// `reference_date`.
///
/// Only history from the lookback window up to the reference month is used.
/// The base is a 1-2-3 weighted average of the last three of those months,
/// scaled by the seasonal factor of the target month and compounded growth.
/// Returns `None` when fewer than [`MIN_FORECAST_HISTORY`] months are available.
pub fn forecast(
    history: &[MonthlyFlow],
    reference_date: NaiveDate,
    months: u32,
    model: &dyn TrendModel,
) -> Option<Vec<ForecastMonth>> {
    let reference_month = date_utils::month_start(reference_date);
    let earliest = date_utils::month_key(date_utils::shift_months(
        reference_month,
        -FORECAST_LOOKBACK_MONTHS,
    ));
    let latest = date_utils::month_key(reference_month);

    let window: Vec<MonthlyFlow> = history
        .iter()
        .filter(|m| m.month >= earliest && m.month <= latest)
        .cloned()
        .collect();

    if window.len() < MIN_FORECAST_HISTORY {
        debug!(
            available = window.len(),
            required = MIN_FORECAST_HISTORY,
            "Not enough history to forecast"
        );
        return None;
    }

    let seasonal = model.seasonal_factors(&window);
    let growth = model.growth_trends(&window);

    let recent = &window[window.len() - MIN_FORECAST_HISTORY..];
    let (mut base_income, mut base_expenses, mut weights) = (0.0, 0.0, 0.0);
    for (idx, flow) in recent.iter().enumerate() {
        let weight = (idx + 1) as f64;
        base_income += to_f64(flow.income) * weight;
        base_expenses += to_f64(flow.expenses) * weight;
        weights += weight;
    }
    base_income /= weights;
    base_expenses /= weights;

    let data_quality = (window.len() as f64 / 12.0).min(1.0);
    let volatility = (1.0 - growth.net_flow.abs()).max(0.5);

    let predictions = (1..=months)
        .map(|i| {
            let target = date_utils::shift_months(reference_month, i as i32);
            let factors = seasonal
                .get(&target.month())
                .copied()
                .unwrap_or(FlowFactors::NEUTRAL);
            let steps = i as i32;

            let income = base_income * factors.income * (1.0 + growth.income).powi(steps);
            let expenses = base_expenses * factors.expenses * (1.0 + growth.expenses).powi(steps);

            let distance = (1.0 - 0.15 * i as f64).max(0.5);
            let confidence = (100.0 * data_quality * distance * volatility).round();

            ForecastMonth {
                month: date_utils::month_key(target),
                predicted_income: money(income),
                predicted_expenses: money(expenses),
                predicted_net_flow: money(income - expenses),
                confidence_score: confidence.clamp(0.0, 100.0) as u8,
            }
        })
        .collect();

    Some(predictions)
}
