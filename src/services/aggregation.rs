//! Date-bucketed aggregation of transactions for reports, charts and exports.
//!
//! Everything here is a pure function of its inputs. The reference day is
//! always passed in; nothing reads the clock.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::date_utils::{self, DateRange};
use crate::models::transaction::add_amount;
use crate::models::{Transaction, TransactionKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodTotals {
    pub total: Decimal,
    pub expenses: Decimal,
    pub income: Decimal,
    pub transaction_count: usize,
}

impl PeriodTotals {
    fn add(&mut self, amount: Decimal, kind: TransactionKind) {
        self.total = add_amount(self.total, amount);
        match kind {
            TransactionKind::Expense => self.expenses = add_amount(self.expenses, amount),
            TransactionKind::Income => self.income = add_amount(self.income, amount),
        }
        self.transaction_count += 1;
    }
}

/// One labeled point of a time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub label: String,
    #[serde(flatten)]
    pub totals: PeriodTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCategories {
    pub month: String,
    pub categories: Vec<CategoryTotal>,
}

/// Everything the reports page draws, already in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub reference_date: NaiveDate,
    pub today: PeriodTotals,
    pub previous_day: PeriodTotals,
    pub current_month: PeriodTotals,
    /// Totals over `[from, to]`.
    pub range: PeriodTotals,
    /// Today's transactions by `HH:MM`, ascending.
    pub today_by_time: Vec<TimeBucket>,
    /// Weeks of the month within the range, keyed and ordered by (year, week).
    /// The same week number in different months of a year shares a bucket.
    pub weekly: Vec<TimeBucket>,
    /// Calendar months within the range, chronological.
    pub monthly: Vec<TimeBucket>,
    /// Calendar years over all transactions, ascending.
    pub yearly: Vec<TimeBucket>,
    /// Categories within the range, largest first.
    pub categories: Vec<CategoryTotal>,
    /// The three months before the reference month, chronological, each with
    /// its categories largest first.
    pub previous_months_by_category: Vec<MonthCategories>,
    /// Records dropped because their date could not be parsed.
    pub skipped_records: usize,
}

/// A transaction with its date and amount parsed.
struct Entry<'a> {
    tx: &'a Transaction,
    at: NaiveDateTime,
    amount: Decimal,
    kind: TransactionKind,
    category: &'a str,
}

/// Parse every record. Unparseable dates drop the record; unparseable amounts
/// count as zero. Both are logged, neither is an error.
fn normalize(transactions: &[Transaction]) -> (Vec<Entry<'_>>, usize) {
    let mut entries = Vec::with_capacity(transactions.len());
    let mut skipped = 0;

    for tx in transactions {
        let Some(at) = tx.timestamp() else {
            warn!(transaction_id = tx.id, date = %tx.date, "Skipping transaction with unparseable date");
            skipped += 1;
            continue;
        };

        let amount = tx.parsed_amount().unwrap_or_else(|| {
            warn!(transaction_id = tx.id, amount = %tx.amount, "Counting non-numeric amount as zero");
            Decimal::ZERO
        });

        entries.push(Entry {
            tx,
            at,
            amount,
            kind: tx.kind,
            category: tx.category_or_default(),
        });
    }

    (entries, skipped)
}

#[derive(Default)]
struct CategoryAccumulator {
    amount: Decimal,
    count: usize,
}

fn add_to_category<'a>(
    map: &mut BTreeMap<&'a str, CategoryAccumulator>,
    category: &'a str,
    amount: Decimal,
) {
    let acc = map.entry(category).or_default();
    acc.amount = add_amount(acc.amount, amount);
    acc.count += 1;
}

/// Largest amount first. The map is keyed by name, so equal amounts come out in
/// name order; callers should not rely on that.
fn sorted_categories(map: BTreeMap<&str, CategoryAccumulator>) -> Vec<CategoryTotal> {
    let mut result: Vec<CategoryTotal> = map
        .into_iter()
        .map(|(category, acc)| CategoryTotal {
            category: category.to_string(),
            amount: acc.amount,
            transaction_count: acc.count,
        })
        .collect();

    result.sort_by(|a, b| b.amount.cmp(&a.amount));
    result
}

fn into_buckets<K: Ord>(
    map: BTreeMap<K, PeriodTotals>,
    label: impl Fn(&K) -> String,
) -> Vec<TimeBucket> {
    map.into_iter()
        .map(|(key, totals)| TimeBucket {
            label: label(&key),
            totals,
        })
        .collect()
}

pub fn aggregate(
    transactions: &[Transaction],
    range: DateRange,
    reference_date: NaiveDate,
) -> AggregationReport {
    let (entries, skipped_records) = normalize(transactions);

    let previous_day = reference_date.pred_opt().unwrap_or(reference_date);
    let current_month = DateRange::month_of(reference_date);
    let trailing = DateRange::new(
        date_utils::shift_months(current_month.from, -3),
        current_month.from.pred_opt().unwrap_or(current_month.from),
    );

    let mut today_totals = PeriodTotals::default();
    let mut previous_day_totals = PeriodTotals::default();
    let mut current_month_totals = PeriodTotals::default();
    let mut range_totals = PeriodTotals::default();

    let mut by_time: BTreeMap<(u32, u32), PeriodTotals> = BTreeMap::new();
    let mut weekly: BTreeMap<(i32, u32), PeriodTotals> = BTreeMap::new();
    let mut monthly: BTreeMap<(i32, u32), PeriodTotals> = BTreeMap::new();
    let mut yearly: BTreeMap<i32, PeriodTotals> = BTreeMap::new();
    let mut categories: BTreeMap<&str, CategoryAccumulator> = BTreeMap::new();
    let mut trailing_matrix: BTreeMap<(i32, u32), BTreeMap<&str, CategoryAccumulator>> =
        BTreeMap::new();

    for entry in &entries {
        let day = entry.at.date();

        if day == reference_date {
            today_totals.add(entry.amount, entry.kind);
            by_time
                .entry((entry.at.hour(), entry.at.minute()))
                .or_default()
                .add(entry.amount, entry.kind);
        }
        if day == previous_day {
            previous_day_totals.add(entry.amount, entry.kind);
        }
        if current_month.contains(entry.at) {
            current_month_totals.add(entry.amount, entry.kind);
        }

        yearly
            .entry(day.year())
            .or_default()
            .add(entry.amount, entry.kind);

        if trailing.contains(entry.at) {
            add_to_category(
                trailing_matrix.entry((day.year(), day.month())).or_default(),
                entry.category,
                entry.amount,
            );
        }

        if !range.contains(entry.at) {
            continue;
        }

        range_totals.add(entry.amount, entry.kind);

        weekly
            .entry((day.year(), date_utils::week_of_month(day)))
            .or_default()
            .add(entry.amount, entry.kind);
        monthly
            .entry((day.year(), day.month()))
            .or_default()
            .add(entry.amount, entry.kind);
        add_to_category(&mut categories, entry.category, entry.amount);
    }

    let report = AggregationReport {
        from: range.from,
        to: range.to,
        reference_date,
        today: today_totals,
        previous_day: previous_day_totals,
        current_month: current_month_totals,
        range: range_totals,
        today_by_time: into_buckets(by_time, |(h, m)| format!("{:02}:{:02}", h, m)),
        weekly: into_buckets(weekly, |(year, week)| date_utils::week_label(*year, *week)),
        monthly: into_buckets(monthly, |(year, month)| date_utils::month_label(*year, *month)),
        yearly: into_buckets(yearly, |year| year.to_string()),
        categories: sorted_categories(categories),
        previous_months_by_category: trailing_matrix
            .into_iter()
            .map(|((year, month), cats)| MonthCategories {
                month: date_utils::month_label(year, month),
                categories: sorted_categories(cats),
            })
            .collect(),
        skipped_records,
    };

    debug!(
        transactions = transactions.len(),
        skipped = skipped_records,
        in_range = report.range.transaction_count,
        "Aggregated report"
    );

    report
}

/// Category totals for the transactions whose date falls in `range`.
pub fn category_totals(transactions: &[Transaction], range: DateRange) -> Vec<CategoryTotal> {
    let (entries, _) = normalize(transactions);
    let mut categories: BTreeMap<&str, CategoryAccumulator> = BTreeMap::new();

    for entry in entries.iter().filter(|e| range.contains(e.at)) {
        add_to_category(&mut categories, entry.category, entry.amount);
    }

    sorted_categories(categories)
}

/// The transactions whose date falls in `range`, oldest first, paired with their
/// parsed timestamp and amount.
pub fn transactions_in_range(
    transactions: &[Transaction],
    range: DateRange,
) -> Vec<(&Transaction, NaiveDateTime, Decimal)> {
    let (entries, _) = normalize(transactions);
    let mut matched: Vec<(&Transaction, NaiveDateTime, Decimal)> = entries
        .into_iter()
        .filter(|e| range.contains(e.at))
        .map(|e| (e.tx, e.at, e.amount))
        .collect();

    matched.sort_by_key(|(tx, at, _)| (*at, tx.id));
    matched
}
