//! Monthly report export in the sectioned CSV layout the download page offers.

use std::io::Write;

use chrono::{Datelike, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use tracing::debug;

use crate::date_utils::{self, DateRange};
use crate::models::transaction::{add_amount, sum_amounts};
use crate::models::{Budget, Transaction, TransactionKind};
use crate::services::aggregation::{self, CategoryTotal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetComparison {
    pub category: String,
    pub budgeted: Decimal,
    pub spent: Decimal,
    pub over_budget: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRow {
    pub id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyReport {
    pub label: String,
    pub total_expenses: Decimal,
    pub categories: Vec<CategoryTotal>,
    pub budgets: Vec<BudgetComparison>,
    pub transactions: Option<Vec<TransactionRow>>,
}

impl MonthlyReport {
    /// Build the report for the month containing `month`. Budget spending is
    /// taken from the month's transactions, not the cached `spent` column.
    pub fn build(
        month: NaiveDate,
        transactions: &[Transaction],
        budgets: &[Budget],
        include_transactions: bool,
    ) -> Self {
        let range = DateRange::month_of(month);
        let expenses: Vec<Transaction> = transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Expense)
            .cloned()
            .collect();

        let categories = aggregation::category_totals(&expenses, range);
        let total_expenses = sum_amounts(categories.iter().map(|c| c.amount));

        let budgets = budgets
            .iter()
            .map(|budget| {
                let spent = categories
                    .iter()
                    .find(|c| c.category == budget.name)
                    .map(|c| c.amount)
                    .unwrap_or(Decimal::ZERO);
                BudgetComparison {
                    category: budget.name.clone(),
                    budgeted: budget.budget_limit,
                    spent,
                    over_budget: add_amount(spent, -budget.budget_limit).max(Decimal::ZERO),
                }
            })
            .collect();

        let transactions = include_transactions.then(|| {
            aggregation::transactions_in_range(transactions, range)
                .into_iter()
                .map(|(tx, at, amount)| TransactionRow {
                    id: tx.id,
                    date: at.date(),
                    time: at.time(),
                    category: tx.category_or_default().to_string(),
                    amount,
                })
                .collect()
        });

        Self {
            label: date_utils::month_label(range.from.year(), range.from.month()),
            total_expenses,
            categories,
            budgets,
            transactions,
        }
    }

    pub fn filename(&self) -> String {
        format!("report_{}.csv", self.label.replace(' ', "_"))
    }
}

fn amount(value: Decimal) -> String {
    format!("{:.2}", value)
}

fn write_section<F>(out: &mut Vec<u8>, rows: F) -> Result<(), csv::Error>
where
    F: FnOnce(&mut csv::Writer<&mut Vec<u8>>) -> Result<(), csv::Error>,
{
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
    rows(&mut writer)?;
    writer.flush()?;
    Ok(())
}

pub fn write_report_csv(report: &MonthlyReport) -> Result<Vec<u8>, csv::Error> {
    let mut out = Vec::new();

    write_section(&mut out, |w| w.write_record(["Month", report.label.as_str()]))?;
    out.write_all(b"\n")?;

    write_section(&mut out, |w| {
        w.write_record(["Total Expenses", amount(report.total_expenses).as_str()])
    })?;
    out.write_all(b"\n")?;

    write_section(&mut out, |w| {
        w.write_record(["Category Expenses"])?;
        w.write_record(["Category", "Amount (₹)"])?;
        for category in &report.categories {
            w.write_record([category.category.as_str(), amount(category.amount).as_str()])?;
        }
        Ok(())
    })?;
    out.write_all(b"\n")?;

    write_section(&mut out, |w| {
        w.write_record(["Budget Comparison"])?;
        w.write_record(["Category", "Budgeted (₹)", "Spent (₹)", "Over Budget (₹)"])?;
        for budget in &report.budgets {
            w.write_record([
                budget.category.clone(),
                amount(budget.budgeted),
                amount(budget.spent),
                amount(budget.over_budget),
            ])?;
        }
        Ok(())
    })?;

    if let Some(transactions) = &report.transactions {
        out.write_all(b"\n")?;
        write_section(&mut out, |w| {
            w.write_record(["Transactions"])?;
            w.write_record(["Transaction ID", "Date", "Time", "Category", "Amount (₹)"])?;
            for tx in transactions {
                w.write_record([
                    tx.id.to_string(),
                    tx.date.format("%Y-%m-%d").to_string(),
                    tx.time.format("%H:%M").to_string(),
                    tx.category.clone(),
                    amount(tx.amount),
                ])?;
            }
            Ok(())
        })?;
    }

    debug!(
        month = %report.label,
        bytes = out.len(),
        categories = report.categories.len(),
        "Wrote report CSV"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(id: i64, amount: &str, category: &str, date: &str) -> Transaction {
        Transaction {
            id,
            amount: amount.to_string(),
            category: Some(category.to_string()),
            date: date.to_string(),
            description: String::new(),
            kind: TransactionKind::for_category(Some(category)),
        }
    }

    fn budget(name: &str, limit: Decimal) -> Budget {
        Budget {
            id: 1,
            name: name.to_string(),
            budget_limit: limit,
            spent: Decimal::ZERO,
            month: "2024-03".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn sample() -> (Vec<Transaction>, Vec<Budget>) {
        let transactions = vec![
            tx(1, "120.5", "Food", "2024-03-02T12:30:00"),
            tx(2, "3000", "Salary", "2024-03-01T09:00:00"),
            tx(3, "800", "Rent", "2024-03-01T08:00:00"),
            tx(4, "45", "Food", "2024-04-01T10:00:00"),
        ];
        let budgets = vec![budget("Food", dec!(100)), budget("Rent", dec!(1000))];
        (transactions, budgets)
    }

    #[test]
    fn test_report_csv_layout() {
        let (transactions, budgets) = sample();
        let report = MonthlyReport::build(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            &transactions,
            &budgets,
            false,
        );
        let csv = String::from_utf8(write_report_csv(&report).unwrap()).unwrap();

        let expected = "Month,Mar 2024\n\
                        \n\
                        Total Expenses,920.50\n\
                        \n\
                        Category Expenses\n\
                        Category,Amount (₹)\n\
                        Rent,800.00\n\
                        Food,120.50\n\
                        \n\
                        Budget Comparison\n\
                        Category,Budgeted (₹),Spent (₹),Over Budget (₹)\n\
                        Food,100.00,120.50,20.50\n\
                        Rent,1000.00,800.00,0.00\n";
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_report_csv_with_transactions() {
        let (transactions, budgets) = sample();
        let report = MonthlyReport::build(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            &transactions,
            &budgets,
            true,
        );
        let csv = String::from_utf8(write_report_csv(&report).unwrap()).unwrap();

        assert!(csv.ends_with(
            "\nTransactions\n\
             Transaction ID,Date,Time,Category,Amount (₹)\n\
             3,2024-03-01,08:00,Rent,800.00\n\
             2,2024-03-01,09:00,Salary,3000.00\n\
             1,2024-03-02,12:30,Food,120.50\n"
        ));
        assert_eq!(report.filename(), "report_Mar_2024.csv");
    }
}
