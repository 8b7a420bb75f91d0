//! Delimited-text report encoding: one section per enabled toggle, each a
//! header line followed by comma-separated rows. Quoting is handled by the
//! writer, so names containing commas stay intact.

use csv::WriterBuilder;

use super::{ReportMeta, ReportSelection, ReportSnapshot, TIMELINE_LIMIT};
use crate::domain::Expense;
use crate::errors::Result;

const REPORT_TITLE: &str = "Expense Tracker Report";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn render(
    snapshot: &ReportSnapshot,
    selection: &ReportSelection,
    meta: &ReportMeta,
) -> Result<String> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    writer.write_record([REPORT_TITLE])?;
    writer.write_record([""])?;

    if selection.sections.summary {
        writer.write_record(["SUMMARY"])?;
        writer.write_record([
            "Report Generated".to_string(),
            meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ])?;
        writer.write_record(["User".to_string(), meta.user_email.clone()])?;
        writer.write_record([
            "Total Budgets".to_string(),
            snapshot.stats.budget_count.to_string(),
        ])?;
        writer.write_record([
            "Total Budget Amount".to_string(),
            meta.currency(snapshot.stats.total_budget),
        ])?;
        writer.write_record([
            "Total Spent".to_string(),
            meta.currency(snapshot.stats.total_spent),
        ])?;
        writer.write_record([
            "Remaining".to_string(),
            meta.currency(snapshot.stats.remaining),
        ])?;
        writer.write_record([
            "Total Expenses".to_string(),
            snapshot.stats.expense_count.to_string(),
        ])?;
        writer.write_record([
            "Average Expense".to_string(),
            meta.currency(snapshot.stats.average_expense),
        ])?;
        writer.write_record([""])?;
    }

    if selection.sections.budget_details {
        writer.write_record(["BUDGET DETAILS"])?;
        writer.write_record(["Budget Name", "Amount", "Spent", "Remaining", "Progress %"])?;
        for budget in &snapshot.budgets {
            writer.write_record([
                budget.name.clone(),
                meta.currency(budget.amount),
                meta.currency(budget.spent),
                meta.currency(budget.remaining()),
                format!("{:.1}%", budget.progress_percent()),
            ])?;
        }
        writer.write_record([""])?;
    }

    if selection.sections.expense_details {
        writer.write_record(["EXPENSE DETAILS"])?;
        writer.write_record(["Date", "Name", "Amount", "Budget"])?;
        for expense in snapshot.newest_first() {
            writer.write_record(expense_row(snapshot, meta, expense))?;
        }
        writer.write_record([""])?;
    }

    if selection.sections.timeline {
        writer.write_record(["TIMELINE"])?;
        writer.write_record(["Date", "Name", "Amount", "Budget"])?;
        for expense in snapshot.newest_first().into_iter().take(TIMELINE_LIMIT) {
            writer.write_record(expense_row(snapshot, meta, expense))?;
        }
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn expense_row(snapshot: &ReportSnapshot, meta: &ReportMeta, expense: &Expense) -> [String; 4] {
    [
        expense.date.format(DATE_FORMAT).to_string(),
        expense.display_name().to_string(),
        meta.currency(expense.amount),
        snapshot.budget_name(expense.budget_id).to_string(),
    ]
}
