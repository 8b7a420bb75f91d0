//! The report projector: budget/date selection, aggregate stats, and the
//! two export encodings.

pub mod csv;
pub mod document;

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{Budget, Expense, UNKNOWN_BUDGET_LABEL};
use crate::errors::{Result, TrackerError};
use crate::gateway::{BudgetMap, ExpenseMap};

pub const DEFAULT_REPORT_NAME: &str = "expense-report";
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₱";

/// Most-recent expenses shown in the timeline sections.
pub const TIMELINE_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Styled, paginated document delivered as HTML.
    #[default]
    Document,
    /// Delimited text table.
    Csv,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Document => "html",
            ReportFormat::Csv => "csv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ReportFormat::Document => "text/html",
            ReportFormat::Csv => "text/csv",
        }
    }
}

/// Which report sections to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionToggles {
    pub summary: bool,
    pub budget_details: bool,
    pub expense_details: bool,
    pub timeline: bool,
}

impl Default for SectionToggles {
    fn default() -> Self {
        Self {
            summary: true,
            budget_details: true,
            expense_details: true,
            timeline: true,
        }
    }
}

/// Ephemeral export request: which budgets, which dates, which sections,
/// and the output encoding. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct ReportSelection {
    pub name: String,
    pub format: ReportFormat,
    pub budgets: BTreeSet<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sections: SectionToggles,
}

impl ReportSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn toggle_budget(&mut self, id: Uuid) {
        if !self.budgets.remove(&id) {
            self.budgets.insert(id);
        }
    }

    pub fn select_all(&mut self, budgets: &BudgetMap) {
        self.budgets = budgets.keys().copied().collect();
    }

    /// Only a fully specified range filters by date.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Quick preset: first of the current month through today.
    pub fn apply_this_month(&mut self, today: NaiveDate) {
        self.start_date = today.with_day(1);
        self.end_date = Some(today);
    }

    /// Quick preset: the whole previous calendar month.
    pub fn apply_last_month(&mut self, today: NaiveDate) {
        let first_of_current = today.with_day(1).unwrap_or(today);
        let last_of_previous = first_of_current - Duration::days(1);
        self.start_date = last_of_previous.with_day(1);
        self.end_date = Some(last_of_previous);
    }

    /// Quick preset: the trailing seven days.
    pub fn apply_last_seven_days(&mut self, today: NaiveDate) {
        self.start_date = Some(today - Duration::days(7));
        self.end_date = Some(today);
    }

    pub fn clear_date_filter(&mut self) {
        self.start_date = None;
        self.end_date = None;
    }

    pub fn file_name(&self, date: NaiveDate) -> String {
        let name = if self.name.trim().is_empty() {
            DEFAULT_REPORT_NAME
        } else {
            self.name.trim()
        };
        format!(
            "{}-{}.{}",
            name,
            date.format("%Y-%m-%d"),
            self.format.extension()
        )
    }
}

/// Aggregates over the filtered budget and expense sets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReportStats {
    pub total_budget: f64,
    pub total_spent: f64,
    pub remaining: f64,
    pub budget_count: usize,
    pub expense_count: usize,
    pub average_expense: f64,
}

/// The filtered, aggregated view handed to the encoders.
#[derive(Debug, Clone)]
pub struct ReportSnapshot {
    pub budgets: Vec<Budget>,
    pub expenses: Vec<Expense>,
    pub stats: ReportStats,
}

impl ReportSnapshot {
    pub fn budget_name(&self, id: Uuid) -> &str {
        self.budgets
            .iter()
            .find(|budget| budget.id == id)
            .map(|budget| budget.name.as_str())
            .unwrap_or(UNKNOWN_BUDGET_LABEL)
    }

    /// Expenses ordered newest-first, as every report section renders them.
    pub fn newest_first(&self) -> Vec<&Expense> {
        let mut ordered: Vec<&Expense> = self.expenses.iter().collect();
        ordered.sort_by(|a, b| b.date.cmp(&a.date));
        ordered
    }
}

/// Report header context supplied by the caller.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub user_email: String,
    pub generated_at: DateTime<Utc>,
    pub currency_symbol: String,
}

impl ReportMeta {
    pub fn new(user_email: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            user_email: user_email.into(),
            generated_at,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.into(),
        }
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub(crate) fn currency(&self, value: f64) -> String {
        format!("{}{:.2}", self.currency_symbol, value)
    }
}

/// A generated report ready for the platform's save/download mechanism.
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

/// Projects the selection against the full collections. Fails with
/// [`TrackerError::EmptySelection`] when no budgets are selected.
pub fn snapshot(
    selection: &ReportSelection,
    budgets: &BudgetMap,
    expenses: &ExpenseMap,
) -> Result<ReportSnapshot> {
    if selection.budgets.is_empty() {
        return Err(TrackerError::EmptySelection);
    }
    let kept_budgets: Vec<Budget> = budgets
        .values()
        .filter(|budget| selection.budgets.contains(&budget.id))
        .cloned()
        .collect();
    let range = selection.date_range();
    let kept_expenses: Vec<Expense> = expenses
        .values()
        .filter(|expense| selection.budgets.contains(&expense.budget_id))
        .filter(|expense| {
            range.is_none_or(|(start, end)| start <= expense.date && expense.date <= end)
        })
        .cloned()
        .collect();

    let total_budget: f64 = kept_budgets.iter().map(|budget| budget.amount).sum();
    let total_spent: f64 = kept_expenses.iter().map(|expense| expense.amount).sum();
    let expense_count = kept_expenses.len();
    let stats = ReportStats {
        total_budget,
        total_spent,
        remaining: total_budget - total_spent,
        budget_count: kept_budgets.len(),
        expense_count,
        average_expense: if expense_count > 0 {
            total_spent / expense_count as f64
        } else {
            0.0
        },
    };
    Ok(ReportSnapshot {
        budgets: kept_budgets,
        expenses: kept_expenses,
        stats,
    })
}

/// Builds the snapshot and renders it in the selected encoding.
pub fn generate(
    selection: &ReportSelection,
    budgets: &BudgetMap,
    expenses: &ExpenseMap,
    meta: &ReportMeta,
) -> Result<ReportFile> {
    let snapshot = snapshot(selection, budgets, expenses)?;
    let contents = match selection.format {
        ReportFormat::Csv => csv::render(&snapshot, selection, meta)?,
        ReportFormat::Document => document::render(&snapshot, selection, meta),
    };
    Ok(ReportFile {
        file_name: selection.file_name(meta.generated_at.date_naive()),
        mime_type: selection.format.mime_type(),
        contents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn budget(name: &str, amount: f64, spent: f64) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            spent,
        }
    }

    fn expense(name: &str, amount: f64, day: NaiveDate, budget_id: Uuid) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            budget_id,
            date: day,
        }
    }

    fn maps(budgets: Vec<Budget>, expenses: Vec<Expense>) -> (BudgetMap, ExpenseMap) {
        (
            budgets.into_iter().map(|b| (b.id, b)).collect(),
            expenses.into_iter().map(|e| (e.id, e)).collect(),
        )
    }

    #[test]
    fn empty_selection_refuses_to_project() {
        let (budgets, expenses) = maps(vec![budget("Food", 5_000.0, 0.0)], vec![]);
        let selection = ReportSelection::new("expense-report");
        let err = snapshot(&selection, &budgets, &expenses).expect_err("empty selection");
        assert!(matches!(err, TrackerError::EmptySelection));
    }

    #[test]
    fn unselected_budgets_and_their_expenses_are_dropped() {
        let food = budget("Food", 5_000.0, 250.0);
        let transport = budget("Transport", 2_000.0, 0.0);
        let (budgets, expenses) = maps(
            vec![food.clone(), transport.clone()],
            vec![
                expense("Lunch", 250.0, date(2024, 1, 5), food.id),
                expense("Fare", 13.0, date(2024, 1, 6), transport.id),
            ],
        );
        let mut selection = ReportSelection::new("expense-report");
        selection.toggle_budget(food.id);

        let snapshot = snapshot(&selection, &budgets, &expenses).expect("snapshot");
        assert_eq!(snapshot.stats.budget_count, 1);
        assert_eq!(snapshot.stats.expense_count, 1);
        assert_eq!(snapshot.stats.total_budget, 5_000.0);
        assert_eq!(snapshot.stats.total_spent, 250.0);
        assert_eq!(snapshot.stats.remaining, 4_750.0);
    }

    #[test]
    fn date_filter_requires_both_bounds() {
        let food = budget("Food", 5_000.0, 0.0);
        let (budgets, expenses) = maps(
            vec![food.clone()],
            vec![
                expense("Old", 100.0, date(2023, 12, 1), food.id),
                expense("New", 200.0, date(2024, 1, 5), food.id),
            ],
        );
        let mut selection = ReportSelection::new("expense-report");
        selection.select_all(&budgets);

        selection.start_date = Some(date(2024, 1, 1));
        let open_ended = snapshot(&selection, &budgets, &expenses).unwrap();
        assert_eq!(open_ended.stats.expense_count, 2);

        selection.end_date = Some(date(2024, 1, 31));
        let bounded = snapshot(&selection, &budgets, &expenses).unwrap();
        assert_eq!(bounded.stats.expense_count, 1);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let food = budget("Food", 5_000.0, 0.0);
        let (budgets, expenses) = maps(
            vec![food.clone()],
            vec![
                expense("Start", 1.0, date(2024, 1, 1), food.id),
                expense("End", 2.0, date(2024, 1, 31), food.id),
                expense("After", 3.0, date(2024, 2, 1), food.id),
            ],
        );
        let mut selection = ReportSelection::new("expense-report");
        selection.select_all(&budgets);
        selection.start_date = Some(date(2024, 1, 1));
        selection.end_date = Some(date(2024, 1, 31));

        let snapshot = snapshot(&selection, &budgets, &expenses).unwrap();
        assert_eq!(snapshot.stats.expense_count, 2);
        assert_eq!(snapshot.stats.total_spent, 3.0);
    }

    #[test]
    fn average_expense_is_zero_without_expenses() {
        let food = budget("Food", 5_000.0, 0.0);
        let (budgets, expenses) = maps(vec![food.clone()], vec![]);
        let mut selection = ReportSelection::new("expense-report");
        selection.select_all(&budgets);

        let snapshot = snapshot(&selection, &budgets, &expenses).unwrap();
        assert_eq!(snapshot.stats.average_expense, 0.0);
    }

    #[test]
    fn file_names_embed_the_date_and_extension() {
        let mut selection = ReportSelection::new("monthly-report");
        let day = date(2024, 3, 15);
        assert_eq!(selection.file_name(day), "monthly-report-2024-03-15.html");
        selection.format = ReportFormat::Csv;
        assert_eq!(selection.file_name(day), "monthly-report-2024-03-15.csv");
        selection.name = "  ".into();
        assert_eq!(selection.file_name(day), "expense-report-2024-03-15.csv");
    }

    #[test]
    fn quick_presets_compute_expected_ranges() {
        let today = date(2024, 3, 15);
        let mut selection = ReportSelection::new("expense-report");

        selection.apply_this_month(today);
        assert_eq!(selection.date_range(), Some((date(2024, 3, 1), today)));

        selection.apply_last_month(today);
        assert_eq!(
            selection.date_range(),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );

        selection.apply_last_seven_days(today);
        assert_eq!(selection.date_range(), Some((date(2024, 3, 8), today)));

        selection.clear_date_filter();
        assert_eq!(selection.date_range(), None);
    }

    #[test]
    fn unknown_budget_names_degrade_to_placeholder() {
        let food = budget("Food", 5_000.0, 0.0);
        let (budgets, expenses) = maps(vec![food.clone()], vec![]);
        let mut selection = ReportSelection::new("expense-report");
        selection.select_all(&budgets);
        let snapshot = snapshot(&selection, &budgets, &expenses).unwrap();
        assert_eq!(snapshot.budget_name(food.id), "Food");
        assert_eq!(snapshot.budget_name(Uuid::new_v4()), UNKNOWN_BUDGET_LABEL);
    }
}
