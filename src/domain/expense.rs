use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, TrackerError};

/// Fallback display label for expenses saved without a name.
pub const UNNAMED_EXPENSE_LABEL: &str = "Unnamed Expense";

/// A single spending record attributed to exactly one budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    /// May reference a since-deleted budget; read paths degrade to
    /// [`crate::domain::UNKNOWN_BUDGET_LABEL`].
    pub budget_id: Uuid,
    pub date: NaiveDate,
}

impl Expense {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            UNNAMED_EXPENSE_LABEL
        } else {
            &self.name
        }
    }
}

/// User input for logging an expense. `date` defaults to the day the
/// expense is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub name: String,
    pub amount: f64,
    pub budget_id: Uuid,
    pub date: Option<NaiveDate>,
}

impl ExpenseDraft {
    pub fn new(name: impl Into<String>, amount: f64, budget_id: Uuid) -> Self {
        Self {
            name: name.into(),
            amount,
            budget_id,
            date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(TrackerError::Validation(
                "expense amount must be positive".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_expense(self, id: Uuid, fallback_date: NaiveDate) -> Expense {
        Expense {
            id,
            name: self.name,
            amount: self.amount,
            budget_id: self.budget_id,
            date: self.date.unwrap_or(fallback_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_fall_back_to_placeholder() {
        let draft = ExpenseDraft::new("   ", 25.0, Uuid::new_v4());
        let expense = draft.into_expense(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        assert_eq!(expense.display_name(), UNNAMED_EXPENSE_LABEL);
    }

    #[test]
    fn missing_date_defaults_to_fallback() {
        let fallback = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let expense =
            ExpenseDraft::new("Lunch", 250.0, Uuid::new_v4()).into_expense(Uuid::new_v4(), fallback);
        assert_eq!(expense.date, fallback);

        let explicit = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let dated = ExpenseDraft::new("Lunch", 250.0, Uuid::new_v4())
            .on(explicit)
            .into_expense(Uuid::new_v4(), fallback);
        assert_eq!(dated.date, explicit);
    }

    #[test]
    fn validate_rejects_nonpositive_amounts() {
        assert!(ExpenseDraft::new("Lunch", 0.0, Uuid::new_v4())
            .validate()
            .is_err());
        assert!(ExpenseDraft::new("Lunch", 250.0, Uuid::new_v4())
            .validate()
            .is_ok());
    }
}
