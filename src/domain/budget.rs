use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, TrackerError};

/// Placeholder shown wherever an expense references a budget that no longer
/// exists.
pub const UNKNOWN_BUDGET_LABEL: &str = "Unknown Budget";

/// A named spending allocation with a ceiling amount and an accumulated
/// spent amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    /// Sum of expense amounts currently attributed to this budget,
    /// maintained incrementally by the tracker.
    pub spent: f64,
}

impl Budget {
    pub fn remaining(&self) -> f64 {
        self.amount - self.spent
    }

    /// Spent share of the allocation as a percentage. Zero for a
    /// non-positive allocation.
    pub fn progress_percent(&self) -> f64 {
        if self.amount > 0.0 {
            self.spent / self.amount * 100.0
        } else {
            0.0
        }
    }
}

/// User input for creating or editing a budget. The store assigns ids and
/// the tracker carries `spent` forward on edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDraft {
    pub name: String,
    pub amount: f64,
}

impl BudgetDraft {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TrackerError::Validation(
                "budget name must not be empty".into(),
            ));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(TrackerError::Validation(
                "budget amount must be positive".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_budget(self, id: Uuid) -> Budget {
        Budget {
            id,
            name: self.name,
            amount: self.amount,
            spent: 0.0,
        }
    }
}
