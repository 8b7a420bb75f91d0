use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, TrackerError};

/// Length of one contribution period in days, matching the semi-monthly
/// ("kinsenas") pay cadence.
pub const KINSENAS_DAYS: i64 = 15;

/// A savings target with a deadline, tracked separately from budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    pub saved: f64,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
}

/// Derived goal state for a given reference day. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub remaining_amount: f64,
    pub days_remaining: i64,
    pub periods_remaining: i64,
    pub suggested_contribution: f64,
    pub progress_percent: f64,
    pub completed: bool,
    pub overdue: bool,
}

impl Goal {
    /// Evaluates progress against `today`. A past target collapses to a
    /// single period so the suggestion is the full remaining amount.
    pub fn progress(&self, today: NaiveDate) -> GoalProgress {
        let remaining_amount = (self.amount - self.saved).max(0.0);
        let days_remaining = (self.target_date - today).num_days().max(0);
        let periods_remaining =
            ((days_remaining as u64).div_ceil(KINSENAS_DAYS as u64) as i64).max(1);
        let completed = self.saved >= self.amount;
        let progress_percent = if self.amount > 0.0 {
            (self.saved / self.amount * 100.0).min(100.0)
        } else {
            100.0
        };
        GoalProgress {
            remaining_amount,
            days_remaining,
            periods_remaining,
            suggested_contribution: remaining_amount / periods_remaining as f64,
            progress_percent,
            completed,
            overdue: self.target_date < today && !completed,
        }
    }
}

/// User input for creating or editing a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalDraft {
    pub name: String,
    pub amount: f64,
    pub saved: f64,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
}

impl GoalDraft {
    pub fn new(
        name: impl Into<String>,
        amount: f64,
        start_date: NaiveDate,
        target_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            amount,
            saved: 0.0,
            start_date,
            target_date,
        }
    }

    pub fn with_saved(mut self, saved: f64) -> Self {
        self.saved = saved;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TrackerError::Validation(
                "goal name must not be empty".into(),
            ));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(TrackerError::Validation(
                "goal target amount must be positive".into(),
            ));
        }
        if !self.saved.is_finite() || self.saved < 0.0 {
            return Err(TrackerError::Validation(
                "goal saved amount must not be negative".into(),
            ));
        }
        if self.target_date < self.start_date {
            return Err(TrackerError::Validation(
                "goal target date must not precede its start date".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_goal(self, id: Uuid) -> Goal {
        Goal {
            id,
            name: self.name,
            amount: self.amount,
            saved: self.saved,
            start_date: self.start_date,
            target_date: self.target_date,
        }
    }
}
