//! Facade coordinating validated tracker operations against the gateway.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::core::totals::{apply_expense_delta, compute_totals, BudgetTotals, ExpenseEvent};
use crate::domain::{
    Budget, BudgetDraft, Expense, ExpenseDraft, Goal, GoalDraft, UserIdentity,
};
use crate::errors::{Result, TrackerError};
use crate::gateway::{BudgetMap, EntityGateway, ExpenseMap, GoalMap, Subscription};

/// Attempts for the optimistic `spent` adjustment before surfacing the
/// conflict to the caller.
const SPENT_WRITE_RETRIES: usize = 3;

/// One authenticated user's view of the store: validated budget, expense,
/// and goal operations plus derived totals and collection watches.
pub struct Tracker {
    gateway: Arc<dyn EntityGateway>,
    user: UserIdentity,
}

impl Tracker {
    pub fn new(gateway: Arc<dyn EntityGateway>, user: UserIdentity) -> Self {
        Self { gateway, user }
    }

    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    pub fn add_budget(&self, draft: BudgetDraft) -> Result<Budget> {
        draft.validate()?;
        let budget = self.gateway.create_budget(&self.user.uid, draft)?;
        info!(budget = %budget.id, name = %budget.name, "budget created");
        Ok(budget)
    }

    /// Replaces the budget's name and amount; accumulated spend carries
    /// over unchanged.
    pub fn edit_budget(&self, id: Uuid, draft: BudgetDraft) -> Result<Budget> {
        draft.validate()?;
        let current = self
            .gateway
            .read_budget(&self.user.uid, id)?
            .ok_or_else(|| TrackerError::NotFound(format!("budget {id}")))?;
        let updated = Budget {
            id,
            name: draft.name,
            amount: draft.amount,
            spent: current.value.spent,
        };
        self.gateway.write_budget(&self.user.uid, &updated)?;
        Ok(updated)
    }

    /// Removes the budget only. Expenses referencing it are left in place
    /// and render under the unknown-budget placeholder from here on.
    pub fn remove_budget(&self, id: Uuid) -> Result<()> {
        if self.gateway.read_budget(&self.user.uid, id)?.is_none() {
            return Err(TrackerError::NotFound(format!("budget {id}")));
        }
        self.gateway.remove_budget(&self.user.uid, id)?;
        info!(budget = %id, "budget removed");
        Ok(())
    }

    pub fn budgets(&self) -> Result<BudgetMap> {
        self.gateway.budgets(&self.user.uid)
    }

    pub fn totals(&self) -> Result<BudgetTotals> {
        let budgets = self.budgets()?;
        Ok(compute_totals(budgets.values()))
    }

    /// Records an expense against an existing budget and charges the
    /// budget's `spent` accumulator.
    pub fn add_expense(&self, draft: ExpenseDraft) -> Result<Expense> {
        draft.validate()?;
        if self
            .gateway
            .read_budget(&self.user.uid, draft.budget_id)?
            .is_none()
        {
            return Err(TrackerError::NotFound(format!(
                "budget {}",
                draft.budget_id
            )));
        }
        let expense = self.gateway.create_expense(&self.user.uid, draft)?;
        self.adjust_spent(expense.budget_id, expense.amount, ExpenseEvent::Added)?;
        info!(expense = %expense.id, amount = expense.amount, "expense recorded");
        Ok(expense)
    }

    /// Deletes an expense, releasing its amount from the referenced budget
    /// first. A budget deleted in the meantime is tolerated.
    pub fn remove_expense(&self, id: Uuid) -> Result<Expense> {
        let expense = self
            .gateway
            .read_expense(&self.user.uid, id)?
            .ok_or_else(|| TrackerError::NotFound(format!("expense {id}")))?;
        self.adjust_spent(expense.budget_id, expense.amount, ExpenseEvent::Removed)?;
        self.gateway.remove_expense(&self.user.uid, id)?;
        info!(expense = %id, "expense removed");
        Ok(expense)
    }

    pub fn expenses(&self) -> Result<ExpenseMap> {
        self.gateway.expenses(&self.user.uid)
    }

    pub fn add_goal(&self, draft: GoalDraft) -> Result<Goal> {
        draft.validate()?;
        let goal = self.gateway.create_goal(&self.user.uid, draft)?;
        info!(goal = %goal.id, name = %goal.name, "goal created");
        Ok(goal)
    }

    pub fn edit_goal(&self, id: Uuid, draft: GoalDraft) -> Result<Goal> {
        draft.validate()?;
        if !self.gateway.goals(&self.user.uid)?.contains_key(&id) {
            return Err(TrackerError::NotFound(format!("goal {id}")));
        }
        let updated = Goal {
            id,
            name: draft.name,
            amount: draft.amount,
            saved: draft.saved,
            start_date: draft.start_date,
            target_date: draft.target_date,
        };
        self.gateway.write_goal(&self.user.uid, &updated)?;
        Ok(updated)
    }

    pub fn remove_goal(&self, id: Uuid) -> Result<()> {
        if !self.gateway.goals(&self.user.uid)?.contains_key(&id) {
            return Err(TrackerError::NotFound(format!("goal {id}")));
        }
        self.gateway.remove_goal(&self.user.uid, id)
    }

    pub fn goals(&self) -> Result<GoalMap> {
        self.gateway.goals(&self.user.uid)
    }

    pub fn watch_budgets(&self) -> Result<Subscription<BudgetMap>> {
        self.gateway.subscribe_budgets(&self.user.uid)
    }

    pub fn watch_expenses(&self) -> Result<Subscription<ExpenseMap>> {
        self.gateway.subscribe_expenses(&self.user.uid)
    }

    pub fn watch_goals(&self) -> Result<Subscription<GoalMap>> {
        self.gateway.subscribe_goals(&self.user.uid)
    }

    /// Read-compute-conditional-write loop on the budget's `spent` field.
    /// A vanished budget ends the loop.
    fn adjust_spent(&self, budget_id: Uuid, amount: f64, event: ExpenseEvent) -> Result<()> {
        for attempt in 1..=SPENT_WRITE_RETRIES {
            let Some(current) = self.gateway.read_budget(&self.user.uid, budget_id)? else {
                return Ok(());
            };
            let updated = apply_expense_delta(&current.value, amount, event);
            match self
                .gateway
                .write_budget_if(&self.user.uid, &updated, current.version)
            {
                Ok(()) => return Ok(()),
                Err(TrackerError::StaleWrite(_)) if attempt < SPENT_WRITE_RETRIES => {
                    warn!(budget = %budget_id, attempt, "spent adjustment raced, retrying");
                }
                Err(err) => return Err(err),
            }
        }
        Err(TrackerError::StaleWrite(budget_id))
    }
}
