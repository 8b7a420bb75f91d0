use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Sender},
        Arc, Mutex, MutexGuard,
    },
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BudgetMap, EntityGateway, ExpenseMap, GoalMap, Subscription, Versioned};
use crate::domain::{Budget, BudgetDraft, Expense, ExpenseDraft, Goal, GoalDraft, UserId};
use crate::errors::{Result, TrackerError};

/// One user's documents, the unit persisted by the file backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct UserDocuments {
    #[serde(default)]
    pub budgets: BTreeMap<Uuid, Versioned<Budget>>,
    #[serde(default)]
    pub expenses: BTreeMap<Uuid, Versioned<Expense>>,
    #[serde(default)]
    pub goals: BTreeMap<Uuid, Versioned<Goal>>,
}

struct Watcher<T> {
    sender: Sender<T>,
    active: Arc<AtomicBool>,
}

#[derive(Default)]
struct UserSpace {
    documents: UserDocuments,
    budget_watchers: Vec<Watcher<BudgetMap>>,
    expense_watchers: Vec<Watcher<ExpenseMap>>,
    goal_watchers: Vec<Watcher<GoalMap>>,
}

/// In-memory document store with the same observable behavior as the hosted
/// backend: store-assigned ids, per-document versions, and snapshot watches
/// that fire on every mutation of the watched collection.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<HashMap<UserId, UserSpace>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_documents(users: BTreeMap<UserId, UserDocuments>) -> Self {
        let state = users
            .into_iter()
            .map(|(uid, documents)| {
                (
                    uid,
                    UserSpace {
                        documents,
                        ..UserSpace::default()
                    },
                )
            })
            .collect();
        Self {
            state: Mutex::new(state),
        }
    }

    pub(crate) fn export_documents(&self) -> Result<BTreeMap<UserId, UserDocuments>> {
        let state = self.guard()?;
        Ok(state
            .iter()
            .map(|(uid, space)| (uid.clone(), space.documents.clone()))
            .collect())
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<UserId, UserSpace>>> {
        self.state
            .lock()
            .map_err(|_| TrackerError::Gateway("store state poisoned".into()))
    }
}

fn snapshot_budgets(documents: &UserDocuments) -> BudgetMap {
    documents
        .budgets
        .iter()
        .map(|(id, slot)| (*id, slot.value.clone()))
        .collect()
}

fn snapshot_expenses(documents: &UserDocuments) -> ExpenseMap {
    documents
        .expenses
        .iter()
        .map(|(id, slot)| (*id, slot.value.clone()))
        .collect()
}

fn snapshot_goals(documents: &UserDocuments) -> GoalMap {
    documents
        .goals
        .iter()
        .map(|(id, slot)| (*id, slot.value.clone()))
        .collect()
}

/// Delivers `snapshot` to live watchers and drops cancelled or hung-up ones.
fn publish<T: Clone>(watchers: &mut Vec<Watcher<T>>, snapshot: &T) {
    watchers.retain(|watcher| {
        watcher.active.load(Ordering::SeqCst) && watcher.sender.send(snapshot.clone()).is_ok()
    });
}

fn subscribe<T: Clone>(watchers: &mut Vec<Watcher<T>>, snapshot: T) -> Subscription<T> {
    let (sender, receiver) = channel();
    let _ = sender.send(snapshot);
    let active = Arc::new(AtomicBool::new(true));
    watchers.push(Watcher {
        sender,
        active: Arc::clone(&active),
    });
    Subscription::new(receiver, active)
}

impl EntityGateway for MemoryGateway {
    fn create_budget(&self, user: &UserId, draft: BudgetDraft) -> Result<Budget> {
        draft.validate()?;
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        let budget = draft.into_budget(Uuid::new_v4());
        space.documents.budgets.insert(
            budget.id,
            Versioned {
                value: budget.clone(),
                version: 1,
            },
        );
        let snapshot = snapshot_budgets(&space.documents);
        publish(&mut space.budget_watchers, &snapshot);
        Ok(budget)
    }

    fn read_budget(&self, user: &UserId, id: Uuid) -> Result<Option<Versioned<Budget>>> {
        let state = self.guard()?;
        Ok(state
            .get(user)
            .and_then(|space| space.documents.budgets.get(&id))
            .cloned())
    }

    fn write_budget(&self, user: &UserId, budget: &Budget) -> Result<()> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        let slot = space
            .documents
            .budgets
            .entry(budget.id)
            .or_insert_with(|| Versioned {
                value: budget.clone(),
                version: 0,
            });
        slot.value = budget.clone();
        slot.version += 1;
        let snapshot = snapshot_budgets(&space.documents);
        publish(&mut space.budget_watchers, &snapshot);
        Ok(())
    }

    fn write_budget_if(&self, user: &UserId, budget: &Budget, expected_version: u64) -> Result<()> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        match space.documents.budgets.get_mut(&budget.id) {
            Some(slot) if slot.version == expected_version => {
                slot.value = budget.clone();
                slot.version += 1;
            }
            _ => return Err(TrackerError::StaleWrite(budget.id)),
        }
        let snapshot = snapshot_budgets(&space.documents);
        publish(&mut space.budget_watchers, &snapshot);
        Ok(())
    }

    fn remove_budget(&self, user: &UserId, id: Uuid) -> Result<()> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        if space.documents.budgets.remove(&id).is_some() {
            let snapshot = snapshot_budgets(&space.documents);
            publish(&mut space.budget_watchers, &snapshot);
        }
        Ok(())
    }

    fn budgets(&self, user: &UserId) -> Result<BudgetMap> {
        let state = self.guard()?;
        Ok(state
            .get(user)
            .map(|space| snapshot_budgets(&space.documents))
            .unwrap_or_default())
    }

    fn create_expense(&self, user: &UserId, draft: ExpenseDraft) -> Result<Expense> {
        draft.validate()?;
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        let expense = draft.into_expense(Uuid::new_v4(), Utc::now().date_naive());
        space.documents.expenses.insert(
            expense.id,
            Versioned {
                value: expense.clone(),
                version: 1,
            },
        );
        let snapshot = snapshot_expenses(&space.documents);
        publish(&mut space.expense_watchers, &snapshot);
        Ok(expense)
    }

    fn read_expense(&self, user: &UserId, id: Uuid) -> Result<Option<Expense>> {
        let state = self.guard()?;
        Ok(state
            .get(user)
            .and_then(|space| space.documents.expenses.get(&id))
            .map(|slot| slot.value.clone()))
    }

    fn remove_expense(&self, user: &UserId, id: Uuid) -> Result<()> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        if space.documents.expenses.remove(&id).is_some() {
            let snapshot = snapshot_expenses(&space.documents);
            publish(&mut space.expense_watchers, &snapshot);
        }
        Ok(())
    }

    fn expenses(&self, user: &UserId) -> Result<ExpenseMap> {
        let state = self.guard()?;
        Ok(state
            .get(user)
            .map(|space| snapshot_expenses(&space.documents))
            .unwrap_or_default())
    }

    fn create_goal(&self, user: &UserId, draft: GoalDraft) -> Result<Goal> {
        draft.validate()?;
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        let goal = draft.into_goal(Uuid::new_v4());
        space.documents.goals.insert(
            goal.id,
            Versioned {
                value: goal.clone(),
                version: 1,
            },
        );
        let snapshot = snapshot_goals(&space.documents);
        publish(&mut space.goal_watchers, &snapshot);
        Ok(goal)
    }

    fn write_goal(&self, user: &UserId, goal: &Goal) -> Result<()> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        let slot = space
            .documents
            .goals
            .entry(goal.id)
            .or_insert_with(|| Versioned {
                value: goal.clone(),
                version: 0,
            });
        slot.value = goal.clone();
        slot.version += 1;
        let snapshot = snapshot_goals(&space.documents);
        publish(&mut space.goal_watchers, &snapshot);
        Ok(())
    }

    fn remove_goal(&self, user: &UserId, id: Uuid) -> Result<()> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        if space.documents.goals.remove(&id).is_some() {
            let snapshot = snapshot_goals(&space.documents);
            publish(&mut space.goal_watchers, &snapshot);
        }
        Ok(())
    }

    fn goals(&self, user: &UserId) -> Result<GoalMap> {
        let state = self.guard()?;
        Ok(state
            .get(user)
            .map(|space| snapshot_goals(&space.documents))
            .unwrap_or_default())
    }

    fn subscribe_budgets(&self, user: &UserId) -> Result<Subscription<BudgetMap>> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        let snapshot = snapshot_budgets(&space.documents);
        Ok(subscribe(&mut space.budget_watchers, snapshot))
    }

    fn subscribe_expenses(&self, user: &UserId) -> Result<Subscription<ExpenseMap>> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        let snapshot = snapshot_expenses(&space.documents);
        Ok(subscribe(&mut space.expense_watchers, snapshot))
    }

    fn subscribe_goals(&self, user: &UserId) -> Result<Subscription<GoalMap>> {
        let mut state = self.guard()?;
        let space = state.entry(user.clone()).or_default();
        let snapshot = snapshot_goals(&space.documents);
        Ok(subscribe(&mut space.goal_watchers, snapshot))
    }
}
