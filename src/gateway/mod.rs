//! The entity store gateway: the boundary between the engines and the
//! realtime document store holding budgets, expenses, and goals per user.

pub mod json_store;
pub mod memory;

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Receiver,
        Arc,
    },
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Budget, BudgetDraft, Expense, ExpenseDraft, Goal, GoalDraft, UserId};
use crate::errors::Result;

pub use json_store::{JsonGateway, STORE_SCHEMA_VERSION};
pub use memory::MemoryGateway;

/// Full-collection snapshot keyed by entity id, as delivered by the store.
pub type BudgetMap = BTreeMap<Uuid, Budget>;
pub type ExpenseMap = BTreeMap<Uuid, Expense>;
pub type GoalMap = BTreeMap<Uuid, Goal>;

/// A document together with its per-document revision counter. Conditional
/// writes compare against `version` to detect concurrent edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Abstraction over document stores capable of holding one user's budgets,
/// expenses, and goals, with change subscriptions.
///
/// `create_*` assigns ids, `write_*` fully replaces a document, and
/// `write_budget_if` replaces only when the stored version still matches
/// (failing with [`crate::errors::TrackerError::StaleWrite`] otherwise).
/// Removals are idempotent.
pub trait EntityGateway: Send + Sync {
    fn create_budget(&self, user: &UserId, draft: BudgetDraft) -> Result<Budget>;
    fn read_budget(&self, user: &UserId, id: Uuid) -> Result<Option<Versioned<Budget>>>;
    fn write_budget(&self, user: &UserId, budget: &Budget) -> Result<()>;
    fn write_budget_if(&self, user: &UserId, budget: &Budget, expected_version: u64) -> Result<()>;
    fn remove_budget(&self, user: &UserId, id: Uuid) -> Result<()>;
    fn budgets(&self, user: &UserId) -> Result<BudgetMap>;

    fn create_expense(&self, user: &UserId, draft: ExpenseDraft) -> Result<Expense>;
    fn read_expense(&self, user: &UserId, id: Uuid) -> Result<Option<Expense>>;
    fn remove_expense(&self, user: &UserId, id: Uuid) -> Result<()>;
    fn expenses(&self, user: &UserId) -> Result<ExpenseMap>;

    fn create_goal(&self, user: &UserId, draft: GoalDraft) -> Result<Goal>;
    fn write_goal(&self, user: &UserId, goal: &Goal) -> Result<()>;
    fn remove_goal(&self, user: &UserId, id: Uuid) -> Result<()>;
    fn goals(&self, user: &UserId) -> Result<GoalMap>;

    fn subscribe_budgets(&self, user: &UserId) -> Result<Subscription<BudgetMap>>;
    fn subscribe_expenses(&self, user: &UserId) -> Result<Subscription<ExpenseMap>>;
    fn subscribe_goals(&self, user: &UserId) -> Result<Subscription<GoalMap>>;
}

/// Handle for a collection watch. The current snapshot is delivered
/// immediately on subscribe, then a fresh one after every mutation of the
/// watched collection. Dropping the handle (or calling [`cancel`]) detaches
/// the watcher so no snapshot outlives the owning view.
///
/// [`cancel`]: Subscription::cancel
pub struct Subscription<T> {
    receiver: Receiver<T>,
    active: Arc<AtomicBool>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(receiver: Receiver<T>, active: Arc<AtomicBool>) -> Self {
        Self { receiver, active }
    }

    /// Next pending snapshot, if one has been delivered.
    pub fn try_next(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Drains pending deliveries and returns the most recent snapshot.
    pub fn latest(&self) -> Option<T> {
        let mut latest = None;
        while let Ok(snapshot) = self.receiver.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Detaches the watcher. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
