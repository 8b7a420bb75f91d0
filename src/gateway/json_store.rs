use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    memory::{MemoryGateway, UserDocuments},
    BudgetMap, EntityGateway, ExpenseMap, GoalMap, Subscription, Versioned,
};
use crate::domain::{Budget, BudgetDraft, Expense, ExpenseDraft, Goal, GoalDraft, UserId};
use crate::errors::{Result, TrackerError};
use crate::utils::paths::{store_file, write_atomic};

pub const STORE_SCHEMA_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct PersistedStore {
    schema_version: u8,
    #[serde(default)]
    users: BTreeMap<UserId, UserDocuments>,
}

/// File-backed gateway: an in-memory store flushed to a single JSON
/// document after every mutation. Used by the CLI; tests point it at a
/// temporary directory.
pub struct JsonGateway {
    inner: MemoryGateway,
    path: PathBuf,
}

impl std::fmt::Debug for JsonGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonGateway")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonGateway {
    /// Opens the store at `path`, creating an empty one when the file is
    /// missing. Files written by a newer schema are rejected.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let data = fs::read_to_string(&path)?;
            let persisted: PersistedStore = serde_json::from_str(&data)?;
            if persisted.schema_version > STORE_SCHEMA_VERSION {
                return Err(TrackerError::Gateway(format!(
                    "store schema v{} is newer than supported v{}",
                    persisted.schema_version, STORE_SCHEMA_VERSION
                )));
            }
            MemoryGateway::from_documents(persisted.users)
        } else {
            MemoryGateway::new()
        };
        Ok(Self { inner, path })
    }

    /// Opens the store at the managed application data path.
    pub fn open_default() -> Result<Self> {
        Self::open(store_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let persisted = PersistedStore {
            schema_version: STORE_SCHEMA_VERSION,
            users: self.inner.export_documents()?,
        };
        let json = serde_json::to_string_pretty(&persisted)?;
        write_atomic(&self.path, &json)
    }
}

impl EntityGateway for JsonGateway {
    fn create_budget(&self, user: &UserId, draft: BudgetDraft) -> Result<Budget> {
        let budget = self.inner.create_budget(user, draft)?;
        self.persist()?;
        Ok(budget)
    }

    fn read_budget(&self, user: &UserId, id: Uuid) -> Result<Option<Versioned<Budget>>> {
        self.inner.read_budget(user, id)
    }

    fn write_budget(&self, user: &UserId, budget: &Budget) -> Result<()> {
        self.inner.write_budget(user, budget)?;
        self.persist()
    }

    fn write_budget_if(&self, user: &UserId, budget: &Budget, expected_version: u64) -> Result<()> {
        self.inner.write_budget_if(user, budget, expected_version)?;
        self.persist()
    }

    fn remove_budget(&self, user: &UserId, id: Uuid) -> Result<()> {
        self.inner.remove_budget(user, id)?;
        self.persist()
    }

    fn budgets(&self, user: &UserId) -> Result<BudgetMap> {
        self.inner.budgets(user)
    }

    fn create_expense(&self, user: &UserId, draft: ExpenseDraft) -> Result<Expense> {
        let expense = self.inner.create_expense(user, draft)?;
        self.persist()?;
        Ok(expense)
    }

    fn read_expense(&self, user: &UserId, id: Uuid) -> Result<Option<Expense>> {
        self.inner.read_expense(user, id)
    }

    fn remove_expense(&self, user: &UserId, id: Uuid) -> Result<()> {
        self.inner.remove_expense(user, id)?;
        self.persist()
    }

    fn expenses(&self, user: &UserId) -> Result<ExpenseMap> {
        self.inner.expenses(user)
    }

    fn create_goal(&self, user: &UserId, draft: GoalDraft) -> Result<Goal> {
        let goal = self.inner.create_goal(user, draft)?;
        self.persist()?;
        Ok(goal)
    }

    fn write_goal(&self, user: &UserId, goal: &Goal) -> Result<()> {
        self.inner.write_goal(user, goal)?;
        self.persist()
    }

    fn remove_goal(&self, user: &UserId, id: Uuid) -> Result<()> {
        self.inner.remove_goal(user, id)?;
        self.persist()
    }

    fn goals(&self, user: &UserId) -> Result<GoalMap> {
        self.inner.goals(user)
    }

    fn subscribe_budgets(&self, user: &UserId) -> Result<Subscription<BudgetMap>> {
        self.inner.subscribe_budgets(user)
    }

    fn subscribe_expenses(&self, user: &UserId) -> Result<Subscription<ExpenseMap>> {
        self.inner.subscribe_expenses(user)
    }

    fn subscribe_goals(&self, user: &UserId) -> Result<Subscription<GoalMap>> {
        self.inner.subscribe_goals(user)
    }
}
