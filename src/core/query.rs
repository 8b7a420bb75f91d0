//! The expense query engine: an explicit filter/sort/group/page state with
//! reducer-style transitions and a pure evaluation pipeline.
//!
//! The pipeline order is fixed: search filter, budget filter, date-range
//! filter, sort, category grouping, pagination.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Duration, Months, NaiveDate};
use uuid::Uuid;

use crate::domain::{Expense, UNKNOWN_BUDGET_LABEL};
use crate::gateway::{BudgetMap, ExpenseMap};

/// Expenses shown per page.
pub const PAGE_SIZE: usize = 5;

/// Label of the grouping bucket for expenses whose budget no longer exists.
pub const UNKNOWN_CATEGORY_LABEL: &str = "Unknown";

/// Grouping only kicks in above this many filtered results.
const GROUPING_MIN_ITEMS: usize = 3;

/// Named date-range presets. Each one is an inclusive lower bound computed
/// from the reference day; presets have no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    Today,
    Week,
    Month,
    ThreeMonths,
    #[default]
    All,
}

impl DateRange {
    pub fn floor(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            DateRange::Today => Some(today),
            DateRange::Week => Some(today - Duration::days(7)),
            DateRange::Month => today.checked_sub_months(Months::new(1)),
            DateRange::ThreeMonths => today.checked_sub_months(Months::new(3)),
            DateRange::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
    Name,
}

/// Budget restriction: everything, or a single budget id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BudgetFilter {
    #[default]
    All,
    Only(Uuid),
}

/// Grouping key: a live budget, or the shared bucket for dangling
/// references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKey {
    Budget(Uuid),
    Unknown,
}

/// One grouped category with its member expenses (already filtered and
/// sorted) and their aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup {
    pub key: CategoryKey,
    pub label: String,
    pub expenses: Vec<Expense>,
    pub count: usize,
    pub total_amount: f64,
}

/// One page of a flat expense listing plus aggregates over the whole
/// filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpensePage {
    pub items: Vec<Expense>,
    pub total_count: usize,
    pub total_amount: f64,
    pub total_pages: usize,
    pub page: usize,
}

/// What the UI should render for the current query state.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpenseView {
    Categories(Vec<CategoryGroup>),
    Page(ExpensePage),
}

/// Explicit query state. Every transition below resets the page to 1, and
/// leaving a category also clears search, range, and sort.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpenseQuery {
    search: String,
    budget: BudgetFilter,
    range: DateRange,
    sort: SortKey,
    category: Option<CategoryKey>,
    page: usize,
}

impl ExpenseQuery {
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Self::default()
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn category(&self) -> Option<CategoryKey> {
        self.category
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into().trim().to_string();
        self.page = 1;
    }

    pub fn set_budget(&mut self, filter: BudgetFilter) {
        self.budget = filter;
        self.page = 1;
    }

    pub fn set_range(&mut self, range: DateRange) {
        self.range = range;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.page = 1;
    }

    /// Drills into one category; its expenses render as a flat list.
    pub fn open_category(&mut self, key: CategoryKey) {
        self.category = Some(key);
        self.page = 1;
    }

    /// Returns to the grouped view, also resetting search, range, and sort.
    pub fn close_category(&mut self) {
        self.category = None;
        self.search.clear();
        self.range = DateRange::All;
        self.sort = SortKey::DateDesc;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// True when any filter diverges from its default. The budget filter
    /// only counts while not drilled into a category, where it stands in
    /// for the category itself.
    pub fn has_active_filter(&self) -> bool {
        !self.search.is_empty()
            || self.range != DateRange::All
            || self.sort != SortKey::DateDesc
            || (self.category.is_none() && self.budget != BudgetFilter::All)
    }

    /// The grouped view applies iff the result is large enough, nothing is
    /// drilled into, and no filter is active.
    pub fn grouping_applies(&self, filtered_count: usize) -> bool {
        filtered_count > GROUPING_MIN_ITEMS && self.category.is_none() && !self.has_active_filter()
    }

    /// Runs the full pipeline over a collection snapshot.
    pub fn evaluate(
        &self,
        expenses: &ExpenseMap,
        budgets: &BudgetMap,
        today: NaiveDate,
    ) -> ExpenseView {
        let floor = self.range.floor(today);
        let mut filtered: Vec<Expense> = expenses
            .values()
            .filter(|expense| self.matches_search(expense, budgets))
            .filter(|expense| match self.budget {
                BudgetFilter::All => true,
                BudgetFilter::Only(id) => expense.budget_id == id,
            })
            .filter(|expense| floor.is_none_or(|floor| expense.date >= floor))
            .cloned()
            .collect();
        sort_expenses(&mut filtered, self.sort);

        if self.grouping_applies(filtered.len()) {
            return ExpenseView::Categories(group_by_budget(filtered, budgets));
        }
        if let Some(key) = self.category {
            filtered.retain(|expense| category_key(expense, budgets) == key);
        }
        ExpenseView::Page(paginate(filtered, self.page()))
    }

    fn matches_search(&self, expense: &Expense, budgets: &BudgetMap) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        expense.name.to_lowercase().contains(&needle)
            || resolve_budget_name(expense, budgets)
                .to_lowercase()
                .contains(&needle)
    }
}

fn resolve_budget_name<'a>(expense: &Expense, budgets: &'a BudgetMap) -> &'a str {
    budgets
        .get(&expense.budget_id)
        .map(|budget| budget.name.as_str())
        .unwrap_or(UNKNOWN_BUDGET_LABEL)
}

fn category_key(expense: &Expense, budgets: &BudgetMap) -> CategoryKey {
    if budgets.contains_key(&expense.budget_id) {
        CategoryKey::Budget(expense.budget_id)
    } else {
        CategoryKey::Unknown
    }
}

/// Stable sort, so equal keys keep their relative order.
fn sort_expenses(expenses: &mut [Expense], key: SortKey) {
    match key {
        SortKey::DateDesc => expenses.sort_by(|a, b| b.date.cmp(&a.date)),
        SortKey::DateAsc => expenses.sort_by(|a, b| a.date.cmp(&b.date)),
        SortKey::AmountDesc => expenses.sort_by(|a, b| compare_amounts(b, a)),
        SortKey::AmountAsc => expenses.sort_by(|a, b| compare_amounts(a, b)),
        SortKey::Name => {
            expenses.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        }
    }
}

fn compare_amounts(a: &Expense, b: &Expense) -> Ordering {
    a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal)
}

fn group_by_budget(expenses: Vec<Expense>, budgets: &BudgetMap) -> Vec<CategoryGroup> {
    let mut order: Vec<CategoryKey> = Vec::new();
    let mut buckets: HashMap<CategoryKey, Vec<Expense>> = HashMap::new();
    for expense in expenses {
        let key = category_key(&expense, budgets);
        if !buckets.contains_key(&key) {
            order.push(key);
        }
        buckets.entry(key).or_default().push(expense);
    }

    let mut groups: Vec<CategoryGroup> = order
        .into_iter()
        .map(|key| {
            let expenses = buckets.remove(&key).unwrap_or_default();
            let label = match key {
                CategoryKey::Budget(id) => budgets
                    .get(&id)
                    .map(|budget| budget.name.clone())
                    .unwrap_or_else(|| UNKNOWN_CATEGORY_LABEL.to_string()),
                CategoryKey::Unknown => UNKNOWN_CATEGORY_LABEL.to_string(),
            };
            CategoryGroup {
                key,
                label,
                count: expenses.len(),
                total_amount: expenses.iter().map(|expense| expense.amount).sum(),
                expenses,
            }
        })
        .collect();

    // Alphabetical for scanability, with the unknown bucket pinned last.
    groups.sort_by(|a, b| {
        match (
            a.key == CategoryKey::Unknown,
            b.key == CategoryKey::Unknown,
        ) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => a.label.to_lowercase().cmp(&b.label.to_lowercase()),
        }
    });
    groups
}

fn paginate(expenses: Vec<Expense>, requested_page: usize) -> ExpensePage {
    let total_count = expenses.len();
    let total_amount = expenses.iter().map(|expense| expense.amount).sum();
    let total_pages = total_count.div_ceil(PAGE_SIZE);
    let page = requested_page.clamp(1, total_pages.max(1));
    let items = expenses
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();
    ExpensePage {
        items,
        total_count,
        total_amount,
        total_pages,
        page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Budget;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn budget(name: &str) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            name: name.into(),
            amount: 10_000.0,
            spent: 0.0,
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

    fn collect(expenses: Vec<Expense>) -> ExpenseMap {
        expenses.into_iter().map(|e| (e.id, e)).collect()
    }

    fn budget_map(budgets: Vec<Budget>) -> BudgetMap {
        budgets.into_iter().map(|b| (b.id, b)).collect()
    }

    fn page(view: ExpenseView) -> ExpensePage {
        match view {
            ExpenseView::Page(page) => page,
            ExpenseView::Categories(_) => panic!("expected flat page view"),
        }
    }

    #[test]
    fn date_ascending_orders_by_increasing_date() {
        let food = budget("Food");
        let expenses = collect(vec![
            expense("a", 100.0, date(2024, 1, 1), food.id),
            expense("b", 50.0, date(2024, 1, 3), food.id),
            expense("c", 75.0, date(2024, 1, 2), food.id),
        ]);
        let budgets = budget_map(vec![food]);

        let mut query = ExpenseQuery::new();
        query.set_sort(SortKey::DateAsc);
        let page = page(query.evaluate(&expenses, &budgets, date(2024, 1, 10)));
        let amounts: Vec<f64> = page.items.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![100.0, 75.0, 50.0]);
    }

    #[test]
    fn date_descending_is_reverse_of_ascending() {
        let food = budget("Food");
        let expenses = collect(vec![
            expense("a", 100.0, date(2024, 1, 1), food.id),
            expense("b", 50.0, date(2024, 1, 3), food.id),
            expense("c", 75.0, date(2024, 1, 2), food.id),
        ]);
        let budgets = budget_map(vec![food]);
        let today = date(2024, 1, 10);

        let mut asc = ExpenseQuery::new();
        asc.set_sort(SortKey::DateAsc);
        let mut desc = ExpenseQuery::new();
        desc.set_sort(SortKey::DateDesc);

        let mut ascending = page(asc.evaluate(&expenses, &budgets, today)).items;
        ascending.reverse();
        let descending = page(desc.evaluate(&expenses, &budgets, today)).items;
        assert_eq!(ascending, descending);
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let food = budget("Food");
        let expenses = collect(vec![
            expense("banana", 1.0, date(2024, 1, 1), food.id),
            expense("Apple", 2.0, date(2024, 1, 2), food.id),
            expense("cherry", 3.0, date(2024, 1, 3), food.id),
        ]);
        let budgets = budget_map(vec![food]);

        let mut query = ExpenseQuery::new();
        query.set_sort(SortKey::Name);
        let names: Vec<String> = page(query.evaluate(&expenses, &budgets, date(2024, 1, 10)))
            .items
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn adding_filters_never_grows_the_result() {
        let food = budget("Food");
        let transport = budget("Transport");
        let expenses = collect(vec![
            expense("Lunch", 250.0, date(2024, 1, 5), food.id),
            expense("Jeepney fare", 13.0, date(2024, 1, 6), transport.id),
            expense("Late lunch", 180.0, date(2023, 12, 1), food.id),
        ]);
        let budgets = budget_map(vec![food.clone(), transport]);
        let today = date(2024, 1, 10);

        let mut broad = ExpenseQuery::new();
        broad.set_search("lunch");
        let broad_count = page(broad.evaluate(&expenses, &budgets, today)).total_count;

        let mut narrow = broad.clone();
        narrow.set_budget(BudgetFilter::Only(food.id));
        narrow.set_range(DateRange::Month);
        let narrow_count = page(narrow.evaluate(&expenses, &budgets, today)).total_count;

        assert!(narrow_count <= broad_count);
        assert_eq!(broad_count, 2);
        assert_eq!(narrow_count, 1);
    }

    #[test]
    fn search_matches_resolved_budget_names() {
        let food = budget("Food");
        let expenses = collect(vec![expense("Lunch", 250.0, date(2024, 1, 5), food.id)]);
        let budgets = budget_map(vec![food]);

        let mut query = ExpenseQuery::new();
        query.set_search("FOO");
        let result = page(query.evaluate(&expenses, &budgets, date(2024, 1, 10)));
        assert_eq!(result.total_count, 1);
    }

    #[test]
    fn orphaned_expenses_group_into_the_unknown_bucket() {
        let food = budget("Food");
        let gone = Uuid::new_v4();
        let expenses = collect(vec![
            expense("Lunch", 250.0, date(2024, 1, 5), food.id),
            expense("Dinner", 300.0, date(2024, 1, 6), food.id),
            expense("Mystery", 99.0, date(2024, 1, 7), gone),
            expense("Snack", 50.0, date(2024, 1, 8), food.id),
        ]);
        let budgets = budget_map(vec![food.clone()]);

        let query = ExpenseQuery::new();
        let view = query.evaluate(&expenses, &budgets, date(2024, 1, 10));
        let groups = match view {
            ExpenseView::Categories(groups) => groups,
            ExpenseView::Page(_) => panic!("expected grouped view"),
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Food");
        assert_eq!(groups[0].count, 3);
        // Unknown bucket is pinned last.
        assert_eq!(groups[1].key, CategoryKey::Unknown);
        assert_eq!(groups[1].label, UNKNOWN_CATEGORY_LABEL);
        assert_eq!(groups[1].total_amount, 99.0);
    }

    #[test]
    fn grouping_switch_follows_count_filters_and_drill_state() {
        let mut query = ExpenseQuery::new();
        assert!(!query.grouping_applies(3));
        assert!(query.grouping_applies(4));

        query.set_search("lunch");
        assert!(!query.grouping_applies(4));
        query.set_search("");
        assert!(query.grouping_applies(4));

        query.set_range(DateRange::Week);
        assert!(!query.grouping_applies(4));
        query.set_range(DateRange::All);

        query.set_sort(SortKey::AmountDesc);
        assert!(!query.grouping_applies(4));
        query.set_sort(SortKey::DateDesc);

        query.set_budget(BudgetFilter::Only(Uuid::new_v4()));
        assert!(!query.grouping_applies(4));
        query.set_budget(BudgetFilter::All);

        query.open_category(CategoryKey::Unknown);
        assert!(!query.grouping_applies(4));
        // Inside a category the budget filter no longer counts as active.
        query.set_budget(BudgetFilter::Only(Uuid::new_v4()));
        assert!(!query.has_active_filter());
        query.close_category();
        assert!(query.has_active_filter());
    }

    #[test]
    fn drilling_into_a_category_shows_its_flat_list() {
        let food = budget("Food");
        let transport = budget("Transport");
        let expenses = collect(vec![
            expense("Lunch", 250.0, date(2024, 1, 5), food.id),
            expense("Dinner", 300.0, date(2024, 1, 6), food.id),
            expense("Fare", 13.0, date(2024, 1, 7), transport.id),
            expense("Snack", 50.0, date(2024, 1, 8), food.id),
        ]);
        let budgets = budget_map(vec![food.clone(), transport]);
        let today = date(2024, 1, 10);

        let mut query = ExpenseQuery::new();
        query.open_category(CategoryKey::Budget(food.id));
        let result = page(query.evaluate(&expenses, &budgets, today));
        assert_eq!(result.total_count, 3);
        assert_eq!(result.total_amount, 600.0);

        query.set_sort(SortKey::AmountAsc);
        query.set_search("n");
        query.close_category();
        assert_eq!(query.search(), "");
        assert!(!query.has_active_filter());
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn pages_concatenate_to_the_full_filtered_list() {
        let food = budget("Food");
        let expenses: Vec<Expense> = (1..=12)
            .map(|day| expense(&format!("e{day}"), day as f64, date(2024, 1, day), food.id))
            .collect();
        let map = collect(expenses);
        let budgets = budget_map(vec![food.clone()]);
        let today = date(2024, 2, 1);

        let mut query = ExpenseQuery::new();
        // Disable grouping by drilling into the only category.
        query.open_category(CategoryKey::Budget(food.id));

        let first = page(query.evaluate(&map, &budgets, today));
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_count, 12);

        let mut seen = Vec::new();
        for number in 1..=first.total_pages {
            query.set_page(number);
            let current = page(query.evaluate(&map, &budgets, today));
            assert_eq!(current.page, number);
            seen.extend(current.items);
        }
        assert_eq!(seen.len(), 12);
        let mut ids: Vec<Uuid> = seen.iter().map(|e| e.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 12);
        // Newest first by default.
        assert_eq!(seen[0].date, date(2024, 1, 12));
    }

    #[test]
    fn out_of_range_pages_clamp_to_the_last_page() {
        let food = budget("Food");
        let expenses = collect(vec![
            expense("a", 1.0, date(2024, 1, 1), food.id),
            expense("b", 2.0, date(2024, 1, 2), food.id),
        ]);
        let budgets = budget_map(vec![food.clone()]);

        let mut query = ExpenseQuery::new();
        query.open_category(CategoryKey::Budget(food.id));
        query.set_page(99);
        let result = page(query.evaluate(&expenses, &budgets, date(2024, 1, 10)));
        assert_eq!(result.page, 1);
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let budgets = BudgetMap::new();
        let expenses = BTreeMap::new();
        let mut query = ExpenseQuery::new();
        query.set_search("nothing");
        let result = page(query.evaluate(&expenses, &budgets, date(2024, 1, 10)));
        assert_eq!(result.total_pages, 0);
        assert_eq!(result.total_count, 0);
        assert_eq!(result.total_amount, 0.0);
    }

    #[test]
    fn date_presets_are_inclusive_lower_bounds() {
        let today = date(2024, 3, 15);
        assert_eq!(DateRange::Today.floor(today), Some(today));
        assert_eq!(DateRange::Week.floor(today), Some(date(2024, 3, 8)));
        assert_eq!(DateRange::Month.floor(today), Some(date(2024, 2, 15)));
        assert_eq!(DateRange::ThreeMonths.floor(today), Some(date(2023, 12, 15)));
        assert_eq!(DateRange::All.floor(today), None);

        let food = budget("Food");
        let expenses = collect(vec![
            expense("edge", 10.0, date(2024, 2, 15), food.id),
            expense("older", 20.0, date(2024, 2, 14), food.id),
        ]);
        let budgets = budget_map(vec![food]);
        let mut query = ExpenseQuery::new();
        query.set_range(DateRange::Month);
        let result = page(query.evaluate(&expenses, &budgets, today));
        assert_eq!(result.total_count, 1);
        assert_eq!(result.items[0].name, "edge");
    }

    #[test]
    fn filter_changes_reset_the_page() {
        let mut query = ExpenseQuery::new();
        query.set_page(4);
        query.set_search("x");
        assert_eq!(query.page(), 1);

        query.set_page(4);
        query.set_range(DateRange::Week);
        assert_eq!(query.page(), 1);

        query.set_page(4);
        query.set_sort(SortKey::AmountAsc);
        assert_eq!(query.page(), 1);

        query.set_page(4);
        query.open_category(CategoryKey::Unknown);
        assert_eq!(query.page(), 1);
    }
}
