use std::{env, process, sync::Arc};

use chrono::{NaiveDate, Utc};
use colored::Colorize;
use uuid::Uuid;

use gastos_core::{
    config::ConfigManager,
    core::{ExpenseQuery, ExpenseView, Tracker},
    domain::{BudgetDraft, ExpenseDraft, GoalDraft, UserIdentity, UNKNOWN_BUDGET_LABEL},
    gateway::JsonGateway,
    init,
    report::{self, ReportFormat, ReportMeta, ReportSelection},
};

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let command = args.next().unwrap_or_else(|| {
        print_usage();
        process::exit(1);
    });

    let config = ConfigManager::new().load()?;
    let email = env::var("GASTOS_USER")
        .ok()
        .or_else(|| config.last_user.clone())
        .unwrap_or_else(|| "local@gastos.app".into());
    let identity = UserIdentity::new(email.clone(), email);
    let gateway = Arc::new(JsonGateway::open_default()?);
    let tracker = Tracker::new(gateway, identity);
    let currency = config.currency_symbol.clone();

    match command.as_str() {
        "summary" => {
            let totals = tracker.totals()?;
            println!("{}", "Overview".bold());
            println!(
                "  Total Budget  {}",
                format!("{currency}{:.2}", totals.total_budget).blue()
            );
            println!(
                "  Total Spent   {}",
                format!("{currency}{:.2}", totals.total_spent).red()
            );
            let remaining = format!("{currency}{:.2}", totals.remaining);
            if totals.remaining < 0.0 {
                println!("  Remaining     {}", remaining.red().bold());
            } else {
                println!("  Remaining     {}", remaining.green());
            }
        }
        "budgets" => {
            let budgets = tracker.budgets()?;
            if budgets.is_empty() {
                println!("No budgets yet. Create one with add-budget.");
                return Ok(());
            }
            for budget in budgets.values() {
                let percent = budget.progress_percent();
                let figure = format!("{percent:.1}%");
                let colored_figure = if percent > 90.0 {
                    figure.red()
                } else if percent > 70.0 {
                    figure.yellow()
                } else {
                    figure.green()
                };
                println!(
                    "{}  {}  spent {} of {}  ({})  [{}]",
                    colored_figure,
                    budget.name.bold(),
                    format!("{currency}{:.2}", budget.spent),
                    format!("{currency}{:.2}", budget.amount),
                    format!("{currency}{:.2} left", budget.remaining()),
                    budget.id
                );
            }
        }
        "add-budget" => {
            let name = expect_arg(args.next(), "add-budget <name> <amount>");
            let amount = parse_amount(&expect_arg(args.next(), "add-budget <name> <amount>"))?;
            let budget = tracker.add_budget(BudgetDraft::new(name, amount))?;
            println!("Created budget {} ({})", budget.name.bold(), budget.id);
        }
        "remove-budget" => {
            let reference = expect_arg(args.next(), "remove-budget <name-or-id>");
            let budget = resolve_budget(&tracker, &reference)?;
            tracker.remove_budget(budget.id)?;
            println!("Removed budget {}", budget.name.bold());
        }
        "add-expense" => {
            let usage = "add-expense <budget> <name> <amount> [YYYY-MM-DD]";
            let budget_ref = expect_arg(args.next(), usage);
            let name = expect_arg(args.next(), usage);
            let amount = parse_amount(&expect_arg(args.next(), usage))?;
            let budget = resolve_budget(&tracker, &budget_ref)?;
            let mut draft = ExpenseDraft::new(name, amount, budget.id);
            if let Some(raw) = args.next() {
                draft = draft.on(parse_date(&raw)?);
            }
            let expense = tracker.add_expense(draft)?;
            println!(
                "Recorded {} {} against {} ({})",
                format!("{currency}{:.2}", expense.amount).red(),
                expense.display_name(),
                budget.name.bold(),
                expense.id
            );
        }
        "remove-expense" => {
            let raw = expect_arg(args.next(), "remove-expense <id>");
            let id: Uuid = raw.parse()?;
            let expense = tracker.remove_expense(id)?;
            println!("Removed expense {}", expense.display_name());
        }
        "expenses" => {
            let mut query = ExpenseQuery::new();
            if let Some(raw) = args.next() {
                query.set_page(raw.parse()?);
            }
            let budgets = tracker.budgets()?;
            let expenses = tracker.expenses()?;
            match query.evaluate(&expenses, &budgets, Utc::now().date_naive()) {
                ExpenseView::Categories(groups) => {
                    for group in groups {
                        println!(
                            "{}  {} expense(s), {}",
                            group.label.bold(),
                            group.count,
                            format!("{currency}{:.2}", group.total_amount).red()
                        );
                    }
                }
                ExpenseView::Page(page) => {
                    if page.total_count == 0 {
                        println!("No expenses yet");
                        return Ok(());
                    }
                    for expense in &page.items {
                        let budget_name = budgets
                            .get(&expense.budget_id)
                            .map(|budget| budget.name.as_str())
                            .unwrap_or(UNKNOWN_BUDGET_LABEL);
                        println!(
                            "{}  {}  {}  {}  [{}]",
                            expense.date,
                            format!("{currency}{:.2}", expense.amount).red(),
                            expense.display_name(),
                            budget_name,
                            expense.id
                        );
                    }
                    println!(
                        "Page {} of {} · {} expense(s) · {}",
                        page.page,
                        page.total_pages,
                        page.total_count,
                        format!("{currency}{:.2}", page.total_amount).red()
                    );
                }
            }
        }
        "goals" => {
            let goals = tracker.goals()?;
            if goals.is_empty() {
                println!("No goals yet. Create one with add-goal.");
                return Ok(());
            }
            let today = Utc::now().date_naive();
            for goal in goals.values() {
                let progress = goal.progress(today);
                let status = if progress.completed {
                    "Goal Achieved!".green().to_string()
                } else if progress.overdue {
                    "Overdue".red().to_string()
                } else {
                    format!("{} days left", progress.days_remaining)
                };
                println!(
                    "{}  {} of {} ({:.1}%)  {}",
                    goal.name.bold(),
                    format!("{currency}{:.2}", goal.saved),
                    format!("{currency}{:.2}", goal.amount),
                    progress.progress_percent,
                    status
                );
                if !progress.completed {
                    println!(
                        "    suggested: {} per kinsenas for the next {}",
                        format!("{currency}{:.2}", progress.suggested_contribution).green(),
                        progress.periods_remaining
                    );
                }
            }
        }
        "add-goal" => {
            let usage = "add-goal <name> <amount> <target YYYY-MM-DD> [saved]";
            let name = expect_arg(args.next(), usage);
            let amount = parse_amount(&expect_arg(args.next(), usage))?;
            let target = parse_date(&expect_arg(args.next(), usage))?;
            let mut draft = GoalDraft::new(name, amount, Utc::now().date_naive(), target);
            if let Some(raw) = args.next() {
                draft = draft.with_saved(parse_amount(&raw)?);
            }
            let goal = tracker.add_goal(draft)?;
            println!("Created goal {} ({})", goal.name.bold(), goal.id);
        }
        "export" => {
            let usage = "export <csv|html> [path]";
            let format = match expect_arg(args.next(), usage).as_str() {
                "csv" => ReportFormat::Csv,
                "html" => ReportFormat::Document,
                other => return Err(format!("unknown export format `{other}`").into()),
            };
            let budgets = tracker.budgets()?;
            if budgets.is_empty() {
                return Err("no budgets to export".into());
            }
            let mut selection = ReportSelection::new("expense-report").with_format(format);
            selection.select_all(&budgets);
            let meta = ReportMeta::new(tracker.user().email.clone(), Utc::now())
                .with_currency_symbol(currency);
            let file = report::generate(&selection, &budgets, &tracker.expenses()?, &meta)?;
            let path = args.next().unwrap_or_else(|| file.file_name.clone());
            std::fs::write(&path, file.contents)?;
            println!("Exported report to {}", path.bold());
        }
        _ => {
            print_usage();
            process::exit(1);
        }
    }

    Ok(())
}

fn resolve_budget(
    tracker: &Tracker,
    reference: &str,
) -> Result<gastos_core::domain::Budget, Box<dyn std::error::Error>> {
    let budgets = tracker.budgets()?;
    if let Ok(id) = reference.parse::<Uuid>() {
        if let Some(budget) = budgets.get(&id) {
            return Ok(budget.clone());
        }
    }
    budgets
        .values()
        .find(|budget| budget.name.eq_ignore_ascii_case(reference))
        .cloned()
        .ok_or_else(|| format!("budget `{reference}` not found").into())
}

fn expect_arg(value: Option<String>, usage: &str) -> String {
    value.unwrap_or_else(|| {
        eprintln!("Usage: gastos_cli {usage}");
        process::exit(1);
    })
}

fn parse_amount(raw: &str) -> Result<f64, Box<dyn std::error::Error>> {
    raw.parse::<f64>()
        .map_err(|_| format!("invalid amount `{raw}`").into())
}

fn parse_date(raw: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date `{raw}`, expected YYYY-MM-DD").into())
}

fn print_usage() {
    eprintln!(
        "Usage: gastos_cli <command>\n\
         Commands:\n  \
         summary\n  \
         budgets\n  \
         add-budget <name> <amount>\n  \
         remove-budget <name-or-id>\n  \
         add-expense <budget> <name> <amount> [YYYY-MM-DD]\n  \
         remove-expense <id>\n  \
         expenses [page]\n  \
         goals\n  \
         add-goal <name> <amount> <target YYYY-MM-DD> [saved]\n  \
         export <csv|html> [path]"
    );
}
