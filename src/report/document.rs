//! Styled report document: a pure layout pass that composes measured
//! blocks onto pages, then an HTML renderer with a footer on every page.

use super::{ReportMeta, ReportSelection, ReportSnapshot, TIMELINE_LIMIT};

// Vertical budget of an A4 page, in millimetres.
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_TOP_MM: f64 = 15.0;
const MARGIN_BOTTOM_MM: f64 = 12.0;
const FOOTER_MM: f64 = 10.0;
const USABLE_MM: f64 = PAGE_HEIGHT_MM - MARGIN_TOP_MM - MARGIN_BOTTOM_MM - FOOTER_MM;

const TITLE_BLOCK_MM: f64 = 34.0;
const SECTION_HEADING_MM: f64 = 14.0;
const METRIC_CARDS_MM: f64 = 30.0;
const TABLE_HEADER_MM: f64 = 9.0;
const TABLE_ROW_MM: f64 = 8.0;
const TIMELINE_ITEM_MM: f64 = 16.0;

// Per-column character budgets keeping table columns aligned.
const DATE_CHARS: usize = 12;
const DESCRIPTION_CHARS: usize = 28;
const AMOUNT_CHARS: usize = 14;
const CATEGORY_CHARS: usize = 20;
const BUDGET_NAME_CHARS: usize = 24;

const DOCUMENT_TITLE: &str = "Expense Tracker Report";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Color tone for a budget's progress figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressTone {
    Critical,
    Warning,
    Normal,
}

fn progress_tone(percent: f64) -> ProgressTone {
    if percent > 90.0 {
        ProgressTone::Critical
    } else if percent > 70.0 {
        ProgressTone::Warning
    } else {
        ProgressTone::Normal
    }
}

impl ProgressTone {
    fn css_class(self) -> &'static str {
        match self {
            ProgressTone::Critical => "tone-critical",
            ProgressTone::Warning => "tone-warning",
            ProgressTone::Normal => "tone-normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Title {
        name: String,
        generated_at: String,
        user: String,
    },
    SectionHeading(String),
    MetricCards {
        total_budget: String,
        total_spent: String,
        remaining: String,
        remaining_negative: bool,
    },
    BudgetTableHeader,
    BudgetRow {
        name: String,
        allocated: String,
        spent: String,
        progress: String,
        tone: ProgressTone,
    },
    ExpenseTableHeader,
    ExpenseRow {
        date: String,
        description: String,
        amount: String,
        category: String,
        zebra: bool,
    },
    TimelineItem {
        date: String,
        description: String,
        amount: String,
        category: String,
    },
}

#[derive(Debug, Default)]
struct Page {
    blocks: Vec<Block>,
}

/// Accumulates blocks, breaking to a fresh page whenever the next block
/// would overflow the remaining vertical budget. Table rows re-emit their
/// header after a break.
struct Composer {
    pages: Vec<Page>,
    used: f64,
}

impl Composer {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            used: 0.0,
        }
    }

    fn push(&mut self, height: f64, block: Block) {
        if self.overflows(height) {
            self.break_page();
        }
        self.append(height, block);
    }

    fn push_row(&mut self, height: f64, header: Block, row: Block) {
        if self.overflows(height) {
            self.break_page();
            self.append(TABLE_HEADER_MM, header);
        }
        self.append(height, row);
    }

    fn overflows(&self, height: f64) -> bool {
        self.used + height > USABLE_MM && !self.current_is_empty()
    }

    fn current_is_empty(&self) -> bool {
        self.pages.last().map(|page| page.blocks.is_empty()).unwrap_or(true)
    }

    fn break_page(&mut self) {
        self.pages.push(Page::default());
        self.used = 0.0;
    }

    fn append(&mut self, height: f64, block: Block) {
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
        self.used += height;
    }
}

/// Truncates cell text to its column's character budget, ending with an
/// ellipsis when anything was cut.
fn truncate_cell(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        text.to_string()
    } else {
        let kept: String = text.chars().take(budget.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn compose(
    snapshot: &ReportSnapshot,
    selection: &ReportSelection,
    meta: &ReportMeta,
) -> Vec<Page> {
    let mut composer = Composer::new();
    composer.push(
        TITLE_BLOCK_MM,
        Block::Title {
            name: if selection.name.trim().is_empty() {
                DOCUMENT_TITLE.to_string()
            } else {
                selection.name.trim().to_string()
            },
            generated_at: meta.generated_at.format(TIMESTAMP_FORMAT).to_string(),
            user: meta.user_email.clone(),
        },
    );

    if selection.sections.summary {
        composer.push(
            SECTION_HEADING_MM,
            Block::SectionHeading("Financial Summary".into()),
        );
        composer.push(
            METRIC_CARDS_MM,
            Block::MetricCards {
                total_budget: meta.currency(snapshot.stats.total_budget),
                total_spent: meta.currency(snapshot.stats.total_spent),
                remaining: meta.currency(snapshot.stats.remaining),
                remaining_negative: snapshot.stats.remaining < 0.0,
            },
        );
    }

    if selection.sections.budget_details {
        composer.push(
            SECTION_HEADING_MM,
            Block::SectionHeading("Budget Breakdown".into()),
        );
        composer.push(TABLE_HEADER_MM, Block::BudgetTableHeader);
        for budget in &snapshot.budgets {
            let percent = budget.progress_percent();
            composer.push_row(
                TABLE_ROW_MM,
                Block::BudgetTableHeader,
                Block::BudgetRow {
                    name: truncate_cell(&budget.name, BUDGET_NAME_CHARS),
                    allocated: meta.currency(budget.amount),
                    spent: meta.currency(budget.spent),
                    progress: format!("{percent:.1}%"),
                    tone: progress_tone(percent),
                },
            );
        }
    }

    if selection.sections.expense_details {
        composer.push(
            SECTION_HEADING_MM,
            Block::SectionHeading("Transaction Details".into()),
        );
        composer.push(TABLE_HEADER_MM, Block::ExpenseTableHeader);
        for (index, expense) in snapshot.newest_first().into_iter().enumerate() {
            composer.push_row(
                TABLE_ROW_MM,
                Block::ExpenseTableHeader,
                Block::ExpenseRow {
                    date: truncate_cell(&expense.date.format("%Y-%m-%d").to_string(), DATE_CHARS),
                    description: truncate_cell(expense.display_name(), DESCRIPTION_CHARS),
                    amount: truncate_cell(&meta.currency(expense.amount), AMOUNT_CHARS),
                    category: truncate_cell(
                        snapshot.budget_name(expense.budget_id),
                        CATEGORY_CHARS,
                    ),
                    zebra: index % 2 == 1,
                },
            );
        }
    }

    if selection.sections.timeline && !snapshot.expenses.is_empty() {
        composer.push(
            SECTION_HEADING_MM,
            Block::SectionHeading("Recent Activity".into()),
        );
        for expense in snapshot.newest_first().into_iter().take(TIMELINE_LIMIT) {
            composer.push(
                TIMELINE_ITEM_MM,
                Block::TimelineItem {
                    date: expense.date.format("%Y-%m-%d").to_string(),
                    description: expense.display_name().to_string(),
                    amount: meta.currency(expense.amount),
                    category: snapshot.budget_name(expense.budget_id).to_string(),
                },
            );
        }
    }

    composer.pages
}

pub fn render(snapshot: &ReportSnapshot, selection: &ReportSelection, meta: &ReportMeta) -> String {
    let pages = compose(snapshot, selection, meta);
    let total_pages = pages.len();
    let title = if selection.name.trim().is_empty() {
        DOCUMENT_TITLE.to_string()
    } else {
        selection.name.trim().to_string()
    };
    let timestamp = meta.generated_at.format(TIMESTAMP_FORMAT).to_string();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape(&title)));
    html.push_str("<style>\n");
    html.push_str(STYLES);
    html.push_str("</style>\n</head>\n<body>\n");

    for (index, page) in pages.iter().enumerate() {
        html.push_str("<div class=\"page\">\n");
        for block in &page.blocks {
            render_block(&mut html, block);
        }
        html.push_str(&format!(
            "<div class=\"page-footer\">{} · Page {} of {} · {}</div>\n",
            escape(&title),
            index + 1,
            total_pages,
            timestamp
        ));
        html.push_str("</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_block(html: &mut String, block: &Block) {
    match block {
        Block::Title {
            name,
            generated_at,
            user,
        } => {
            html.push_str("<header class=\"title\">\n");
            html.push_str(&format!("<h1>{}</h1>\n", escape(name)));
            html.push_str(&format!("<p>Generated on {}</p>\n", escape(generated_at)));
            html.push_str(&format!("<p>User: {}</p>\n", escape(user)));
            html.push_str("</header>\n");
        }
        Block::SectionHeading(heading) => {
            html.push_str(&format!("<h2>{}</h2>\n", escape(heading)));
        }
        Block::MetricCards {
            total_budget,
            total_spent,
            remaining,
            remaining_negative,
        } => {
            let remaining_class = if *remaining_negative {
                "metric-value negative"
            } else {
                "metric-value positive"
            };
            html.push_str("<div class=\"metric-cards\">\n");
            html.push_str(&format!(
                "<div class=\"metric-card\"><h3>Total Budget</h3><div class=\"metric-value\">{}</div></div>\n",
                escape(total_budget)
            ));
            html.push_str(&format!(
                "<div class=\"metric-card\"><h3>Total Spent</h3><div class=\"metric-value\">{}</div></div>\n",
                escape(total_spent)
            ));
            html.push_str(&format!(
                "<div class=\"metric-card\"><h3>Remaining</h3><div class=\"{}\">{}</div></div>\n",
                remaining_class,
                escape(remaining)
            ));
            html.push_str("</div>\n");
        }
        Block::BudgetTableHeader => {
            html.push_str(
                "<div class=\"table-row table-head\"><span>Budget</span><span>Allocated</span><span>Spent</span><span>Progress</span></div>\n",
            );
        }
        Block::BudgetRow {
            name,
            allocated,
            spent,
            progress,
            tone,
        } => {
            html.push_str(&format!(
                "<div class=\"table-row\"><span>{}</span><span>{}</span><span>{}</span><span class=\"{}\">{}</span></div>\n",
                escape(name),
                escape(allocated),
                escape(spent),
                tone.css_class(),
                escape(progress)
            ));
        }
        Block::ExpenseTableHeader => {
            html.push_str(
                "<div class=\"table-row table-head\"><span>Date</span><span>Description</span><span>Amount</span><span>Category</span></div>\n",
            );
        }
        Block::ExpenseRow {
            date,
            description,
            amount,
            category,
            zebra,
        } => {
            let class = if *zebra { "table-row alt" } else { "table-row" };
            html.push_str(&format!(
                "<div class=\"{}\"><span>{}</span><span>{}</span><span class=\"amount\">{}</span><span>{}</span></div>\n",
                class,
                escape(date),
                escape(description),
                escape(amount),
                escape(category)
            ));
        }
        Block::TimelineItem {
            date,
            description,
            amount,
            category,
        } => {
            html.push_str(&format!(
                "<div class=\"timeline-item\"><strong>{}</strong><span class=\"meta\">{} · {}</span><span class=\"amount\">{}</span></div>\n",
                escape(description),
                escape(category),
                escape(date),
                escape(amount)
            ));
        }
    }
}

const STYLES: &str = "\
* { margin: 0; padding: 0; box-sizing: border-box; }\n\
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; color: #333; background: #f3f4f6; }\n\
.page { position: relative; width: 210mm; min-height: 297mm; margin: 10px auto; padding: 15mm 14mm 22mm; background: white; box-shadow: 0 4px 14px rgba(0,0,0,0.1); page-break-after: always; }\n\
.title { background: linear-gradient(135deg, #4f46e5, #7c3aed); color: white; padding: 18px; border-radius: 10px; margin-bottom: 12px; }\n\
.title h1 { font-size: 1.6rem; }\n\
.title p { opacity: 0.9; font-size: 0.9rem; }\n\
h2 { color: #4f46e5; border-bottom: 3px solid #e5e7eb; padding-bottom: 6px; margin: 14px 0 8px; }\n\
.metric-cards { display: flex; gap: 12px; }\n\
.metric-card { flex: 1; background: linear-gradient(135deg, #f3f4f6, #e5e7eb); border: 1px solid #d1d5db; border-radius: 10px; padding: 12px; text-align: center; }\n\
.metric-card h3 { color: #4f46e5; font-size: 0.9rem; margin-bottom: 6px; }\n\
.metric-value { font-size: 1.3rem; font-weight: bold; color: #1f2937; }\n\
.metric-value.positive { color: #059669; }\n\
.metric-value.negative { color: #dc2626; }\n\
.table-row { display: flex; padding: 6px 10px; border-bottom: 1px solid #e5e7eb; font-size: 0.85rem; }\n\
.table-row span { flex: 1; overflow: hidden; white-space: nowrap; }\n\
.table-head { background: linear-gradient(135deg, #4f46e5, #7c3aed); color: white; font-weight: 600; border-radius: 6px 6px 0 0; }\n\
.table-row.alt { background: #f9fafb; }\n\
.amount { font-weight: bold; color: #ef4444; }\n\
.tone-critical { color: #dc2626; font-weight: 600; }\n\
.tone-warning { color: #d97706; font-weight: 600; }\n\
.tone-normal { color: #059669; }\n\
.timeline-item { display: flex; gap: 10px; align-items: baseline; border: 1px solid #e5e7eb; border-left: 4px solid #4f46e5; border-radius: 8px; padding: 8px 12px; margin-bottom: 6px; font-size: 0.9rem; }\n\
.timeline-item .meta { color: #6b7280; flex: 1; }\n\
.page-footer { position: absolute; bottom: 8mm; left: 14mm; right: 14mm; text-align: center; color: #6b7280; font-size: 0.75rem; border-top: 1px solid #e5e7eb; padding-top: 4px; }\n\
@media print { body { background: white; } .page { margin: 0; box-shadow: none; } }\n";
