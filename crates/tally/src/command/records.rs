// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tally expenses|income|budgets|categories`.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::{fail, print_json, require_login, EXIT_OK};
use crate::model::{
    Budget, ExpenseSort, NewBudget, NewExpense, NewIncome, Page, PageQuery, Record,
};
use crate::session::Session;

/// Largest page the backend serves.
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, clap::Args)]
pub struct ListArgs {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Items per page.
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
    /// Print raw JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page == 0 {
            anyhow::bail!("--page starts at 1");
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            anyhow::bail!("--limit must be between 1 and {MAX_LIMIT} (got {})", self.limit);
        }
        Ok(())
    }

    fn query(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }
}

fn positive(name: &str, value: Decimal) -> anyhow::Result<()> {
    if value <= Decimal::ZERO {
        anyhow::bail!("{name} must be greater than zero (got {value})");
    }
    Ok(())
}

// -- Expenses -----------------------------------------------------------------

#[derive(Debug, clap::Args)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    pub action: ExpenseAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum ExpenseAction {
    /// List expenses.
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Server-side ordering.
        #[arg(long, value_enum)]
        sort: Option<ExpenseSort>,
    },
    /// Record an expense.
    Add(ExpenseFields),
    /// Replace the fields of an expense.
    Update {
        id: i64,
        #[command(flatten)]
        fields: ExpenseFields,
    },
    /// Delete an expense.
    Rm { id: i64 },
}

#[derive(Debug, Clone, clap::Args)]
pub struct ExpenseFields {
    /// What was bought.
    pub item: String,
    #[arg(long)]
    pub cost: Decimal,
    #[arg(long)]
    pub category: String,
    /// When it happened (`YYYY-MM-DDTHH:MM:SS`); defaults to now on the server.
    #[arg(long)]
    pub date: Option<NaiveDateTime>,
}

impl ExpenseFields {
    fn to_new(&self) -> NewExpense {
        NewExpense {
            item: self.item.clone(),
            cost: self.cost,
            category: self.category.clone(),
            date: self.date,
        }
    }
}

impl ExpenseArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.action {
            ExpenseAction::List { list, .. } => list.validate(),
            ExpenseAction::Add(fields) | ExpenseAction::Update { fields, .. } => {
                positive("--cost", fields.cost)
            }
            ExpenseAction::Rm { .. } => Ok(()),
        }
    }
}

pub async fn expenses(session: &Session, args: &ExpenseArgs) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    let api = session.api();
    match &args.action {
        ExpenseAction::List { list, sort } => {
            let mut query = list.query();
            query.sort = *sort;
            match api.expenses(query).await {
                Ok(page) if list.json => print_json(&page),
                Ok(page) => {
                    print_records(&page, "ITEM");
                    EXIT_OK
                }
                Err(e) => fail(&e),
            }
        }
        ExpenseAction::Add(fields) => match api.create_expense(&fields.to_new()).await {
            Ok(ack) => {
                println!("Added expense{}.", id_suffix(ack.id));
                EXIT_OK
            }
            Err(e) => fail(&e),
        },
        ExpenseAction::Update { id, fields } => {
            match api.update_expense(*id, &fields.to_new()).await {
                Ok(_) => {
                    println!("Updated expense {id}.");
                    EXIT_OK
                }
                Err(e) => fail(&e),
            }
        }
        ExpenseAction::Rm { id } => match api.delete_expense(*id).await {
            Ok(()) => {
                println!("Deleted expense {id}.");
                EXIT_OK
            }
            Err(e) => fail(&e),
        },
    }
}

// -- Income -------------------------------------------------------------------

#[derive(Debug, clap::Args)]
pub struct IncomeArgs {
    #[command(subcommand)]
    pub action: IncomeAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum IncomeAction {
    /// List income.
    List(ListArgs),
    /// Record income.
    Add(IncomeFields),
    /// Replace the fields of an income record.
    Update {
        id: i64,
        #[command(flatten)]
        fields: IncomeFields,
    },
    /// Delete an income record.
    Rm { id: i64 },
}

#[derive(Debug, Clone, clap::Args)]
pub struct IncomeFields {
    /// Where the money came from.
    pub source: String,
    #[arg(long)]
    pub amount: Decimal,
    #[arg(long)]
    pub date: Option<NaiveDateTime>,
}

impl IncomeFields {
    fn to_new(&self) -> NewIncome {
        NewIncome { amount: self.amount, source: self.source.clone(), date: self.date }
    }
}

impl IncomeArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.action {
            IncomeAction::List(list) => list.validate(),
            IncomeAction::Add(fields) | IncomeAction::Update { fields, .. } => {
                positive("--amount", fields.amount)
            }
            IncomeAction::Rm { .. } => Ok(()),
        }
    }
}

pub async fn income(session: &Session, args: &IncomeArgs) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    let api = session.api();
    match &args.action {
        IncomeAction::List(list) => match api.income(list.query()).await {
            Ok(page) if list.json => print_json(&page),
            Ok(page) => {
                print_records(&page, "SOURCE");
                EXIT_OK
            }
            Err(e) => fail(&e),
        },
        IncomeAction::Add(fields) => match api.create_income(&fields.to_new()).await {
            Ok(ack) => {
                println!("Added income{}.", id_suffix(ack.id));
                EXIT_OK
            }
            Err(e) => fail(&e),
        },
        IncomeAction::Update { id, fields } => {
            match api.update_income(*id, &fields.to_new()).await {
                Ok(_) => {
                    println!("Updated income {id}.");
                    EXIT_OK
                }
                Err(e) => fail(&e),
            }
        }
        IncomeAction::Rm { id } => match api.delete_income(*id).await {
            Ok(()) => {
                println!("Deleted income {id}.");
                EXIT_OK
            }
            Err(e) => fail(&e),
        },
    }
}

// -- Budgets ------------------------------------------------------------------

#[derive(Debug, clap::Args)]
pub struct BudgetArgs {
    #[command(subcommand)]
    pub action: BudgetAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum BudgetAction {
    /// List budgets.
    List(ListArgs),
    /// Create a budget.
    Add(BudgetFields),
    /// Replace the fields of a budget.
    Update {
        id: i64,
        #[command(flatten)]
        fields: BudgetFields,
    },
    /// Delete a budget.
    Rm { id: i64 },
}

#[derive(Debug, Clone, clap::Args)]
pub struct BudgetFields {
    /// Category the budget caps.
    pub category: String,
    #[arg(long)]
    pub limit: Decimal,
    #[arg(long, default_value = "monthly")]
    pub period: String,
    #[arg(long)]
    pub start: Option<NaiveDateTime>,
    #[arg(long)]
    pub end: Option<NaiveDateTime>,
}

impl BudgetFields {
    fn to_new(&self) -> NewBudget {
        NewBudget {
            category: self.category.clone(),
            limit: self.limit,
            period: self.period.clone(),
            start_date: self.start,
            end_date: self.end,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        positive("--limit", self.limit)?;
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                anyhow::bail!("--end must not be before --start");
            }
        }
        Ok(())
    }
}

impl BudgetArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.action {
            BudgetAction::List(list) => list.validate(),
            BudgetAction::Add(fields) | BudgetAction::Update { fields, .. } => fields.validate(),
            BudgetAction::Rm { .. } => Ok(()),
        }
    }
}

pub async fn budgets(session: &Session, args: &BudgetArgs) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    let api = session.api();
    match &args.action {
        BudgetAction::List(list) => match api.budgets(list.query()).await {
            Ok(page) if list.json => print_json(&page),
            Ok(page) => {
                print_budgets(&page);
                EXIT_OK
            }
            Err(e) => fail(&e),
        },
        BudgetAction::Add(fields) => match api.create_budget(&fields.to_new()).await {
            Ok(ack) => {
                println!("Added budget{}.", id_suffix(ack.id));
                EXIT_OK
            }
            Err(e) => fail(&e),
        },
        BudgetAction::Update { id, fields } => {
            match api.update_budget(*id, &fields.to_new()).await {
                Ok(_) => {
                    println!("Updated budget {id}.");
                    EXIT_OK
                }
                Err(e) => fail(&e),
            }
        }
        BudgetAction::Rm { id } => match api.delete_budget(*id).await {
            Ok(()) => {
                println!("Deleted budget {id}.");
                EXIT_OK
            }
            Err(e) => fail(&e),
        },
    }
}

pub async fn categories(session: &Session, args: &ListArgs) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    match session.api().categories(args.query()).await {
        Ok(page) if args.json => print_json(&page),
        Ok(page) => {
            if page.data.is_empty() {
                println!("No categories.");
            }
            for category in &page.data {
                println!("{:<6} {}", category.id, category.name);
            }
            EXIT_OK
        }
        Err(e) => fail(&e),
    }
}

// -- Output -------------------------------------------------------------------

fn id_suffix(id: Option<i64>) -> String {
    id.map(|id| format!(" #{id}")).unwrap_or_default()
}

fn page_footer<T>(page: &Page<T>) {
    let current = page.metadata.current_page.unwrap_or(1);
    let total = page.metadata.total_pages.max(1);
    match page.metadata.total_items {
        Some(items) => println!("page {current}/{total} ({items} total)"),
        None => println!("page {current}/{total}"),
    }
}

fn print_records(page: &Page<Record>, label: &str) {
    if page.data.is_empty() {
        println!("Nothing recorded.");
        return;
    }
    println!("{:<6} {:<19} {:<16} {:>12}  {label}", "ID", "DATE", "CATEGORY", "AMOUNT");
    println!("{}", "-".repeat(64));
    for record in &page.data {
        let date = record.occurred_at.format("%Y-%m-%d %H:%M");
        let category = record.category.as_deref().unwrap_or("-");
        println!(
            "{:<6} {:<19} {:<16} {:>12}  {}",
            record.id,
            date.to_string(),
            category,
            record.amount.round_dp(2).to_string(),
            record.description
        );
    }
    page_footer(page);
}

fn print_budgets(page: &Page<Budget>) {
    if page.data.is_empty() {
        println!("No budgets.");
        return;
    }
    println!("{:<6} {:<16} {:>12}  PERIOD", "ID", "CATEGORY", "LIMIT");
    println!("{}", "-".repeat(48));
    for budget in &page.data {
        println!(
            "{:<6} {:<16} {:>12}  {}",
            budget.id,
            budget.category,
            budget.limit.round_dp(2).to_string(),
            budget.period
        );
    }
    page_footer(page);
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
