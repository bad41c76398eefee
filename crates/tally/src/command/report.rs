// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tally summary`, `report`, `breakdown`.

use rust_decimal::Decimal;

use super::{fail, print_json, require_login, EXIT_OK};
use crate::aggregate::{self, BreakdownEntry};
use crate::model::ReportPeriod;
use crate::session::Session;

#[derive(Debug, clap::Args)]
pub struct SummaryArgs {
    /// Window in days (server default: 30).
    #[arg(long)]
    pub days: Option<u32>,
    #[arg(long)]
    pub json: bool,
}

impl SummaryArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.days == Some(0) {
            anyhow::bail!("--days must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct ReportArgs {
    /// Month, 1-12 (default: current month).
    #[arg(long)]
    pub month: Option<u32>,
    /// Year (default: current year).
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long)]
    pub json: bool,
}

impl ReportArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.period().map(|_| ())
    }

    /// The selected month, filling gaps from the local clock.
    pub fn period(&self) -> anyhow::Result<ReportPeriod> {
        let now = ReportPeriod::current();
        ReportPeriod::new(self.month.unwrap_or(now.month()), self.year.unwrap_or(now.year()))
    }
}

#[derive(Debug, clap::Args)]
pub struct BreakdownArgs {
    #[arg(long)]
    pub json: bool,
}

pub async fn summary(session: &Session, args: &SummaryArgs) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    match session.api().summary(args.days).await {
        Ok(summary) if args.json => print_json(&summary),
        Ok(summary) => {
            println!("Last {} days", summary.days);
            println!("  income   {:>12}", summary.total_income.round_dp(2).to_string());
            println!("  expenses {:>12}", summary.total_expenses.round_dp(2).to_string());
            println!("  net      {:>12}", summary.net.round_dp(2).to_string());
            EXIT_OK
        }
        Err(e) => fail(&e),
    }
}

pub async fn report(session: &Session, args: &ReportArgs) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    let period = match args.period() {
        Ok(period) => period,
        Err(e) => {
            eprintln!("error: {e}");
            return super::EXIT_USAGE;
        }
    };
    let api = session.api();
    let report = match api.monthly_report(period).await {
        Ok(report) => report,
        Err(e) => return fail(&e),
    };
    let entries = aggregate::breakdown(&aggregate::totals_from(&report.by_category));
    if args.json {
        return print_json(&serde_json::json!({
            "month": period.month(),
            "year": period.year(),
            "total_expense": report.total_expense,
            "breakdown": entries,
        }));
    }

    println!("{period}: {} spent", report.total_expense.round_dp(2));
    print_breakdown(&entries);
    EXIT_OK
}

pub async fn breakdown(session: &Session, args: &BreakdownArgs) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    match session.api().expense_breakdown().await {
        Ok(entries) if args.json => print_json(&entries),
        Ok(entries) => {
            let grand = entries.iter().fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.total));
            println!("All expenses: {} spent", grand.round_dp(2));
            print_breakdown(&entries);
            EXIT_OK
        }
        Err(e) => fail(&e),
    }
}

fn print_breakdown(entries: &[BreakdownEntry]) {
    if entries.is_empty() {
        println!("No expenses.");
        return;
    }
    println!("{:<20} {:>12} {:>7}", "CATEGORY", "TOTAL", "SHARE");
    println!("{}", "-".repeat(41));
    for entry in entries {
        println!(
            "{:<20} {:>12} {:>6}%",
            entry.category,
            entry.total.round_dp(2).to_string(),
            entry.percentage_of_total.round_dp(1).to_string()
        );
    }
    if let Some(top) = aggregate::top_category(entries) {
        println!("Top category: {}", top.category);
    }
}
