// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tally` subcommands. Each returns a process exit code.

pub mod account;
pub mod records;
pub mod report;

use serde::Serialize;

use crate::config::Config;
use crate::error::ApiError;
use crate::session::Session;

pub const EXIT_OK: i32 = 0;
/// A request failed (transport, validation, or server error).
pub const EXIT_FAILURE: i32 = 1;
/// Bad arguments or configuration.
pub const EXIT_USAGE: i32 = 2;
/// The session is gone; the user has to log in again.
pub const EXIT_SESSION_ENDED: i32 = 3;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Log in and store the session tokens.
    Login(account::LoginArgs),
    /// Forget the stored session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// Create a new account.
    Register(account::RegisterArgs),
    /// Update profile fields.
    Profile(account::ProfileArgs),
    /// Delete the account and every record it owns.
    DeleteAccount(account::DeleteArgs),
    /// Manage expenses.
    Expenses(records::ExpenseArgs),
    /// Manage income.
    Income(records::IncomeArgs),
    /// Manage budgets.
    Budgets(records::BudgetArgs),
    /// List expense categories.
    Categories(records::ListArgs),
    /// Income and expense totals over recent days.
    Summary(report::SummaryArgs),
    /// Monthly expense report by category.
    Report(report::ReportArgs),
    /// Category breakdown of all expenses.
    Breakdown(report::BreakdownArgs),
}

impl Command {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            Self::Login(args) => args.validate(),
            Self::Register(args) => args.validate(),
            Self::Profile(args) => args.validate(),
            Self::DeleteAccount(args) => args.validate(),
            Self::Expenses(args) => args.validate(),
            Self::Income(args) => args.validate(),
            Self::Budgets(args) => args.validate(),
            Self::Categories(args) => args.validate(),
            Self::Summary(args) => args.validate(),
            Self::Report(args) => args.validate(),
            Self::Logout | Self::Whoami | Self::Breakdown(_) => Ok(()),
        }
    }
}

/// Run the selected subcommand against the configured backend.
pub async fn run(config: &Config) -> i32 {
    let session = match Session::open(&config.client) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {e:#}");
            return EXIT_USAGE;
        }
    };

    match &config.command {
        Command::Login(args) => account::login(&session, args).await,
        Command::Logout => account::logout(&session),
        Command::Whoami => account::whoami(&session).await,
        Command::Register(args) => account::register(&session, args).await,
        Command::Profile(args) => account::profile(&session, args).await,
        Command::DeleteAccount(_) => account::delete_account(&session).await,
        Command::Expenses(args) => records::expenses(&session, args).await,
        Command::Income(args) => records::income(&session, args).await,
        Command::Budgets(args) => records::budgets(&session, args).await,
        Command::Categories(args) => records::categories(&session, args).await,
        Command::Summary(args) => report::summary(&session, args).await,
        Command::Report(args) => report::report(&session, args).await,
        Command::Breakdown(args) => report::breakdown(&session, args).await,
    }
}

/// Print `err` and map it to an exit code.
pub(crate) fn fail(err: &ApiError) -> i32 {
    match err {
        ApiError::SessionEnded => {
            eprintln!("session expired; run `tally login`");
            EXIT_SESSION_ENDED
        }
        ApiError::Failure(detail) => {
            eprintln!("error: {detail}");
            EXIT_FAILURE
        }
    }
}

/// Commands that need a stored session bail out early without one.
pub(crate) fn require_login(session: &Session) -> Option<i32> {
    if session.is_authenticated() {
        None
    } else {
        eprintln!("not logged in; run `tally login`");
        Some(EXIT_SESSION_ENDED)
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_FAILURE
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
