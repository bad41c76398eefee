// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types of the tracker backend.

use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Login credentials. Used once per login call and never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), password: password.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /token` success body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// A dated, categorized monetary record (expense or income).
///
/// Expenses arrive as `{tid, item, cost, date, category}` and income as
/// `{id, amount, source, date}`; both decode into this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(alias = "tid")]
    pub id: i64,
    #[serde(alias = "cost")]
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(alias = "date")]
    pub occurred_at: NaiveDateTime,
    #[serde(default, alias = "item", alias = "source")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub category: String,
    pub limit: Decimal,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_date: Option<NaiveDateTime>,
}

fn default_period() -> String {
    "monthly".to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub profile_emoji: Option<String>,
}

impl UserProfile {
    /// Best human-readable name available.
    pub fn display_name(&self) -> String {
        match (&self.firstname, &self.lastname, &self.username) {
            (Some(first), Some(last), _) => format!("{first} {last}"),
            (Some(first), None, _) => first.clone(),
            (None, _, Some(username)) => username.clone(),
            _ => self.id.map(|id| format!("user #{id}")).unwrap_or_else(|| "unknown".to_owned()),
        }
    }
}

/// `PATCH /profile` responds with either the profile or `{message, user}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileEnvelope {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

impl ProfileEnvelope {
    pub(crate) fn into_profile(self) -> UserProfile {
        match self {
            Self::Wrapped { user } => user,
            Self::Bare(profile) => profile,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub gender: String,
    pub age: u32,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_emoji: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewExpense {
    pub item: String,
    pub cost: Decimal,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIncome {
    pub amount: Decimal,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBudget {
    pub category: String,
    pub limit: Decimal,
    pub period: String,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

/// Body of create/update/delete acknowledgements (`{message, id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub total_pages: u32,
    #[serde(default)]
    pub total_items: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// One page of a listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub metadata: PageMetadata,
}

/// Listing endpoints answer either with a [`Page`] or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paged(Page<T>),
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_page(self) -> Page<T> {
        match self {
            Self::Paged(page) => page,
            Self::Bare(data) => {
                let total = data.len() as u64;
                Page {
                    data,
                    metadata: PageMetadata {
                        total_pages: 1,
                        total_items: Some(total),
                        current_page: Some(1),
                        limit: None,
                    },
                }
            }
        }
    }
}

/// Pagination and ordering for listing calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
    pub sort: Option<ExpenseSort>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 20, sort: None }
    }
}

impl PageQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit, sort: None }
    }

    pub fn sorted(mut self, sort: ExpenseSort) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Server-side ordering of the expense listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExpenseSort {
    DateDesc,
    DateAsc,
    CostDesc,
    CostAsc,
}

impl ExpenseSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateDesc => "date_desc",
            Self::DateAsc => "date_asc",
            Self::CostDesc => "cost_desc",
            Self::CostAsc => "cost_asc",
        }
    }
}

/// `GET /me/summary` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net: Decimal,
    pub days: u32,
}

/// One server-aggregated row of a monthly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// `GET /me/reports/monthly` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    pub total_expense: Decimal,
    pub by_category: Vec<CategoryTotal>,
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month selected for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    month: u32,
    year: i32,
}

impl ReportPeriod {
    pub fn new(month: u32, year: i32) -> anyhow::Result<Self> {
        if !(1..=12).contains(&month) {
            anyhow::bail!("month must be between 1 and 12 (got {month})");
        }
        Ok(Self { month, year })
    }

    /// The current month on the local clock.
    pub fn current() -> Self {
        let now = chrono::Local::now();
        Self { month: now.month(), year: now.year() }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES.get(self.month as usize - 1).copied().unwrap_or("")
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
