// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed endpoints of the tracker backend.
//!
//! Every call goes through [`AuthClient::request`], so each one inherits the
//! refresh protocol. Results are `Result<T, ApiError>`; an
//! [`ApiError::SessionEnded`] means the caller must send the user to login.

use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::aggregate::{self, BreakdownEntry};
use crate::error::{ApiError, ErrorKind, FailureDetail};
use crate::model::{
    Ack, Budget, Category, Listing, MonthlyReport, NewBudget, NewExpense, NewIncome, Page,
    PageQuery, ProfileEnvelope, ProfileUpdate, Record, Registration, ReportPeriod, Summary,
    UserProfile,
};
use crate::request::{ApiRequest, AuthClient};

/// Page size used when walking a whole listing.
pub const SCAN_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct FinanceApi {
    client: AuthClient,
}

impl FinanceApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    async fn fetch<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ApiError> {
        self.client.request(&req).await.into_json()
    }

    async fn send(&self, req: ApiRequest) -> Result<(), ApiError> {
        self.client.request(&req).await.into_unit()
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: PageQuery,
    ) -> Result<Page<T>, ApiError> {
        let mut req = ApiRequest::get(path).query("page", query.page).query("limit", query.limit);
        if let Some(sort) = query.sort {
            req = req.query("sort", sort.as_str());
        }
        let listing: Listing<T> = self.fetch(req).await?;
        Ok(listing.into_page())
    }

    // -- Account ------------------------------------------------------------

    pub async fn register(&self, registration: &Registration) -> Result<Ack, ApiError> {
        self.fetch(ApiRequest::post("/register").json(body(registration)?)).await
    }

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.fetch(ApiRequest::get("/me")).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let envelope: ProfileEnvelope =
            self.fetch(ApiRequest::patch("/profile").json(body(update)?)).await?;
        Ok(envelope.into_profile())
    }

    /// Delete the account and all of its records.
    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.send(ApiRequest::delete("/account")).await
    }

    // -- Expenses -----------------------------------------------------------

    pub async fn expenses(&self, query: PageQuery) -> Result<Page<Record>, ApiError> {
        self.list("/me/expenses", query).await
    }

    pub async fn create_expense(&self, expense: &NewExpense) -> Result<Ack, ApiError> {
        self.fetch(ApiRequest::post("/expenses").json(body(expense)?)).await
    }

    pub async fn update_expense(&self, id: i64, expense: &NewExpense) -> Result<Ack, ApiError> {
        self.fetch(ApiRequest::patch(format!("/expenses/{id}")).json(body(expense)?)).await
    }

    pub async fn delete_expense(&self, id: i64) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(format!("/expenses/{id}"))).await
    }

    /// Every expense, walking all pages. Pages after the first are fetched
    /// concurrently.
    pub async fn all_expenses(&self) -> Result<Vec<Record>, ApiError> {
        let first = self.expenses(PageQuery::new(1, SCAN_PAGE_SIZE)).await?;
        let total_pages = first.metadata.total_pages;
        let mut records = first.data;
        if total_pages <= 1 {
            return Ok(records);
        }

        tracing::debug!(total_pages, "fetching remaining expense pages");
        let rest = join_all(
            (2..=total_pages).map(|page| self.expenses(PageQuery::new(page, SCAN_PAGE_SIZE))),
        )
        .await;
        for page in rest {
            records.extend(page?.data);
        }
        Ok(records)
    }

    // -- Income -------------------------------------------------------------

    pub async fn income(&self, query: PageQuery) -> Result<Page<Record>, ApiError> {
        self.list("/me/income", query).await
    }

    pub async fn create_income(&self, income: &NewIncome) -> Result<Ack, ApiError> {
        self.fetch(ApiRequest::post("/income").json(body(income)?)).await
    }

    pub async fn update_income(&self, id: i64, income: &NewIncome) -> Result<Ack, ApiError> {
        self.fetch(ApiRequest::patch(format!("/income/{id}")).json(body(income)?)).await
    }

    pub async fn delete_income(&self, id: i64) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(format!("/income/{id}"))).await
    }

    // -- Budgets ------------------------------------------------------------

    pub async fn budgets(&self, query: PageQuery) -> Result<Page<Budget>, ApiError> {
        self.list("/me/budgets", query).await
    }

    pub async fn create_budget(&self, budget: &NewBudget) -> Result<Ack, ApiError> {
        self.fetch(ApiRequest::post("/budgets").json(body(budget)?)).await
    }

    pub async fn update_budget(&self, id: i64, budget: &NewBudget) -> Result<Ack, ApiError> {
        self.fetch(ApiRequest::patch(format!("/budgets/{id}")).json(body(budget)?)).await
    }

    pub async fn delete_budget(&self, id: i64) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(format!("/budgets/{id}"))).await
    }

    pub async fn categories(&self, query: PageQuery) -> Result<Page<Category>, ApiError> {
        self.list("/me/categories", query).await
    }

    // -- Reports ------------------------------------------------------------

    /// Income/expense totals over the trailing `days` (server default when `None`).
    pub async fn summary(&self, days: Option<u32>) -> Result<Summary, ApiError> {
        let mut req = ApiRequest::get("/me/summary");
        if let Some(days) = days {
            req = req.query("days", days);
        }
        self.fetch(req).await
    }

    pub async fn monthly_report(&self, period: ReportPeriod) -> Result<MonthlyReport, ApiError> {
        self.fetch(
            ApiRequest::get("/me/reports/monthly")
                .query("month", period.month())
                .query("year", period.year()),
        )
        .await
    }

    /// Ranked category breakdown of one month, from the server's totals.
    pub async fn monthly_breakdown(
        &self,
        period: ReportPeriod,
    ) -> Result<Vec<BreakdownEntry>, ApiError> {
        let report = self.monthly_report(period).await?;
        Ok(aggregate::breakdown(&aggregate::totals_from(&report.by_category)))
    }

    /// Ranked category breakdown of every expense, aggregated client-side.
    pub async fn expense_breakdown(&self) -> Result<Vec<BreakdownEntry>, ApiError> {
        let records = self.all_expenses().await?;
        Ok(aggregate::breakdown(&aggregate::sum_by_category(&records)))
    }
}

fn body<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        ApiError::Failure(FailureDetail {
            kind: ErrorKind::Decode,
            status: None,
            message: e.to_string(),
        })
    })
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
