// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: an in-process mock of the tracker backend and
//! client builders wired to it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, delete, get, patch, post};
use axum::{Form, Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::event::{SessionEvent, EVENT_CAPACITY};
use crate::request::{AuthClient, RefreshPhase};
use crate::token::{TokenPair, TokenStore};

pub const USERNAME: &str = "ada";
pub const PASSWORD: &str = "hunter2";

/// Assert that `$expr` is an `Err` whose message contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = format!("{err:#}");
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// How the mock answers `POST /refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshBehavior {
    /// Mint a new access token, keep the refresh token.
    Mint,
    /// Mint a new access token and rotate the refresh token.
    Rotate,
    /// Reject with this status.
    Reject(u16),
}

/// Mutable backend state shared with the test body.
pub struct MockState {
    access: Mutex<String>,
    refresh: Mutex<String>,
    minted: AtomicU32,
    pub behavior: Mutex<RefreshBehavior>,
    pub refresh_delay: Mutex<Duration>,
    /// Issue tokens from `/token` without a refresh token.
    pub omit_refresh_token: Mutex<bool>,
    pub refresh_calls: AtomicU32,
    pub token_calls: AtomicU32,
    pub always_401_calls: AtomicU32,
    pub failure_calls: AtomicU32,
    pub expense_pages: Mutex<Vec<u32>>,
    pub expenses: Mutex<Vec<Value>>,
    pub last_content_type: Mutex<Option<String>>,
    pub last_refresh_body: Mutex<Option<Value>>,
    pub deleted: Mutex<Vec<String>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            access: Mutex::new("access-0".to_owned()),
            refresh: Mutex::new("refresh-0".to_owned()),
            minted: AtomicU32::new(0),
            behavior: Mutex::new(RefreshBehavior::Mint),
            refresh_delay: Mutex::new(Duration::ZERO),
            omit_refresh_token: Mutex::new(false),
            refresh_calls: AtomicU32::new(0),
            token_calls: AtomicU32::new(0),
            always_401_calls: AtomicU32::new(0),
            failure_calls: AtomicU32::new(0),
            expense_pages: Mutex::new(Vec::new()),
            expenses: Mutex::new(Vec::new()),
            last_content_type: Mutex::new(None),
            last_refresh_body: Mutex::new(None),
            deleted: Mutex::new(Vec::new()),
        }
    }
}

impl MockState {
    /// The access token the backend currently accepts.
    pub fn valid_access(&self) -> String {
        self.access.lock().clone()
    }

    /// The refresh token the backend currently accepts.
    pub fn valid_refresh(&self) -> String {
        self.refresh.lock().clone()
    }

    /// Make every outstanding access token stale.
    pub fn expire_access(&self) {
        *self.access.lock() = "expired".to_owned();
    }

    pub fn set_behavior(&self, behavior: RefreshBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock() = delay;
    }

    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Seed `count` expenses with alternating categories.
    pub fn seed_expenses(&self, count: usize) {
        let mut expenses = self.expenses.lock();
        for i in 0..count {
            let category = match i % 3 {
                0 => json!("Food"),
                1 => json!("Rent"),
                _ => Value::Null,
            };
            expenses.push(json!({
                "tid": i + 1,
                "item": format!("item {i}"),
                "cost": 10 * (i + 1),
                "category": category,
                "date": "2026-03-14T09:30:00",
            }));
        }
    }

    fn mint(&self, rotate: bool) -> (String, String) {
        let n = self.minted.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("access-{n}");
        *self.access.lock() = access.clone();
        if rotate {
            *self.refresh.lock() = format!("refresh-{n}");
        }
        (access, self.valid_refresh())
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {}", state.access.lock());
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(detail(StatusCode::UNAUTHORIZED, "Could not validate credentials")),
    }
}

fn record_content_type(state: &MockState, headers: &HeaderMap) {
    *state.last_content_type.lock() =
        headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_owned);
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    record_content_type(&state, &headers);
    if form.username != USERNAME || form.password != PASSWORD {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password");
    }
    let (access, refresh) = state.mint(true);
    if *state.omit_refresh_token.lock() {
        return Json(json!({ "access_token": access, "token_type": "bearer" })).into_response();
    }
    Json(json!({ "access_token": access, "refresh_token": refresh, "token_type": "bearer" }))
        .into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_refresh_body.lock() = Some(body.clone());
    let delay = *state.refresh_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let behavior = *state.behavior.lock();
    if let RefreshBehavior::Reject(code) = behavior {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::UNAUTHORIZED);
        return detail(status, "Invalid refresh token");
    }
    if body.get("refresh_token").and_then(Value::as_str) != Some(state.valid_refresh().as_str()) {
        return detail(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }
    let (access, refresh) = state.mint(behavior == RefreshBehavior::Rotate);
    if behavior == RefreshBehavior::Rotate {
        Json(json!({ "access_token": access, "refresh_token": refresh })).into_response()
    } else {
        Json(json!({ "access_token": access })).into_response()
    }
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(json!({
        "id": 1,
        "username": USERNAME,
        "firstname": "Ada",
        "lastname": "Lovelace",
        "gender": "F",
        "age": 36,
        "profile_emoji": null,
    }))
    .into_response()
}

async fn update_profile(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    let firstname = body.get("firstname").cloned().unwrap_or(json!("Ada"));
    Json(json!({
        "message": "Profile updated successfully",
        "user": { "id": 1, "username": USERNAME, "firstname": firstname },
    }))
    .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body.get("username").and_then(Value::as_str) == Some(USERNAME) {
        return detail(StatusCode::BAD_REQUEST, "Username already registered");
    }
    (StatusCode::CREATED, Json(json!({ "message": "User registered", "id": 2 }))).into_response()
}

async fn delete_account(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    state.deleted.lock().push("account".to_owned());
    Json(json!({ "message": "Your account and all related data have been deleted successfully" }))
        .into_response()
}

async fn list_expenses(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1).max(1);
    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(20).max(1);
    state.expense_pages.lock().push(page as u32);

    let expenses = state.expenses.lock().clone();
    let total_items = expenses.len();
    let total_pages = total_items.div_ceil(limit);
    let data: Vec<Value> = expenses.into_iter().skip((page - 1) * limit).take(limit).collect();
    Json(json!({
        "metadata": {
            "total_items": total_items,
            "total_pages": total_pages,
            "current_page": page,
            "limit": limit,
        },
        "data": data,
    }))
    .into_response()
}

async fn create_record(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    uri: Uri,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    record_content_type(&state, &headers);
    let field = ["cost", "amount", "limit"].into_iter().find(|f| body.get(*f).is_some());
    let positive = field
        .and_then(|f| body.get(f))
        .and_then(Value::as_f64)
        .is_some_and(|value| value > 0.0);
    if !positive {
        let loc = field.unwrap_or("cost");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [
                { "loc": ["body", loc], "msg": "Input should be greater than 0" },
            ]})),
        )
            .into_response();
    }
    if collection(&uri) != "expenses" {
        return Json(json!({ "message": "Created", "id": 1 })).into_response();
    }
    let mut expenses = state.expenses.lock();
    let id = expenses.len() + 1;
    let mut stored = body;
    stored["tid"] = json!(id);
    if stored.get("date").is_none() {
        stored["date"] = json!("2026-03-14T09:30:00");
    }
    expenses.push(stored);
    Json(json!({ "message": "Expense added successfully", "id": id })).into_response()
}

/// First path segment, e.g. `expenses` for `/expenses/3`.
fn collection(uri: &Uri) -> String {
    uri.path().trim_start_matches('/').split('/').next().unwrap_or_default().to_owned()
}

async fn delete_record(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    let kind = collection(&uri);
    if id == 404 {
        return detail(StatusCode::NOT_FOUND, "Expense not found");
    }
    state.deleted.lock().push(format!("{kind}/{id}"));
    StatusCode::NO_CONTENT.into_response()
}

async fn update_record(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    let kind = collection(&uri);
    let mut updated = body;
    updated["id"] = json!(id);
    Json(json!({ "message": format!("{kind} updated"), "id": id, "record": updated }))
        .into_response()
}

async fn list_income(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(json!([
        { "id": 1, "amount": 2500, "source": "Salary", "date": "2026-03-01T00:00:00" },
        { "id": 2, "amount": 120.5, "source": "Refund", "date": "2026-03-09T00:00:00" },
    ]))
    .into_response()
}

async fn list_budgets(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(json!([
        { "id": 1, "category": "Food", "limit": 300, "period": "monthly",
          "start_date": null, "end_date": null },
    ]))
    .into_response()
}

async fn list_categories(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(json!({
        "metadata": { "total_items": 2, "total_pages": 1, "current_page": 1, "limit": 20 },
        "data": [{ "id": 1, "name": "Food" }, { "id": 2, "name": "Rent" }],
    }))
    .into_response()
}

async fn summary(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    let days: u32 = params.get("days").and_then(|d| d.parse().ok()).unwrap_or(30);
    Json(json!({ "total_income": 2620.5, "total_expenses": 1200, "net": 1420.5, "days": days }))
        .into_response()
}

async fn monthly_report(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    let month: Option<u32> = params.get("month").and_then(|m| m.parse().ok());
    let year: Option<i32> = params.get("year").and_then(|y| y.parse().ok());
    if month.is_none() || year.is_none() {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "month and year are required");
    }
    Json(json!({
        "month": month,
        "year": year,
        "total_expense": 1000,
        "by_category": [
            { "category": "Rent", "total": 600 },
            { "category": "Food", "total": 250 },
            { "category": "Fun", "total": 150 },
        ],
    }))
    .into_response()
}

async fn always_401(State(state): State<Arc<MockState>>) -> Response {
    state.always_401_calls.fetch_add(1, Ordering::SeqCst);
    detail(StatusCode::UNAUTHORIZED, "Not authenticated")
}

/// Echo method, query, body, and selected headers back as JSON.
async fn echo(
    State(state): State<Arc<MockState>>,
    method: axum::http::Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "body": body,
        "content_type": header("content-type"),
        "x_trace": header("x-trace"),
    }))
    .into_response()
}

/// Whether the request carried any bearer token, without validating it.
async fn bearer_probe(headers: HeaderMap) -> Response {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
    Json(json!({ "authorization": auth })).into_response()
}

async fn fail(State(state): State<Arc<MockState>>, Path(code): Path<u16>) -> Response {
    state.failure_calls.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    detail(status, &format!("failure {code}"))
}

async fn fail_text(State(state): State<Arc<MockState>>) -> Response {
    state.failure_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::BAD_GATEWAY, "<html>upstream down</html>").into_response()
}

async fn empty(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    StatusCode::NO_CONTENT.into_response()
}

pub fn build_router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/token", post(token))
        .route("/refresh", post(refresh))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/profile", patch(update_profile))
        .route("/account", delete(delete_account))
        .route("/me/expenses", get(list_expenses))
        .route("/me/income", get(list_income))
        .route("/me/budgets", get(list_budgets))
        .route("/me/categories", get(list_categories))
        .route("/me/summary", get(summary))
        .route("/me/reports/monthly", get(monthly_report))
        .route("/expenses", post(create_record))
        .route("/income", post(create_record))
        .route("/budgets", post(create_record))
        .route("/expenses/{id}", patch(update_record).delete(delete_record))
        .route("/income/{id}", patch(update_record).delete(delete_record))
        .route("/budgets/{id}", patch(update_record).delete(delete_record))
        .route("/always-401", any(always_401))
        .route("/echo", any(echo))
        .route("/bearer", get(bearer_probe))
        .route("/fail/{code}", any(fail))
        .route("/fail-text", get(fail_text))
        .route("/empty", any(empty))
        .with_state(state)
}

/// A running mock backend.
pub struct MockBackend {
    pub state: Arc<MockState>,
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockState::default());
        let router = build_router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self { state, base_url: format!("http://{addr}"), handle })
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_base_url(self.base_url.clone())
    }

    /// A client whose store already holds the backend's current pair.
    pub fn logged_in_client(&self) -> anyhow::Result<(AuthClient, broadcast::Receiver<SessionEvent>)> {
        let tokens = Arc::new(TokenStore::in_memory());
        tokens.set(TokenPair::new(self.state.valid_access(), self.state.valid_refresh()));
        self.client_with(tokens)
    }

    /// Log in against `/token` out of band and return the issued pair.
    pub async fn issue_pair(&self) -> anyhow::Result<TokenPair> {
        crate::ensure_crypto();
        let resp: Value = reqwest::Client::new()
            .post(format!("{}/token", self.base_url))
            .form(&[("username", USERNAME), ("password", PASSWORD)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let access = resp.get("access_token").and_then(Value::as_str).unwrap_or_default();
        let refresh = resp.get("refresh_token").and_then(Value::as_str).unwrap_or_default();
        Ok(TokenPair::new(access, refresh))
    }

    pub fn client_with(
        &self,
        tokens: Arc<TokenStore>,
    ) -> anyhow::Result<(AuthClient, broadcast::Receiver<SessionEvent>)> {
        let (tx, rx) = broadcast::channel(EVENT_CAPACITY);
        let client = AuthClient::new(&self.config(), tokens, tx)?;
        Ok((client, rx))
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drain every event currently buffered on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait until the client's refresh gate has settled back to `Idle`.
pub async fn wait_for_idle(client: &AuthClient) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while client.phase() != RefreshPhase::Idle {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}
