// Split Ledger - Web Server
// JSON API over the month ledgers, balances and history

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

use split_ledger::{
    logging, settlement_report, share_url, AppConfig, BalanceEngine, Expense, ExpenseDraft,
    ExpenseFilter, ExpensePatch, LedgerStore, MonthHistory, MonthLedger, MonthToken, Removal,
    SaveOutcome, Session, SplitError, SqliteStore, Summary,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    ledgers: Arc<Mutex<LedgerStore<SqliteStore>>>,
    config: Arc<AppConfig>,
}

impl AppState {
    fn ledgers(&self) -> Result<MutexGuard<'_, LedgerStore<SqliteStore>>, ApiError> {
        self.ledgers
            .lock()
            .map_err(|_| ApiError::internal("ledger store lock poisoned"))
    }

    fn engine(&self) -> BalanceEngine {
        BalanceEngine::with_tolerance(self.config.tolerance)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<SplitError> for ApiError {
    fn from(err: SplitError) -> Self {
        let status = match err {
            SplitError::UnknownPerson(_) | SplitError::ExpenseNotFound(_) => StatusCode::NOT_FOUND,
            SplitError::DuplicatePerson(_) => StatusCode::CONFLICT,
            SplitError::LoginRejected(_) => StatusCode::UNAUTHORIZED,
            SplitError::InvalidExpense(_)
            | SplitError::InvalidMonthToken(_)
            | SplitError::BlankName => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<SplitError>() {
            Ok(split) => split.into(),
            Err(err) => {
                error!("Request failed: {:#}", err);
                Self::internal(format!("{:#}", err))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn parse_month(month: &str) -> Result<MonthToken, ApiError> {
    Ok(MonthToken::parse(month)?)
}

/// Persist a changed ledger; a skipped save still answers with the ledger
fn save(
    ledgers: &mut LedgerStore<SqliteStore>,
    month: MonthToken,
    ledger: &MonthLedger,
) -> Result<(), ApiError> {
    if ledgers.save_month(month, ledger)? == SaveOutcome::Skipped {
        info!("Left {} untouched: empty ledger over existing data", month);
    }
    Ok(())
}

// ============================================================================
// Request / Response bodies
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MonthsResponse {
    months: Vec<MonthToken>,
    /// Month a fresh client should open
    initial: MonthToken,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpenseQuery {
    paid_by: Option<String>,
    split_with: Option<String>,
}

impl From<ExpenseQuery> for ExpenseFilter {
    fn from(query: ExpenseQuery) -> Self {
        match (query.paid_by, query.split_with) {
            (Some(person), _) => ExpenseFilter::PaidBy(person),
            (None, Some(person)) => ExpenseFilter::SplitWith(person),
            (None, None) => ExpenseFilter::All,
        }
    }
}

#[derive(Deserialize)]
struct PersonBody {
    name: String,
}

#[derive(Deserialize)]
struct LoginBody {
    name: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    message: String,
    share_url: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/months - Months with stored data, newest first
async fn list_months(State(state): State<AppState>) -> ApiResult<MonthsResponse> {
    let ledgers = state.ledgers()?;
    let months = ledgers.list_months()?;
    let initial = ledgers.initial_month(Utc::now().date_naive())?;
    ok(MonthsResponse { months, initial })
}

/// GET /api/months/:month - People and expenses (inherited roster if new)
async fn get_month(State(state): State<AppState>, Path(month): Path<String>) -> ApiResult<MonthLedger> {
    let month = parse_month(&month)?;
    let ledger = state.ledgers()?.load_month(month)?;
    ok(ledger)
}

/// GET /api/months/:month/summary
async fn get_summary(State(state): State<AppState>, Path(month): Path<String>) -> ApiResult<Summary> {
    let month = parse_month(&month)?;
    let ledger = state.ledgers()?.load_month(month)?;
    ok(state.engine().compute_summary(&ledger.people, &ledger.expenses)?)
}

/// GET /api/months/:month/expenses?paidBy=..|splitWith=..
async fn list_expenses(
    State(state): State<AppState>,
    Path(month): Path<String>,
    Query(query): Query<ExpenseQuery>,
) -> ApiResult<Vec<Expense>> {
    let month = parse_month(&month)?;
    let ledger = state.ledgers()?.load_month(month)?;
    let filter = ExpenseFilter::from(query);
    ok(ledger.filter_expenses(&filter).into_iter().cloned().collect())
}

/// POST /api/months/:month/expenses
async fn add_expense(
    State(state): State<AppState>,
    Path(month): Path<String>,
    Json(draft): Json<ExpenseDraft>,
) -> Result<(StatusCode, Json<ApiResponse<Expense>>), ApiError> {
    let month = parse_month(&month)?;
    let today = Utc::now().date_naive();
    let default_day = if month.contains(today) { today } else { month.first_day() };

    let mut ledgers = state.ledgers()?;
    let mut ledger = ledgers.load_month(month)?;
    let expense = ledger.add_expense(&draft, default_day)?.clone();
    save(&mut ledgers, month, &ledger)?;

    info!("Added expense {} to {}", expense.id, month);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(expense))))
}

/// PUT /api/months/:month/expenses/:id
async fn edit_expense(
    State(state): State<AppState>,
    Path((month, id)): Path<(String, String)>,
    Json(patch): Json<ExpensePatch>,
) -> ApiResult<Expense> {
    let month = parse_month(&month)?;
    let mut ledgers = state.ledgers()?;
    let mut ledger = ledgers.load_month(month)?;
    let expense = ledger.edit_expense(&id, patch)?.clone();
    save(&mut ledgers, month, &ledger)?;
    ok(expense)
}

/// DELETE /api/months/:month/expenses/:id
async fn delete_expense(
    State(state): State<AppState>,
    Path((month, id)): Path<(String, String)>,
) -> ApiResult<String> {
    let month = parse_month(&month)?;
    let mut ledgers = state.ledgers()?;
    let mut ledger = ledgers.load_month(month)?;

    if !ledger.remove_expense(&id) {
        return Err(SplitError::ExpenseNotFound(id).into());
    }
    save(&mut ledgers, month, &ledger)?;
    ok(id)
}

/// POST /api/months/:month/people
async fn add_person(
    State(state): State<AppState>,
    Path(month): Path<String>,
    Json(body): Json<PersonBody>,
) -> ApiResult<MonthLedger> {
    let month = parse_month(&month)?;
    let mut ledgers = state.ledgers()?;
    let mut ledger = ledgers.load_month(month)?;

    ledger.try_add_person(&body.name)?;
    save(&mut ledgers, month, &ledger)?;
    ok(ledger)
}

/// PUT /api/months/:month/people/:name - rename
async fn rename_person(
    State(state): State<AppState>,
    Path((month, name)): Path<(String, String)>,
    Json(body): Json<PersonBody>,
) -> ApiResult<MonthLedger> {
    let month = parse_month(&month)?;
    let mut ledgers = state.ledgers()?;
    let mut ledger = ledgers.load_month(month)?;

    if ledger.rename_person(&name, &body.name)? {
        save(&mut ledgers, month, &ledger)?;

        let mut session = Session::load(ledgers.store())?;
        session.on_person_renamed(&name, body.name.trim());
        session.save(ledgers.store_mut())?;
    }
    ok(ledger)
}

/// DELETE /api/months/:month/people/:name
async fn remove_person(
    State(state): State<AppState>,
    Path((month, name)): Path<(String, String)>,
) -> ApiResult<Removal> {
    let month = parse_month(&month)?;
    let mut ledgers = state.ledgers()?;
    let mut ledger = ledgers.load_month(month)?;

    let removal = ledger.remove_person(&name)?;
    save(&mut ledgers, month, &ledger)?;

    let mut session = Session::load(ledgers.store())?;
    session.on_person_removed(&name);
    session.save(ledgers.store_mut())?;

    ok(removal)
}

/// GET /api/months/:month/report - Shareable settlement message
async fn get_report(State(state): State<AppState>, Path(month): Path<String>) -> ApiResult<ReportResponse> {
    let month = parse_month(&month)?;
    let ledger = state.ledgers()?.load_month(month)?;
    let summary = state.engine().compute_summary(&ledger.people, &ledger.expenses)?;

    let message = settlement_report(&ledger.expenses, &summary, &state.config.payee);
    let share_url = share_url(&message);
    ok(ReportResponse { message, share_url })
}

/// GET /api/history - Every stored month, newest first
async fn get_history(State(state): State<AppState>) -> ApiResult<Vec<MonthHistory>> {
    let history = state.ledgers()?.history()?;
    ok(history)
}

/// GET /api/session
async fn get_session(State(state): State<AppState>) -> ApiResult<Session> {
    let session = Session::load(state.ledgers()?.store())?;
    ok(session)
}

/// POST /api/session/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> ApiResult<Session> {
    let mut ledgers = state.ledgers()?;
    let month = ledgers.initial_month(Utc::now().date_naive())?;
    let ledger = ledgers.load_month(month)?;

    let mut session = Session::default();
    session.login(&ledger.people, &body.name, &body.password)?;
    session.save(ledgers.store_mut())?;
    ok(session)
}

/// POST /api/session/logout
async fn logout(State(state): State<AppState>) -> ApiResult<Session> {
    let mut ledgers = state.ledgers()?;
    let mut session = Session::load(ledgers.store())?;
    session.logout();
    session.save(ledgers.store_mut())?;
    ok(session)
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/months", get(list_months))
        .route("/months/:month", get(get_month))
        .route("/months/:month/summary", get(get_summary))
        .route("/months/:month/report", get(get_report))
        .route("/months/:month/expenses", get(list_expenses).post(add_expense))
        .route(
            "/months/:month/expenses/:id",
            put(edit_expense).delete(delete_expense),
        )
        .route("/months/:month/people", post(add_person))
        .route(
            "/months/:month/people/:name",
            put(rename_person).delete(remove_person),
        )
        .route("/history", get(get_history))
        .route("/session", get(get_session))
        .route("/session/login", post(login))
        .route("/session/logout", post(logout))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.log_level);

    println!("🌐 Split Ledger - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = SqliteStore::open(&config.storage_path)?;
    let ledgers = LedgerStore::open(store, config.default_roster.clone(), Utc::now().date_naive())?;
    println!("✓ Store opened: {}", config.storage_path.display());

    let addr = config.server_addr.clone();
    let state = AppState {
        ledgers: Arc::new(Mutex::new(ledgers)),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/months", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
