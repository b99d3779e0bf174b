// REST handlers
//
// Thin wrappers over StoreApi; the dispatcher and chat endpoints expose the
// function-calling layer.

use super::auth::verify_credentials;
use super::{blocking, jwt, AppState, HttpError};
use crate::advisory::{RefinanceOptions, RestructuringGoal, RestructuringPlan};
use crate::analytics::{AnalysisPeriod, LoanSummary, PaymentPatterns};
use crate::api::{ActiveLoan, LoanDetails, LoanStatusView};
use crate::chat::ChatMessage;
use crate::context::RequestContext;
use crate::entities::{Borrower, Collateral, Equipment, Loan, Payment};
use crate::error::DispatchError;
use crate::forecast::{
    CropSeason, CropYieldAssessment, ForecastHorizon, MaintenanceForecast, MarketImpact,
};
use crate::risk::{
    CollateralAssessment, DefaultRiskAssessment, FarmersAtRisk, HighRiskFarmers,
    MarketConditions, NonAccrualAssessment, RiskLevel, Season, TimeHorizon,
};
use crate::VERSION;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

type ApiResult<T> = Result<Json<T>, HttpError>;

// ============================================================================
// Health
// ============================================================================

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// POST /api/auth/login
pub async fn login(State(state): State<AppState>, body: Option<Json<Value>>) -> Response {
    let Some(secret) = state.auth.jwt_secret().map(str::to_string) else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Login is not available",
                "details": "JWT_SECRET is not configured",
            })),
        )
            .into_response();
    };

    let request = body
        .and_then(|Json(v)| serde_json::from_value::<LoginRequest>(v).ok())
        .filter(|r| !r.username.trim().is_empty() && !r.password.is_empty());
    let Some(request) = request else {
        return HttpError::BadRequest("Username and password are required".to_string()).into_response();
    };

    // Argon2 verification is deliberately slow
    let auth = state.auth.clone();
    let username = request.username.clone();
    let verified = tokio::task::spawn_blocking(move || {
        verify_credentials(&auth, &request.username, &request.password).cloned()
    })
    .await;

    let user = match verified {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(username = %username, "login rejected");
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid credentials" }))).into_response();
        }
        Err(e) => return HttpError::Task(e).into_response(),
    };

    let claims = jwt::Claims::for_user(&user, state.auth.token_ttl_secs);
    match jwt::issue(&secret, &claims) {
        Ok(token) => {
            info!(user_id = %user.id, "login succeeded");
            Json(json!({
                "success": true,
                "user": { "id": user.id, "username": user.username, "role": user.role },
                "accessToken": token,
                "expiresIn": state.auth.token_ttl_secs,
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to sign access token");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "Internal server error" }))).into_response()
        }
    }
}

// ============================================================================
// Borrowers
// ============================================================================

/// GET /api/borrowers
pub async fn list_borrowers(State(state): State<AppState>) -> ApiResult<Vec<Borrower>> {
    Ok(Json(blocking(&state, |api| api.borrowers()).await?))
}

/// GET /api/borrowers/:id
pub async fn get_borrower(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Borrower> {
    Ok(Json(blocking(&state, move |api| api.borrower(&id)).await?))
}

/// GET /api/borrowers/:id/loans
pub async fn borrower_loans(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Loan>> {
    Ok(Json(blocking(&state, move |api| api.borrower_loans(&id)).await?))
}

/// GET /api/borrowers/:id/equipment
pub async fn borrower_equipment(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Equipment>> {
    Ok(Json(blocking(&state, move |api| api.borrower_equipment(&id)).await?))
}

// ============================================================================
// Loans
// ============================================================================

/// GET /api/loans
pub async fn list_loans(State(state): State<AppState>) -> ApiResult<Vec<Loan>> {
    Ok(Json(blocking(&state, |api| api.loans()).await?))
}

/// GET /api/loans/active
pub async fn active_loans(State(state): State<AppState>) -> ApiResult<Vec<ActiveLoan>> {
    Ok(Json(blocking(&state, |api| api.active_loans()).await?))
}

/// GET /api/loans/summary
pub async fn loan_summary(State(state): State<AppState>) -> ApiResult<LoanSummary> {
    Ok(Json(blocking(&state, |api| api.loan_summary()).await?))
}

/// GET /api/loans/:id
pub async fn get_loan(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<LoanDetails> {
    Ok(Json(blocking(&state, move |api| api.loan_details(&id)).await?))
}

/// GET /api/loans/:id/status
pub async fn loan_status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<LoanStatusView> {
    Ok(Json(blocking(&state, move |api| api.loan_status(&id)).await?))
}

/// GET /api/loans/:id/payments
pub async fn loan_payments(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Payment>> {
    Ok(Json(blocking(&state, move |api| api.loan_payments(&id)).await?))
}

/// GET /api/loans/:id/collateral
pub async fn loan_collateral(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Collateral>> {
    Ok(Json(blocking(&state, move |api| api.loan_collateral(&id)).await?))
}

// ============================================================================
// Risk & analytics
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RiskQuery {
    time_horizon: Option<String>,
    market_conditions: Option<String>,
    period: Option<String>,
    crop_type: Option<String>,
    season: Option<String>,
    risk_level: Option<String>,
    goal: Option<String>,
    /// Comma-separated
    commodities: Option<String>,
}

impl RiskQuery {
    fn crop_type(&self) -> Option<String> {
        self.crop_type
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }

    fn commodities(&self) -> Vec<String> {
        self.commodities
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

/// Parse an optional query value; None when absent or blank
fn parse_optional<T>(raw: Option<&str>, key: &str, parse: fn(&str) -> Option<T>) -> Result<Option<T>, HttpError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => parse(value)
            .map(Some)
            .ok_or_else(|| HttpError::BadRequest(format!("Invalid {}: {}", key, value))),
    }
}

/// Parse an optional query value, falling back to the default when absent
fn parse_query<T: Default>(raw: Option<&str>, key: &str, parse: fn(&str) -> Option<T>) -> Result<T, HttpError> {
    Ok(parse_optional(raw, key, parse)?.unwrap_or_default())
}

/// GET /api/risk/default/:borrower_id?time_horizon=
pub async fn default_risk(
    State(state): State<AppState>,
    Path(borrower_id): Path<String>,
    Query(query): Query<RiskQuery>,
) -> ApiResult<DefaultRiskAssessment> {
    let horizon = parse_query(query.time_horizon.as_deref(), "time_horizon", TimeHorizon::parse)?;
    Ok(Json(blocking(&state, move |api| api.default_risk(&borrower_id, horizon)).await?))
}

/// GET /api/risk/non-accrual/:borrower_id
pub async fn non_accrual_risk(
    State(state): State<AppState>,
    Path(borrower_id): Path<String>,
) -> ApiResult<NonAccrualAssessment> {
    Ok(Json(blocking(&state, move |api| api.non_accrual_risk(&borrower_id)).await?))
}

/// GET /api/risk/collateral/:loan_id?market_conditions=
pub async fn collateral_sufficiency(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
    Query(query): Query<RiskQuery>,
) -> ApiResult<CollateralAssessment> {
    let market = parse_query(
        query.market_conditions.as_deref(),
        "market_conditions",
        MarketConditions::parse,
    )?;
    Ok(Json(blocking(&state, move |api| api.collateral_sufficiency(&loan_id, market)).await?))
}

/// GET /api/risk/high-risk-farmers
pub async fn high_risk_farmers(State(state): State<AppState>) -> ApiResult<HighRiskFarmers> {
    Ok(Json(blocking(&state, |api| api.high_risk_farmers()).await?))
}

/// GET /api/risk/farmers-at-risk?crop_type=&season=&risk_level=
pub async fn farmers_at_risk(State(state): State<AppState>, Query(query): Query<RiskQuery>) -> ApiResult<FarmersAtRisk> {
    let season = parse_optional(query.season.as_deref(), "season", Season::parse)?;
    let min_level = parse_optional(query.risk_level.as_deref(), "risk_level", RiskLevel::parse)?.unwrap_or(RiskLevel::High);
    let crop_type = query.crop_type();
    Ok(Json(
        blocking(&state, move |api| api.farmers_at_risk(crop_type.as_deref(), season, min_level)).await?,
    ))
}

/// GET /api/analytics/payment-patterns/:borrower_id?period=
pub async fn payment_patterns(
    State(state): State<AppState>,
    Path(borrower_id): Path<String>,
    Query(query): Query<RiskQuery>,
) -> ApiResult<PaymentPatterns> {
    let period = parse_query(query.period.as_deref(), "period", AnalysisPeriod::parse)?;
    Ok(Json(blocking(&state, move |api| api.payment_patterns(&borrower_id, period)).await?))
}

/// GET /api/analytics/recommendations/refinance/:loan_id
pub async fn refinance_options(State(state): State<AppState>, Path(loan_id): Path<String>) -> ApiResult<RefinanceOptions> {
    Ok(Json(blocking(&state, move |api| api.refinance_options(&loan_id)).await?))
}

/// GET /api/analytics/restructure/:loan_id?goal=
pub async fn loan_restructuring(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
    Query(query): Query<RiskQuery>,
) -> ApiResult<RestructuringPlan> {
    let goal = parse_query(query.goal.as_deref(), "goal", RestructuringGoal::parse)?;
    Ok(Json(blocking(&state, move |api| api.restructuring_options(&loan_id, goal)).await?))
}

/// GET /api/analytics/equipment/forecast/:borrower_id?time_horizon=
pub async fn equipment_forecast(
    State(state): State<AppState>,
    Path(borrower_id): Path<String>,
    Query(query): Query<RiskQuery>,
) -> ApiResult<MaintenanceForecast> {
    let horizon = parse_query(query.time_horizon.as_deref(), "time_horizon", ForecastHorizon::parse)?;
    Ok(Json(blocking(&state, move |api| api.equipment_forecast(&borrower_id, horizon)).await?))
}

/// GET /api/analytics/crop-yield/:borrower_id?crop_type=&season=
pub async fn crop_yield_risk(
    State(state): State<AppState>,
    Path(borrower_id): Path<String>,
    Query(query): Query<RiskQuery>,
) -> ApiResult<CropYieldAssessment> {
    let season = parse_query(query.season.as_deref(), "season", CropSeason::parse)?;
    let crop_type = query.crop_type();
    Ok(Json(
        blocking(&state, move |api| api.crop_yield_risk(&borrower_id, crop_type.as_deref(), season)).await?,
    ))
}

/// GET /api/analytics/market-impact/:borrower_id?commodities=corn,soybeans
pub async fn market_impact(
    State(state): State<AppState>,
    Path(borrower_id): Path<String>,
    Query(query): Query<RiskQuery>,
) -> ApiResult<MarketImpact> {
    let commodities = query.commodities();
    Ok(Json(
        blocking(&state, move |api| {
            let names: Vec<&str> = commodities.iter().map(String::as_str).collect();
            api.market_impact(&borrower_id, &names)
        })
        .await?,
    ))
}

// ============================================================================
// Function calling
// ============================================================================

/// GET /api/functions
pub async fn list_functions(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(state.dispatcher.registry().schemas())
}

/// POST /api/functions/:name
pub async fn call_function(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> Response {
    let args = body.map(|Json(v)| v).unwrap_or(Value::Null);

    match state.dispatcher.dispatch_blocking(&ctx, &name, &args).await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(err) => {
            let status = match err {
                DispatchError::UnknownFunction { .. } | DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
                DispatchError::Validation { .. } => StatusCode::BAD_REQUEST,
                DispatchError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(err.to_payload(&name))).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Option<Json<Value>>,
) -> Response {
    let Some(orchestrator) = state.chat.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Chat is not available",
                "details": "OPENAI_API_KEY is not configured",
            })),
        )
            .into_response();
    };

    let request = body
        .map(|Json(v)| v)
        .and_then(|v| serde_json::from_value::<ChatRequest>(v).ok())
        .filter(|r| !r.messages.is_empty());
    let Some(request) = request else {
        return HttpError::BadRequest("Invalid request format. Messages array is required.".to_string())
            .into_response();
    };

    info!(request_id = %ctx.request_id, messages = request.messages.len(), "chat turn");
    match orchestrator.respond(&ctx, request.messages).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(err) => {
            error!(request_id = %ctx.request_id, error = %err, "chat completion failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Chat completion failed", "details": err.to_string() })),
            )
                .into_response()
        }
    }
}
