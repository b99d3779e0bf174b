// 🌐 HTTP API - axum router over the internal API, dispatcher and chat
//
// /api/health and /api/auth/login are public. Everything else goes through
// require_auth, which attaches the RequestContext the dispatcher logs under.

pub mod auth;
pub mod jwt;
pub mod routes;

use crate::api::{InternalApi, StoreApi};
use crate::chat::{ChatError, ChatOrchestrator, OpenAiClient};
use crate::config::{AppConfig, AuthConfig};
use crate::dispatcher::Dispatcher;
use crate::error::{ApiError, UPSTREAM_DETAILS};
use crate::registry::FunctionRegistry;
use crate::store::DataStore;
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<StoreApi>,
    pub dispatcher: Dispatcher,
    pub chat: Option<Arc<ChatOrchestrator>>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(api: StoreApi, auth: AuthConfig) -> Self {
        let api = Arc::new(api);
        let internal: Arc<dyn InternalApi> = api.clone();
        let dispatcher = Dispatcher::new(Arc::new(FunctionRegistry::new()), internal);

        AppState {
            api,
            dispatcher,
            chat: None,
            auth: Arc::new(auth),
        }
    }

    pub fn with_chat(mut self, chat: ChatOrchestrator) -> Self {
        self.chat = Some(Arc::new(chat));
        self
    }

    /// Build the state from configuration; chat stays off without an API key
    pub fn from_config(config: &AppConfig) -> Result<Self, ChatError> {
        let api = StoreApi::new(DataStore::new(&config.server.data_dir));
        let state = AppState::new(api, config.auth.clone());

        if !config.openai.is_configured() {
            info!("OPENAI_API_KEY not set, /api/chat disabled");
            return Ok(state);
        }

        let client = OpenAiClient::from_config(&config.openai)?;
        info!(model = %client.model(), "chat enabled");
        let orchestrator = ChatOrchestrator::new(Arc::new(client), state.dispatcher.clone());
        Ok(state.with_chat(orchestrator))
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum HttpError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    BadRequest(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            HttpError::Api(err) if err.is_not_found() => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": err.to_string() }))).into_response()
            }
            HttpError::Api(err) => {
                error!(error = %err, "internal api failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error", "details": UPSTREAM_DETAILS })),
                )
                    .into_response()
            }
            HttpError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            HttpError::Task(err) => {
                error!(error = %err, "blocking task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error", "details": UPSTREAM_DETAILS })),
                )
                    .into_response()
            }
        }
    }
}

/// Run a StoreApi read on the blocking pool; every read hits the JSON files
pub(crate) async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, HttpError>
where
    F: FnOnce(&StoreApi) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let api = state.api.clone();
    Ok(tokio::task::spawn_blocking(move || work(&api)).await??)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/borrowers", get(routes::list_borrowers))
        .route("/api/borrowers/:id", get(routes::get_borrower))
        .route("/api/borrowers/:id/loans", get(routes::borrower_loans))
        .route("/api/borrowers/:id/equipment", get(routes::borrower_equipment))
        .route("/api/loans", get(routes::list_loans))
        .route("/api/loans/active", get(routes::active_loans))
        .route("/api/loans/summary", get(routes::loan_summary))
        .route("/api/loans/:id", get(routes::get_loan))
        .route("/api/loans/:id/status", get(routes::loan_status))
        .route("/api/loans/:id/payments", get(routes::loan_payments))
        .route("/api/loans/:id/collateral", get(routes::loan_collateral))
        .route("/api/risk/default/:borrower_id", get(routes::default_risk))
        .route("/api/risk/non-accrual/:borrower_id", get(routes::non_accrual_risk))
        .route("/api/risk/collateral/:loan_id", get(routes::collateral_sufficiency))
        .route("/api/risk/high-risk-farmers", get(routes::high_risk_farmers))
        .route("/api/risk/farmers-at-risk", get(routes::farmers_at_risk))
        .route(
            "/api/analytics/payment-patterns/:borrower_id",
            get(routes::payment_patterns),
        )
        .route(
            "/api/analytics/recommendations/refinance/:loan_id",
            get(routes::refinance_options),
        )
        .route("/api/analytics/restructure/:loan_id", get(routes::loan_restructuring))
        .route(
            "/api/analytics/equipment/forecast/:borrower_id",
            get(routes::equipment_forecast),
        )
        .route("/api/analytics/crop-yield/:borrower_id", get(routes::crop_yield_risk))
        .route("/api/analytics/market-impact/:borrower_id", get(routes::market_impact))
        .route("/api/functions", get(routes::list_functions))
        .route("/api/functions/:name", post(routes::call_function))
        .route("/api/chat", post(routes::chat))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
        // Public
        .route("/api/health", get(routes::health))
        .route("/api/auth/login", post(routes::login))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(auth::assign_request_id))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================
