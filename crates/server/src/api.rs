//! HTTP surface over the agent runtime.
//!
//! `POST /turns` runs a batch of tool calls as one turn, `POST /chat` runs the
//! full decide/act loop for one inbound text, and `GET /sessions/...` reads the
//! current cart. Every response carries the request's correlation id.

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use orderbot_agent::{AgentReply, AgentRuntime, RawToolCall, ToolCall, TurnReport};
use orderbot_channel::normalize_phone;
use orderbot_core::domain::cart::Cart;
use orderbot_core::domain::session::ConversationKey;
use orderbot_core::errors::InterfaceError;
use orderbot_core::ordering::pricing::format_amount;
use orderbot_db::DbPool;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::health;

const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
    pub db_pool: DbPool,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db_pool.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/turns", post(run_turn))
        .route("/chat", post(chat))
        .route("/sessions/{business_phone}/{user_phone}", get(session))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub business_phone: String,
    pub user_phone: String,
    /// Customer's channel profile name, used to name a new session.
    #[serde(default)]
    pub name: Option<String>,
    pub tool_calls: Vec<RawToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub business_phone: String,
    pub user_phone: String,
    #[serde(default)]
    pub name: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub correlation_id: String,
    #[serde(flatten)]
    pub report: TurnReport,
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub correlation_id: String,
    #[serde(flatten)]
    pub reply: AgentReply,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub business_phone: String,
    pub user_phone: String,
    pub display_name: String,
    pub cart: Cart,
    pub total: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    correlation_id: String,
}

/// Response wrapper that maps the interface error taxonomy onto status codes.
pub struct ApiError(InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            InterfaceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let message = match &self.0 {
            InterfaceError::BadRequest { message, .. } => message.clone(),
            other => other.user_message().to_string(),
        };
        let body =
            ErrorBody { error: kind, message, correlation_id: self.0.correlation_id().to_string() };
        (status, Json(body)).into_response()
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Only the customer side is normalized; the business number is matched as registered.
fn conversation(business_phone: &str, user_phone: &str) -> ConversationKey {
    ConversationKey::new(business_phone.trim(), normalize_phone(user_phone))
}

fn bad_request(message: impl Into<String>, correlation_id: &str) -> ApiError {
    ApiError(InterfaceError::BadRequest {
        message: message.into(),
        correlation_id: correlation_id.to_string(),
    })
}

async fn run_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let key = conversation(&request.business_phone, &request.user_phone);

    if request.tool_calls.is_empty() {
        return Err(bad_request("tool_calls must not be empty", &correlation_id));
    }
    let calls = request
        .tool_calls
        .into_iter()
        .map(ToolCall::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|reason| bad_request(reason, &correlation_id))?;

    info!(
        event_name = "server.turn.received",
        correlation_id = %correlation_id,
        conversation = %key,
        calls = calls.len(),
        "turn request received"
    );

    let report = state
        .runtime
        .coordinator()
        .run_turn_as(&key, request.name.as_deref(), calls)
        .await
        .map_err(|error| ApiError(error.into_interface(correlation_id.as_str())))?;
    let total = format_amount(report.cart.total());

    Ok(Json(TurnResponse { correlation_id, report, total }))
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let key = conversation(&request.business_phone, &request.user_phone);

    if request.text.trim().is_empty() {
        return Err(bad_request("text must not be empty", &correlation_id));
    }

    let reply = state
        .runtime
        .handle_message(&key, request.name.as_deref(), &request.text, &correlation_id)
        .await;
    if reply.degraded {
        warn!(
            event_name = "server.chat.degraded",
            correlation_id = %correlation_id,
            conversation = %key,
            "chat answered with a degraded reply"
        );
    }

    Ok(Json(ChatResponse { correlation_id, reply }))
}

async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((business_phone, user_phone)): Path<(String, String)>,
) -> Result<Json<SessionResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let key = conversation(&business_phone, &user_phone);

    let session = state
        .runtime
        .coordinator()
        .session(&key)
        .await
        .map_err(|error| ApiError(error.into_interface(correlation_id.as_str())))?;

    Ok(Json(SessionResponse {
        business_phone: session.key.business_phone,
        user_phone: session.key.user_phone,
        display_name: session.display_name,
        total: format_amount(session.cart.total()),
        cart: session.cart,
    }))
}
