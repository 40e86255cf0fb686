//! HTTP API — chat plus the dashboard's data endpoints.
//!
//! Endpoints (nested under `/api`):
//!
//! - `POST /chat`                       — One counselling turn
//! - `GET  /tools`                      — Tools the model can call
//! - `GET  /profiles/{id}`              — Stored profile
//! - `PUT  /profiles/{id}/onboarding`   — Save onboarding answers
//! - `POST /profiles/{id}/stage`        — Set the dashboard stage
//! - `GET  /universities`               — Discovery grid (`country`, `maxBudget`)
//! - `GET  /users/{id}/shortlist`       — Shortlist joined with universities
//! - `POST /users/{id}/shortlist`       — Manual shortlist add
//! - `GET  /users/{id}/tasks`           — Application checklist
//! - `POST /users/{id}/tasks`           — Manual task add
//! - `POST /tasks/{id}/toggle`          — Flip a task PENDING ↔ DONE

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{error, info, warn};

use unipath_agent::stage::{self, DiscoveryCard, StageError};
use unipath_core::domain::{
    Category, ChatRole, ChatTurn, Profile, ShortlistEntry, ShortlistView, Stage, Task,
};
use unipath_core::error::StoreError;
use unipath_core::provider::ToolDefinition;
use unipath_core::store::OnboardingUpdate;

use crate::SharedState;

/// What the student sees when a chat turn fails for any reason.
pub const GENERIC_ERROR_REPLY: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

/// Build the API router. Nest this under "/api" in the main router.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/tools", get(list_tools_handler))
        .route("/profiles/{id}", get(get_profile_handler))
        .route("/profiles/{id}/onboarding", put(onboarding_handler))
        .route("/profiles/{id}/stage", post(set_stage_handler))
        .route("/universities", get(discovery_handler))
        .route("/users/{id}/shortlist", get(list_shortlist_handler))
        .route("/users/{id}/shortlist", post(add_shortlist_handler))
        .route("/users/{id}/tasks", get(list_tasks_handler))
        .route("/users/{id}/tasks", post(add_task_handler))
        .route("/tasks/{id}/toggle", post(toggle_task_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal storage error".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            StoreError::Constraint(_) => ApiError::BadRequest(e.to_string()),
            other => {
                error!(error = %other, "Store operation failed");
                ApiError::Internal
            }
        }
    }
}

impl From<StageError> for ApiError {
    fn from(e: StageError) -> Self {
        match e {
            StageError::Invalid(msg) => ApiError::BadRequest(msg),
            StageError::Store(e) => e.into(),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDefinition>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
struct StageRequest {
    stage: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse {
    pub user_id: String,
    pub stage: Stage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveryQuery {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    max_budget: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortlistRequest {
    university_id: String,
    category: Category,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskRequest {
    title: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if payload.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("userId is required".into()));
    }
    match payload.messages.last() {
        None => return Err(ApiError::BadRequest("messages must not be empty".into())),
        Some(turn) if turn.role != ChatRole::User => {
            return Err(ApiError::BadRequest(
                "the last message must come from the user".into(),
            ));
        }
        Some(_) => {}
    }

    info!(
        user_id = %payload.user_id,
        turns = payload.messages.len(),
        "api/chat request"
    );

    let content = match state
        .agent
        .respond(&payload.user_id, &payload.messages)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            error!(user_id = %payload.user_id, error = %e, "Chat turn failed");
            GENERIC_ERROR_REPLY.to_string()
        }
    };

    Ok(Json(ChatResponse {
        role: ChatRole::Assistant,
        content,
    }))
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools = state.agent.tools().definitions();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

async fn get_profile_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Profile>> {
    state
        .store
        .get_profile(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("profile not found: {id}")))
}

async fn onboarding_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(update): Json<OnboardingUpdate>,
) -> ApiResult<Json<Profile>> {
    let profile =
        stage::complete_onboarding(state.store.as_ref(), &state.event_bus, &id, update).await?;
    Ok(Json(profile))
}

async fn set_stage_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<StageRequest>,
) -> ApiResult<Json<StageResponse>> {
    let target = Stage::from_str(payload.stage.trim()).map_err(ApiError::BadRequest)?;
    stage::advance(state.store.as_ref(), &state.event_bus, &id, target).await?;
    Ok(Json(StageResponse {
        user_id: id,
        stage: target,
    }))
}

async fn discovery_handler(
    State(state): State<SharedState>,
    Query(query): Query<DiscoveryQuery>,
) -> ApiResult<Json<Vec<DiscoveryCard>>> {
    let cards = stage::discovery_listing(
        state.store.as_ref(),
        query.country.as_deref(),
        query.max_budget,
    )
    .await?;
    Ok(Json(cards))
}

async fn list_shortlist_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ShortlistView>>> {
    Ok(Json(state.store.list_shortlist(&id).await?))
}

async fn add_shortlist_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ShortlistRequest>,
) -> ApiResult<(StatusCode, Json<ShortlistEntry>)> {
    let entry = stage::shortlist_manually(
        state.store.as_ref(),
        &id,
        &payload.university_id,
        payload.category,
        payload.notes,
    )
    .await
    .inspect_err(|e| warn!(user_id = %id, error = %e, "Manual shortlist add failed"))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_tasks_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.store.list_tasks(&id).await?))
}

async fn add_task_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = stage::add_manual_task(state.store.as_ref(), &id, &payload.title).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn toggle_task_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(stage::toggle_task(state.store.as_ref(), &id).await?))
}

// ── Tests ─────────────────────────────────────────────────────────────────
