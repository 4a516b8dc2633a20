//! Axum route handlers for the companion HTTP server.
//!
//! # Routes
//!
//! - `GET    /health`                                   - Liveness probe
//! - `GET    /api/moods`                                - Mood profiles
//! - `POST   /api/users`                                - Register a user
//! - `POST   /api/conversations`                        - Create a user's conversation
//! - `GET    /api/conversations/:id`                    - Fetch a conversation
//! - `GET    /api/users/:user_id/conversation`          - Fetch a user's conversation
//! - `POST   /api/conversations/:id/messages`           - Append a message
//! - `PATCH  /api/conversations/:id/mood`               - Set mood
//! - `PATCH  /api/conversations/:id/affection`          - Set affection (clamped)
//! - `POST   /api/conversations/:id/milestones`         - Add a milestone
//! - `PATCH  /api/conversations/:id/milestones/:mid`    - Toggle `achieved`
//! - `POST   /api/chat`                                 - Stateless chat proxy
//! - `POST   /api/conversations/:id/turn`               - Full conversation turn
//!
//! Request bodies are taken as raw JSON and validated here, so every
//! rejection is a `{"message": ...}` body.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use super::error::ApiError;
use crate::affection;
use crate::chat::{ChatProxy, ChatRequest, Companion, TypingPacer};
use crate::chunker::ResponseChunker;
use crate::config::AppConfig;
use crate::conversation::{Conversation, Message, NewConversation, Sender};
use crate::error::StoreError;
use crate::llms::{ChatCompletion, OpenRouterClient};
use crate::milestone::Milestone;
use crate::mood::Mood;
use crate::persona::Persona;
use crate::store::{ConversationStore, MemoryStore};

type ApiResult<T> = Result<T, ApiError>;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversationStore>,
    pub companion: Arc<Companion>,
}

impl AppState {
    /// In-memory store plus an OpenRouter-backed companion.
    pub fn new(config: &AppConfig) -> Self {
        let backend = Arc::new(OpenRouterClient::from_config(&config.upstream));
        let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());
        let proxy = ChatProxy::new(backend, Persona::new(config.companion_name.clone()));
        let companion = Companion::new(store.clone(), proxy)
            .with_chunker(ResponseChunker::new(config.chunker))
            .with_pacer(TypingPacer::from(config.typing_delay));

        Self {
            store,
            companion: Arc::new(companion),
        }
    }

    /// State around an arbitrary completion backend, with no typing pauses.
    pub fn with_backend(backend: Arc<dyn ChatCompletion>) -> Self {
        let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());
        let proxy = ChatProxy::new(backend, Persona::default());
        let companion = Companion::new(store.clone(), proxy).with_pacer(TypingPacer::immediate());

        Self {
            store,
            companion: Arc::new(companion),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/moods", get(list_moods_handler))
        .route("/api/users", post(create_user_handler))
        .route("/api/users/:user_id/conversation", get(user_conversation_handler))
        .route("/api/conversations", post(create_conversation_handler))
        .route("/api/conversations/:id", get(get_conversation_handler))
        .route("/api/conversations/:id/messages", post(add_message_handler))
        .route("/api/conversations/:id/mood", patch(update_mood_handler))
        .route("/api/conversations/:id/affection", patch(update_affection_handler))
        .route("/api/conversations/:id/milestones", post(add_milestone_handler))
        .route(
            "/api/conversations/:id/milestones/:milestone_id",
            patch(update_milestone_handler),
        )
        .route("/api/conversations/:id/turn", post(turn_handler))
        .route("/api/chat", post(chat_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Extraction helpers
// ---------------------------------------------------------------------------

fn parse_id(raw: &str, what: &str) -> ApiResult<u64> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {} ID", what)))
}

fn body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    let Json(value) = payload?;
    if !value.is_object() {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    }
    Ok(value)
}

fn required_str<'a>(body: &'a Value, field: &str) -> ApiResult<&'a str> {
    body.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::bad_request(format!("Missing '{}'", field)))
}

async fn load_conversation(state: &AppState, id: u64) -> ApiResult<Conversation> {
    state
        .store
        .get_conversation(id)
        .await
        .ok_or_else(|| ApiError::not_found("Conversation not found"))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /health - liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "companion",
    }))
}

/// GET /api/moods - every mood with its emoji and description.
async fn list_moods_handler() -> impl IntoResponse {
    let moods: Vec<_> = Mood::ALL.iter().map(|m| m.profile()).collect();
    Json(serde_json::json!({ "moods": moods }))
}

/// POST /api/users
///
/// Request body: `{ "username": "...", "password": "..." }`
async fn create_user_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = body(payload)?;
    let username = required_str(&body, "username")?.trim();
    let password = required_str(&body, "password")?;
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    if state.store.get_user_by_username(username).await.is_some() {
        return Err(StoreError::UsernameTaken {
            username: username.to_string(),
        }
        .into());
    }

    let user = state.store.create_user(username, password).await?;
    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/:user_id/conversation
async fn user_conversation_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let user_id = parse_id(&user_id, "user")?;
    if state.store.get_user(user_id).await.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let conversation = state
        .store
        .get_conversation_by_user(user_id)
        .await
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;
    Ok(Json(conversation))
}

/// POST /api/conversations
///
/// Request body: `{ "userId": 1, "messages"?, "mood"?, "affection"?, "milestones"? }`
async fn create_conversation_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = body(payload)?;
    let init: NewConversation = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid conversation data: {}", e)))?;

    let conversation = state.store.create_conversation(init).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/conversations/:id
async fn get_conversation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let id = parse_id(&id, "conversation")?;
    Ok(Json(load_conversation(&state, id).await?))
}

/// POST /api/conversations/:id/messages
///
/// Request body: `{ "sender": "user" | "companion", "content": "..." }`
async fn add_message_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "conversation")?;
    let body = body(payload)?;
    let sender: Sender = body
        .get("sender")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| ApiError::bad_request("Invalid message data: unknown sender"))?;
    let content = required_str(&body, "content")?;

    let conversation = state
        .store
        .add_message(id, Message::new(sender, content))
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// PATCH /api/conversations/:id/mood
///
/// Request body: `{ "mood": "happy" }`
async fn update_mood_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = parse_id(&id, "conversation")?;
    let body = body(payload)?;
    let mood: Mood = required_str(&body, "mood")?
        .parse()
        .map_err(|e: crate::mood::UnknownMood| ApiError::bad_request(e.to_string()))?;

    Ok(Json(state.store.set_mood(id, mood).await?))
}

/// PATCH /api/conversations/:id/affection
///
/// Request body: `{ "affection": 42 }`. Fractions are rounded, the result is
/// clamped to `[0, 100]`.
async fn update_affection_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = parse_id(&id, "conversation")?;
    let body = body(payload)?;
    let raw = body
        .get("affection")
        .and_then(|v| v.as_f64())
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::bad_request("Affection must be a number"))?;
    let affection = affection::clamp(raw.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32);

    Ok(Json(state.store.set_affection(id, affection).await?))
}

/// POST /api/conversations/:id/milestones
///
/// Request body: `{ "title": "...", "description": "...", "achieved"?: bool }`
async fn add_milestone_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "conversation")?;
    let body = body(payload)?;
    let title = required_str(&body, "title")?;
    let description = required_str(&body, "description")?;
    let achieved = body.get("achieved").and_then(|v| v.as_bool()).unwrap_or(false);

    let milestone = Milestone::new(Uuid::new_v4().to_string(), title, description, achieved);
    let conversation = state.store.add_milestone(id, milestone).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// PATCH /api/conversations/:id/milestones/:milestone_id
///
/// Request body: `{ "achieved": true }`
async fn update_milestone_handler(
    State(state): State<AppState>,
    Path((id, milestone_id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = parse_id(&id, "conversation")?;
    let body = body(payload)?;
    let achieved = body
        .get("achieved")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| ApiError::bad_request("Achieved status must be a boolean"))?;

    Ok(Json(
        state
            .store
            .set_milestone_achieved(id, &milestone_id, achieved)
            .await?,
    ))
}

/// POST /api/conversations/:id/turn
///
/// Request body: `{ "content": "..." }`. Runs the whole turn, including the
/// paced chunk appends, before responding.
async fn turn_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "conversation")?;
    let body = body(payload)?;
    let content = body.get("content").and_then(|v| v.as_str()).unwrap_or("");

    let outcome = state.companion.send_message(id, content).await?;
    Ok(Json(outcome))
}

/// POST /api/chat - stateless proxy to the completion backend.
///
/// Request:  `{ "prompt": "...", "conversationHistory": [...], "mood"?: "happy" }`
/// Response: `{ "message": "...", "usage": {...} | null, "fallback": bool }`
async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = body(payload)?;
    let request: ChatRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid chat request: {}", e)))?;

    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }
    let mood = match request.mood.as_deref() {
        None | Some("") => Mood::Neutral,
        Some(raw) => raw
            .parse()
            .map_err(|e: crate::mood::UnknownMood| ApiError::bad_request(e.to_string()))?,
    };
    let history: Vec<Message> = request
        .conversation_history
        .into_iter()
        .map(Message::from)
        .collect();

    let reply = state
        .companion
        .proxy()
        .reply(&request.prompt, &history, mood)
        .await;
    Ok(Json(reply))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
