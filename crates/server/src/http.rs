//! HTTP endpoints
//!
//! REST surface for the dialogue manager: the chat endpoint, the
//! conversation-log queries, health, metrics and the admin reload.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use flowbot_core::MessageOutput;
use flowbot_persistence::ConversationRecord;

use crate::metrics::metrics_handler;
use crate::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat endpoint
        .route("/chatbot/rest", post(send_rest))
        // Conversation log queries
        .route("/conversations/:user_id", get(get_conversation))
        .route("/messages", get(get_messages))
        .route("/users", get(get_users))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Admin endpoints
        .route("/admin/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Input scheme of the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// `POST /chatbot/rest` — drive one turn and return the response.
async fn send_rest(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<MessageOutput>, StatusCode> {
    if request.user_id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    metrics::counter!("flowbot_http_requests_total", "route" => "chat").increment(1);

    let engine = state.engine();
    let user_name = request.user_name.as_deref().unwrap_or("anonymous");

    let conversation = engine.conversations.get(&request.user_id, user_name).await;
    let output = {
        let mut conversation = conversation.lock().await;
        engine
            .controller
            .handle(&mut conversation, Some(&request.message))
            .await
    };
    engine.conversations.save(&request.user_id).await;

    Ok(Json(output))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// A log record with its composite fields decoded for API consumers.
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub version: String,
    pub intent: Value,
    pub entities: Value,
    pub slots: Value,
    pub events: Value,
    pub button: Option<Value>,
    pub synonym_dict: Option<Value>,
    pub loop_stack: i64,
    pub response: Option<Value>,
    pub timestamp: f64,
}

impl From<ConversationRecord> for RecordView {
    fn from(record: ConversationRecord) -> Self {
        let decode = |encoded: &str| {
            serde_json::from_str::<Value>(encoded)
                .unwrap_or_else(|_| Value::String(encoded.to_string()))
        };
        Self {
            id: record.id,
            user_id: record.user_id,
            user_name: record.user_name,
            version: record.version,
            intent: decode(&record.intent),
            entities: decode(&record.entities),
            slots: decode(&record.slots),
            events: decode(&record.events),
            button: record.button.as_deref().map(decode),
            synonym_dict: record.synonym_dict.as_deref().map(decode),
            loop_stack: record.loop_stack,
            response: record.response.as_deref().map(decode),
            timestamp: record.timestamp,
        }
    }
}

/// `GET /conversations/:user_id` — one user's turns, most recent first.
async fn get_conversation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<RecordView>>, StatusCode> {
    let engine = state.engine();
    let records = engine
        .store
        .history(&user_id, query.limit.unwrap_or(100))
        .await
        .map_err(|error| {
            tracing::error!(%error, "history query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(records.into_iter().map(RecordView::from).collect()))
}

/// `GET /messages` — recent turns across all users.
async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<RecordView>>, StatusCode> {
    let engine = state.engine();
    let records = engine
        .store
        .recent(query.limit.unwrap_or(300))
        .await
        .map_err(|error| {
            tracing::error!(%error, "recent query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(records.into_iter().map(RecordView::from).collect()))
}

/// `GET /users` — the latest turn of each known user.
async fn get_users(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<RecordView>>, StatusCode> {
    let engine = state.engine();
    let records = engine
        .store
        .latest_per_user(query.limit.unwrap_or(100))
        .await
        .map_err(|error| {
            tracing::error!(%error, "latest-per-user query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(records.into_iter().map(RecordView::from).collect()))
}

/// `GET /health`
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let engine = state.engine();
    Json(serde_json::json!({
        "status": "ok",
        "instance_id": state.instance_id,
        "cached_conversations": engine.conversations.len(),
    }))
}

/// `POST /admin/reload` — rebuild the engine from configuration.
async fn reload(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, String)> {
    state.reload().map_err(|error| {
        tracing::error!(%error, "reload failed");
        (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    })?;
    Ok(Json(serde_json::json!({ "reloaded": true })))
}
