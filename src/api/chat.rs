// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    agent::{self, HISTORY_WINDOW},
    auth::{Auth, AuthenticatedUser},
    error::{ApiError, ApiJson},
    models::{
        ChatMessage, ChatRequest, ChatResponse, ChatRole, Conversation, ConversationDetail,
        ConversationMessage, ConversationSummary, MessageResponse,
    },
    state::AppState,
};

/// Characters of the first message used as a conversation title.
const TITLE_PREVIEW_CHARS: usize = 30;
const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";
const EMPTY_ASSISTANT_MESSAGE: &str = "Processed.";
const EMPTY_RESPONSE: &str = "Done.";

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserQuery {
    /// Must match the authenticated user when given.
    pub user_id: Option<String>,
}

pub fn conversation_title(message: &str) -> String {
    if message.is_empty() {
        return DEFAULT_CONVERSATION_TITLE.to_string();
    }
    if message.chars().count() > TITLE_PREVIEW_CHARS {
        let preview: String = message.chars().take(TITLE_PREVIEW_CHARS).collect();
        format!("{preview}...")
    } else {
        message.to_string()
    }
}

/// Check that a client-supplied user id names the caller.
fn ensure_caller(raw: &str, user: &AuthenticatedUser) -> Result<(), ApiError> {
    let id = Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("Invalid user_id format"))?;
    if id != user.id() {
        return Err(ApiError::forbidden("Not authorized"));
    }
    Ok(())
}

fn ensure_query_caller(query: &UserQuery, user: &AuthenticatedUser) -> Result<(), ApiError> {
    match query.user_id.as_deref() {
        Some(raw) if !raw.trim().is_empty() => ensure_caller(raw, user),
        _ => Ok(()),
    }
}

/// Load a conversation the caller owns. Foreign and missing look the same.
async fn owned_conversation(
    state: &AppState,
    user: &AuthenticatedUser,
    raw_id: &str,
) -> Result<Conversation, ApiError> {
    let id = Uuid::parse_str(raw_id).map_err(|_| ApiError::bad_request("Invalid ID"))?;
    match state.store.conversation_by_id(id).await? {
        Some(conversation) if conversation.user_id == user.id() => Ok(conversation),
        _ => Err(ApiError::not_found("Not found")),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/chat",
    request_body = ChatRequest,
    tag = "Chat",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ChatResponse),
        (status = 400, description = "Missing or malformed user_id"),
        (status = 403, description = "user_id is not the caller")
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    Auth(user): Auth,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("user_id is required"));
    }
    ensure_caller(&request.user_id, &user)?;

    let now = Utc::now();

    let existing = match request
        .conversation_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
    {
        Some(id) => state
            .store
            .conversation_by_id(id)
            .await?
            .filter(|c| c.user_id == user.id()),
        None => None,
    };

    let conversation = match existing {
        Some(conversation) => conversation,
        None => {
            let conversation =
                Conversation::new(user.id(), conversation_title(&request.message), now);
            state.store.insert_conversation(&conversation).await?;
            tracing::debug!(conversation_id = %conversation.id, user_id = %user.id(), "Conversation started");
            conversation
        }
    };

    let user_message = ChatMessage::new(conversation.id, ChatRole::User, request.message.clone(), now);
    state.store.append_message(&user_message).await?;

    let history = state
        .store
        .recent_messages(conversation.id, HISTORY_WINDOW)
        .await?;

    let outcome = agent::respond(
        state.chat_model.as_deref(),
        state.store.as_ref(),
        user.id(),
        &history,
        now,
    )
    .await;

    let stored_reply = if outcome.reply.is_empty() {
        EMPTY_ASSISTANT_MESSAGE.to_string()
    } else {
        outcome.reply.clone()
    };
    let replied_at = Utc::now();
    let assistant_message =
        ChatMessage::new(conversation.id, ChatRole::Assistant, stored_reply, replied_at);
    state.store.append_message(&assistant_message).await?;
    state
        .store
        .touch_conversation(conversation.id, replied_at)
        .await?;

    let response = if outcome.reply.is_empty() {
        EMPTY_RESPONSE.to_string()
    } else {
        outcome.reply
    };

    Ok(Json(ChatResponse {
        response,
        conversation_id: conversation.id.to_string(),
        user_id: request.user_id,
        tool_calls_executed: outcome.tool_calls_executed,
        original_request: json!({"message": request.message}),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations",
    params(UserQuery),
    tag = "Chat",
    security(("bearer_auth" = [])),
    responses((status = 200, body = [ConversationSummary]))
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    ensure_query_caller(&query, &user)?;
    let conversations = state.store.conversations_for_user(user.id()).await?;
    Ok(Json(conversations.iter().map(ConversationSummary::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/conversations/{conversation_id}",
    params(
        ("conversation_id" = String, Path, description = "Conversation UUID"),
        UserQuery
    ),
    tag = "Chat",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ConversationDetail),
        (status = 400, description = "Malformed ID"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_conversation(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(query): Query<UserQuery>,
) -> Result<Json<ConversationDetail>, ApiError> {
    ensure_query_caller(&query, &user)?;
    let conversation = owned_conversation(&state, &user, &conversation_id).await?;
    let messages = state
        .store
        .messages_for_conversation(conversation.id)
        .await?;

    Ok(Json(ConversationDetail {
        id: conversation.id.to_string(),
        title: conversation.title,
        created_at: conversation.created_at,
        updated_at: conversation.updated_at,
        messages: messages.iter().map(ConversationMessage::from).collect(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/conversations/{conversation_id}",
    params(
        ("conversation_id" = String, Path, description = "Conversation UUID"),
        UserQuery
    ),
    tag = "Chat",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Malformed ID"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_conversation(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(query): Query<UserQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_query_caller(&query, &user)?;
    let conversation = owned_conversation(&state, &user, &conversation_id).await?;
    state.store.delete_conversation(conversation.id).await?;
    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}
