//! Conversation and message endpoints, plus the checkout route.
//!
//! Message posting persists first and fans out second: a subscriber that
//! misses the broadcast still sees the message on its next fetch.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::checkout::{self, CheckoutError, CheckoutReceipt};
use crate::db::{
    Article, Conversation, ConversationResponse, CreateConversationRequest, CreateMessageRequest,
    Message, User,
};
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_message_content;
use super::ws::ws_payload;

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::NotBuyer => ApiError::forbidden(err.to_string()),
            CheckoutError::ArticleGone => ApiError::not_found(err.to_string()),
            CheckoutError::Database(e) => e.into(),
        }
    }
}

async fn with_messages(
    state: &AppState,
    conversation: Conversation,
) -> Result<ConversationResponse, ApiError> {
    let messages = Message::list_for_conversation(&state.db, &conversation.id).await?;
    Ok(ConversationResponse {
        conversation,
        messages,
    })
}

/// Create-or-get the conversation for (article, caller).
pub async fn create_or_get_conversation(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let article = Article::find(&state.db, &request.article_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    if user.id == article.seller_id {
        return Err(ApiError::bad_request(
            "Sellers cannot start a conversation with themselves",
        ));
    }

    let conversation = Conversation::create_or_get(&state.db, &article, &user.id).await?;
    Ok(Json(with_messages(&state, conversation).await?))
}

/// List the caller's conversations, buyer- or seller-side.
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<ConversationResponse>>, ApiError> {
    let conversations = Conversation::list_for_user(&state.db, &user.id).await?;
    let mut responses = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        responses.push(with_messages(&state, conversation).await?);
    }
    Ok(Json(responses))
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = Conversation::find(&state.db, &conversation_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;
    if !conversation.is_participant(&user.id) {
        return Err(ApiError::forbidden("Not a participant of this conversation"));
    }
    Ok(Json(with_messages(&state, conversation).await?))
}

/// Post a message: persist, then fan out to live subscribers.
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(conversation_id): Path<String>,
    Json(request): Json<CreateMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let conversation = Conversation::find(&state.db, &conversation_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;
    if !conversation.is_participant(&user.id) {
        return Err(ApiError::forbidden("Not a participant of this conversation"));
    }

    validate_message_content(&request.content)
        .map_err(|e| ApiError::validation_field("content", e))?;

    let message = Message {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: conversation.id.clone(),
        sender_id: user.id.clone(),
        content: request.content,
        file_url: request.file_url,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    message.insert(&state.db).await?;

    match serde_json::to_string(&ws_payload(&message)) {
        Ok(payload) => {
            state.registry.broadcast(&conversation.id, &payload);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize message for fan-out");
        }
    }

    Ok(Json(message))
}

/// Run the mock checkout for the conversation's article.
pub async fn checkout_conversation(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(conversation_id): Path<String>,
) -> Result<Json<CheckoutReceipt>, ApiError> {
    let conversation = Conversation::find(&state.db, &conversation_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;

    let receipt =
        checkout::process_checkout(&state.db, &state.registry, &conversation, &user).await?;
    Ok(Json(receipt))
}
