// src/handlers/messages.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedAccount,
    models::message::{ConversationPayload, ConversationResponse, NewMessagesPayload},
};

#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Messages",
    request_body = ConversationPayload,
    responses(
        (status = 200, description = "Conversation between the two participants", body = ConversationResponse),
        (status = 403, description = "Caller is not a participant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_conversation(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Json(payload): Json<ConversationPayload>,
) -> Result<Json<ConversationResponse>, AppError> {
    payload.validate()?;

    let conversation = app_state
        .messaging_service
        .get_or_create(&actor, &payload.sender, &payload.receiver)
        .await?;
    Ok(Json(ConversationResponse { conversation }))
}

#[utoipa::path(
    post,
    path = "/api/newmessage",
    tag = "Messages",
    request_body = NewMessagesPayload,
    responses(
        (status = 200, description = "Conversation after the append", body = ConversationResponse),
        (status = 400, description = "Empty batch or sender outside the conversation")
    ),
    security(("api_jwt" = []))
)]
pub async fn append_messages(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Json(payload): Json<NewMessagesPayload>,
) -> Result<Json<ConversationResponse>, AppError> {
    payload.validate()?;

    let conversation = app_state
        .messaging_service
        .append(&actor, &payload.sender, &payload.receiver, payload.message)
        .await?;
    Ok(Json(ConversationResponse { conversation }))
}
