use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use murmur_db::models::DeleteOutcome;
use murmur_types::api::{AckResponse, SendMessageRequest};
use murmur_types::models::Message;

use crate::error::ApiError;
use crate::gate::require_contact;
use crate::middleware::Session;
use crate::state::{AppState, with_db};

/// GET /messages/{peer_id}: the caller's view of the conversation, oldest first.
pub async fn get_conversation(
    State(state): State<AppState>,
    WithRejection(Path(peer_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Message>>, ApiError> {
    require_contact(&state, session.user_id, peer_id).await?;

    let (viewer, peer) = (session.user_id.to_string(), peer_id.to_string());
    let rows = with_db(&state, move |db| db.get_conversation(&viewer, &peer)).await?;

    let messages = rows
        .into_iter()
        .map(Message::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(messages))
}

/// POST /messages
///
/// The row is committed before the gateway push, and the push is queued before
/// the response goes out. Push failures never fail the request.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<Json<Message>, ApiError> {
    require_contact(&state, session.user_id, req.receiver_id).await?;
    req.validate()?;

    let (sender, receiver) = (session.user_id.to_string(), req.receiver_id.to_string());
    let content = req.content;
    let row = with_db(&state, move |db| db.insert_message(&sender, &receiver, &content, Utc::now())).await?;
    let message = Message::try_from(row)?;

    let reached = state.dispatcher.broadcast_message(&message).await;
    debug!("Message {} pushed to {} connections", message.id, reached);

    Ok(Json(message))
}

/// DELETE /messages/{message_id}: hide the message from the caller only.
pub async fn delete_message(
    State(state): State<AppState>,
    WithRejection(Path(message_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(session): Extension<Session>,
) -> Result<Json<AckResponse>, ApiError> {
    let (id, requester) = (message_id.to_string(), session.user_id.to_string());
    let outcome = with_db(&state, move |db| db.soft_delete_message(&id, &requester)).await?;

    match outcome {
        DeleteOutcome::DeletedForSender | DeleteOutcome::DeletedForReceiver => {
            Ok(Json(AckResponse::new("Message deleted")))
        }
        DeleteOutcome::NotFound => Err(ApiError::NotFound("Message not found")),
        DeleteOutcome::NotParticipant => Err(ApiError::Forbidden("Not a participant in this message")),
    }
}
