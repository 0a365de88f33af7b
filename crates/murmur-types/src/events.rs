use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Events pushed over the WebSocket gateway.
///
/// Clients treat these as a cue to refetch the conversation; the REST API stays
/// the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A message was persisted.
    Message { message: Message },
}
