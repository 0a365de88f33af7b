use axum::{
    Extension,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};
use tracing::debug;

use murmur_gateway::connection;

use crate::middleware::Session;
use crate::state::AppState;

/// GET /ws
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    debug!("Gateway upgrade for {}", session.user_id);
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, session.user_id))
}
