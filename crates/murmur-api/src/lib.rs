//! HTTP surface: email-code auth, contacts, messages and the gateway upgrade.

pub mod auth;
pub mod contacts;
pub mod error;
pub mod gate;
pub mod identity;
pub mod mailer;
pub mod messages;
pub mod middleware;
pub mod session;
pub mod state;
pub mod verification;
pub mod ws;

use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use murmur_types::api::HealthResponse;

use crate::middleware::require_session;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/send-code", post(auth::send_code))
        .route("/auth/verify-code", post(auth::verify_code))
        .route("/auth/complete-registration", post(auth::complete_registration));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/profile", patch(auth::update_profile))
        .route("/contacts", get(contacts::list_contacts).post(contacts::add_contact))
        .route("/messages", post(messages::send_message))
        .route(
            "/messages/{id}",
            get(messages::get_conversation).delete(messages::delete_message),
        )
        .route("/ws", get(ws::ws_upgrade))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        connections: state.dispatcher.connection_count().await,
    })
}
