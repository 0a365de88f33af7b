use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// The logged-in caller, inserted as a request extension by [`require_session`].
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Reject requests without a live session cookie for a registered user.
/// A cookie that only proves an email (registration still pending) is not enough,
/// and neither is one that was logged out.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state.session.read(&jar).ok_or(ApiError::Unauthenticated)?;
    let user_id = claims.sub.ok_or(ApiError::Unauthenticated)?;

    let jti = claims.jti.to_string();
    if with_db(&state, move |db| db.is_session_revoked(&jti)).await? {
        return Err(ApiError::Unauthenticated);
    }

    let expires_at = DateTime::from_timestamp(claims.exp as i64, 0).ok_or(ApiError::Unauthenticated)?;
    req.extensions_mut().insert(Session {
        user_id,
        email: claims.email,
        jti: claims.jti,
        expires_at,
    });
    Ok(next.run(req).await)
}
