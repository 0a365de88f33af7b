use axum::{Extension, Json, extract::State};
use axum_extra::extract::{WithRejection, cookie::CookieJar};
use tracing::{info, warn};

use murmur_types::api::{
    AckResponse, CompleteRegistrationRequest, SendCodeRequest, UpdateProfileRequest,
    UserResponse, VerifyCodeRequest, VerifyCodeResponse,
};
use murmur_types::models::User;

use crate::error::ApiError;
use crate::identity;
use crate::middleware::Session;
use crate::state::{AppState, with_db};
use crate::verification;

/// POST /auth/send-code
pub async fn send_code(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SendCodeRequest>, ApiError>,
) -> Result<Json<AckResponse>, ApiError> {
    req.validate()?;

    let email = req.email.clone();
    let existing = with_db(&state, move |db| db.get_user_by_email(&email)).await?;

    verification::issue(&state, &req.email).await?;

    let message = if existing.is_some() {
        "User already registered. Please verify to login."
    } else {
        "Verification code sent"
    };
    Ok(Json(AckResponse::new(message)))
}

/// POST /auth/verify-code
///
/// Logs an existing user in, or starts a pending session that only proves the
/// email so that registration can be completed.
pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<VerifyCodeRequest>, ApiError>,
) -> Result<(CookieJar, Json<VerifyCodeResponse>), ApiError> {
    req.validate()?;

    if let Err(e) = verification::redeem(&state, &req.email, &req.code).await {
        warn!("Verification failed for {}: {}", req.email, e);
        return Err(e);
    }

    let email = req.email.clone();
    let existing = with_db(&state, move |db| db.get_user_by_email(&email)).await?;

    match existing {
        Some(row) => {
            let user = User::try_from(row)?;
            let cookie = state.session.issue(&req.email, Some(user.id))?;
            info!("{} ({}) logged in", user.username, user.id);
            Ok((
                jar.add(cookie),
                Json(VerifyCodeResponse {
                    needs_profile: false,
                    user: Some(user),
                }),
            ))
        }
        None => {
            let cookie = state.session.issue(&req.email, None)?;
            Ok((
                jar.add(cookie),
                Json(VerifyCodeResponse {
                    needs_profile: true,
                    user: None,
                }),
            ))
        }
    }
}

/// POST /auth/complete-registration
pub async fn complete_registration(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<CompleteRegistrationRequest>, ApiError>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    req.validate()?;

    let verified = state.session.read(&jar).map(|claims| claims.email);
    if verified.as_deref() != Some(req.email.as_str()) {
        return Err(ApiError::EmailNotVerified);
    }

    let email = req.email.clone();
    let user = identity::register(&state, req).await?;
    let cookie = state.session.issue(&email, Some(user.id))?;

    info!("{} ({}) registered", user.username, user.id);
    Ok((jar.add(cookie), Json(UserResponse { user })))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<User>, ApiError> {
    let id = session.user_id.to_string();
    let row = with_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(User::try_from(row)?))
}

/// PATCH /auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProfileRequest>, ApiError>,
) -> Result<Json<User>, ApiError> {
    req.validate()?;

    let id = session.user_id.to_string();
    let row = with_db(&state, move |db| {
        // Empty string clears the field.
        let status = req.status.as_deref().map(|s| Some(s).filter(|s| !s.is_empty()));
        let avatar_url = req.avatar_url.as_deref().map(|s| Some(s).filter(|s| !s.is_empty()));
        db.update_profile(&id, status, avatar_url)
    })
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(User::try_from(row)?))
}

/// POST /auth/logout
///
/// Revokes the token server-side, so a copy of the cookie stops working too.
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AckResponse>), ApiError> {
    let (jti, expires_at) = (session.jti.to_string(), session.expires_at);
    with_db(&state, move |db| db.revoke_session(&jti, expires_at)).await?;

    info!("{} ({}) logged out", session.email, session.user_id);
    Ok((state.session.clear(jar), Json(AckResponse::new("Logged out"))))
}
