use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use murmur_types::validation::ValidationError;

/// Every failure a handler can report. Rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Body or path that could not be decoded at all.
    #[error("{0}")]
    Malformed(String),

    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired")]
    Expired,

    #[error("Invalid invitation code")]
    InvalidInvitation,

    #[error("Cannot add yourself as a contact")]
    SelfContact,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Malformed(_)
            | Self::InvalidCode
            | Self::Expired
            | Self::InvalidInvitation
            | Self::SelfContact => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::EmailNotVerified => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
