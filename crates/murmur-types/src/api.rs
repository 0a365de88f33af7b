use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;
use crate::validation::{
    ValidationError, validate_avatar_url, validate_code, validate_content, validate_email,
    validate_password, validate_status, validate_username,
};

// -- Session --

/// Claims carried in the session cookie. `sub` is only set once the email
/// belongs to a registered user; before that the session just proves the email.
/// `jti` names this session so logout can revoke it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Uuid>,
    pub email: String,
    pub jti: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

impl SendCodeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

impl VerifyCodeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_code(&self.code)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub needs_profile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRegistrationRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl CompleteRegistrationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        validate_status(self.status.as_deref())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

/// Absent fields are left alone; an empty string clears the field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_status(self.status.as_deref())?;
        validate_avatar_url(self.avatar_url.as_deref())
    }
}

// -- Contacts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddContactRequest {
    pub invitation_code: String,
}

impl AddContactRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.invitation_code.trim().is_empty() {
            return Err(ValidationError::MissingInvitationCode);
        }
        Ok(())
    }
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
}

impl SendMessageRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_content(&self.content)
    }
}

// -- Misc --

/// Plain acknowledgement body, e.g. `{"message": "Logged out"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}

impl AckResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
}
