use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;

use murmur_db::models::{NewUser, NewUserOutcome};
use murmur_types::api::CompleteRegistrationRequest;
use murmur_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// 16 random bytes, hex encoded.
pub fn generate_invitation_code() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Hash password with Argon2id.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Create the account. The caller must already have checked that the email was verified.
pub async fn register(state: &AppState, req: CompleteRegistrationRequest) -> Result<User, ApiError> {
    let outcome = with_db(state, move |db| {
        let new = NewUser {
            password_hash: hash_password(&req.password)?,
            invitation_code: generate_invitation_code(),
            email: req.email,
            username: req.username,
            status: req.status.filter(|s| !s.is_empty()),
        };
        db.create_user(&new, Utc::now())
    })
    .await?;

    match outcome {
        NewUserOutcome::Created(row) => Ok(User::try_from(row)?),
        NewUserOutcome::UsernameTaken => Err(ApiError::Conflict("Username already taken")),
        NewUserOutcome::EmailTaken => Err(ApiError::Conflict("Email already registered")),
    }
}
