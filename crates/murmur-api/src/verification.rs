use chrono::{Duration, Utc};
use rand::Rng;
use tracing::debug;

use murmur_db::models::RedeemOutcome;

use crate::error::ApiError;
use crate::mailer::OutgoingMail;
use crate::state::{AppState, with_db};

pub const CODE_TTL_MINUTES: i64 = 10;

/// Uniform over 000000-999999.
pub fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

/// Store a new code for `email` and mail it. Older codes are not invalidated.
pub async fn issue(state: &AppState, email: &str) -> Result<(), ApiError> {
    let code = generate_code();
    let now = Utc::now();
    let expires_at = now + Duration::minutes(CODE_TTL_MINUTES);

    let (e, c) = (email.to_string(), code.clone());
    with_db(state, move |db| db.insert_verification_code(&e, &c, now, expires_at)).await?;

    state.mailer.send(OutgoingMail {
        to: email.to_string(),
        subject: "Murmur verification code".into(),
        body: format!(
            "Your verification code is: {}\n\nThis code will expire in {} minutes.",
            code, CODE_TTL_MINUTES
        ),
    });

    debug!("Issued verification code for {}", email);
    Ok(())
}

/// Consume a code. Fails with `InvalidCode` or `Expired`.
pub async fn redeem(state: &AppState, email: &str, code: &str) -> Result<(), ApiError> {
    let (e, c) = (email.to_string(), code.to_string());
    let outcome = with_db(state, move |db| db.redeem_verification_code(&e, &c, Utc::now())).await?;

    match outcome {
        RedeemOutcome::Redeemed => Ok(()),
        RedeemOutcome::Invalid => Err(ApiError::InvalidCode),
        RedeemOutcome::Expired => Err(ApiError::Expired),
    }
}
